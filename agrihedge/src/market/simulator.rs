use std::collections::VecDeque;
use std::sync::{Arc, Mutex, TryLockError, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::driver::Ticker;
use super::lock;
use super::state::MarketState;
use super::subscribers::{NotifyReport, SubscriberRegistry, Subscription};
use crate::config::MarketConfig;
use crate::error::{Error, Result};
use crate::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Running,
}

struct Market {
    state: MarketState,
    rng: Box<dyn RngCore + Send>,
    clock: Box<dyn Clock>,
}

/// Thread running the current notification round, and prices produced by
/// advances that thread made from inside its own subscribers
#[derive(Default)]
struct RoundOwner {
    thread: Option<ThreadId>,
    deferred: VecDeque<i64>,
}

struct Shared {
    market: Mutex<Market>,
    // held for a whole transition plus notification round
    round: Mutex<()>,
    owner: Mutex<RoundOwner>,
    subscribers: Arc<SubscriberRegistry>,
    driver: Mutex<Option<Ticker>>,
    tick_interval: Duration,
}

/// Shared handle to the simulated market
///
/// Build one per application and hand clones to every consumer; clones share
/// the same prices, subscribers and driver.
#[derive(Clone)]
pub struct MarketSimulator {
    shared: Arc<Shared>,
}

impl MarketSimulator {
    /// Market seeded from entropy, stamped with the UTC calendar day
    pub fn new(config: MarketConfig) -> Result<Self> {
        Self::with_sources(config, StdRng::from_entropy(), SystemClock)
    }

    pub fn with_seed(config: MarketConfig, seed: u64) -> Result<Self> {
        Self::with_sources(config, StdRng::seed_from_u64(seed), SystemClock)
    }

    pub fn with_sources<R, C>(config: MarketConfig, mut rng: R, clock: C) -> Result<Self>
    where
        R: RngCore + Send + 'static,
        C: Clock + 'static,
    {
        config.validate()?;
        let state = MarketState::initialize(config, clock.today(), &mut rng);
        Ok(Self::from_state(state, rng, clock))
    }

    /// Wrap an existing state, e.g. one rebuilt with [`MarketState::resume`]
    pub fn from_state<R, C>(state: MarketState, rng: R, clock: C) -> Self
    where
        R: RngCore + Send + 'static,
        C: Clock + 'static,
    {
        let tick_interval = state.config().tick_interval();
        MarketSimulator {
            shared: Arc::new(Shared {
                market: Mutex::new(Market {
                    state,
                    rng: Box::new(rng),
                    clock: Box::new(clock),
                }),
                round: Mutex::new(()),
                owner: Mutex::new(RoundOwner::default()),
                subscribers: Arc::new(SubscriberRegistry::new()),
                driver: Mutex::new(None),
                tick_interval,
            }),
        }
    }

    /// Run one tick and notify subscribers
    ///
    /// Rounds are serialized: a second caller waits until the current
    /// transition and its notifications have finished, so every subscriber
    /// sees prices in history order and the last price it sees is the current
    /// one. Subscribers run without the state lock held and may read the
    /// simulator or (un)subscribe.
    ///
    /// A subscriber that calls `advance` on the notifying thread gets its
    /// transition applied at once; the matching notification round is
    /// delivered after the current round ends, and the returned report has
    /// `delivered == 0`.
    pub fn advance(&self) -> NotifyReport {
        if let Some(report) = self.advance_nested() {
            return report;
        }
        let _round = lock(&self.shared.round);
        self.run_round()
    }

    /// Driver tick: skipped while another caller's round is in progress
    fn tick(&self) {
        let _round = match self.shared.round.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("tick skipped, advance already in progress");
                return;
            }
        };
        self.run_round();
    }

    fn advance_nested(&self) -> Option<NotifyReport> {
        let mut owner = lock(&self.shared.owner);
        if owner.thread != Some(thread::current().id()) {
            return None;
        }
        let price = self.transition();
        owner.deferred.push_back(price);
        Some(NotifyReport {
            price,
            delivered: 0,
            failures: Vec::new(),
        })
    }

    // caller holds the round lock
    fn run_round(&self) -> NotifyReport {
        lock(&self.shared.owner).thread = Some(thread::current().id());
        let price = self.transition();
        let report = self.notify(price);
        loop {
            let next = lock(&self.shared.owner).deferred.pop_front();
            match next {
                Some(price) => {
                    self.notify(price);
                }
                None => break,
            }
        }
        lock(&self.shared.owner).thread = None;
        report
    }

    fn transition(&self) -> i64 {
        let price = {
            let mut market = lock(&self.shared.market);
            let Market { state, rng, clock } = &mut *market;
            state.advance(clock.today(), rng.as_mut())
        };
        debug!(price, "market price updated");
        price
    }

    fn notify(&self, price: i64) -> NotifyReport {
        let report = self.shared.subscribers.notify(price);
        for failure in &report.failures {
            warn!(price, error = %failure, "price subscriber panicked");
        }
        report
    }

    pub fn current_price(&self) -> i64 {
        lock(&self.shared.market).state.current_price()
    }

    /// Copy of the history, historical points first then the forecast
    pub fn price_history(&self) -> Vec<PricePoint> {
        lock(&self.shared.market).state.history().to_vec()
    }

    /// Copy of the full state
    pub fn snapshot(&self) -> MarketState {
        lock(&self.shared.market).state.clone()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Start ticking. Does nothing when already running.
    pub fn start(&self) -> Result<()> {
        let mut driver = lock(&self.shared.driver);
        if driver.is_some() {
            return Ok(());
        }

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let ticker = Ticker::spawn(self.shared.tick_interval, move || match weak.upgrade() {
            Some(shared) => {
                MarketSimulator { shared }.tick();
                true
            }
            None => false,
        })
        .map_err(|e| {
            error!(error = %e, "could not spawn market driver");
            Error::Driver(e)
        })?;

        *driver = Some(ticker);
        info!(
            interval_ms = self.shared.tick_interval.as_millis() as u64,
            "market simulation started"
        );
        Ok(())
    }

    /// Stop ticking. Does nothing when already stopped; prices are kept.
    pub fn stop(&self) {
        // release the lock before joining so a subscriber calling start/stop
        // on the driver thread cannot deadlock against us
        let ticker = lock(&self.shared.driver).take();
        if let Some(ticker) = ticker {
            ticker.stop();
            info!("market simulation stopped");
        }
    }

    pub fn driver_state(&self) -> DriverState {
        if lock(&self.shared.driver).is_some() {
            DriverState::Running
        } else {
            DriverState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.driver_state() == DriverState::Running
    }
}

impl std::fmt::Debug for MarketSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketSimulator")
            .field("current_price", &self.current_price())
            .field("driver", &self.driver_state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
