//! Virtual-time replay of the market driver
//!
//! Runs the same start/stop/tick state machine as the live driver on the `des`
//! event loop, in virtual milliseconds, so a whole session plays out
//! instantly and reproducibly from a seed.
//!
//! Agents:
//! - `MarketAgent`: owns the market state; re-arms a tick chain while running
//! - `TickRecorder`: the virtual-time subscriber, records every price update

use chrono::{Duration, NaiveDate};
use des::{Agent, EventLoop, Response};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::MarketConfig;
use crate::error::{Error, Result};
use crate::market::MarketState;
use crate::PricePoint;

pub const MS_PER_DAY: usize = 86_400_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Stop,
    /// `run` identifies the start() that armed this chain
    Tick { run: u64 },
    PriceUpdated { price: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickRecord {
    pub t_ms: usize,
    pub date: NaiveDate,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketReplayStats {
    pub ticks: usize,
    pub running: bool,
    pub current_price: i64,
    pub history: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stats {
    Market(MarketReplayStats),
    Recorder(Vec<TickRecord>),
}

fn day_at(start_date: NaiveDate, t_ms: usize) -> NaiveDate {
    let days = (t_ms / MS_PER_DAY) as i64;
    start_date
        .checked_add_signed(Duration::days(days))
        .unwrap_or(start_date)
}

pub struct MarketAgent {
    state: MarketState,
    rng: StdRng,
    start_date: NaiveDate,
    interval_ms: usize,
    running: bool,
    run: u64,
    ticks: usize,
}

impl MarketAgent {
    pub fn new(config: MarketConfig, start_date: NaiveDate, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let interval_ms = config.tick_interval_ms as usize;
        let state = MarketState::initialize(config, start_date, &mut rng);
        MarketAgent {
            state,
            rng,
            start_date,
            interval_ms,
            running: false,
            run: 0,
            ticks: 0,
        }
    }
}

impl Agent<Event, Stats> for MarketAgent {
    fn act(&mut self, current_t: usize, data: &Event) -> Response<Event> {
        match data {
            Event::Start => {
                if self.running {
                    return Response::new();
                }
                self.running = true;
                self.run += 1;
                Response::event(current_t + self.interval_ms, Event::Tick { run: self.run })
            }
            Event::Stop => {
                self.running = false;
                Response::new()
            }
            Event::Tick { run } => {
                // a chain armed before the last stop is dead
                if !self.running || *run != self.run {
                    return Response::new();
                }
                let today = day_at(self.start_date, current_t);
                let price = self.state.advance(today, &mut self.rng);
                self.ticks += 1;
                Response::events(vec![
                    (current_t, Event::PriceUpdated { price }),
                    (current_t + self.interval_ms, Event::Tick { run: *run }),
                ])
            }
            Event::PriceUpdated { .. } => Response::new(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::Market(MarketReplayStats {
            ticks: self.ticks,
            running: self.running,
            current_price: self.state.current_price(),
            history: self.state.history().to_vec(),
        })
    }
}

pub struct TickRecorder {
    start_date: NaiveDate,
    records: Vec<TickRecord>,
}

impl TickRecorder {
    pub fn new(start_date: NaiveDate) -> Self {
        TickRecorder {
            start_date,
            records: Vec::new(),
        }
    }
}

impl Agent<Event, Stats> for TickRecorder {
    fn act(&mut self, current_t: usize, data: &Event) -> Response<Event> {
        if let Event::PriceUpdated { price } = data {
            self.records.push(TickRecord {
                t_ms: current_t,
                date: day_at(self.start_date, current_t),
                price: *price,
            });
        }
        Response::new()
    }

    fn stats(&self) -> Stats {
        Stats::Recorder(self.records.clone())
    }
}

/// Start/stop calls at virtual times, plus the horizon of the replay
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayPlan {
    pub controls: Vec<(usize, Event)>,
    pub until_ms: usize,
}

impl ReplayPlan {
    /// Start at t=0 and run long enough for `ticks` ticks
    pub fn continuous(ticks: usize, config: &MarketConfig) -> Result<Self> {
        let until_ms = usize::try_from(config.tick_interval_ms)
            .ok()
            .and_then(|interval| ticks.checked_mul(interval))
            .ok_or_else(|| {
                Error::Config(format!(
                    "{ticks} ticks of {} ms do not fit in the virtual clock",
                    config.tick_interval_ms
                ))
            })?;
        Ok(ReplayPlan {
            controls: vec![(0, Event::Start)],
            until_ms,
        })
    }

    pub fn start_at(mut self, t_ms: usize) -> Self {
        self.controls.push((t_ms, Event::Start));
        self
    }

    pub fn stop_at(mut self, t_ms: usize) -> Self {
        self.controls.push((t_ms, Event::Stop));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayResult {
    pub seed: u64,
    pub ticks: Vec<TickRecord>,
    pub market: MarketReplayStats,
}

pub fn run_replay(
    config: &MarketConfig,
    start_date: NaiveDate,
    seed: u64,
    plan: &ReplayPlan,
) -> Result<ReplayResult> {
    config.validate()?;

    let agents: Vec<Box<dyn Agent<Event, Stats>>> = vec![
        Box::new(MarketAgent::new(config.clone(), start_date, seed)),
        Box::new(TickRecorder::new(start_date)),
    ];
    let mut event_loop = EventLoop::new(plan.controls.clone(), agents);
    event_loop.run(plan.until_ms);

    let mut ticks = Vec::new();
    let mut market = None;
    for stats in event_loop.stats() {
        match stats {
            Stats::Market(m) => market = Some(m),
            Stats::Recorder(records) => ticks = records,
        }
    }
    // the market agent is always present
    let market = market.unwrap_or(MarketReplayStats {
        ticks: 0,
        running: false,
        current_price: config.base_price,
        history: Vec::new(),
    });

    Ok(ReplayResult {
        seed,
        ticks,
        market,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split_segments;

    fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn tick_times(result: &ReplayResult) -> Vec<usize> {
        result.ticks.iter().map(|t| t.t_ms).collect()
    }

    #[test]
    fn one_tick_per_interval() {
        let config = MarketConfig::baseline();
        let plan = ReplayPlan::continuous(4, &config).unwrap();
        let result = run_replay(&config, start_date(), 42, &plan).unwrap();

        assert_eq!(tick_times(&result), vec![3000, 6000, 9000, 12000]);
        assert_eq!(result.market.ticks, 4);
        assert!(result.market.running);
    }

    #[test]
    fn second_start_does_not_double_the_ticks() {
        let config = MarketConfig::baseline();
        let plan = ReplayPlan::continuous(3, &config).unwrap().start_at(1000);
        let result = run_replay(&config, start_date(), 42, &plan).unwrap();

        assert_eq!(tick_times(&result), vec![3000, 6000, 9000]);
    }

    #[test]
    fn stop_then_start_resumes_without_reset() {
        let config = MarketConfig::baseline();
        let plan = ReplayPlan {
            controls: vec![(0, Event::Start)],
            until_ms: 26_000,
        }
        .stop_at(7000)
        .start_at(20_000);
        let result = run_replay(&config, start_date(), 9, &plan).unwrap();

        assert_eq!(tick_times(&result), vec![3000, 6000, 23_000, 26_000]);
        let (historical, forecast) = split_segments(&result.market.history);
        assert_eq!(historical.len(), 30);
        assert_eq!(forecast.len(), 7);
        assert_eq!(result.market.current_price, result.ticks[3].price);
    }

    #[test]
    fn stopped_market_does_not_tick() {
        let config = MarketConfig::baseline();
        let plan = ReplayPlan {
            controls: vec![(0, Event::Start)],
            until_ms: 60_000,
        }
        .stop_at(2999);
        let result = run_replay(&config, start_date(), 1, &plan).unwrap();

        assert!(result.ticks.is_empty());
        assert!(!result.market.running);
        assert_eq!(result.market.history.len(), 33);
    }

    #[test]
    fn recorder_sees_every_price_the_market_produced() {
        let config = MarketConfig::baseline();
        let plan = ReplayPlan::continuous(10, &config).unwrap();
        let result = run_replay(&config, start_date(), 5, &plan).unwrap();

        let (historical, _) = split_segments(&result.market.history);
        let tail: Vec<i64> = historical[historical.len() - 10..]
            .iter()
            .map(|p| p.price)
            .collect();
        let recorded: Vec<i64> = result.ticks.iter().map(|t| t.price).collect();
        assert_eq!(recorded, tail);
    }

    #[test]
    fn same_seed_same_replay() {
        let config = MarketConfig::baseline();
        let plan = ReplayPlan::continuous(20, &config).unwrap();
        let a = run_replay(&config, start_date(), 77, &plan).unwrap();
        let b = run_replay(&config, start_date(), 77, &plan).unwrap();
        let c = run_replay(&config, start_date(), 78, &plan).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.market.history, c.market.history);
    }

    #[test]
    fn virtual_days_roll_over() {
        let config = MarketConfig {
            tick_interval_ms: (MS_PER_DAY / 2) as u64,
            ..MarketConfig::baseline()
        };
        let plan = ReplayPlan::continuous(4, &config).unwrap();
        let result = run_replay(&config, start_date(), 3, &plan).unwrap();

        let dates: Vec<NaiveDate> = result.ticks.iter().map(|t| t.date).collect();
        let day = |n: i64| start_date() + Duration::days(n);
        assert_eq!(dates, vec![day(0), day(1), day(1), day(2)]);
        let last = result.market.history.iter().rfind(|p| !p.is_forecast).unwrap();
        assert_eq!(last.date, day(2));
    }

    #[test]
    fn oversized_plan_is_rejected() {
        let config = MarketConfig::baseline();
        let err = ReplayPlan::continuous(usize::MAX, &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(ReplayPlan::continuous(2, &config).unwrap().until_ms, 6000);
    }
}
