//! Simulated crop market
//!
//! [`MarketState`] holds the pure price transitions. [`MarketSimulator`] is the
//! shared context around it: random source, clock, subscribers and the
//! periodic driver.

mod clock;
mod driver;
mod simulator;
mod state;
mod subscribers;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use clock::{Clock, FixedClock, SystemClock};
pub use simulator::{DriverState, MarketSimulator};
pub use state::{round_half_up, MarketState};
pub use subscribers::{NotifyReport, SubscriberRegistry, Subscription};

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
