//! AgriHedge market core
//!
//! A simulated crop-price market for a farmer-facing hedging demo. The
//! [`market::MarketSimulator`] keeps a rolling window of daily prices plus a
//! synthetic forecast tail, advances on a fixed timer, and notifies
//! subscribers of each new price.
//!
//! Around the simulator:
//! - `hedging`: hedge positions and their profit/loss against the live price
//! - `contracts`: mock ledger sale contracts
//! - `dashboard` / `alerts`: headline price summary and market alerts
//! - `storage`: key-value record store standing in for browser local storage
//! - `replay`: deterministic virtual-time replay of the ticking driver
//! - `output`: CSV/JSON export of price history

pub mod alerts;
pub mod config;
pub mod contracts;
pub mod dashboard;
pub mod error;
pub mod hedging;
pub mod market;
pub mod output;
pub mod replay;
pub mod storage;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use config::{AppConfig, MarketConfig};
pub use error::{Error, Result, ValidationError};
pub use market::{MarketSimulator, MarketState, Subscription};

/// One day on the price chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: i64,
    #[serde(default)]
    pub is_forecast: bool,
}

impl PricePoint {
    pub fn historical(date: NaiveDate, price: i64) -> Self {
        PricePoint {
            date,
            price,
            is_forecast: false,
        }
    }

    pub fn forecast(date: NaiveDate, price: i64) -> Self {
        PricePoint {
            date,
            price,
            is_forecast: true,
        }
    }
}

/// Split an ordered history into its historical and forecast segments
pub fn split_segments(history: &[PricePoint]) -> (&[PricePoint], &[PricePoint]) {
    let boundary = history
        .iter()
        .position(|p| p.is_forecast)
        .unwrap_or(history.len());
    history.split_at(boundary)
}
