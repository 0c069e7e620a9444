//! Export of price histories and replay sessions
//!
//! CSV for spreadsheets and plotting, JSON for a full session record.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::config::MarketConfig;
use crate::error::Result;
use crate::replay::{ReplayResult, TickRecord};
use crate::PricePoint;

#[derive(Debug, Serialize)]
struct HistoryRow {
    date: String,
    price: i64,
    is_forecast: bool,
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `date,price,is_forecast` rows
pub fn write_history_csv(path: impl AsRef<Path>, history: &[PricePoint]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for point in history {
        writer.serialize(HistoryRow {
            date: point.date.format("%Y-%m-%d").to_string(),
            price: point.price,
            is_forecast: point.is_forecast,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `t_ms,date,price` rows
pub fn write_ticks_csv(path: impl AsRef<Path>, ticks: &[TickRecord]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for record in ticks {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionMetadata {
    pub config: MarketConfig,
    pub seed: u64,
    pub num_ticks: usize,
    pub timestamp: String,
}

/// Full record of a replay
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutput {
    pub metadata: SessionMetadata,
    pub history: Vec<PricePoint>,
    pub ticks: Vec<TickRecord>,
}

impl SessionOutput {
    pub fn from_replay(config: &MarketConfig, result: &ReplayResult) -> Self {
        SessionOutput {
            metadata: SessionMetadata {
                config: config.clone(),
                seed: result.seed,
                num_ticks: result.ticks.len(),
                timestamp: Utc::now().to_rfc3339(),
            },
            history: result.market.history.clone(),
            ticks: result.ticks.clone(),
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        ensure_parent(path)?;
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
