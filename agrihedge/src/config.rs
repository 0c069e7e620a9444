//! Simulator parameters and application configuration
//!
//! `MarketConfig::baseline()` reproduces the demo market: prices around 4500,
//! a 30-day chart window, a 7-day forecast and a tick every 3 seconds.
//! `AppConfig` wraps it with session, storage, output and logging settings and
//! is loaded from TOML. Every field has a default, so an empty file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Market simulator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Centre of the initial synthetic history
    pub base_price: i64,
    /// Initial history draws uniformly from base_price ± initial_spread
    pub initial_spread: f64,
    /// Each tick moves the price uniformly within ± tick_amplitude
    pub tick_amplitude: f64,
    /// Forecast step is (u - forecast_bias) * forecast_scale, u ~ U[0, 1)
    pub forecast_bias: f64,
    pub forecast_scale: f64,
    /// Historical days generated at start-up, today included
    pub history_days: usize,
    /// Cap on the historical segment
    pub max_history: usize,
    /// Length of the forecast tail
    pub forecast_days: usize,
    /// Period of the driver in milliseconds
    pub tick_interval_ms: u64,
}

impl MarketConfig {
    pub fn baseline() -> Self {
        MarketConfig {
            base_price: 4500,
            initial_spread: 50.0,
            tick_amplitude: 10.0,
            forecast_bias: 0.45,
            forecast_scale: 20.0,
            history_days: 26,
            max_history: 30,
            forecast_days: 7,
            tick_interval_ms: 3000,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be positive".into()));
        }
        if self.history_days == 0 {
            return Err(Error::Config("history_days must be positive".into()));
        }
        if self.history_days > self.max_history {
            return Err(Error::Config(format!(
                "history_days ({}) exceeds max_history ({})",
                self.history_days, self.max_history
            )));
        }
        for (name, value) in [
            ("initial_spread", self.initial_spread),
            ("tick_amplitude", self.tick_amplitude),
            ("forecast_bias", self.forecast_bias),
            ("forecast_scale", self.forecast_scale),
        ] {
            if !value.is_finite() {
                return Err(Error::Config(format!("{name} must be finite")));
            }
        }
        Ok(())
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig::baseline()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// How long the live binary lets the market tick
    pub run_seconds: u64,
    /// Seed for a reproducible session; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            run_seconds: 15,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            path: PathBuf::from("agrihedge-store.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub history_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by RUST_LOG
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: "info".to_string(),
        }
    }
}

/// Top-level configuration for the binaries
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub session: SessionSettings,
    pub storage: StorageSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.market.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_matches_demo_market() {
        let config = MarketConfig::baseline();
        assert_eq!(config.base_price, 4500);
        assert_eq!(config.history_days, 26);
        assert_eq!(config.max_history, 30);
        assert_eq!(config.forecast_days, 7);
        assert_eq!(config.tick_interval(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.session.run_seconds, 15);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn partial_market_section_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [market]
            tick_interval_ms = 500
            base_price = 5000

            [session]
            seed = 7

            [output]
            history_csv = "out/history.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.market.tick_interval_ms, 500);
        assert_eq!(config.market.base_price, 5000);
        assert_eq!(config.market.max_history, 30);
        assert_eq!(config.session.seed, Some(7));
        assert_eq!(
            config.output.history_csv,
            Some(PathBuf::from("out/history.csv"))
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = AppConfig::from_toml_str("[market]\ntick_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn history_longer_than_cap_is_rejected() {
        let config = MarketConfig {
            history_days: 31,
            ..MarketConfig::baseline()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = AppConfig::from_toml_str("[market\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }
}
