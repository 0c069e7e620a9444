//! Headline numbers for the price dashboard

use serde::Serialize;

use crate::{split_segments, PricePoint};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub current_price: i64,
    /// First day of the forecast tail
    pub forecast_price: Option<i64>,
    pub change: i64,
    pub change_percent: f64,
}

impl DashboardSummary {
    /// None when the history has no historical point
    pub fn from_history(history: &[PricePoint]) -> Option<Self> {
        let (historical, forecast) = split_segments(history);
        let current_price = historical.last()?.price;
        let forecast_price = forecast.first().map(|p| p.price);
        let change = forecast_price.map_or(0, |f| f - current_price);
        let change_percent = if current_price == 0 {
            0.0
        } else {
            change as f64 * 100.0 / current_price as f64
        };
        Some(DashboardSummary {
            current_price,
            forecast_price,
            change,
            change_percent,
        })
    }

    pub fn is_rising(&self) -> bool {
        self.change >= 0
    }
}

impl std::fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Current price: ₹{}/quintal", self.current_price)?;
        if let Some(forecast) = self.forecast_price {
            write!(
                f,
                " | Forecast: ₹{} ({:+.2}%)",
                forecast, self.change_percent
            )?;
        }
        Ok(())
    }
}
