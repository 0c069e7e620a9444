//! Market alerts shown on the dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
}

/// The fixed demo alerts, stamped with `now`
pub fn default_alerts(now: DateTime<Utc>) -> Vec<MarketAlert> {
    [
        (
            AlertKind::Positive,
            "Rising Demand",
            "International demand for soybean oil is rising. Prices may increase by 2-3%.",
        ),
        (
            AlertKind::Neutral,
            "Policy Update",
            "Government to announce new MSP policy next week.",
        ),
        (
            AlertKind::Negative,
            "Weather Alert",
            "Higher than expected rainfall may impact crop quality. Watch for price dips.",
        ),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (kind, title, message))| MarketAlert {
        id: (i + 1).to_string(),
        kind,
        title: title.to_string(),
        message: message.to_string(),
        date: now,
    })
    .collect()
}
