//! Practice hedge positions
//!
//! A farmer locks in the current market price for a quantity of crop; the
//! position's profit or loss then follows the live price.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::storage::{load_records, save_records, KeyValueStore, HEDGE_POSITIONS_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HedgePosition {
    pub id: String,
    pub date: NaiveDate,
    pub quantity: f64,
    pub hedged_price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitLoss {
    /// Current price minus hedged price, per unit
    pub price_diff: i64,
    pub total: f64,
}

impl ProfitLoss {
    pub fn is_profit(&self) -> bool {
        self.total >= 0.0
    }
}

/// Parse a positive quantity from form input
pub fn parse_quantity(input: &str) -> std::result::Result<f64, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("quantity"));
    }
    let quantity: f64 = trimmed.parse().map_err(|_| ValidationError::NotANumber {
        field: "quantity",
        value: input.to_string(),
    })?;
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(ValidationError::NotPositive("quantity"));
    }
    Ok(quantity)
}

impl HedgePosition {
    /// Hedge `quantity_input` units at `hedged_price`
    pub fn open(
        id: impl Into<String>,
        date: NaiveDate,
        quantity_input: &str,
        hedged_price: i64,
    ) -> std::result::Result<Self, ValidationError> {
        let quantity = parse_quantity(quantity_input)?;
        Ok(HedgePosition {
            id: id.into(),
            date,
            quantity,
            hedged_price,
            current_price: Some(hedged_price),
        })
    }

    pub fn profit_loss(&self, current_price: i64) -> ProfitLoss {
        let price_diff = current_price - self.hedged_price;
        ProfitLoss {
            price_diff,
            total: price_diff as f64 * self.quantity,
        }
    }
}

/// The farmer's positions in creation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HedgeBook {
    positions: Vec<HedgePosition>,
}

impl HedgeBook {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        Ok(HedgeBook {
            positions: load_records(store, HEDGE_POSITIONS_KEY)?,
        })
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        save_records(store, HEDGE_POSITIONS_KEY, &self.positions)
    }

    pub fn positions(&self) -> &[HedgePosition] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Open a position at the current price, with an id unique in this book
    pub fn hedge(
        &mut self,
        id_hint: impl Into<String>,
        date: NaiveDate,
        quantity_input: &str,
        current_price: i64,
    ) -> std::result::Result<&HedgePosition, ValidationError> {
        let mut id = id_hint.into();
        if self.positions.iter().any(|p| p.id == id) {
            let base = id.clone();
            let mut n = 1;
            while self.positions.iter().any(|p| p.id == id) {
                id = format!("{base}-{n}");
                n += 1;
            }
        }
        let position = HedgePosition::open(id, date, quantity_input, current_price)?;
        self.positions.push(position);
        Ok(&self.positions[self.positions.len() - 1])
    }

    pub fn total_profit_loss(&self, current_price: i64) -> f64 {
        self.positions
            .iter()
            .map(|p| p.profit_loss(current_price).total)
            .sum()
    }
}
