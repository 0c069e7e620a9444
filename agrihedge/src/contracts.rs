//! Mock ledger sale contracts
//!
//! A contract records a forward sale to a buyer. "Confirming on the ledger"
//! only stamps a random transaction hash; nothing leaves the process.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::storage::{load_records, save_records, KeyValueStore, CONTRACTS_KEY};

pub const MOCK_BUYERS: [&str; 4] = [
    "AgroCorp Ltd",
    "Local Millers Inc",
    "Oilseed Traders Co.",
    "Rural Processing Unit",
];

const HASH_DIGITS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    #[serde(rename = "Confirmed on Ledger")]
    ConfirmedOnLedger,
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    pub buyer_name: String,
    pub quantity: f64,
    pub agreed_price: f64,
    pub delivery_date: NaiveDate,
    pub transaction_hash: String,
    pub status: ContractStatus,
    pub created_date: NaiveDate,
}

impl Contract {
    pub fn create<R: Rng + ?Sized>(
        id: impl Into<String>,
        terms: ContractTerms,
        created_date: NaiveDate,
        rng: &mut R,
    ) -> Self {
        Contract {
            id: id.into(),
            buyer_name: terms.buyer_name,
            quantity: terms.quantity,
            agreed_price: terms.agreed_price,
            delivery_date: terms.delivery_date,
            transaction_hash: generate_transaction_hash(rng),
            status: ContractStatus::ConfirmedOnLedger,
            created_date,
        }
    }

    pub fn total_value(&self) -> f64 {
        self.quantity * self.agreed_price
    }
}

/// "0x" followed by 64 random lowercase hex digits
pub fn generate_transaction_hash<R: Rng + ?Sized>(rng: &mut R) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut hash = String::with_capacity(2 + HASH_DIGITS);
    hash.push_str("0x");
    for _ in 0..HASH_DIGITS {
        hash.push(DIGITS[rng.gen_range(0..DIGITS.len())] as char);
    }
    hash
}

/// Contract form as entered, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractForm {
    pub buyer_name: String,
    pub quantity: String,
    pub agreed_price: String,
    pub delivery_date: String,
}

/// Validated form contents
#[derive(Debug, Clone, PartialEq)]
pub struct ContractTerms {
    pub buyer_name: String,
    pub quantity: f64,
    pub agreed_price: f64,
    pub delivery_date: NaiveDate,
}

fn required<'a>(value: &'a str, field: &'static str) -> std::result::Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

fn positive(value: &str, field: &'static str) -> std::result::Result<f64, ValidationError> {
    let number: f64 = value.parse().map_err(|_| ValidationError::NotANumber {
        field,
        value: value.to_string(),
    })?;
    if !number.is_finite() || number <= 0.0 {
        return Err(ValidationError::NotPositive(field));
    }
    Ok(number)
}

impl ContractForm {
    pub fn validate(&self) -> std::result::Result<ContractTerms, ValidationError> {
        // every field must be filled before any is parsed
        let buyer_name = required(&self.buyer_name, "buyer name")?;
        let quantity = required(&self.quantity, "quantity")?;
        let agreed_price = required(&self.agreed_price, "agreed price")?;
        let delivery_date = required(&self.delivery_date, "delivery date")?;

        Ok(ContractTerms {
            buyer_name: buyer_name.to_string(),
            quantity: positive(quantity, "quantity")?,
            agreed_price: positive(agreed_price, "agreed price")?,
            delivery_date: NaiveDate::parse_from_str(delivery_date, "%Y-%m-%d").map_err(|_| {
                ValidationError::BadDate {
                    field: "delivery date",
                    value: delivery_date.to_string(),
                }
            })?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractBook {
    contracts: Vec<Contract>,
}

impl ContractBook {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        Ok(ContractBook {
            contracts: load_records(store, CONTRACTS_KEY)?,
        })
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        save_records(store, CONTRACTS_KEY, &self.contracts)
    }

    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Validate the form and append the resulting contract
    pub fn submit<R: Rng + ?Sized>(
        &mut self,
        id: impl Into<String>,
        form: &ContractForm,
        created_date: NaiveDate,
        rng: &mut R,
    ) -> std::result::Result<&Contract, ValidationError> {
        let terms = form.validate()?;
        self.contracts
            .push(Contract::create(id, terms, created_date, rng));
        Ok(&self.contracts[self.contracts.len() - 1])
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.transaction_hash == hash)
    }
}
