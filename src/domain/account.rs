//! Brokerage account and its default trading rates.

use crate::domain::{AccountId, Decimal};
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Brokerage fee rate in percent.
    pub brokerage_fee_rate: Decimal,
    /// Sell-side transaction tax rate in percent.
    pub transaction_tax_rate: Decimal,
}

impl Account {
    /// Account with the statutory Taiwan rates (0.1425% fee, 0.3% tax).
    pub fn new(name: String) -> Self {
        Self {
            id: AccountId::generate(),
            name,
            brokerage_fee_rate: default_fee_rate(),
            transaction_tax_rate: default_tax_rate(),
        }
    }
}

pub fn default_fee_rate() -> Decimal {
    Decimal::new(RustDecimal::new(1425, 4))
}

pub fn default_tax_rate() -> Decimal {
    Decimal::new(RustDecimal::new(3, 1))
}
