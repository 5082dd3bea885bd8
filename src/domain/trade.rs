//! Derived trade cost and disposal results.

use crate::domain::{Decimal, Side};
use serde::Serialize;

/// Costs of a single buy or sell, in whole currency units for fee and tax.
///
/// Always recomputed from shares, price and rates; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeCosts {
    pub side: Side,
    pub gross_amount: Decimal,
    pub brokerage_fee: Decimal,
    /// Securities transaction tax; zero on buys.
    pub transaction_tax: Decimal,
    pub total_costs: Decimal,
    /// Cash paid (buy, gross + costs) or received (sell, gross - costs).
    pub net_amount: Decimal,
}

/// Outcome of disposing shares bought at `buy_price` and sold at `sell_price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedResult {
    pub gross_gain_loss: Decimal,
    pub buy_costs: TradeCosts,
    pub sell_costs: TradeCosts,
    pub net_gain_loss: Decimal,
    pub total_transaction_costs: Decimal,
    pub transaction_tax_rate: Decimal,
}
