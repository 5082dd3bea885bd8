//! Persisted rights-adjustment state of a single lot.

use crate::domain::{Decimal, RightsEvent, RightsOrderingKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How cash dividends interact with the cost basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasisMode {
    /// Cash dividends are income; the basis only moves with share count.
    #[default]
    ExcludeCash,
    /// Cash dividends reduce the basis (never below zero).
    IncomeInclusive,
}

/// One event as it was applied to the lot, with before/after snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRight {
    pub event: RightsEvent,
    pub shares_before: i64,
    pub shares_after: i64,
    pub cost_price_before: Decimal,
    pub cost_price_after: Decimal,
    /// Cash received for this event (shares_before * cash_per_share).
    pub cash_amount: Decimal,
    /// Shares received for this event.
    pub stock_shares: i64,
}

/// Replay state for a lot: the original purchase plus every applied event.
///
/// `cost_basis / current_shares` is the adjusted cost price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsLedger {
    pub original_shares: i64,
    pub original_cost_price: Decimal,
    pub current_shares: i64,
    pub cost_basis: Decimal,
    pub cash_income: Decimal,
    #[serde(default)]
    pub basis_mode: BasisMode,
    #[serde(default)]
    pub applied: Vec<AppliedRight>,
}

/// The lot's total cost does not fit in a `Decimal`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lot of {shares} shares at {cost_price} is too large")]
pub struct LotOverflow {
    pub shares: i64,
    pub cost_price: Decimal,
}

impl RightsLedger {
    /// Fresh ledger for a lot that has seen no rights events.
    pub fn new(shares: i64, cost_price: Decimal, basis_mode: BasisMode) -> Result<Self, LotOverflow> {
        let cost_basis =
            Decimal::lot_value(shares, cost_price).ok_or(LotOverflow { shares, cost_price })?;
        Ok(Self {
            original_shares: shares,
            original_cost_price: cost_price,
            current_shares: shares,
            cost_basis,
            cash_income: Decimal::zero(),
            basis_mode,
            applied: Vec::new(),
        })
    }

    /// Same lot with all adjustment state discarded.
    pub fn reset(&self) -> Result<Self, LotOverflow> {
        Self::new(self.original_shares, self.original_cost_price, self.basis_mode)
    }

    /// Ordering key of the last applied event.
    pub fn watermark(&self) -> Option<RightsOrderingKey> {
        self.applied.last().map(|a| a.event.ordering_key())
    }

    /// Whether an event occupying the same (ex_date, kind) slot was applied.
    pub fn has_applied(&self, event: &RightsEvent) -> bool {
        self.applied
            .iter()
            .any(|a| a.event.dedup_key() == event.dedup_key())
    }

    /// Per-share basis; falls back to the original cost when no shares remain.
    pub fn adjusted_cost_price(&self) -> Decimal {
        if self.current_shares <= 0 {
            return self.original_cost_price;
        }
        self.cost_basis / Decimal::from_i64(self.current_shares)
    }

    pub fn summary(&self) -> RightsSummary {
        RightsSummary {
            total_cash_dividend: self.cash_income,
            total_stock_dividend_shares: self
                .applied
                .iter()
                .fold(0_i64, |acc, a| acc.saturating_add(a.stock_shares)),
            events_count: self.applied.len(),
            last_event_date: self.applied.iter().map(|a| a.event.ex_date).max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsSummary {
    pub total_cash_dividend: Decimal,
    pub total_stock_dividend_shares: i64,
    pub events_count: usize,
    pub last_event_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_new_ledger_basis() {
        let ledger = RightsLedger::new(1000, d("50"), BasisMode::ExcludeCash).unwrap();
        assert_eq!(ledger.cost_basis, d("50000"));
        assert_eq!(ledger.adjusted_cost_price(), d("50"));
        assert!(ledger.watermark().is_none());
        assert_eq!(ledger.summary().events_count, 0);
    }

    #[test]
    fn test_zero_shares_keeps_original_cost() {
        let ledger = RightsLedger::new(0, d("50"), BasisMode::ExcludeCash).unwrap();
        assert_eq!(ledger.adjusted_cost_price(), d("50"));
    }

    #[test]
    fn test_oversized_lot_is_rejected() {
        let err = RightsLedger::new(i64::MAX, d("1000000000000"), BasisMode::ExcludeCash).unwrap_err();
        assert_eq!(err.shares, i64::MAX);
    }

    #[test]
    fn test_ledger_roundtrips_through_json() {
        let mut ledger = RightsLedger::new(1100, d("50"), BasisMode::IncomeInclusive).unwrap();
        ledger.cost_basis = d("50000");
        let json = serde_json::to_string(&ledger).unwrap();
        let back: RightsLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
        assert_eq!(back.adjusted_cost_price(), d("50000") / d("1100"));
    }
}
