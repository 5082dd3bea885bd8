//! Corporate-action (rights) events and their deterministic ordering.

use crate::domain::{Decimal, Symbol};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of corporate action.
///
/// Variant order is the replay order for events sharing an ex-date: the cash
/// part of a combined distribution is paid on the pre-right share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RightsEventKind {
    CashDividend,
    StockDividend,
    Split,
}

impl RightsEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RightsEventKind::CashDividend => "cash-dividend",
            RightsEventKind::StockDividend => "stock-dividend",
            RightsEventKind::Split => "split",
        }
    }
}

impl std::fmt::Display for RightsEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single corporate action affecting holders of record on `ex_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsEvent {
    pub ex_date: NaiveDate,
    pub kind: RightsEventKind,
    /// Cash paid per held share (cash dividends only).
    pub cash_per_share: Decimal,
    /// New shares per held share (0.1 = ten new shares per hundred held).
    pub stock_ratio: Decimal,
    /// Authoritative post-event share count, when the source supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_after_right: Option<i64>,
    pub source_record_id: String,
}

impl RightsEvent {
    pub fn cash_dividend(ex_date: NaiveDate, cash_per_share: Decimal, source_record_id: String) -> Self {
        Self {
            ex_date,
            kind: RightsEventKind::CashDividend,
            cash_per_share,
            stock_ratio: Decimal::zero(),
            shares_after_right: None,
            source_record_id,
        }
    }

    pub fn stock_dividend(ex_date: NaiveDate, stock_ratio: Decimal, source_record_id: String) -> Self {
        Self {
            ex_date,
            kind: RightsEventKind::StockDividend,
            cash_per_share: Decimal::zero(),
            stock_ratio,
            shares_after_right: None,
            source_record_id,
        }
    }

    pub fn split(ex_date: NaiveDate, stock_ratio: Decimal, source_record_id: String) -> Self {
        Self {
            ex_date,
            kind: RightsEventKind::Split,
            cash_per_share: Decimal::zero(),
            stock_ratio,
            shares_after_right: None,
            source_record_id,
        }
    }

    pub fn with_shares_after_right(mut self, shares: i64) -> Self {
        self.shares_after_right = Some(shares);
        self
    }

    /// Identity used for de-duplication: one event per (ex_date, kind).
    pub fn dedup_key(&self) -> (NaiveDate, RightsEventKind) {
        (self.ex_date, self.kind)
    }

    pub fn ordering_key(&self) -> RightsOrderingKey {
        RightsOrderingKey::from_event(self)
    }

    /// Derive a stable record id when the provider does not supply one.
    pub fn compute_record_id(
        symbol: &Symbol,
        ex_date: NaiveDate,
        kind: RightsEventKind,
        amount: &Decimal,
    ) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, symbol.as_str());
        hash_var(&mut hasher, &ex_date.to_string());
        hash_var(&mut hasher, kind.as_str());
        hash_var(&mut hasher, &amount.to_canonical_string());

        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}

/// Total order over rights events: ex_date, then kind, then record id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsOrderingKey {
    pub ex_date: NaiveDate,
    pub kind: RightsEventKind,
    pub source_record_id: String,
}

impl RightsOrderingKey {
    pub fn from_event(event: &RightsEvent) -> Self {
        Self {
            ex_date: event.ex_date,
            kind: event.kind,
            source_record_id: event.source_record_id.clone(),
        }
    }
}

/// Sort events deterministically and collapse duplicates sharing (ex_date, kind).
///
/// Within a duplicate group the record carrying an explicit
/// `shares_after_right` wins; otherwise the lowest record id does.
pub fn sort_and_dedup(mut events: Vec<RightsEvent>) -> Vec<RightsEvent> {
    events.sort_by(|a, b| {
        a.dedup_key()
            .cmp(&b.dedup_key())
            .then_with(|| b.shares_after_right.is_some().cmp(&a.shares_after_right.is_some()))
            .then_with(|| a.source_record_id.cmp(&b.source_record_id))
    });
    events.dedup_by(|later, earlier| later.dedup_key() == earlier.dedup_key());
    events
}

/// A dividend/split record as returned by the market data backend.
///
/// `stock_dividend` is quoted in NT$ of par value per share; par is NT$10, so
/// 1.0 means 0.1 new shares per held share.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRightsRecord {
    pub ex_date: String,
    #[serde(default)]
    pub cash_dividend: Option<Decimal>,
    #[serde(default)]
    pub stock_dividend: Option<Decimal>,
    /// New shares per held share for a split (1 = two-for-one).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_ratio: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_after_right: Option<i64>,
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}
