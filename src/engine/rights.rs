//! Rights (corporate action) replay for a single lot.
//!
//! Events are applied in ascending ordering key. The ledger remembers every
//! applied event, so replay is idempotent and can resume from where the last
//! run stopped.

use crate::domain::{
    sort_and_dedup, AppliedRight, BasisMode, Decimal, LotOverflow, Position, RawRightsRecord,
    RightsEvent, RightsEventKind, RightsLedger, Symbol, TimeMs,
};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RightsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid rights event {record_id}: {reason}")]
    InvalidEvent { record_id: String, reason: String },
    #[error("invalid rights record for {symbol} ({ex_date}): {reason}")]
    InvalidRecord {
        symbol: String,
        ex_date: String,
        reason: String,
    },
}

impl From<LotOverflow> for RightsError {
    fn from(err: LotOverflow) -> Self {
        RightsError::InvalidInput(err.to_string())
    }
}

/// Whether a replay resumed from the stored ledger or started over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    Incremental,
    Full,
}

/// Inclusive date range of events that apply to a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl EventWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Everything from the purchase date onwards.
    pub fn since(from: NaiveDate) -> Self {
        Self {
            from,
            to: NaiveDate::MAX,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub ledger: RightsLedger,
    /// Events newly applied by this run.
    pub applied: usize,
    pub mode: ReplayMode,
}

/// Applies rights events to a ledger one at a time.
pub struct RightsProcessor {
    state: RightsLedger,
}

impl RightsProcessor {
    pub fn new(state: RightsLedger) -> Self {
        Self { state }
    }

    /// Processor for a fresh lot.
    pub fn from_lot(shares: i64, cost_price: Decimal, basis_mode: BasisMode) -> Result<Self, RightsError> {
        if shares < 0 {
            return Err(RightsError::InvalidInput(format!(
                "shares must be >= 0, got {}",
                shares
            )));
        }
        if cost_price.is_negative() {
            return Err(RightsError::InvalidInput(format!(
                "cost price must be >= 0, got {}",
                cost_price
            )));
        }
        Ok(Self::new(RightsLedger::new(shares, cost_price, basis_mode)?))
    }

    pub fn state(&self) -> &RightsLedger {
        &self.state
    }

    pub fn into_ledger(self) -> RightsLedger {
        self.state
    }

    /// Apply one event. Cash dividends are computed on the pre-event share count.
    pub fn apply_event(&mut self, event: &RightsEvent) -> Result<(), RightsError> {
        let shares_before = self.state.current_shares;
        let cost_price_before = self.state.adjusted_cost_price();

        let (shares_after, cash_amount) = match event.kind {
            RightsEventKind::CashDividend => {
                if event.cash_per_share.is_negative() {
                    return Err(invalid_event(event, "cash per share must be >= 0"));
                }
                let cash = Decimal::lot_value(shares_before, event.cash_per_share)
                    .ok_or_else(|| invalid_event(event, "cash dividend overflow"))?;
                self.state.cash_income = self
                    .state
                    .cash_income
                    .checked_add(cash)
                    .ok_or_else(|| invalid_event(event, "cash income overflow"))?;
                if self.state.basis_mode == BasisMode::IncomeInclusive {
                    let reduced = self.state.cost_basis - cash;
                    self.state.cost_basis = if reduced.is_negative() {
                        Decimal::zero()
                    } else {
                        reduced
                    };
                }
                (shares_before, cash)
            }
            RightsEventKind::StockDividend | RightsEventKind::Split => {
                (self.shares_after(event, shares_before)?, Decimal::zero())
            }
        };

        self.state.current_shares = shares_after;

        let applied = AppliedRight {
            event: event.clone(),
            shares_before,
            shares_after,
            cost_price_before,
            cost_price_after: self.state.adjusted_cost_price(),
            cash_amount,
            stock_shares: shares_after - shares_before,
        };
        debug!(
            ex_date = %event.ex_date,
            kind = %event.kind,
            shares_before,
            shares_after,
            cost_price_after = %applied.cost_price_after,
            "Applied rights event"
        );
        self.state.applied.push(applied);
        Ok(())
    }

    /// Post-event share count. An explicit count from the source wins over the ratio.
    fn shares_after(&self, event: &RightsEvent, shares_before: i64) -> Result<i64, RightsError> {
        if let Some(explicit) = event.shares_after_right {
            if explicit < 0 {
                return Err(invalid_event(event, "shares after right must be >= 0"));
            }
            if event.kind == RightsEventKind::StockDividend && explicit < shares_before {
                return Err(invalid_event(
                    event,
                    "stock dividend cannot reduce the share count",
                ));
            }
            return Ok(explicit);
        }

        let ratio = event.stock_ratio;
        match event.kind {
            RightsEventKind::StockDividend if ratio.is_negative() => {
                return Err(invalid_event(event, "stock dividend ratio must be >= 0"));
            }
            RightsEventKind::Split if !(ratio + Decimal::one()).is_positive() => {
                return Err(invalid_event(event, "split ratio must be > -1"));
            }
            _ => {}
        }

        Decimal::lot_value(shares_before, Decimal::one() + ratio)
            .and_then(|shares| shares.floor().to_i64())
            .ok_or_else(|| invalid_event(event, "share count overflow"))
    }
}

fn invalid_event(event: &RightsEvent, reason: &str) -> RightsError {
    RightsError::InvalidEvent {
        record_id: event.source_record_id.clone(),
        reason: reason.to_string(),
    }
}

/// Replay `events` onto `ledger`.
///
/// Events outside `window` are ignored and duplicates collapse to one per
/// (ex_date, kind). Unless `force_recalculate` is set, already-applied events
/// are skipped and only newer ones are applied. An unapplied event older than
/// the last applied one forces a full replay from the original lot.
///
/// The input ledger is never modified; on error nothing is returned.
pub fn replay(
    ledger: &RightsLedger,
    events: Vec<RightsEvent>,
    window: EventWindow,
    force_recalculate: bool,
) -> Result<ReplayOutcome, RightsError> {
    let events: Vec<RightsEvent> = sort_and_dedup(events)
        .into_iter()
        .filter(|e| window.contains(e.ex_date))
        .collect();

    let mode = if force_recalculate {
        ReplayMode::Full
    } else {
        let watermark = ledger.watermark();
        let backfilled = events.iter().any(|e| {
            !ledger.has_applied(e)
                && watermark
                    .as_ref()
                    .map_or(false, |mark| e.ordering_key() < *mark)
        });
        if backfilled {
            warn!(
                watermark = ?watermark,
                "Rights event older than last applied event, replaying from original lot"
            );
            ReplayMode::Full
        } else {
            ReplayMode::Incremental
        }
    };

    let start = match mode {
        ReplayMode::Full => ledger.reset()?,
        ReplayMode::Incremental => ledger.clone(),
    };

    let mut processor = RightsProcessor::new(start);
    let mut applied = 0;
    for event in &events {
        if processor.state().has_applied(event) {
            continue;
        }
        processor.apply_event(event)?;
        applied += 1;
    }

    Ok(ReplayOutcome {
        ledger: processor.into_ledger(),
        applied,
        mode,
    })
}

/// Full replay of `events` over a fresh lot, without date filtering.
pub fn replay_lot(
    shares: i64,
    cost_price: Decimal,
    events: Vec<RightsEvent>,
    basis_mode: BasisMode,
) -> Result<RightsLedger, RightsError> {
    let start = RightsProcessor::from_lot(shares, cost_price, basis_mode)?.into_ledger();
    let window = EventWindow::new(NaiveDate::MIN, NaiveDate::MAX);
    replay(&start, events, window, true).map(|outcome| outcome.ledger)
}

/// Replay events onto a position's lot and return the adjusted copy.
///
/// Events are limited to `position.purchase_date..=as_of`. The returned
/// position carries the new share count, adjusted cost price, ledger and a
/// `last_dividend_update` stamp of `now`.
pub fn adjust_position(
    position: &Position,
    events: Vec<RightsEvent>,
    as_of: NaiveDate,
    force_recalculate: bool,
    now: TimeMs,
) -> Result<(Position, ReplayOutcome), RightsError> {
    if position.shares < 0 || position.rights.original_shares < 0 {
        return Err(RightsError::InvalidInput(format!(
            "position {} has a negative share count",
            position.id
        )));
    }
    if position.cost_price.is_negative() {
        return Err(RightsError::InvalidInput(format!(
            "position {} has a negative cost price",
            position.id
        )));
    }

    let window = EventWindow::new(position.purchase_date, as_of);
    let outcome = replay(&position.rights, events, window, force_recalculate)?;

    let mut adjusted = position.clone();
    adjusted.shares = outcome.ledger.current_shares;
    adjusted.adjusted_cost_price = outcome.ledger.adjusted_cost_price();
    adjusted.rights = outcome.ledger.clone();
    adjusted.last_dividend_update = Some(now);

    Ok((adjusted, outcome))
}

/// Convert backend records into typed events.
///
/// One record may yield a cash dividend, a stock dividend and a split. An
/// explicit `sharesAfterRight` is attached to the share-changing event.
/// Records without a parseable ex-date are skipped.
pub fn normalize_records(symbol: &Symbol, records: &[RawRightsRecord]) -> Result<Vec<RightsEvent>, RightsError> {
    let par_value = Decimal::from_i64(10);
    let mut events = Vec::new();

    for record in records {
        let invalid = |reason: &str| RightsError::InvalidRecord {
            symbol: symbol.to_string(),
            ex_date: record.ex_date.clone(),
            reason: reason.to_string(),
        };

        let Some(ex_date) = parse_ex_date(&record.ex_date) else {
            warn!(symbol = %symbol, ex_date = %record.ex_date, "Skipping rights record with unparseable ex-date");
            continue;
        };
        let cash = record.cash_dividend.unwrap_or_default();
        let stock = record.stock_dividend.unwrap_or_default();
        if cash.is_negative() {
            return Err(invalid("cash dividend must be >= 0"));
        }
        if stock.is_negative() {
            return Err(invalid("stock dividend must be >= 0"));
        }

        let record_id = |kind: RightsEventKind, amount: &Decimal| match &record.record_id {
            Some(id) => format!("{}:{}", id, kind),
            None => RightsEvent::compute_record_id(symbol, ex_date, kind, amount),
        };

        if cash.is_positive() {
            let id = record_id(RightsEventKind::CashDividend, &cash);
            events.push(RightsEvent::cash_dividend(ex_date, cash, id));
        }

        let mut share_event = None;
        if stock.is_positive() {
            let ratio = stock / par_value;
            let id = record_id(RightsEventKind::StockDividend, &ratio);
            share_event = Some(RightsEvent::stock_dividend(ex_date, ratio, id));
        }
        if let Some(ratio) = record.split_ratio.filter(|r| !r.is_zero()) {
            if let Some(stock_event) = share_event.take() {
                events.push(stock_event);
            }
            let id = record_id(RightsEventKind::Split, &ratio);
            share_event = Some(RightsEvent::split(ex_date, ratio, id));
        }

        match (share_event, record.shares_after_right) {
            (Some(event), Some(n)) => events.push(event.with_shares_after_right(n)),
            (Some(event), None) => events.push(event),
            (None, Some(_)) => {
                debug!(symbol = %symbol, ex_date = %ex_date, "Ignoring share count on cash-only record");
            }
            (None, None) => {}
        }
    }

    Ok(events)
}

fn parse_ex_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split('T').next().unwrap_or(raw);
    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}
