//! Domain types for the portfolio ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TimeMs, Symbol, AccountId, PositionId, Side
//! - Positions, accounts, quotes and settings
//! - Rights events with a stable ordering key, and the per-lot rights ledger

pub mod account;
pub mod decimal;
pub mod position;
pub mod primitives;
pub mod quote;
pub mod rights_event;
pub mod rights_ledger;
pub mod security;
pub mod settings;
pub mod trade;

pub use account::Account;
pub use decimal::Decimal;
pub use position::{IssueKind, Position, PositionIssue};
pub use primitives::{AccountId, PositionId, Side, Symbol, SymbolParseError, TimeMs};
pub use quote::Quote;
pub use rights_event::{
    sort_and_dedup, RawRightsRecord, RightsEvent, RightsEventKind, RightsOrderingKey,
};
pub use rights_ledger::{AppliedRight, BasisMode, LotOverflow, RightsLedger, RightsSummary};
pub use security::SecurityClass;
pub use settings::{AppSettings, GainLossMode};
pub use trade::{RealizedResult, TradeCosts};
