//! User-level application settings, persisted as one record.

use crate::domain::AccountId;
use serde::{Deserialize, Serialize};

/// Which cost basis unrealized gain/loss is reported against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainLossMode {
    /// Original purchase cost; rights events ignored.
    ExcludingRights,
    /// Original purchase cost plus cash dividends collected.
    CashDividendOnly,
    /// Adjusted cost price after replaying rights events.
    #[default]
    FullRights,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub current_account: Option<AccountId>,
    #[serde(default)]
    pub privacy_mode: bool,
    #[serde(default)]
    pub gain_loss_mode: GainLossMode,
}
