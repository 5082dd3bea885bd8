//! Refresh a stored position's rights adjustments and quote from the market data source.

use crate::datasource::{DataSourceError, MarketDataSource};
use crate::db::{RepoError, Repository};
use crate::domain::{BasisMode, Position, PositionId, Quote, TimeMs};
use crate::engine::{adjust_position, normalize_records, ReplayMode, RightsError};
use crate::orchestration::locks::SymbolLocks;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("position not found: {0}")]
    NotFound(String),
    #[error("market data unavailable: {0}")]
    UpstreamUnavailable(#[from] DataSourceError),
    #[error(transparent)]
    Rights(#[from] RightsError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("position {0} was edited during refresh")]
    Conflict(String),
}

/// When a stored position is due for a rights refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub max_age_ms: i64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            max_age_ms: 24 * 60 * 60 * 1000,
        }
    }
}

impl FreshnessPolicy {
    pub fn new(max_age_ms: i64) -> Self {
        Self { max_age_ms }
    }

    /// Never refreshed, refreshed more than `max_age_ms` ago, or forced.
    pub fn needs_refresh(&self, position: &Position, now: TimeMs, force: bool) -> bool {
        if force {
            return true;
        }
        match position.last_dividend_update {
            None => true,
            Some(last) => now.as_ms().saturating_sub(last.as_ms()) > self.max_age_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    pub position: Position,
    /// False when the position was fresh and nothing was fetched.
    pub refreshed: bool,
    pub events_applied: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ReplayMode>,
}

#[derive(Clone)]
pub struct Enhancer {
    datasource: Arc<dyn MarketDataSource>,
    repo: Arc<Repository>,
    locks: SymbolLocks,
    policy: FreshnessPolicy,
    basis_mode: BasisMode,
}

impl Enhancer {
    pub fn new(
        datasource: Arc<dyn MarketDataSource>,
        repo: Arc<Repository>,
        locks: SymbolLocks,
        policy: FreshnessPolicy,
    ) -> Self {
        Self {
            datasource,
            repo,
            locks,
            policy,
            basis_mode: BasisMode::default(),
        }
    }

    /// Basis mode a forced refresh rebuilds lots with.
    pub fn with_basis_mode(mut self, basis_mode: BasisMode) -> Self {
        self.basis_mode = basis_mode;
        self
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Per-symbol locks shared with lot edits.
    pub fn locks(&self) -> &SymbolLocks {
        &self.locks
    }

    /// Replay the symbol's rights events onto a stored position and write back
    /// only the adjustment fields.
    ///
    /// A forced refresh skips the freshness check and any cached records, and
    /// replays from the original lot using the configured basis mode.
    ///
    /// On any failure the stored record is left as it was.
    pub async fn refresh_rights(&self, id: &PositionId, force: bool) -> Result<RefreshResult, RefreshError> {
        let preview = self.load(id).await?;
        if !self.policy.needs_refresh(&preview, TimeMs::now(), force) {
            return Ok(skipped(preview));
        }

        let _guard = self.locks.lock(&preview.symbol).await;
        // Re-read under the lock so a concurrent refresh of the same symbol is seen.
        let stored = self.load(id).await?;
        if !self.policy.needs_refresh(&stored, TimeMs::now(), force) {
            return Ok(skipped(stored));
        }

        let records = if force {
            self.datasource.fetch_rights_records_fresh(&stored.symbol).await?
        } else {
            self.datasource.fetch_rights_records(&stored.symbol).await?
        };
        let events = normalize_records(&stored.symbol, &records)?;
        let mut base = stored.clone();
        if force {
            base.rights.basis_mode = self.basis_mode;
        }
        let now = TimeMs::now();
        let (adjusted, outcome) = adjust_position(&base, events, now.date(), force, now)?;

        let mut conflicted = false;
        let written = self
            .repo
            .update_position(id, |current| {
                if current.rights.original_shares != stored.rights.original_shares
                    || current.rights.original_cost_price != stored.rights.original_cost_price
                {
                    conflicted = true;
                    return current.clone();
                }
                current.merge_adjustment(&adjusted)
            })
            .await?;
        if conflicted {
            warn!(position = %id, "Lot edited while refreshing rights, discarding result");
            return Err(RefreshError::Conflict(id.to_string()));
        }

        info!(
            position = %id,
            symbol = %written.symbol,
            events_applied = outcome.applied,
            mode = ?outcome.mode,
            shares = written.shares,
            adjusted_cost_price = %written.adjusted_cost_price,
            "Rights refreshed"
        );

        Ok(RefreshResult {
            position: written,
            refreshed: true,
            events_applied: outcome.applied,
            mode: Some(outcome.mode),
        })
    }

    /// Fetch a quote for the position's symbol.
    pub async fn fetch_quote(&self, position: &Position) -> Result<Quote, RefreshError> {
        Ok(self.datasource.fetch_quote(&position.symbol).await?)
    }

    /// Write a quote's price (and name, if the record has none) onto a stored position.
    pub async fn apply_quote(&self, id: &PositionId, quote: &Quote) -> Result<Position, RefreshError> {
        let written = self
            .repo
            .update_position(id, |current| {
                let mut next = current.clone();
                next.current_price = quote.price;
                next.price_updated_at = Some(quote.timestamp);
                if next.name.trim().is_empty() {
                    if let Some(name) = &quote.name {
                        next.name = name.clone();
                    }
                }
                next
            })
            .await
            .map_err(|e| match e {
                RepoError::PositionNotFound(id) => RefreshError::NotFound(id),
                other => RefreshError::Repo(other),
            })?;
        debug!(position = %id, price = %quote.price, "Quote applied");
        Ok(written)
    }

    async fn load(&self, id: &PositionId) -> Result<Position, RefreshError> {
        self.repo
            .get_position(id)
            .await?
            .ok_or_else(|| RefreshError::NotFound(id.to_string()))
    }
}

fn skipped(position: Position) -> RefreshResult {
    debug!(position = %position.id, symbol = %position.symbol, "Rights still fresh, skipping");
    RefreshResult {
        position,
        refreshed: false,
        events_applied: 0,
        mode: None,
    }
}
