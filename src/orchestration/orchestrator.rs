use crate::db::{RepoError, Repository};
use crate::domain::{AccountId, Position, PositionId, Symbol};
use crate::orchestration::enhance::{Enhancer, RefreshError, RefreshResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Sequential batch refreshes over stored positions.
#[derive(Clone)]
pub struct Orchestrator {
    enhancer: Enhancer,
    repo: Arc<Repository>,
    batch_delay: Duration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub position_id: PositionId,
    pub symbol: Symbol,
    pub error: String,
}

/// Per-item outcome of a batch; failed items keep their stored record.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record_failure(&mut self, position: &Position, error: &RefreshError) {
        warn!(position = %position.id, symbol = %position.symbol, error = %error, "Batch item failed");
        self.failed.push(BatchFailure {
            position_id: position.id.clone(),
            symbol: position.symbol.clone(),
            error: error.to_string(),
        });
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Db(#[from] RepoError),
}

impl Orchestrator {
    pub fn new(enhancer: Enhancer, repo: Arc<Repository>, batch_delay: Duration) -> Self {
        Self {
            enhancer,
            repo,
            batch_delay,
        }
    }

    pub fn enhancer(&self) -> &Enhancer {
        &self.enhancer
    }

    /// Refresh one position's rights.
    pub async fn refresh_position(&self, id: &PositionId, force: bool) -> Result<RefreshResult, RefreshError> {
        self.enhancer.refresh_rights(id, force).await
    }

    /// Refresh rights for every position (optionally one account's), one at a time.
    ///
    /// The delay is applied after each item that went to the network.
    pub async fn refresh_rights_batch(
        &self,
        account: Option<&AccountId>,
        force: bool,
    ) -> Result<BatchReport, OrchestrationError> {
        let positions = self.repo.list_positions(account).await?;
        let mut report = BatchReport {
            total: positions.len(),
            ..Default::default()
        };

        let mut pending_delay = false;
        for position in &positions {
            if pending_delay {
                self.pause().await;
            }
            match self.enhancer.refresh_rights(&position.id, force).await {
                Ok(result) if result.refreshed => {
                    report.updated += 1;
                    pending_delay = true;
                }
                Ok(_) => {
                    report.skipped += 1;
                    pending_delay = false;
                }
                Err(e) => {
                    report.record_failure(position, &e);
                    pending_delay = matches!(e, RefreshError::UpstreamUnavailable(_));
                }
            }
        }

        info!(
            total = report.total,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed.len(),
            "Rights batch finished"
        );
        Ok(report)
    }

    /// Refresh quotes, fetching each symbol once and applying it to every
    /// position that holds it. On failure the last-known price stays.
    pub async fn refresh_quotes_batch(&self, account: Option<&AccountId>) -> Result<BatchReport, OrchestrationError> {
        let positions = self.repo.list_positions(account).await?;
        let mut by_symbol: BTreeMap<Symbol, Vec<&Position>> = BTreeMap::new();
        for position in &positions {
            by_symbol.entry(position.symbol.clone()).or_default().push(position);
        }

        let mut report = BatchReport {
            total: positions.len(),
            ..Default::default()
        };

        for (index, holders) in by_symbol.values().enumerate() {
            if index > 0 {
                self.pause().await;
            }
            let Some(first) = holders.first() else {
                continue;
            };
            let quote = match self.enhancer.fetch_quote(first).await {
                Ok(quote) => quote,
                Err(e) => {
                    for position in holders {
                        report.record_failure(position, &e);
                    }
                    continue;
                }
            };
            for position in holders {
                match self.enhancer.apply_quote(&position.id, &quote).await {
                    Ok(_) => report.updated += 1,
                    Err(e) => report.record_failure(position, &e),
                }
            }
        }

        info!(
            total = report.total,
            updated = report.updated,
            failed = report.failed.len(),
            "Quote batch finished"
        );
        Ok(report)
    }

    async fn pause(&self) {
        if !self.batch_delay.is_zero() {
            tokio::time::sleep(self.batch_delay).await;
        }
    }
}
