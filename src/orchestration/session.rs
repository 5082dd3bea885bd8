//! Application settings held in memory and persisted at explicit checkpoints.

use crate::db::{RepoError, Repository};
use crate::domain::AppSettings;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
pub struct Session {
    repo: Arc<Repository>,
    settings: RwLock<AppSettings>,
}

impl Session {
    /// Load stored settings (defaults when none were saved).
    pub async fn load(repo: Arc<Repository>) -> Result<Self, RepoError> {
        let settings = repo.load_settings().await?;
        Ok(Self {
            repo,
            settings: RwLock::new(settings),
        })
    }

    pub async fn settings(&self) -> AppSettings {
        self.settings.read().await.clone()
    }

    /// Replace the settings and save them.
    ///
    /// A `current_account` that does not exist is rejected and nothing changes.
    pub async fn update(&self, next: AppSettings) -> Result<AppSettings, RepoError> {
        if let Some(account_id) = &next.current_account {
            if self.repo.get_account(account_id).await?.is_none() {
                return Err(RepoError::AccountNotFound(account_id.to_string()));
            }
        }

        let mut guard = self.settings.write().await;
        self.repo.save_settings(&next).await?;
        *guard = next.clone();
        debug!(gain_loss_mode = ?next.gain_loss_mode, "Settings saved");
        Ok(next)
    }

    /// Discard in-memory state and re-read from the repository.
    pub async fn reload(&self) -> Result<AppSettings, RepoError> {
        let stored = self.repo.load_settings().await?;
        *self.settings.write().await = stored.clone();
        Ok(stored)
    }
}
