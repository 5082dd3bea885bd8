//! Repository layer for database operations.
//!
//! Methods are organized across submodules by record type:
//! - `accounts.rs` - Brokerage accounts
//! - `positions.rs` - Position records and the read-modify-write update path
//! - `settings.rs` - The single application settings record

mod accounts;
mod positions;
mod settings;

use sqlx::sqlite::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("stored record {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("position not found: {0}")]
    PositionNotFound(String),
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("record already exists: {0}")]
    Conflict(String),
}

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Cheap connectivity probe for readiness checks.
    pub async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique-constraint violation to `Conflict`.
fn conflict_or(err: sqlx::Error, id: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(id.to_string()),
        _ => RepoError::Database(err),
    }
}
