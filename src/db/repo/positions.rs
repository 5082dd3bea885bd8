//! Position record operations for the repository.
//!
//! A position is stored as one JSON document in `positions.record`, with the
//! id, account and symbol columns duplicated for lookups.

use crate::domain::{AccountId, Position, PositionId, TimeMs};
use sqlx::Row;

use super::{conflict_or, RepoError, Repository};

impl Repository {
    /// Insert a new position; fails with `Conflict` if the id exists.
    pub async fn insert_position(&self, position: &Position) -> Result<(), RepoError> {
        let record = serde_json::to_string(position)?;
        sqlx::query(
            r#"
            INSERT INTO positions (id, account_id, symbol, record, updated_at_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(position.id.as_str())
        .bind(position.account_id.as_str())
        .bind(position.symbol.as_str())
        .bind(record)
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await
        .map_err(|e| map_position_write_error(e, position))?;
        Ok(())
    }

    /// Insert or replace a whole position record.
    pub async fn upsert_position(&self, position: &Position) -> Result<(), RepoError> {
        let record = serde_json::to_string(position)?;
        sqlx::query(
            r#"
            INSERT INTO positions (id, account_id, symbol, record, updated_at_ms)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                account_id = excluded.account_id,
                symbol = excluded.symbol,
                record = excluded.record,
                updated_at_ms = excluded.updated_at_ms
            "#,
        )
        .bind(position.id.as_str())
        .bind(position.account_id.as_str())
        .bind(position.symbol.as_str())
        .bind(record)
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await
        .map_err(|e| map_position_write_error(e, position))?;
        Ok(())
    }

    pub async fn get_position(&self, id: &PositionId) -> Result<Option<Position>, RepoError> {
        let row = sqlx::query("SELECT id, record FROM positions WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| position_from_row(&r)).transpose()
    }

    /// Positions ordered by symbol then id, optionally limited to one account.
    pub async fn list_positions(&self, account: Option<&AccountId>) -> Result<Vec<Position>, RepoError> {
        let rows = match account {
            Some(account_id) => {
                sqlx::query(
                    "SELECT id, record FROM positions WHERE account_id = ? ORDER BY symbol ASC, id ASC",
                )
                .bind(account_id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, record FROM positions ORDER BY symbol ASC, id ASC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(position_from_row).collect()
    }

    pub async fn delete_position(&self, id: &PositionId) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM positions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Read-modify-write of one position inside a transaction.
    ///
    /// `f` receives the stored record and returns the replacement. The id,
    /// account and symbol of the stored record are kept regardless of what `f`
    /// returns. Returns the record as written.
    pub async fn update_position<F>(&self, id: &PositionId, f: F) -> Result<Position, RepoError>
    where
        F: FnOnce(&Position) -> Position,
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT id, record FROM positions WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::PositionNotFound(id.to_string()))?;
        let stored = position_from_row(&row)?;

        let mut updated = f(&stored);
        updated.id = stored.id.clone();
        updated.account_id = stored.account_id.clone();
        updated.symbol = stored.symbol.clone();

        let record = serde_json::to_string(&updated)?;
        sqlx::query("UPDATE positions SET record = ?, updated_at_ms = ? WHERE id = ?")
            .bind(record)
            .bind(TimeMs::now().as_ms())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }
}

fn position_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Position, RepoError> {
    let id: String = row.get("id");
    let record: String = row.get("record");
    serde_json::from_str(&record).map_err(|e| RepoError::Corrupt {
        id,
        reason: e.to_string(),
    })
}

fn map_position_write_error(err: sqlx::Error, position: &Position) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            RepoError::AccountNotFound(position.account_id.to_string())
        }
        _ => conflict_or(err, position.id.as_str()),
    }
}
