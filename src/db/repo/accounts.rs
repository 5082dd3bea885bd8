//! Account operations for the repository.

use crate::domain::{Account, AccountId, Decimal, TimeMs};
use sqlx::Row;

use super::{conflict_or, RepoError, Repository};

impl Repository {
    /// Insert a new account; fails with `Conflict` if the id exists.
    pub async fn insert_account(&self, account: &Account) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, brokerage_fee_rate, transaction_tax_rate, created_at_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.name)
        .bind(account.brokerage_fee_rate.to_canonical_string())
        .bind(account.transaction_tax_rate.to_canonical_string())
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, account.id.as_str()))?;
        Ok(())
    }

    /// Insert or overwrite an account's name and rates.
    pub async fn upsert_account(&self, account: &Account) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, brokerage_fee_rate, transaction_tax_rate, created_at_ms)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                brokerage_fee_rate = excluded.brokerage_fee_rate,
                transaction_tax_rate = excluded.transaction_tax_rate
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.name)
        .bind(account.brokerage_fee_rate.to_canonical_string())
        .bind(account.transaction_tax_rate.to_canonical_string())
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, RepoError> {
        let row = sqlx::query(
            "SELECT id, name, brokerage_fee_rate, transaction_tax_rate FROM accounts WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| account_from_row(&r)).transpose()
    }

    /// All accounts in creation order.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, brokerage_fee_rate, transaction_tax_rate
            FROM accounts
            ORDER BY created_at_ms ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    /// Delete an account and, by cascade, its positions.
    pub async fn delete_account(&self, id: &AccountId) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn account_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Account, RepoError> {
    let id: String = row.get("id");
    let rate = |column: &str| -> Result<Decimal, RepoError> {
        let raw: String = row.get(column);
        Decimal::from_str_canonical(&raw).map_err(|e| RepoError::Corrupt {
            id: id.clone(),
            reason: format!("{}: {}", column, e),
        })
    };

    Ok(Account {
        brokerage_fee_rate: rate("brokerage_fee_rate")?,
        transaction_tax_rate: rate("transaction_tax_rate")?,
        name: row.get("name"),
        id: AccountId::new(id.clone()),
    })
}
