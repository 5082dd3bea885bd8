//! Application settings record.

use crate::domain::{AppSettings, TimeMs};
use sqlx::Row;

use super::{RepoError, Repository};

impl Repository {
    /// Stored settings, or defaults when none were saved yet.
    pub async fn load_settings(&self) -> Result<AppSettings, RepoError> {
        let row = sqlx::query("SELECT settings FROM app_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Ok(AppSettings::default()),
            Some(row) => {
                let raw: String = row.get("settings");
                serde_json::from_str(&raw).map_err(|e| RepoError::Corrupt {
                    id: "app_settings".to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), RepoError> {
        let raw = serde_json::to_string(settings)?;
        sqlx::query(
            r#"
            INSERT INTO app_settings (id, settings, updated_at_ms)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                settings = excluded.settings,
                updated_at_ms = excluded.updated_at_ms
            "#,
        )
        .bind(raw)
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::repo::test_support::temp_repo;
    use crate::domain::{AccountId, AppSettings, GainLossMode};

    #[tokio::test]
    async fn test_settings_default_then_saved() {
        let (_dir, repo) = temp_repo().await;
        assert_eq!(repo.load_settings().await.unwrap(), AppSettings::default());

        let settings = AppSettings {
            current_account: Some(AccountId::new("acc-1".to_string())),
            privacy_mode: true,
            gain_loss_mode: GainLossMode::CashDividendOnly,
        };
        repo.save_settings(&settings).await.unwrap();
        repo.save_settings(&settings).await.unwrap();
        assert_eq!(repo.load_settings().await.unwrap(), settings);
    }
}
