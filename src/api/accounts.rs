use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_optional_decimal, AppState};
use crate::domain::Account;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub name: String,
    pub brokerage_fee_rate: Option<String>,
    pub transaction_tax_rate: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
}

pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<AccountsResponse>, AppError> {
    let accounts = state.repo.list_accounts().await?;
    Ok(Json(AccountsResponse { accounts }))
}

/// Create an account. Rates default to the configured ones.
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("account name is required".to_string()));
    }

    let mut account = Account::new(name.to_string());
    account.brokerage_fee_rate = parse_optional_decimal("brokerageFeeRate", req.brokerage_fee_rate.as_deref())?
        .unwrap_or(state.config.brokerage_fee_rate);
    account.transaction_tax_rate =
        parse_optional_decimal("transactionTaxRate", req.transaction_tax_rate.as_deref())?
            .unwrap_or(state.config.transaction_tax_rate);
    if account.brokerage_fee_rate.is_negative() || account.transaction_tax_rate.is_negative() {
        return Err(AppError::BadRequest("rates must be >= 0".to_string()));
    }

    state.repo.insert_account(&account).await?;
    tracing::info!(account = %account.id, name = %account.name, "Account created");
    Ok((StatusCode::CREATED, Json(account)))
}
