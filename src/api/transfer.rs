//! Whole-ledger export (JSON or CSV) and JSON import merged by id.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::db::RepoError;
use crate::domain::{Account, AppSettings, IssueKind, Position, PositionIssue, TimeMs};
use crate::error::AppError;

const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: TimeMs,
    pub accounts: Vec<Account>,
    pub positions: Vec<Position>,
    pub settings: AppSettings,
}

/// Accepts an `ExportDocument`; extra fields are ignored.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub positions: Vec<serde_json::Value>,
    #[serde(default)]
    pub settings: Option<AppSettings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    pub index: usize,
    pub issues: Vec<PositionIssue>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub accounts_imported: usize,
    pub positions_imported: usize,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    account_id: &'a str,
    account_name: &'a str,
    symbol: &'a str,
    name: &'a str,
    shares: i64,
    cost_price: String,
    adjusted_cost_price: String,
    current_price: String,
    market_value: String,
    cash_income: String,
    purchase_date: String,
}

pub async fn export(
    Query(params): Query<ExportQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let accounts = state.repo.list_accounts().await?;
    let positions = state.repo.list_positions(None).await?;

    match params.format.as_deref().unwrap_or("json") {
        "json" => {
            let document = ExportDocument {
                version: EXPORT_VERSION,
                exported_at: TimeMs::now(),
                accounts,
                positions,
                settings: state.session.settings().await,
            };
            Ok(Json(document).into_response())
        }
        "csv" => {
            let body = positions_csv(&accounts, &positions)?;
            Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body).into_response())
        }
        other => Err(AppError::BadRequest(format!("unsupported export format: {}", other))),
    }
}

fn positions_csv(accounts: &[Account], positions: &[Position]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for p in positions {
        let account_name = accounts
            .iter()
            .find(|a| a.id == p.account_id)
            .map(|a| a.name.as_str())
            .unwrap_or_default();
        writer
            .serialize(CsvRow {
                account_id: p.account_id.as_str(),
                account_name,
                symbol: p.symbol.as_str(),
                name: &p.name,
                shares: p.shares,
                cost_price: p.cost_price.to_string(),
                adjusted_cost_price: p.adjusted_cost_price.round_dp(4).to_string(),
                current_price: p.current_price.to_string(),
                market_value: p.market_value().map(|v| v.to_string()).unwrap_or_default(),
                cash_income: p.rights.cash_income.to_string(),
                purchase_date: p.purchase_date.to_string(),
            })
            .map_err(|e| AppError::Internal(format!("csv export failed: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
}

/// Merge records into the store by id. Accounts go first so positions can
/// reference accounts from the same document. Invalid positions are reported
/// and skipped.
pub async fn import(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportReport>, AppError> {
    let mut report = ImportReport::default();

    for account in &req.accounts {
        if account.name.trim().is_empty()
            || account.brokerage_fee_rate.is_negative()
            || account.transaction_tax_rate.is_negative()
        {
            return Err(AppError::BadRequest(format!("invalid account {}", account.id)));
        }
    }
    for account in &req.accounts {
        state.repo.upsert_account(account).await?;
        report.accounts_imported += 1;
    }

    for (index, record) in req.positions.iter().enumerate() {
        let position = match Position::from_record(record, state.config.basis_mode) {
            Ok(p) => p,
            Err(issues) => {
                report.rejected.push(RejectedRecord { index, issues });
                continue;
            }
        };
        match state.repo.upsert_position(&position).await {
            Ok(()) => report.positions_imported += 1,
            Err(RepoError::AccountNotFound(id)) => report.rejected.push(RejectedRecord {
                index,
                issues: vec![PositionIssue {
                    field: "accountId".to_string(),
                    kind: IssueKind::Invalid,
                    message: format!("account {} does not exist", id),
                }],
            }),
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(settings) = req.settings {
        state.session.update(settings).await?;
    }

    tracing::info!(
        accounts = report.accounts_imported,
        positions = report.positions_imported,
        rejected = report.rejected.len(),
        "Import finished"
    );
    Ok(Json(report))
}
