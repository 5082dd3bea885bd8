use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{account_filter, AppState};
use crate::domain::PositionId;
use crate::error::AppError;
use crate::orchestration::{BatchReport, RefreshResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshQuery {
    pub account_id: Option<String>,
    pub force: Option<bool>,
}

pub async fn refresh_position(
    Path(id): Path<String>,
    Query(params): Query<RefreshQuery>,
    State(state): State<AppState>,
) -> Result<Json<RefreshResult>, AppError> {
    let result = state
        .orchestrator
        .refresh_position(&PositionId::new(id), params.force.unwrap_or(false))
        .await?;
    Ok(Json(result))
}

/// Batch rights refresh. Per-item failures are reported, not returned as errors.
pub async fn refresh_all(
    Query(params): Query<RefreshQuery>,
    State(state): State<AppState>,
) -> Result<Json<BatchReport>, AppError> {
    let account = account_filter(params.account_id.as_deref());
    let report = state
        .orchestrator
        .refresh_rights_batch(account.as_ref(), params.force.unwrap_or(false))
        .await?;
    Ok(Json(report))
}

pub async fn refresh_quotes(
    Query(params): Query<RefreshQuery>,
    State(state): State<AppState>,
) -> Result<Json<BatchReport>, AppError> {
    let account = account_filter(params.account_id.as_deref());
    let report = state.orchestrator.refresh_quotes_batch(account.as_ref()).await?;
    Ok(Json(report))
}
