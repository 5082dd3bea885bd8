use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::{account_filter, parse_decimal, parse_optional_decimal, AppState};
use crate::domain::{
    Account, AccountId, Decimal, GainLossMode, Position, PositionId, RealizedResult, RightsLedger,
    RightsSummary, SecurityClass, Symbol,
};
use crate::engine::{position_disposal, unrealized_gain_loss};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsQuery {
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    #[serde(flatten)]
    pub position: Position,
    pub security_class: SecurityClass,
    /// Null when the value does not fit in a decimal.
    pub market_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrealized_gain_loss: Option<Decimal>,
    pub rights_summary: RightsSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub positions: Vec<PositionView>,
    pub gain_loss_mode: GainLossMode,
    pub total_market_value: Option<Decimal>,
    pub total_unrealized_gain_loss: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePositionRequest {
    pub account_id: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub shares: i64,
    pub cost_price: String,
    pub purchase_date: NaiveDate,
    pub current_price: Option<String>,
    pub transaction_tax_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetLotRequest {
    pub shares: i64,
    pub cost_price: String,
    pub purchase_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposalQuery {
    /// Defaults to the whole position.
    pub shares: Option<i64>,
    /// Defaults to the stored current price.
    pub sell_price: Option<String>,
}

pub async fn list_positions(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    let account = account_filter(params.account_id.as_deref());
    let positions = state.repo.list_positions(account.as_ref()).await?;
    let accounts: HashMap<AccountId, Account> = state
        .repo
        .list_accounts()
        .await?
        .into_iter()
        .map(|a| (a.id.clone(), a))
        .collect();
    let mode = state.session.settings().await.gain_loss_mode;

    let views: Vec<PositionView> = positions
        .into_iter()
        .map(|p| {
            let unrealized = accounts
                .get(&p.account_id)
                .and_then(|a| unrealized_gain_loss(&p, mode, &state.schedule_for(a, &p)));
            view(p, unrealized)
        })
        .collect();

    Ok(Json(PositionsResponse {
        total_market_value: checked_total(views.iter().map(|v| v.market_value)),
        total_unrealized_gain_loss: checked_total(
            views.iter().filter_map(|v| v.unrealized_gain_loss).map(Some),
        ),
        gain_loss_mode: mode,
        positions: views,
    }))
}

pub async fn get_position(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PositionView>, AppError> {
    let position = load_position(&state, &id).await?;
    let account = state.require_account(&position.account_id).await?;
    let mode = state.session.settings().await.gain_loss_mode;
    let unrealized = unrealized_gain_loss(&position, mode, &state.schedule_for(&account, &position));
    Ok(Json(view(position, unrealized)))
}

pub async fn create_position(
    State(state): State<AppState>,
    Json(req): Json<CreatePositionRequest>,
) -> Result<(StatusCode, Json<Position>), AppError> {
    let symbol = Symbol::from_str(&req.symbol).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let cost_price = parse_decimal("costPrice", &req.cost_price)?;
    validate_lot(req.shares, cost_price)?;
    let account = state
        .require_account(&AccountId::new(req.account_id.trim().to_string()))
        .await?;

    let mut position = Position::new(
        account.id.clone(),
        symbol,
        req.name.trim().to_string(),
        req.shares,
        cost_price,
        req.purchase_date,
        state.config.basis_mode,
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if let Some(price) = parse_optional_decimal("currentPrice", req.current_price.as_deref())? {
        position.current_price = price;
    }
    position.transaction_tax_rate =
        parse_optional_decimal("transactionTaxRate", req.transaction_tax_rate.as_deref())?;

    let issues = position.validate();
    if let Some(first) = issues.first() {
        return Err(AppError::BadRequest(format!("{}: {}", first.field, first.message)));
    }

    state.repo.insert_position(&position).await?;
    tracing::info!(
        position = %position.id,
        account = %position.account_id,
        symbol = %position.symbol,
        shares = position.shares,
        "Position created"
    );
    Ok((StatusCode::CREATED, Json(position)))
}

pub async fn delete_position(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let id = PositionId::new(id);
    if !state.repo.delete_position(&id).await? {
        return Err(AppError::NotFound(format!("position {}", id)));
    }
    tracing::info!(position = %id, "Position deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the purchased lot. Rights adjustments are discarded and will be
/// rebuilt by the next refresh.
pub async fn reset_lot(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ResetLotRequest>,
) -> Result<Json<Position>, AppError> {
    let cost_price = parse_decimal("costPrice", &req.cost_price)?;
    validate_lot(req.shares, cost_price)?;
    let lot = RightsLedger::new(req.shares, cost_price, state.config.basis_mode)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let id = PositionId::new(id);
    let _guard = match state.repo.get_position(&id).await? {
        Some(p) => state.orchestrator.enhancer().locks().lock(&p.symbol).await,
        None => return Err(AppError::NotFound(format!("position {}", id))),
    };
    let written = state
        .repo
        .update_position(&id, |current| {
            let mut next = current.clone();
            next.reset_lot(lot);
            if let Some(date) = req.purchase_date {
                next.purchase_date = date;
            }
            next
        })
        .await?;
    tracing::info!(position = %id, shares = written.shares, "Lot reset");
    Ok(Json(written))
}

/// Preview selling part or all of a position at its adjusted cost.
pub async fn get_disposal(
    Path(id): Path<String>,
    Query(params): Query<DisposalQuery>,
    State(state): State<AppState>,
) -> Result<Json<RealizedResult>, AppError> {
    let position = load_position(&state, &id).await?;
    let account = state.require_account(&position.account_id).await?;
    let shares = params.shares.unwrap_or(position.shares);
    let sell_price = parse_optional_decimal("sellPrice", params.sell_price.as_deref())?
        .unwrap_or(position.current_price);

    let schedule = state.schedule_for(&account, &position);
    Ok(Json(position_disposal(&position, shares, sell_price, &schedule)?))
}

async fn load_position(state: &AppState, id: &str) -> Result<Position, AppError> {
    state
        .repo
        .get_position(&PositionId::new(id.to_string()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("position {}", id)))
}

fn validate_lot(shares: i64, cost_price: Decimal) -> Result<(), AppError> {
    if shares <= 0 {
        return Err(AppError::BadRequest(format!("shares must be > 0, got {}", shares)));
    }
    if !cost_price.is_positive() {
        return Err(AppError::BadRequest(format!("costPrice must be > 0, got {}", cost_price)));
    }
    Ok(())
}

/// Sum of `values`; None if any value is missing or the sum overflows.
fn checked_total(mut values: impl Iterator<Item = Option<Decimal>>) -> Option<Decimal> {
    values.try_fold(Decimal::zero(), |acc, v| acc.checked_add(v?))
}

fn view(position: Position, unrealized_gain_loss: Option<Decimal>) -> PositionView {
    PositionView {
        security_class: position.security_class(),
        market_value: position.market_value(),
        rights_summary: position.rights.summary(),
        unrealized_gain_loss,
        position,
    }
}
