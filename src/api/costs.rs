use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{parse_decimal, parse_optional_decimal, AppState};
use crate::domain::{Decimal, RealizedResult, SecurityClass, Side, Symbol, TradeCosts};
use crate::engine::CostSchedule;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostsQuery {
    pub side: String,
    pub shares: i64,
    pub price: String,
    pub fee_rate: Option<String>,
    pub tax_rate: Option<String>,
    /// Used to pick the statutory tax rate when no explicit rate is given.
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostsResponse {
    #[serde(flatten)]
    pub costs: TradeCosts,
    /// Net amount per share.
    pub actual_price: Decimal,
    pub fee_rate: Decimal,
    pub tax_rate: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GainLossQuery {
    pub shares: i64,
    pub buy_price: String,
    pub sell_price: String,
    pub fee_rate: Option<String>,
    pub tax_rate: Option<String>,
    pub symbol: Option<String>,
}

pub async fn get_costs(
    Query(params): Query<CostsQuery>,
    State(state): State<AppState>,
) -> Result<Json<CostsResponse>, AppError> {
    let side = Side::from_str(&params.side).map_err(AppError::BadRequest)?;
    let price = parse_decimal("price", &params.price)?;
    let schedule = schedule_from_query(
        &state,
        params.fee_rate.as_deref(),
        params.tax_rate.as_deref(),
        params.symbol.as_deref(),
    )?;

    let costs = schedule.costs(side, params.shares, price)?;
    Ok(Json(CostsResponse {
        actual_price: costs.net_amount / Decimal::from_i64(params.shares),
        fee_rate: schedule.fee_rate_percent,
        tax_rate: schedule.tax_rate_percent,
        costs,
    }))
}

pub async fn get_gain_loss(
    Query(params): Query<GainLossQuery>,
    State(state): State<AppState>,
) -> Result<Json<RealizedResult>, AppError> {
    let buy_price = parse_decimal("buyPrice", &params.buy_price)?;
    let sell_price = parse_decimal("sellPrice", &params.sell_price)?;
    let schedule = schedule_from_query(
        &state,
        params.fee_rate.as_deref(),
        params.tax_rate.as_deref(),
        params.symbol.as_deref(),
    )?;

    Ok(Json(schedule.realized(params.shares, buy_price, sell_price)?))
}

/// Configured defaults, overridden by explicit query rates.
fn schedule_from_query(
    state: &AppState,
    fee_rate: Option<&str>,
    tax_rate: Option<&str>,
    symbol: Option<&str>,
) -> Result<CostSchedule, AppError> {
    let mut schedule = state.config.cost_schedule();
    if let Some(fee) = parse_optional_decimal("feeRate", fee_rate)? {
        schedule.fee_rate_percent = fee;
    }
    match parse_optional_decimal("taxRate", tax_rate)? {
        Some(tax) => schedule.tax_rate_percent = tax,
        None => {
            if let Some(raw) = symbol.filter(|s| !s.trim().is_empty()) {
                let symbol = Symbol::from_str(raw).map_err(|e| AppError::BadRequest(e.to_string()))?;
                let class = SecurityClass::classify(&symbol, None);
                if class.is_bond_etf() {
                    schedule.tax_rate_percent = class.default_tax_rate();
                }
            }
        }
    }
    Ok(schedule)
}
