pub mod accounts;
pub mod costs;
pub mod health;
pub mod positions;
pub mod rights;
pub mod settings;
pub mod transfer;

use crate::config::Config;
use crate::datasource::MarketDataSource;
use crate::db::{RepoError, Repository};
use crate::domain::{Account, AccountId, Decimal, Position};
use crate::engine::CostSchedule;
use crate::error::AppError;
use crate::orchestration::{Enhancer, FreshnessPolicy, Orchestrator, Session, SymbolLocks};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    pub session: Arc<Session>,
}

impl AppState {
    /// Wire the orchestration layer over `datasource` and load the session.
    pub async fn new(
        repo: Arc<Repository>,
        config: Config,
        datasource: Arc<dyn MarketDataSource>,
    ) -> Result<Self, RepoError> {
        let enhancer = Enhancer::new(
            datasource,
            Arc::clone(&repo),
            SymbolLocks::new(),
            FreshnessPolicy::new(config.rights_refresh_interval_ms),
        )
        .with_basis_mode(config.basis_mode);
        let orchestrator = Orchestrator::new(
            enhancer,
            Arc::clone(&repo),
            Duration::from_millis(config.batch_delay_ms),
        );
        let session = Session::load(Arc::clone(&repo)).await?;

        Ok(Self {
            repo,
            config,
            orchestrator: Arc::new(orchestrator),
            session: Arc::new(session),
        })
    }

    pub(crate) async fn require_account(&self, id: &AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("account {}", id)))
    }

    /// Cost schedule for trading `position` out of its account.
    pub(crate) fn schedule_for(&self, account: &Account, position: &Position) -> CostSchedule {
        CostSchedule::for_position(account, position, self.config.min_brokerage_fee)
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/costs", get(costs::get_costs))
        .route("/v1/gain-loss", get(costs::get_gain_loss))
        .route(
            "/v1/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/v1/positions",
            get(positions::list_positions).post(positions::create_position),
        )
        .route(
            "/v1/positions/:id",
            get(positions::get_position).delete(positions::delete_position),
        )
        .route("/v1/positions/:id/lot", put(positions::reset_lot))
        .route("/v1/positions/:id/gain-loss", get(positions::get_disposal))
        .route("/v1/positions/:id/rights", post(rights::refresh_position))
        .route("/v1/rights/refresh", post(rights::refresh_all))
        .route("/v1/quotes/refresh", post(rights::refresh_quotes))
        .route(
            "/v1/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        .route("/v1/export", get(transfer::export))
        .route("/v1/import", post(transfer::import))
        .layer(cors)
        .with_state(state)
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str_canonical(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("{} is not a number: {:?}", field, raw)))
}

pub(crate) fn parse_optional_decimal(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_decimal(field, value).map(Some),
    }
}

/// Parse an optional `accountId` query value; empty means "all accounts".
pub(crate) fn account_filter(raw: Option<&str>) -> Option<AccountId> {
    match raw.map(str::trim) {
        None | Some("") => None,
        Some(id) => Some(AccountId::new(id.to_string())),
    }
}
