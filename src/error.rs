use crate::db::RepoError;
use crate::engine::{CostError, RightsError};
use crate::orchestration::{OrchestrationError, RefreshError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream unavailable: {0}")]
    Upstream(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::PositionNotFound(id) => AppError::NotFound(format!("position {}", id)),
            RepoError::AccountNotFound(id) => AppError::NotFound(format!("account {}", id)),
            RepoError::Conflict(id) => AppError::Conflict(format!("{} already exists", id)),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<CostError> for AppError {
    fn from(err: CostError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<RightsError> for AppError {
    fn from(err: RightsError) -> Self {
        match err {
            RightsError::InvalidInput(_) => AppError::BadRequest(err.to_string()),
            // Bad data from the provider, not from the caller.
            RightsError::InvalidEvent { .. } | RightsError::InvalidRecord { .. } => {
                AppError::Upstream(err.to_string())
            }
        }
    }
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::NotFound(id) => AppError::NotFound(format!("position {}", id)),
            RefreshError::UpstreamUnavailable(e) => AppError::Upstream(e.to_string()),
            RefreshError::Rights(e) => e.into(),
            RefreshError::Repo(e) => e.into(),
            RefreshError::Conflict(_) => AppError::Conflict(err.to_string()),
        }
    }
}

impl From<OrchestrationError> for AppError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::Db(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::DataSourceError;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (AppError::from(CostError::InvalidInput("x".into())), StatusCode::BAD_REQUEST),
            (
                AppError::from(RepoError::PositionNotFound("p".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(RefreshError::UpstreamUnavailable(DataSourceError::RateLimited)),
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::from(RepoError::Conflict("p".into())), StatusCode::CONFLICT),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
