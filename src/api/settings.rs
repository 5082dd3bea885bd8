use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::domain::AppSettings;
use crate::error::AppError;

pub async fn get_settings(State(state): State<AppState>) -> Json<AppSettings> {
    Json(state.session.settings().await)
}

pub async fn put_settings(
    State(state): State<AppState>,
    Json(next): Json<AppSettings>,
) -> Result<Json<AppSettings>, AppError> {
    Ok(Json(state.session.update(next).await?))
}
