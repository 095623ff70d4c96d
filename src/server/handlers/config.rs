use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Merged `config.yml` + secrets with sensitive values masked.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let config = state.config_service.load_config()?;
    let redacted = state.config_service.redact_sensitive_values(&config);
    Ok(Json(redacted))
}
