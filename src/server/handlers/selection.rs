use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::selection::{SelectionContext, SelectionEngine};
use crate::server::handlers::utils::parse_backend_type;
use crate::state::AppState;

pub async fn decide(
    State(state): State<Arc<AppState>>,
    Json(context): Json<SelectionContext>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.selector.decide(&context)?))
}

pub async fn fallback(Path(backend_type): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let backend = parse_backend_type(&backend_type)?;
    Ok(Json(json!({
        "backend_type": backend,
        "fallback": SelectionEngine::fallback(backend),
        "chain": SelectionEngine::fallback_chain(backend),
    })))
}

pub async fn high_reliability() -> impl IntoResponse {
    Json(json!({ "chain": SelectionEngine::high_reliability_chain() }))
}
