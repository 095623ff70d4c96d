use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::server::handlers::utils::{parse_backend_type, require_non_blank};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub document_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct StartTransferRequest {
    pub source_id: String,
    pub target_id: String,
    pub document_ids: Vec<String>,
}

pub async fn compatibility(
    State(state): State<Arc<AppState>>,
    Path((source, target)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let source = parse_backend_type(&source)?;
    let target = parse_backend_type(&target)?;
    Ok(Json(state.compatibility.compatibility_info(source, target)))
}

pub async fn plan_transfer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let source = parse_backend_type(&request.source)?;
    let target = parse_backend_type(&request.target)?;
    let plan = state
        .planner
        .transfer_recommendations(source, target, request.document_count);
    Ok(Json(plan))
}

pub async fn start_transfer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartTransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_blank("source_id", &request.source_id)?;
    require_non_blank("target_id", &request.target_id)?;
    let operation_id = state.orchestrator.start_transfer(
        &request.source_id,
        &request.target_id,
        request.document_ids,
    )?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "operation_id": operation_id })),
    ))
}

pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.orchestrator.list()?))
}

pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(operation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.orchestrator.status(&operation_id)?))
}

pub async fn cancel_transfer(
    State(state): State<Arc<AppState>>,
    Path(operation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.orchestrator.cancel(&operation_id)?))
}
