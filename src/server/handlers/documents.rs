use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::state::AppState;

const DEFAULT_QUERY_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

pub async fn ingest_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = state
        .chunk_store
        .ingest(&request.content, request.metadata)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "document_id": document_id })),
    ))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.chunk_store.list_documents()?))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.chunk_store.get_document(&document_id)?))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Distinguish "unknown id" from a persistence failure.
    state.chunk_store.get_document(&document_id)?;
    if !state.chunk_store.delete_document(&document_id).await {
        return Err(ApiError::Internal(format!(
            "Failed to delete document {}",
            document_id
        )));
    }
    Ok(Json(json!({ "status": "deleted", "document_id": document_id })))
}

pub async fn query_documents(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let results = state
        .chunk_store
        .query(&request.text, request.limit)
        .await?;
    Ok(Json(results))
}

pub async fn store_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.chunk_store.stats()?))
}
