use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::defaults::default_cors_origins;
use crate::server::handlers::{backends, config, documents, health, selection, transfers};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware
/// - Health check and redacted config endpoints
/// - Selection, compatibility and transfer endpoints
/// - LightRAG document endpoints
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/config", get(config::get_config))
        .route("/api/selection", post(selection::decide))
        .route(
            "/api/selection/fallback/:backend_type",
            get(selection::fallback),
        )
        .route(
            "/api/selection/high-reliability",
            get(selection::high_reliability),
        )
        .route(
            "/api/compatibility/:source/:target",
            get(transfers::compatibility),
        )
        .route("/api/backends", get(backends::list_backends))
        .route(
            "/api/transfers",
            get(transfers::list_transfers).post(transfers::start_transfer),
        )
        .route("/api/transfers/plan", post(transfers::plan_transfer))
        .route("/api/transfers/:operation_id", get(transfers::get_transfer))
        .route(
            "/api/transfers/:operation_id/cancel",
            post(transfers::cancel_transfer),
        )
        .route(
            "/api/documents",
            get(documents::list_documents).post(documents::ingest_document),
        )
        .route("/api/documents/query", post(documents::query_documents))
        .route("/api/documents/stats", get(documents::store_stats))
        .route(
            "/api/documents/:document_id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let allowed_origins = parse_origins(&state.config.server.cors_allowed_origins);

    let allow_origin = if allowed_origins.is_empty() {
        tracing::warn!("No valid CORS origins configured; using local defaults");
        AllowOrigin::list(parse_origins(&default_cors_origins()))
    } else {
        AllowOrigin::list(allowed_origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect()
}
