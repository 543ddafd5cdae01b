use std::sync::Arc;

use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::resolve_tenant;
use crate::AppState;

pub mod handlers;

/// Build the settings API router.
/// All routes are relative; the caller mounts this under `/api/v1`.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/credentials",
            get(handlers::get_credentials)
                .post(handlers::upsert_credentials)
                .delete(handlers::delete_credentials),
        )
        .layer(middleware::from_fn_with_state(state, resolve_tenant))
        .layer(TraceLayer::new_for_http())
        .fallback(fallback_404)
}

async fn fallback_404() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "not found" })),
    )
}
