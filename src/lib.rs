//! Tenant settings service: per-tenant ERP (Zeus) connection credentials.
//!
//! - `api`: `/api/v1/credentials` get / upsert / delete handlers
//! - `store`: one-row-per-tenant persistence (Postgres, in-memory)
//! - `vault`: envelope encryption of the stored password
//! - `client`: the dashboard-side HTTP client and settings form controller

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::CorsLayer;

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod store;
pub mod vault;

use store::CredentialStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, config: config::Config) -> Arc<Self> {
        Arc::new(Self { store, config })
    }
}

/// Full HTTP application: health probes, the settings API and the
/// cross-cutting layers.
pub fn app(state: Arc<AppState>) -> Router {
    let dashboard_origin = state.config.dashboard_origin.clone();

    Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .route("/readyz", axum::routing::get(|| async { "ok" }))
        .nest("/api/v1", api::api_router(state.clone()))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors_layer(dashboard_origin))
        .layer(axum::middleware::from_fn(
            middleware::headers::request_id_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::headers::security_headers_middleware,
        ))
}

fn cors_layer(dashboard_origin: String) -> CorsLayer {
    use axum::http::{HeaderName, Method};
    use tower_http::cors::AllowOrigin;

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            origin_str == dashboard_origin
                || origin_str.starts_with("http://localhost:")
                || origin_str.starts_with("http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("x-admin-key"),
            HeaderName::from_static("x-tenant-id"),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}
