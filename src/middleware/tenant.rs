//! Tenant context resolution for the management API.
//!
//! The dashboard backend calls this service with its service key and the
//! tenant of the signed-in user. The middleware checks the key and attaches a
//! [`TenantContext`] to the request; handlers pull it out with the extractor.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::models::TenantId;
use crate::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Tenant the current request acts on.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

/// Middleware: validates the service key, then resolves the tenant header.
///
/// A missing or blank tenant header is not rejected here; handlers report it
/// as a 400 through the [`TenantContext`] extractor.
pub async fn resolve_tenant(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state.config.admin_key();

    match provided_key(req.headers()) {
        Some(k) if bool::from(k.as_bytes().ct_eq(expected.as_bytes())) => {}
        Some(k) => {
            // never log the expected key or the full provided key
            let masked = if k.len() > 8 {
                format!("{}…{}", &k[..4], &k[k.len() - 4..])
            } else {
                "****".to_string()
            };
            tracing::warn!("settings API: invalid key (provided: '{}')", masked);
            return Err(AppError::Unauthorized);
        }
        None => {
            tracing::warn!("settings API: missing X-Admin-Key header");
            return Err(AppError::Unauthorized);
        }
    }

    let tenant = req
        .headers()
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(TenantId::parse);

    if let Some(tenant_id) = tenant {
        req.extensions_mut().insert(TenantContext { tenant_id });
    }

    Ok(next.run(req).await)
}

fn provided_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim())
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::TenantUnresolved)
    }
}
