use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::middleware::TenantContext;
use crate::models::{validate_payload, CredentialView, FieldError};
use crate::AppState;

// ── Response envelopes ───────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CredentialEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<CredentialView>,
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
}

// ── Credential Handlers ──────────────────────────────────────

/// GET /api/v1/credentials: the tenant's ERP credential, password redacted
pub async fn get_credentials(
    State(state): State<Arc<AppState>>,
    ctx: TenantContext,
) -> Result<Json<CredentialEnvelope>, AppError> {
    let stored = state.store.find(&ctx.tenant_id).await?;

    Ok(Json(CredentialEnvelope {
        success: true,
        message: None,
        data: stored.map(|c| c.redact()),
    }))
}

/// POST /api/v1/credentials: create or update the tenant's ERP credential
pub async fn upsert_credentials(
    State(state): State<Arc<AppState>>,
    ctx: TenantContext,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CredentialEnvelope>, AppError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::warn!(tenant = %ctx.tenant_id, "upsert_credentials: unreadable body: {}", rejection);
        AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
    })?;

    let input = validate_payload(&body).map_err(|errors| {
        tracing::warn!(
            tenant = %ctx.tenant_id,
            fields = ?errors.iter().map(|e| e.field.as_str()).collect::<Vec<_>>(),
            "upsert_credentials: validation failed"
        );
        AppError::Validation(errors)
    })?;

    let stored = state.store.upsert(&ctx.tenant_id, &input).await?;

    Ok(Json(CredentialEnvelope {
        success: true,
        message: Some("ERP credentials saved".to_string()),
        data: Some(stored.redact()),
    }))
}

/// DELETE /api/v1/credentials: remove the tenant's ERP credential (idempotent)
pub async fn delete_credentials(
    State(state): State<Arc<AppState>>,
    ctx: TenantContext,
) -> Result<Json<MessageEnvelope>, AppError> {
    let existed = state.store.delete(&ctx.tenant_id).await?;
    tracing::debug!(tenant = %ctx.tenant_id, existed, "delete_credentials");

    Ok(Json(MessageEnvelope {
        success: true,
        message: "ERP credentials deleted".to_string(),
    }))
}
