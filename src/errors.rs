use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::FieldError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("tenant could not be resolved")]
    TenantUnresolved,

    #[error("invalid or missing service key")]
    Unauthorized,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::TenantUnresolved => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::UnknownTenant) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(errors) => json!({
                "success": false,
                "message": "Invalid ERP credential data",
                "errors": errors,
            }),
            AppError::TenantUnresolved | AppError::Store(StoreError::UnknownTenant) => json!({
                "success": false,
                "message": "Tenant could not be resolved for this request",
            }),
            AppError::Unauthorized => json!({
                "success": false,
                "message": "invalid or missing service key",
            }),
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                internal_body()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                internal_body()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal_body() -> serde_json::Value {
    json!({
        "success": false,
        "message": "internal server error",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_lists_field_errors() {
        let (status, body) = body_of(AppError::Validation(vec![FieldError::new(
            "port",
            "Port must be a number",
        )]))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["field"], "port");
    }

    #[tokio::test]
    async fn test_database_error_is_generic() {
        let err = AppError::Store(StoreError::Database(sqlx::Error::Protocol(
            "relation \"erp_credentials\" does not exist".into(),
        )));
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "internal server error");
        assert!(!body.to_string().contains("erp_credentials"));
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_client_error() {
        let (status, body) = body_of(AppError::Store(StoreError::UnknownTenant)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("errors").is_none());
    }
}
