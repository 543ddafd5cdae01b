//! Dashboard-side access to the settings API.
//!
//! [`CredentialsApi`] is the transport seam used by the settings form
//! controller ([`form::CredentialForm`]); [`HttpCredentialsApi`] is the
//! production implementation.

pub mod form;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::middleware::tenant::{ADMIN_KEY_HEADER, TENANT_HEADER};
use crate::models::{CredentialInput, CredentialView, FieldError, TenantId};

pub use form::CredentialForm;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with `success: false`.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("unexpected response from settings service (status {status})")]
    MalformedResponse { status: u16 },
}

/// Wire body of `POST /api/v1/credentials`. `password` is left out entirely
/// when the user did not type a new one.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl From<&CredentialInput> for CredentialRequest {
    fn from(input: &CredentialInput) -> Self {
        Self {
            host: input.host.clone(),
            port: input.port,
            database_name: input.database_name.clone(),
            username: input.username.clone(),
            password: input.password.clone(),
        }
    }
}

/// Successful save: the service message and the redacted stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub message: String,
    pub credential: CredentialView,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[async_trait]
pub trait CredentialsApi: Send + Sync {
    async fn fetch(&self, tenant: &TenantId) -> Result<Option<CredentialView>, ClientError>;

    async fn save(
        &self,
        tenant: &TenantId,
        body: &CredentialRequest,
    ) -> Result<SaveOutcome, ClientError>;

    /// Returns the service's confirmation message.
    async fn delete(&self, tenant: &TenantId) -> Result<String, ClientError>;
}

/// `reqwest` client for the settings API.
#[derive(Clone)]
pub struct HttpCredentialsApi {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpCredentialsApi {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, service_key)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    fn request(&self, method: Method, tenant: &TenantId) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api/v1/credentials", self.base_url))
            .header(ADMIN_KEY_HEADER, &self.service_key)
            .header(TENANT_HEADER, tenant.as_str())
    }
}

async fn read_envelope<T: DeserializeOwned>(resp: Response) -> Result<ApiEnvelope<T>, ClientError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!(status = status.as_u16(), "settings API returned unreadable body: {}", e);
        ClientError::MalformedResponse {
            status: status.as_u16(),
        }
    })?;

    if !status.is_success() || !envelope.success {
        return Err(ClientError::Rejected {
            status: status.as_u16(),
            message: envelope
                .message
                .unwrap_or_else(|| format!("request failed with status {}", status.as_u16())),
            errors: envelope.errors,
        });
    }
    Ok(envelope)
}

#[async_trait]
impl CredentialsApi for HttpCredentialsApi {
    async fn fetch(&self, tenant: &TenantId) -> Result<Option<CredentialView>, ClientError> {
        let resp = self.request(Method::GET, tenant).send().await?;
        Ok(read_envelope::<CredentialView>(resp).await?.data)
    }

    async fn save(
        &self,
        tenant: &TenantId,
        body: &CredentialRequest,
    ) -> Result<SaveOutcome, ClientError> {
        let resp = self.request(Method::POST, tenant).json(body).send().await?;
        let status = resp.status().as_u16();
        let envelope = read_envelope::<CredentialView>(resp).await?;

        let credential = envelope
            .data
            .ok_or(ClientError::MalformedResponse { status })?;
        Ok(SaveOutcome {
            message: envelope
                .message
                .unwrap_or_else(|| "ERP credentials saved".to_string()),
            credential,
        })
    }

    async fn delete(&self, tenant: &TenantId) -> Result<String, ClientError> {
        let resp = self.request(Method::DELETE, tenant).send().await?;
        let envelope = read_envelope::<serde_json::Value>(resp).await?;
        Ok(envelope
            .message
            .unwrap_or_else(|| "ERP credentials deleted".to_string()))
    }
}
