pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CredentialInput, TenantCredential, TenantId};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The tenant row referenced by the credential does not exist.
    #[error("unknown tenant")]
    UnknownTenant,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("vault error: {0}")]
    Crypto(#[source] anyhow::Error),
}

/// Persistence for the one-row-per-tenant ERP credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored credential for the tenant, if any.
    async fn find(&self, tenant: &TenantId) -> Result<Option<TenantCredential>, StoreError>;

    /// Create or update the tenant's credential.
    ///
    /// The stored password is replaced only when `input.password` is `Some`;
    /// on create a missing password is stored as empty.
    async fn upsert(
        &self,
        tenant: &TenantId,
        input: &CredentialInput,
    ) -> Result<TenantCredential, StoreError>;

    /// Remove the tenant's credential. Returns whether a row existed.
    async fn delete(&self, tenant: &TenantId) -> Result<bool, StoreError>;
}
