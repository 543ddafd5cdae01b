use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{CredentialStore, StoreError};
use crate::models::{CredentialInput, TenantCredential, TenantId};

/// Process-local store backed by a `DashMap`.
///
/// Used by tests and by `serve --memory` for local dashboard work without Postgres.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<DashMap<TenantId, TenantCredential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find(&self, tenant: &TenantId) -> Result<Option<TenantCredential>, StoreError> {
        Ok(self.rows.get(tenant).map(|r| r.value().clone()))
    }

    async fn upsert(
        &self,
        tenant: &TenantId,
        input: &CredentialInput,
    ) -> Result<TenantCredential, StoreError> {
        let now = Utc::now();
        // entry() holds the shard lock, so create-or-update is atomic per tenant
        let row = self
            .rows
            .entry(tenant.clone())
            .and_modify(|row| {
                row.host = input.host.clone();
                row.port = input.port;
                row.database_name = input.database_name.clone();
                row.username = input.username.clone();
                if let Some(password) = &input.password {
                    row.password = password.clone();
                }
                row.updated_at = now;
            })
            .or_insert_with(|| TenantCredential {
                tenant_id: tenant.clone(),
                host: input.host.clone(),
                port: input.port,
                database_name: input.database_name.clone(),
                username: input.username.clone(),
                password: input.password.clone().unwrap_or_default(),
                created_at: now,
                updated_at: now,
            });
        Ok(row.value().clone())
    }

    async fn delete(&self, tenant: &TenantId) -> Result<bool, StoreError> {
        Ok(self.rows.remove(tenant).is_some())
    }
}
