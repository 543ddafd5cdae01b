use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{CredentialStore, StoreError};
use crate::models::{CredentialInput, TenantCredential, TenantId};
use crate::vault::{EncryptedSecret, VaultCrypto};

const CREDENTIAL_COLUMNS: &str = "tenant_id, host, port, database_name, username, \
     encrypted_dek, dek_nonce, encrypted_secret, secret_nonce, created_at, updated_at";

/// Postgres-backed credential store. Passwords are envelope-encrypted before
/// they reach the table; an empty password is stored as NULL ciphertext.
pub struct PgStore {
    pool: PgPool,
    crypto: VaultCrypto,
}

impl PgStore {
    pub async fn connect(database_url: &str, master_key_hex: &str) -> anyhow::Result<Self> {
        let crypto = VaultCrypto::new(master_key_hex)?;
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool, crypto })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn seal(&self, password: Option<&str>) -> Result<Option<EncryptedSecret>, StoreError> {
        match password {
            Some(pw) if !pw.is_empty() => self
                .crypto
                .encrypt_string(pw)
                .map(Some)
                .map_err(StoreError::Crypto),
            _ => Ok(None),
        }
    }

    fn open(&self, row: CredentialRow) -> Result<TenantCredential, StoreError> {
        let port = u16::try_from(row.port).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let password = match (
            row.encrypted_dek,
            row.dek_nonce,
            row.encrypted_secret,
            row.secret_nonce,
        ) {
            (Some(encrypted_dek), Some(dek_nonce), Some(encrypted_secret), Some(secret_nonce)) => {
                self.crypto
                    .decrypt_string(&EncryptedSecret {
                        encrypted_dek,
                        dek_nonce,
                        encrypted_secret,
                        secret_nonce,
                    })
                    .map_err(StoreError::Crypto)?
            }
            _ => String::new(),
        };

        let tenant_id = TenantId::parse(&row.tenant_id).ok_or_else(|| {
            StoreError::Database(sqlx::Error::Decode("blank tenant_id in row".into()))
        })?;

        Ok(TenantCredential {
            tenant_id,
            host: row.host,
            port,
            database_name: row.database_name,
            username: row.username,
            password,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find(&self, tenant: &TenantId) -> Result<Option<TenantCredential>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {} FROM erp_credentials WHERE tenant_id = $1",
            CREDENTIAL_COLUMNS
        ))
        .bind(tenant.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.open(r)).transpose()
    }

    async fn upsert(
        &self,
        tenant: &TenantId,
        input: &CredentialInput,
    ) -> Result<TenantCredential, StoreError> {
        let sealed = self.seal(input.password.as_deref())?;
        let (encrypted_dek, dek_nonce, encrypted_secret, secret_nonce) = match sealed {
            Some(s) => (
                Some(s.encrypted_dek),
                Some(s.dek_nonce),
                Some(s.encrypted_secret),
                Some(s.secret_nonce),
            ),
            None => (None, None, None, None),
        };

        // NULL ciphertext in EXCLUDED means "no new password": keep the stored one.
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            r#"INSERT INTO erp_credentials
                   (tenant_id, host, port, database_name, username,
                    encrypted_dek, dek_nonce, encrypted_secret, secret_nonce)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT (tenant_id) DO UPDATE SET
                   host = EXCLUDED.host,
                   port = EXCLUDED.port,
                   database_name = EXCLUDED.database_name,
                   username = EXCLUDED.username,
                   encrypted_dek = COALESCE(EXCLUDED.encrypted_dek, erp_credentials.encrypted_dek),
                   dek_nonce = COALESCE(EXCLUDED.dek_nonce, erp_credentials.dek_nonce),
                   encrypted_secret = COALESCE(EXCLUDED.encrypted_secret, erp_credentials.encrypted_secret),
                   secret_nonce = COALESCE(EXCLUDED.secret_nonce, erp_credentials.secret_nonce),
                   updated_at = now()
               RETURNING {}"#,
            CREDENTIAL_COLUMNS
        ))
        .bind(tenant.as_str())
        .bind(&input.host)
        .bind(i32::from(input.port))
        .bind(&input.database_name)
        .bind(&input.username)
        .bind(encrypted_dek)
        .bind(dek_nonce)
        .bind(encrypted_secret)
        .bind(secret_nonce)
        .fetch_one(&self.pool)
        .await
        .map_err(map_fk_violation)?;

        tracing::info!(
            tenant = %tenant,
            password_replaced = input.password.is_some(),
            "erp credential saved"
        );
        self.open(row)
    }

    async fn delete(&self, tenant: &TenantId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM erp_credentials WHERE tenant_id = $1")
            .bind(tenant.as_str())
            .execute(&self.pool)
            .await?;

        let existed = result.rows_affected() > 0;
        tracing::info!(tenant = %tenant, existed, "erp credential deleted");
        Ok(existed)
    }
}

fn map_fk_violation(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::UnknownTenant,
        _ => StoreError::Database(e),
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    tenant_id: String,
    host: String,
    port: i32,
    database_name: String,
    username: String,
    encrypted_dek: Option<Vec<u8>>,
    dek_nonce: Option<Vec<u8>>,
    encrypted_secret: Option<Vec<u8>>,
    secret_nonce: Option<Vec<u8>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
