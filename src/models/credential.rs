use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the tenant that owns a credential row.
///
/// Always resolved from the request context, never from a request body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Returns `None` for empty or whitespace-only identifiers.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored ERP connection credential, password included.
///
/// This is the server-side representation returned by the store. It has no
/// `Serialize` impl: anything leaving the process goes through
/// [`CredentialView`].
#[derive(Clone, PartialEq)]
pub struct TenantCredential {
    pub tenant_id: TenantId,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantCredential {
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Drop the password and expose only whether one is set.
    pub fn redact(&self) -> CredentialView {
        CredentialView {
            tenant_id: self.tenant_id.clone(),
            host: self.host.clone(),
            port: self.port,
            database_name: self.database_name.clone(),
            username: self.username.clone(),
            has_password: self.has_password(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Debug for TenantCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCredential")
            .field("tenant_id", &self.tenant_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &if self.has_password() { "<redacted>" } else { "" })
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Credential as seen by any reader: the password is replaced by `hasPassword`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialView {
    pub tenant_id: TenantId,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated upsert payload.
///
/// `password: None` means "keep whatever is stored" (or empty on create).
#[derive(Clone, PartialEq)]
pub struct CredentialInput {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(password: &str) -> TenantCredential {
        let now = Utc::now();
        TenantCredential {
            tenant_id: TenantId::parse("acme").unwrap(),
            host: "10.0.0.1".into(),
            port: 3050,
            database_name: "DB.FDB".into(),
            username: "SYSDBA".into(),
            password: password.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tenant_id_rejects_blank() {
        assert!(TenantId::parse("").is_none());
        assert!(TenantId::parse("   ").is_none());
        assert_eq!(TenantId::parse(" acme ").unwrap().as_str(), "acme");
    }

    #[test]
    fn test_redacted_view_has_no_password_key() {
        let view = sample("secret").redact();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["hasPassword"], true);
        assert_eq!(json["databaseName"], "DB.FDB");
        assert_eq!(json["tenantId"], "acme");
        assert!(json.get("password").is_none());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn test_empty_password_reports_absent() {
        assert!(!sample("").redact().has_password);
    }

    #[test]
    fn test_debug_never_prints_password() {
        let rendered = format!("{:?}", sample("hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));

        let input = CredentialInput {
            host: "h".into(),
            port: 1,
            database_name: "d".into(),
            username: "u".into(),
            password: Some("hunter2".into()),
        };
        assert!(!format!("{:?}", input).contains("hunter2"));
    }
}
