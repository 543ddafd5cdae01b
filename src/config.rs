use serde::Deserialize;

/// Development-only master key ("dev-only-key-do-not-use-in-prod!" in hex).
/// Refused when SETTINGS_ENV=production.
pub const PLACEHOLDER_MASTER_KEY: &str =
    "6465762d6f6e6c792d6b65792d646f2d6e6f742d7573652d696e2d70726f6421";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// 64 hex chars. Wraps the per-password data keys.
    pub master_key: String,
    pub admin_key: Option<String>,
    /// Origin of the dashboard allowed by CORS, besides localhost.
    pub dashboard_origin: String,
}

impl Config {
    /// Returns the service key required on every settings API call.
    /// Falls back to master_key if SETTINGS_ADMIN_KEY is not set.
    pub fn admin_key(&self) -> &str {
        self.admin_key.as_deref().unwrap_or(&self.master_key)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let master_key = std::env::var("SETTINGS_MASTER_KEY")
        .unwrap_or_else(|_| PLACEHOLDER_MASTER_KEY.into());

    if master_key == PLACEHOLDER_MASTER_KEY {
        let env_mode = std::env::var("SETTINGS_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "SETTINGS_MASTER_KEY is still the insecure placeholder. \
                 Set a proper 64-char hex key before running in production."
            );
        }
        tracing::warn!(
            "SETTINGS_MASTER_KEY is not set; using insecure placeholder. Set a 64-char hex key for production."
        );
    }

    Ok(Config {
        port: std::env::var("SETTINGS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/campaign".into()),
        master_key,
        admin_key: std::env::var("SETTINGS_ADMIN_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty()),
        dashboard_origin: std::env::var("DASHBOARD_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string()),
    })
}
