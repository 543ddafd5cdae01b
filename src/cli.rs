use clap::{Parser, Subcommand};

/// Tenant settings service: ERP credential storage for the campaign dashboard
#[derive(Parser)]
#[command(name = "tenant-settings", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the settings API server
    Serve {
        /// Port to bind (defaults to SETTINGS_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep credentials in process memory instead of Postgres
        #[arg(long)]
        memory: bool,
    },

    /// Manage a tenant's ERP credential
    Credential {
        #[command(subcommand)]
        command: CredentialCommands,
    },
}

#[derive(Subcommand)]
pub enum CredentialCommands {
    /// Show the stored credential (password redacted)
    Show {
        #[arg(long)]
        tenant: String,
    },
    /// Create or update the credential
    Set {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: String,
        #[arg(long)]
        database: String,
        #[arg(long)]
        username: String,
        /// New password; omit to keep the stored one
        #[arg(long, env = "ERP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Delete the credential (no error if none exists)
    Delete {
        #[arg(long)]
        tenant: String,
    },
}
