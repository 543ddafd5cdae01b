use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_settings::models::{validate_payload, TenantId};
use tenant_settings::store::{CredentialStore, MemoryStore, PgStore};
use tenant_settings::{config, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    // --help and --version exit here, before any config is read
    let args = cli::Cli::parse();

    // OTLP export only when a collector endpoint is configured
    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "tenant-settings"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tenant_settings=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;

    let result = match args.command {
        Some(cli::Commands::Serve { port, memory }) => run_server(cfg, port, memory).await,
        Some(cli::Commands::Credential { command }) => {
            let db = PgStore::connect(&cfg.database_url, &cfg.master_key).await?;
            handle_credential_command(&db, command).await
        }
        None => run_server(cfg, None, false).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    let store: Arc<dyn CredentialStore> = if memory {
        tracing::warn!("Using in-memory credential store; nothing survives a restart");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Connecting to database...");
        let db = PgStore::connect(&cfg.database_url, &cfg.master_key)
            .await
            .context("connecting to Postgres")?;

        tracing::info!("Running migrations...");
        db.migrate().await?;
        Arc::new(db)
    };

    let port = port.unwrap_or(cfg.port);
    let state = AppState::new(store, cfg);
    let app = tenant_settings::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Tenant settings service listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_credential_command(
    db: &PgStore,
    cmd: cli::CredentialCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::CredentialCommands::Show { tenant } => {
            let tenant = parse_tenant(&tenant)?;
            match db.find(&tenant).await? {
                Some(cred) => {
                    let view = cred.redact();
                    println!("ERP credential for tenant {}:", view.tenant_id);
                    println!("  Host:      {}", view.host);
                    println!("  Port:      {}", view.port);
                    println!("  Database:  {}", view.database_name);
                    println!("  Username:  {}", view.username);
                    println!(
                        "  Password:  {}",
                        if view.has_password { "set" } else { "not set" }
                    );
                    println!("  Updated:   {}", view.updated_at.format("%Y-%m-%d %H:%M:%S"));
                }
                None => println!("No ERP credential stored for tenant {}.", tenant),
            }
        }
        cli::CredentialCommands::Set {
            tenant,
            host,
            port,
            database,
            username,
            password,
        } => {
            let tenant = parse_tenant(&tenant)?;
            let input = validate_payload(&serde_json::json!({
                "host": host,
                "port": port,
                "databaseName": database,
                "username": username,
                "password": password,
            }))
            .map_err(|errors| {
                let detail = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                anyhow::anyhow!("invalid credential: {}", detail)
            })?;

            let stored = db.upsert(&tenant, &input).await?;
            println!("ERP credential saved for tenant {}:", tenant);
            println!("  Host:      {}:{}", stored.host, stored.port);
            println!("  Database:  {}", stored.database_name);
            println!("  Password:  {}", if stored.has_password() { "set" } else { "not set" });
        }
        cli::CredentialCommands::Delete { tenant } => {
            let tenant = parse_tenant(&tenant)?;
            if db.delete(&tenant).await? {
                println!("ERP credential deleted.");
            } else {
                println!("No ERP credential stored; nothing to delete.");
            }
        }
    }
    Ok(())
}

fn parse_tenant(raw: &str) -> anyhow::Result<TenantId> {
    TenantId::parse(raw).ok_or_else(|| anyhow::anyhow!("invalid tenant id: {:?}", raw))
}
