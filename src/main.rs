use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ecopontos_api::{app, config::AppConfig, AppState};

#[derive(Parser)]
#[command(name = "ecopontos-api")]
#[command(about = "REST API for recycling drop-off points backed by Firebase")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Address to bind (overrides HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up FIREBASE_CONFIG_JSON, FIREBASE_DB_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ecopontos_api=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("invalid Firebase configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let state = AppState::firebase(&config).context("failed to initialize Firebase clients")?;
    tracing::info!(
        "Firebase initialized for project {}",
        config.firebase.credentials.project_id
    );

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Ecopontos API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;

    Ok(())
}
