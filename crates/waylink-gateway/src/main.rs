//! Standalone gateway binary over the in-memory collaborators.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waylink_server::collaborators::{DirectRouteService, InMemoryIncidentStore};
use waylink_server::config::GatewayConfig;
use waylink_server::metrics::install_recorder;
use waylink_server::server::GatewayServer;

#[derive(Parser, Debug)]
#[command(name = "waylink-gateway", about = "Real-time incident and navigation event gateway")]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind, overriding config.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding config.
    #[arg(short, long)]
    port: Option<u16>,

    /// Corridor distance in meters, overriding config.
    #[arg(long)]
    corridor: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = GatewayConfig::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(corridor) = cli.corridor {
        config.corridor_distance_m = corridor;
    }
    anyhow::ensure!(
        !config.token_secret.is_empty(),
        "token_secret must be set (config file or WAYLINK_TOKEN_SECRET)"
    );

    let prometheus = install_recorder();
    let bind = format!("{}:{}", config.server.host, config.server.port);
    let server = GatewayServer::new(
        config,
        Arc::new(InMemoryIncidentStore::new()),
        Arc::new(DirectRouteService),
    )
    .with_metrics(prometheus);

    let listener = TcpListener::bind(&bind).await?;

    let state = server.state();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            state.shutdown.shutdown();
        }
    });

    server.serve(listener).await?;
    info!("gateway stopped");
    Ok(())
}
