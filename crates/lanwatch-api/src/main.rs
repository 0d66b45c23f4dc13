//! lanwatch HTTP server.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use lanwatch_api::{router, AppState, ServerConfig};
use lanwatch_discover::config::DiscoverConfig;
use lanwatch_discover::ScanCoordinator;

#[derive(Parser)]
#[command(name = "lanwatch-api")]
#[command(about = "Serve the lanwatch scan API over HTTP")]
struct Cli {
    /// Config file prefix (default: lanwatch).
    #[arg(short, long, default_value = "lanwatch")]
    config: String,

    /// Override the listen address from the config.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    fmt().json().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut server = ServerConfig::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        server.bind = bind;
    }
    let discover = DiscoverConfig::load(&cli.config)?;

    let coordinator = ScanCoordinator::from_config(&discover).await;
    let state = AppState {
        coordinator,
        default_network_range: discover.default_network_range.clone(),
    };
    let app = router(state, &server);

    let listener = tokio::net::TcpListener::bind(&server.bind).await?;
    tracing::info!(
        bind = %server.bind,
        max_concurrent_scans = discover.max_concurrent_scans,
        "lanwatch API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
