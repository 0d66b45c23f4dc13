//! CLI entry point: run one scan through the coordinator and print the result.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use lanwatch_core::{ScanMode, ScanRequest};
use lanwatch_discover::config::{DiscoverConfig, ProberKind};
use lanwatch_discover::ScanCoordinator;

#[derive(Parser)]
#[command(name = "lanwatch-discover")]
#[command(about = "Run a single lanwatch scan and print the result as JSON")]
struct Cli {
    /// Target to scan (address or CIDR, e.g., 192.168.1.0/24).
    #[arg(short, long)]
    target: String,

    /// Scan mode: ping, port, service, vuln.
    #[arg(short, long, default_value = "ping")]
    mode: String,

    /// Override the probing backend: auto, nmap, simulated.
    #[arg(long)]
    prober: Option<String>,

    /// Status poll interval in milliseconds.
    #[arg(long, default_value_t = 250)]
    poll_ms: u64,

    /// Config file prefix (default: lanwatch).
    #[arg(short, long, default_value = "lanwatch")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = DiscoverConfig::load(&cli.config)?;
    if let Some(prober) = cli.prober.as_deref() {
        config.prober = prober.parse::<ProberKind>()?;
    }

    let mode: ScanMode = cli.mode.parse()?;
    let coordinator = ScanCoordinator::from_config(&config).await;
    let started = coordinator.submit(&ScanRequest::new(cli.target, mode))?;
    let scan_id = started.scan_id;

    let mut last_progress = 0;
    let result = loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(cli.poll_ms)) => {}
            _ = tokio::signal::ctrl_c() => {
                coordinator.cancel(&scan_id)?;
            }
        }
        let snapshot = coordinator.status(&scan_id)?;
        if snapshot.progress != last_progress {
            tracing::info!(
                scan_id = %scan_id,
                progress = snapshot.progress,
                devices = snapshot.devices.len(),
                "Scan progress"
            );
            last_progress = snapshot.progress;
        }
        if snapshot.status.is_terminal() {
            break snapshot;
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(error) = &result.error {
        anyhow::bail!("Scan {scan_id} ended with {}: {error}", result.status);
    }
    Ok(())
}
