//! Probing backends.
//!
//! The coordinator only talks to [`ProbeProvider`]. Which implementation sits
//! behind it is decided once at startup by [`select_provider`]: nmap when it
//! can be executed, otherwise the deterministic simulator.

mod nmap;
mod simulated;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lanwatch_core::{PortFinding, ScanMode};

use crate::config::{DiscoverConfig, ProberKind};
use crate::error::Result;

pub use nmap::NmapProber;
pub use simulated::SimulatedProber;

/// A live host as reported by the discovery phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSighting {
    pub ip: String,
    /// Hardware address, when the discovery technique exposes one.
    pub mac: Option<String>,
    /// Name reported by the prober itself.
    pub hostname: Option<String>,
}

impl HostSighting {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            mac: None,
            hostname: None,
        }
    }
}

/// Input/output contract of a probing backend.
#[async_trait]
pub trait ProbeProvider: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Live hosts within `target`, in discovery order.
    async fn discover_hosts(&self, target: &str) -> Result<Vec<HostSighting>>;

    /// Ports of a single live host, at the depth `mode` asks for.
    async fn enumerate_ports(&self, ip: &str, mode: ScanMode) -> Result<Vec<PortFinding>>;

    /// Alternate hardware-address technique, used when discovery reported none.
    async fn resolve_hardware_address(&self, ip: &str) -> Result<Option<String>>;

    /// Reverse name lookup for `ip`.
    async fn reverse_lookup(&self, ip: &str) -> Result<Option<String>>;
}

/// Pick the process-wide probing backend.
///
/// Never fails: if nmap cannot be initialised the simulator is used instead.
pub async fn select_provider(config: &DiscoverConfig) -> Arc<dyn ProbeProvider> {
    let simulated = || {
        Arc::new(SimulatedProber::new(Duration::from_millis(
            config.simulated_step_delay_ms,
        ))) as Arc<dyn ProbeProvider>
    };

    if config.prober == ProberKind::Simulated {
        tracing::info!("Simulated prober selected by configuration");
        return simulated();
    }

    match NmapProber::initialize(config).await {
        Ok(prober) => Arc::new(prober),
        Err(e) if config.prober == ProberKind::Nmap => {
            tracing::error!(error = %e, "Nmap required but unavailable, using simulated prober");
            simulated()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Nmap unavailable, using simulated prober");
            simulated()
        }
    }
}
