//! Nmap process wrapper.
//!
//! Each probe runs nmap as a child process via `tokio::process::Command`
//! with `-oX -` and parses the XML report from stdout.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lanwatch_core::{PortFinding, ScanMode};
use tokio::process::Command;

use super::{HostSighting, ProbeProvider};
use crate::config::DiscoverConfig;
use crate::error::{DiscoverError, Result};
use crate::nmap_xml::{self, NmapRun};

/// Probing backend driving the nmap binary.
#[derive(Debug, Clone)]
pub struct NmapProber {
    nmap_path: String,
    host_timeout_secs: u64,
    process_timeout: Duration,
}

impl NmapProber {
    pub fn new(config: &DiscoverConfig) -> Self {
        Self {
            nmap_path: config.nmap_path.clone(),
            host_timeout_secs: config.nmap_host_timeout_secs,
            process_timeout: Duration::from_secs(config.nmap_process_timeout_secs),
        }
    }

    /// Build a prober and confirm nmap can actually be executed.
    pub async fn initialize(config: &DiscoverConfig) -> Result<Self> {
        let prober = Self::new(config);
        let version = prober.verify_installation().await?;
        tracing::info!(
            nmap_path = %prober.nmap_path,
            nmap_version = %version.lines().next().unwrap_or_default().trim(),
            "Nmap verified"
        );
        Ok(prober)
    }

    /// Verify nmap is installed and accessible.
    pub async fn verify_installation(&self) -> Result<String> {
        let output = Command::new(&self.nmap_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(self.unavailable(format!(
                "--version exited with {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        String::from_utf8(output.stdout).map_err(|e| self.unavailable(e.to_string()))
    }

    /// Nmap flags for the port phase of each scan mode.
    ///
    /// No NSE scripts are run: script output is not parsed, so `vuln` only
    /// deepens version detection.
    pub fn port_flags(mode: ScanMode) -> Vec<&'static str> {
        match mode {
            ScanMode::Ping => vec![],
            ScanMode::Port => vec!["-Pn", "-sT", "--top-ports", "1000"],
            ScanMode::Service => vec!["-Pn", "-sT", "-sV", "--top-ports", "1000"],
            ScanMode::Vuln => vec!["-Pn", "-sT", "-sV", "--version-all", "--top-ports", "1000"],
        }
    }

    /// Run nmap with `flags` against `target` and parse its report.
    async fn run(&self, flags: &[&str], target: &str) -> Result<NmapRun> {
        let start = Instant::now();
        let host_timeout = format!("{}s", self.host_timeout_secs);

        let child = Command::new(&self.nmap_path)
            .args(flags)
            .arg("--host-timeout")
            .arg(&host_timeout)
            .arg("-oX")
            .arg("-")
            .arg("--noninteractive")
            .arg(target)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.process_timeout, child)
            .await
            .map_err(|_| DiscoverError::NmapTimeout {
                secs: self.process_timeout.as_secs(),
            })?
            .map_err(|e| self.unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(DiscoverError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let run = nmap_xml::parse_nmap_xml(&output.stdout)?;

        tracing::debug!(
            target = %target,
            flags = ?flags,
            hosts = run.hosts.len(),
            duration_ms = start.elapsed().as_millis(),
            "Nmap run complete"
        );

        Ok(run)
    }

    fn unavailable(&self, reason: String) -> DiscoverError {
        DiscoverError::ProbeUnavailable {
            path: self.nmap_path.clone(),
            reason,
        }
    }
}

#[async_trait]
impl ProbeProvider for NmapProber {
    fn name(&self) -> &'static str {
        "nmap"
    }

    async fn discover_hosts(&self, target: &str) -> Result<Vec<HostSighting>> {
        let run = self.run(&["-sn"], target).await?;
        Ok(run.sightings())
    }

    async fn enumerate_ports(&self, ip: &str, mode: ScanMode) -> Result<Vec<PortFinding>> {
        if !mode.wants_ports() {
            return Ok(Vec::new());
        }
        let run = self.run(&Self::port_flags(mode), ip).await?;
        Ok(run.host(ip).map(|h| h.port_findings()).unwrap_or_default())
    }

    async fn resolve_hardware_address(&self, ip: &str) -> Result<Option<String>> {
        // ARP ping; only yields a MAC on the local segment.
        let run = self.run(&["-sn", "-PR"], ip).await?;
        Ok(run.host(ip).and_then(|h| h.mac()).map(String::from))
    }

    async fn reverse_lookup(&self, ip: &str) -> Result<Option<String>> {
        // List scan: no packets to the target, forced reverse DNS.
        let run = self.run(&["-sL", "-R"], ip).await?;
        Ok(run.host(ip).and_then(|h| h.hostname()).map(String::from))
    }
}
