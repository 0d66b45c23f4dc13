//! Deterministic stand-in used when nmap is not available.
//!
//! Whatever the target, discovery reports the same three devices after a
//! fixed delay. Driven through the coordinator this reproduces the
//! 20/40/60/80/100 progress milestones of a real three-host scan.

use std::time::Duration;

use async_trait::async_trait;
use lanwatch_core::{PortFinding, ScanMode};

use super::{HostSighting, ProbeProvider};
use crate::error::Result;

struct SampleDevice {
    ip: &'static str,
    /// Reported during discovery.
    mac: Option<&'static str>,
    /// Only found by the ARP retry.
    arp_mac: Option<&'static str>,
    hostname: Option<&'static str>,
    ports: &'static [(u16, &'static str)],
}

static SAMPLE_DEVICES: [SampleDevice; 3] = [
    SampleDevice {
        ip: "192.168.1.1",
        mac: Some("50:C7:BF:11:22:33"),
        arp_mac: None,
        hostname: Some("router.local"),
        ports: &[(23, "telnet"), (53, "domain"), (80, "http"), (443, "https")],
    },
    SampleDevice {
        ip: "192.168.1.10",
        mac: Some("64:90:C1:AA:BB:CC"),
        arp_mac: None,
        hostname: None,
        ports: &[(22, "ssh"), (80, "http"), (443, "https"), (554, "rtsp")],
    },
    SampleDevice {
        ip: "192.168.1.15",
        mac: None,
        arp_mac: Some("8C:79:F5:12:34:56"),
        hostname: None,
        ports: &[(8008, "http"), (9080, "glrpc")],
    },
];

#[derive(Debug, Clone)]
pub struct SimulatedProber {
    step_delay: Duration,
}

impl SimulatedProber {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }

    fn device(ip: &str) -> Option<&'static SampleDevice> {
        SAMPLE_DEVICES.iter().find(|d| d.ip == ip)
    }

    async fn pause(&self, divisor: u32) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay / divisor).await;
        }
    }
}

#[async_trait]
impl ProbeProvider for SimulatedProber {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn discover_hosts(&self, target: &str) -> Result<Vec<HostSighting>> {
        self.pause(1).await;
        tracing::debug!(target = %target, "Simulated discovery");

        Ok(SAMPLE_DEVICES
            .iter()
            .map(|d| HostSighting {
                ip: d.ip.to_string(),
                mac: d.mac.map(String::from),
                hostname: d.hostname.map(String::from),
            })
            .collect())
    }

    async fn enumerate_ports(&self, ip: &str, mode: ScanMode) -> Result<Vec<PortFinding>> {
        if !mode.wants_ports() {
            return Ok(Vec::new());
        }
        self.pause(1).await;

        let detailed = matches!(mode, ScanMode::Service | ScanMode::Vuln);
        Ok(Self::device(ip)
            .map(|d| {
                d.ports
                    .iter()
                    .map(|&(port, service)| PortFinding {
                        port,
                        protocol: "tcp".to_string(),
                        state: "open".to_string(),
                        service: service.to_string(),
                        version: detailed.then(|| "simulated".to_string()),
                        product: None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn resolve_hardware_address(&self, ip: &str) -> Result<Option<String>> {
        self.pause(4).await;
        Ok(Self::device(ip).and_then(|d| d.arp_mac).map(String::from))
    }

    async fn reverse_lookup(&self, _ip: &str) -> Result<Option<String>> {
        self.pause(4).await;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discovery_is_fixed() {
        let prober = SimulatedProber::new(Duration::ZERO);
        let a = prober.discover_hosts("10.0.0.0/24").await.unwrap();
        let b = prober.discover_hosts("172.16.0.0/16").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a[0].ip, "192.168.1.1");
    }

    #[tokio::test]
    async fn test_ping_mode_has_no_ports() {
        let prober = SimulatedProber::new(Duration::ZERO);
        let ports = prober
            .enumerate_ports("192.168.1.1", ScanMode::Ping)
            .await
            .unwrap();
        assert!(ports.is_empty());
    }

    #[tokio::test]
    async fn test_arp_retry_finds_hidden_mac() {
        let prober = SimulatedProber::new(Duration::ZERO);
        assert_eq!(
            prober.resolve_hardware_address("192.168.1.15").await.unwrap(),
            Some("8C:79:F5:12:34:56".to_string())
        );
        assert_eq!(
            prober.resolve_hardware_address("192.168.1.10").await.unwrap(),
            None
        );
    }
}
