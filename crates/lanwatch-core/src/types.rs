//! Core domain types for lanwatch scans.
//!
//! A scan moves through `pending → running → {completed, error, cancelled}`.
//! Its [`ScanResult`] is the only thing clients ever see: they poll it for
//! progress and the devices discovered so far.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScanError};

/// Hardware address placeholder when none could be resolved.
pub const UNKNOWN_MAC: &str = "unknown";

/// Vendor label used whenever vendor resolution fails.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

// ── Identifiers ───────────────────────────────────────────────────

/// Opaque identifier handed out when a scan is submitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ScanId {
    type Err = ScanError;

    /// A malformed identifier can never have been issued, so it is reported
    /// as not found rather than as a bad request.
    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ScanError::not_found(s))
    }
}

// ── Requests ──────────────────────────────────────────────────────

/// How deep a scan probes each live host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Host discovery only.
    Ping,
    /// Discovery plus open-port enumeration.
    Port,
    /// Port enumeration with service/version detection.
    Service,
    /// Service detection plus vulnerability scripts.
    Vuln,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Port => "port",
            Self::Service => "service",
            Self::Vuln => "vuln",
        }
    }

    /// Whether hosts found by this mode get a port-enumeration pass.
    pub fn wants_ports(&self) -> bool {
        !matches!(self, Self::Ping)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ping" => Ok(Self::Ping),
            "port" => Ok(Self::Port),
            "service" => Ok(Self::Service),
            "vuln" => Ok(Self::Vuln),
            other => Err(ScanError::InvalidRequest(format!(
                "unsupported scan mode '{other}' (expected ping, port, service or vuln)"
            ))),
        }
    }
}

/// A scan request as received from a client, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Address or CIDR range, e.g. `192.168.1.0/24`.
    #[serde(default)]
    pub target: String,
    /// One of `ping`, `port`, `service`, `vuln`.
    #[serde(default, alias = "scan_type")]
    pub scan_type: String,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>, mode: ScanMode) -> Self {
        Self {
            target: target.into(),
            scan_type: mode.as_str().to_string(),
        }
    }

    /// Validate the request into an immutable [`ScanJob`].
    pub fn validate(&self) -> Result<ScanJob> {
        let mode: ScanMode = self.scan_type.parse()?;
        let target = self.target.trim();

        if target.is_empty() {
            return Err(ScanError::InvalidRequest("target must not be empty".into()));
        }
        if target.parse::<IpAddr>().is_err() && target.parse::<IpNet>().is_err() {
            return Err(ScanError::InvalidRequest(format!(
                "target '{target}' is neither an IP address nor a CIDR range"
            )));
        }

        Ok(ScanJob {
            target: target.to_string(),
            mode,
        })
    }
}

/// A validated scan request. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    pub target: String,
    pub mode: ScanMode,
}

// ── Scan state ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Accepted, waiting for an admission slot.
    Pending,
    Running,
    Completed,
    Error,
    Cancelled,
}

impl ScanStatus {
    /// Terminal states accept no further writes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// One port reported by the prober for a host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PortFinding {
    pub port: u16,
    pub protocol: String,
    /// As reported by the prober: `open`, `closed`, `filtered`, `open|filtered`, ...
    pub state: String,
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl PortFinding {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }
}

/// A discovered host, enriched with vendor, hostname and risk tier.
///
/// Built once per host and then frozen into the owning [`ScanResult`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub ip: String,
    pub mac: String,
    pub hostname: String,
    pub vendor: String,
    pub status: String,
    pub ports: Vec<PortFinding>,
    pub vulnerabilities: Vec<String>,
    pub risk: RiskTier,
    /// Present only when the host could not be fully inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceRecord {
    /// Best-effort record for a host whose inspection failed.
    pub fn degraded(ip: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            mac: UNKNOWN_MAC.to_string(),
            hostname: "unknown".to_string(),
            vendor: UNKNOWN_DEVICE.to_string(),
            status: "up".to_string(),
            ports: Vec::new(),
            vulnerabilities: Vec::new(),
            risk: RiskTier::Low,
            error: Some(reason.into()),
        }
    }

    pub fn open_ports(&self) -> Vec<u16> {
        self.ports
            .iter()
            .filter(|p| p.is_open())
            .map(|p| p.port)
            .collect()
    }
}

/// Point-in-time view of a scan, as returned to pollers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub scan_id: ScanId,
    pub target: String,
    pub scan_type: ScanMode,
    pub status: ScanStatus,
    /// Percent complete, 0–100.
    pub progress: u8,
    pub devices: Vec<DeviceRecord>,
    pub total_devices: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    pub fn new(scan_id: ScanId, job: &ScanJob, status: ScanStatus) -> Self {
        Self {
            scan_id,
            target: job.target.clone(),
            scan_type: job.mode,
            status,
            progress: 0,
            devices: Vec::new(),
            total_devices: 0,
            timestamp: Utc::now(),
            error: None,
        }
    }
}

/// Bookkeeping for a scan that is still active.
#[derive(Debug, Clone)]
pub struct ScanControlBlock {
    pub scan_id: ScanId,
    pub target: String,
    pub mode: ScanMode,
    pub started_at: DateTime<Utc>,
}

impl ScanControlBlock {
    pub fn new(scan_id: ScanId, job: &ScanJob) -> Self {
        Self {
            scan_id,
            target: job.target.clone(),
            mode: job.mode,
            started_at: Utc::now(),
        }
    }
}

// ── Read-side views ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListing {
    pub scan_id: ScanId,
    pub status: ScanStatus,
    pub devices: Vec<DeviceRecord>,
    pub total_devices: usize,
    pub discovered_devices: usize,
}

impl From<ScanResult> for DeviceListing {
    fn from(result: ScanResult) -> Self {
        Self {
            scan_id: result.scan_id,
            status: result.status,
            discovered_devices: result.devices.len(),
            total_devices: result.total_devices,
            devices: result.devices,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanListing {
    pub active: Vec<ScanId>,
    pub completed: Vec<ScanId>,
    pub total: usize,
}

/// What a `cancel` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyFinished,
}

impl CancelOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Cancelled => "Scan cancelled",
            Self::AlreadyFinished => "Scan already finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_mode_parses_case_insensitively() {
        assert_eq!("PING".parse::<ScanMode>().unwrap(), ScanMode::Ping);
        assert_eq!(" vuln ".parse::<ScanMode>().unwrap(), ScanMode::Vuln);
        assert!(matches!(
            "stealth".parse::<ScanMode>(),
            Err(ScanError::InvalidRequest(_))
        ));
    }

    #[test]
    fn validate_accepts_addresses_and_ranges() {
        let job = ScanRequest::new("10.0.0.0/24", ScanMode::Port)
            .validate()
            .unwrap();
        assert_eq!(job.target, "10.0.0.0/24");
        assert_eq!(job.mode, ScanMode::Port);

        assert!(ScanRequest::new("192.168.1.7", ScanMode::Ping)
            .validate()
            .is_ok());
    }

    #[test]
    fn validate_rejects_bad_targets() {
        for target in ["", "   ", "not-a-network", "10.0.0.0/99"] {
            let err = ScanRequest::new(target, ScanMode::Ping)
                .validate()
                .unwrap_err();
            assert!(matches!(err, ScanError::InvalidRequest(_)), "{target}");
        }
    }

    #[test]
    fn malformed_scan_id_is_not_found() {
        let err = "nope".parse::<ScanId>().unwrap_err();
        assert_eq!(err, ScanError::not_found("nope"));
    }

    #[test]
    fn scan_result_serializes_camel_case() {
        let job = ScanRequest::new("10.0.0.1", ScanMode::Ping)
            .validate()
            .unwrap();
        let result = ScanResult::new(ScanId::new(), &job, ScanStatus::Running);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "running");
        assert_eq!(json["scanType"], "ping");
        assert_eq!(json["totalDevices"], 0);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn degraded_record_keeps_address() {
        let record = DeviceRecord::degraded("10.0.0.9", "nmap timed out");
        assert_eq!(record.ip, "10.0.0.9");
        assert_eq!(record.mac, UNKNOWN_MAC);
        assert_eq!(record.vendor, UNKNOWN_DEVICE);
        assert_eq!(record.risk, RiskTier::Low);
        assert_eq!(record.error.as_deref(), Some("nmap timed out"));
    }

    #[test]
    fn open_ports_ignores_other_states() {
        let mut record = DeviceRecord::degraded("10.0.0.2", "x");
        record.ports = vec![
            PortFinding {
                port: 22,
                protocol: "tcp".into(),
                state: "open".into(),
                service: "ssh".into(),
                version: None,
                product: None,
            },
            PortFinding {
                port: 3306,
                protocol: "tcp".into(),
                state: "filtered".into(),
                service: "mysql".into(),
                version: None,
                product: None,
            },
        ];
        assert_eq!(record.open_ports(), vec![22]);
    }
}
