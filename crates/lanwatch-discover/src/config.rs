//! Configuration for the lanwatch scan orchestrator.

use serde::Deserialize;

use crate::error::{DiscoverError, Result};

/// Top-level discover configuration.
///
/// Loaded from `lanwatch.toml` `[discover]` section or
/// `LANWATCH_DISCOVER__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverConfig {
    /// Path to the nmap binary (default: "nmap").
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    /// Which probing backend to use.
    #[serde(default)]
    pub prober: ProberKind,

    /// Maximum scans probing at the same time; further scans wait as pending.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_scans: usize,

    /// Per-host budget handed to nmap via `--host-timeout`.
    #[serde(default = "default_host_timeout")]
    pub nmap_host_timeout_secs: u64,

    /// Hard limit on a single nmap invocation.
    #[serde(default = "default_process_timeout")]
    pub nmap_process_timeout_secs: u64,

    /// Delay between simulated probe steps.
    #[serde(default = "default_simulated_delay")]
    pub simulated_step_delay_ms: u64,

    /// Range reported by `network/info` when interfaces cannot be enumerated.
    #[serde(default = "default_network_range")]
    pub default_network_range: String,

    #[serde(default)]
    pub vendor: VendorConfig,

    #[serde(default)]
    pub risk: RiskConfig,
}

/// Probing backend selection.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProberKind {
    /// nmap when it is installed, otherwise the simulator.
    #[default]
    Auto,
    /// nmap only; startup falls back to the simulator if it is missing.
    Nmap,
    /// Always simulate.
    Simulated,
}

impl std::str::FromStr for ProberKind {
    type Err = DiscoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "nmap" => Ok(Self::Nmap),
            "simulated" => Ok(Self::Simulated),
            _ => Err(DiscoverError::Config(format!(
                "Invalid prober: {s}. Choose: auto, nmap, simulated"
            ))),
        }
    }
}

/// Hardware-vendor lookup settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    /// Base URL; the hardware address is appended as the last path segment.
    #[serde(default = "default_vendor_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_vendor_timeout")]
    pub timeout_ms: u64,

    /// Ordered brand rules; the first keyword found in the raw vendor wins.
    #[serde(default = "default_vendor_rules")]
    pub rules: Vec<VendorRule>,
}

/// Maps a brand keyword to a friendly label.
///
/// `{vendor}` in the label is replaced by the raw vendor string.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VendorRule {
    pub keyword: String,
    pub label: String,
}

impl VendorRule {
    pub fn new(keyword: &str, label: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            label: label.to_string(),
        }
    }
}

/// Port tables used by the risk classifier.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Any one of these open makes a device high risk.
    #[serde(default = "default_high_risk_ports")]
    pub high_risk_ports: Vec<u16>,

    #[serde(default = "default_medium_risk_ports")]
    pub medium_risk_ports: Vec<u16>,

    /// A device is medium risk when more than this many medium ports are open.
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: usize,
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_max_concurrent() -> usize {
    4
}

fn default_host_timeout() -> u64 {
    30
}

fn default_process_timeout() -> u64 {
    600
}

fn default_simulated_delay() -> u64 {
    500
}

fn default_network_range() -> String {
    "192.168.1.0/24".to_string()
}

fn default_vendor_endpoint() -> String {
    "https://api.macvendors.com".to_string()
}

fn default_vendor_timeout() -> u64 {
    3000
}

fn default_vendor_rules() -> Vec<VendorRule> {
    vec![
        VendorRule::new("apple", "Apple Device ({vendor})"),
        VendorRule::new("samsung", "Samsung Device ({vendor})"),
        VendorRule::new("xiaomi", "Xiaomi Device ({vendor})"),
        VendorRule::new("huawei", "Huawei Device ({vendor})"),
        VendorRule::new("tp-link", "TP-Link Router ({vendor})"),
        VendorRule::new("netgear", "Netgear Router ({vendor})"),
        VendorRule::new("cisco", "Cisco Network Device ({vendor})"),
        VendorRule::new("raspberry", "Raspberry Pi ({vendor})"),
        VendorRule::new("intel", "Intel Computer ({vendor})"),
        VendorRule::new("google", "Google Device ({vendor})"),
        VendorRule::new("amazon", "Amazon Device ({vendor})"),
    ]
}

fn default_high_risk_ports() -> Vec<u16> {
    vec![21, 23, 135, 139, 445, 1433, 3389, 5900, 8080]
}

fn default_medium_risk_ports() -> Vec<u16> {
    vec![22, 80, 443, 993, 995]
}

fn default_medium_threshold() -> usize {
    2
}

impl Default for DiscoverConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            prober: ProberKind::default(),
            max_concurrent_scans: default_max_concurrent(),
            nmap_host_timeout_secs: default_host_timeout(),
            nmap_process_timeout_secs: default_process_timeout(),
            simulated_step_delay_ms: default_simulated_delay(),
            default_network_range: default_network_range(),
            vendor: VendorConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_vendor_endpoint(),
            timeout_ms: default_vendor_timeout(),
            rules: default_vendor_rules(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_risk_ports: default_high_risk_ports(),
            medium_risk_ports: default_medium_risk_ports(),
            medium_threshold: default_medium_threshold(),
        }
    }
}

impl DiscoverConfig {
    /// Load the `[discover]` section from `<file_prefix>.toml` and the
    /// environment, falling back to defaults when the section is absent.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                // LANWATCH_DISCOVER__NMAP_PATH -> discover.nmap_path
                config::Environment::with_prefix("LANWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DiscoverError::Config(e.to_string()))?;

        Self::from_sources(&cfg)
    }

    /// Extract the `[discover]` section. Only a missing section yields the
    /// defaults; a section that fails to deserialize is an error.
    pub fn from_sources(cfg: &config::Config) -> Result<Self> {
        match cfg.get::<DiscoverConfig>("discover") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(DiscoverConfig::default()),
            Err(e) => Err(DiscoverError::Config(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoverConfig::default();
        assert_eq!(config.nmap_path, "nmap");
        assert_eq!(config.prober, ProberKind::Auto);
        assert_eq!(config.max_concurrent_scans, 4);
        assert_eq!(config.default_network_range, "192.168.1.0/24");
        assert_eq!(config.vendor.timeout_ms, 3000);
        assert_eq!(config.risk.medium_threshold, 2);
        assert!(config.risk.high_risk_ports.contains(&445));
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let toml = r#"
            [discover]
            prober = "simulated"
            max_concurrent_scans = 1

            [discover.risk]
            medium_threshold = 3
        "#;
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        let parsed: DiscoverConfig = cfg.get("discover").unwrap();

        assert_eq!(parsed.prober, ProberKind::Simulated);
        assert_eq!(parsed.max_concurrent_scans, 1);
        assert_eq!(parsed.risk.medium_threshold, 3);
        assert_eq!(parsed.risk.medium_risk_ports, vec![22, 80, 443, 993, 995]);
        assert_eq!(parsed.vendor.rules.len(), default_vendor_rules().len());
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let toml = r#"
            [server]
            bind = "127.0.0.1:9000"
        "#;
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        let parsed = DiscoverConfig::from_sources(&cfg).unwrap();
        assert_eq!(parsed.prober, ProberKind::Auto);
        assert_eq!(parsed.max_concurrent_scans, 4);
    }

    #[test]
    fn test_bad_field_is_an_error() {
        let toml = r#"
            [discover]
            prober = "simulated"
            max_concurrent_scans = "four"

            [discover.risk]
            high_risk_ports = [6379]
        "#;
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        let err = DiscoverConfig::from_sources(&cfg).unwrap_err();
        assert!(matches!(err, DiscoverError::Config(_)));
    }

    #[test]
    fn test_unknown_prober_is_an_error() {
        let toml = r#"
            [discover]
            prober = "masscan"
        "#;
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        assert!(DiscoverConfig::from_sources(&cfg).is_err());
    }

    #[test]
    fn test_prober_kind_parse() {
        assert_eq!("NMAP".parse::<ProberKind>().unwrap(), ProberKind::Nmap);
        assert!("masscan".parse::<ProberKind>().is_err());
    }
}
