//! Hardware-address to vendor label resolution.
//!
//! Raw vendor strings come from an HTTP lookup service keyed by MAC address
//! (`GET {endpoint}/{mac}`, plain-text body). Resolution never fails: any
//! problem yields [`UNKNOWN_DEVICE`].

use std::time::Duration;

use dashmap::DashMap;
use lanwatch_core::types::UNKNOWN_DEVICE;

use crate::config::{VendorConfig, VendorRule};

/// Resolves MAC addresses to friendly vendor labels.
///
/// Successful lookups are cached per OUI prefix for the life of the process.
#[derive(Debug)]
pub struct VendorResolver {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    rules: Vec<VendorRule>,
    cache: DashMap<String, String>,
}

impl VendorResolver {
    pub fn new(config: &VendorConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client for vendor lookups");
                reqwest::Client::default()
            });

        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout,
            rules: config.rules.clone(),
            cache: DashMap::new(),
        }
    }

    /// Resolve `mac` to a vendor label, or [`UNKNOWN_DEVICE`].
    pub async fn resolve(&self, mac: &str) -> String {
        let Some(mac) = normalize_mac(mac) else {
            return UNKNOWN_DEVICE.to_string();
        };
        let oui = mac[..8].to_string();

        if let Some(raw) = self.cache.get(&oui) {
            return self.label(raw.value());
        }

        match tokio::time::timeout(self.timeout, self.lookup(&mac)).await {
            Ok(Ok(Some(raw))) => {
                let label = self.label(&raw);
                self.cache.insert(oui, raw);
                label
            }
            Ok(Ok(None)) => {
                tracing::debug!(mac = %mac, "Vendor lookup returned an empty body");
                UNKNOWN_DEVICE.to_string()
            }
            Ok(Err(e)) => {
                tracing::debug!(mac = %mac, error = %e, "Vendor lookup failed");
                UNKNOWN_DEVICE.to_string()
            }
            Err(_) => {
                tracing::debug!(mac = %mac, timeout_ms = self.timeout.as_millis(), "Vendor lookup timed out");
                UNKNOWN_DEVICE.to_string()
            }
        }
    }

    /// Apply the brand rules to a raw vendor string.
    pub fn label(&self, raw: &str) -> String {
        let haystack = raw.to_lowercase();
        self.rules
            .iter()
            .find(|rule| haystack.contains(&rule.keyword.to_lowercase()))
            .map(|rule| rule.label.replace("{vendor}", raw))
            .unwrap_or_else(|| raw.to_string())
    }

    async fn lookup(&self, mac: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}/{}", self.endpoint, mac);
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let raw = body.trim();
        Ok((!raw.is_empty()).then(|| raw.to_string()))
    }
}

/// Canonical `AA:BB:CC:DD:EE:FF` form, accepting `:`/`-` separated or bare hex.
pub fn normalize_mac(mac: &str) -> Option<String> {
    let hex: String = mac
        .trim()
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect();

    let separated = mac.trim().len() == 17;
    let bare = mac.trim().len() == 12;
    if !(separated || bare) || hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let hex = hex.to_ascii_uppercase();
    let octets: Vec<&str> = (0..6).map(|i| &hex[i * 2..i * 2 + 2]).collect();
    Some(octets.join(":"))
}
