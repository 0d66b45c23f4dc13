//! Nmap XML report model.
//!
//! Every nmap invocation runs with `-oX -`; the report on stdout is
//! deserialized here with `quick-xml` + serde and flattened into the
//! prober's own types.

use lanwatch_core::PortFinding;
use serde::Deserialize;

use crate::error::{DiscoverError, Result};
use crate::prober::HostSighting;

/// Root element: `<nmaprun>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "nmaprun")]
pub struct NmapRun {
    #[serde(rename = "@args")]
    pub args: Option<String>,
    #[serde(rename = "host", default)]
    pub hosts: Vec<NmapHost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapHost {
    pub status: Option<HostStatus>,
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub hostnames: Option<Hostnames>,
    pub ports: Option<Ports>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostStatus {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: String,
    #[serde(rename = "@addrtype")]
    pub addr_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostnames {
    #[serde(rename = "hostname", default)]
    pub hostnames: Vec<Hostname>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hostname {
    #[serde(rename = "@name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<NmapPort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapPort {
    #[serde(rename = "@protocol")]
    pub protocol: String,
    #[serde(rename = "@portid")]
    pub port_id: u16,
    pub state: PortState,
    pub service: Option<NmapService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortState {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapService {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@product")]
    pub product: Option<String>,
    #[serde(rename = "@version")]
    pub version: Option<String>,
}

impl NmapHost {
    /// First IPv4 (or failing that, IPv6) address.
    pub fn ip(&self) -> Option<&str> {
        self.address_of("ipv4").or_else(|| self.address_of("ipv6"))
    }

    pub fn mac(&self) -> Option<&str> {
        self.address_of("mac")
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostnames
            .as_ref()
            .and_then(|hn| hn.hostnames.first())
            .map(|h| h.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn is_up(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.state == "up")
    }

    /// Flatten a live host into a sighting; `None` for down or address-less hosts.
    pub fn sighting(&self) -> Option<HostSighting> {
        if !self.is_up() {
            return None;
        }
        Some(HostSighting {
            ip: self.ip()?.to_string(),
            mac: self.mac().map(String::from),
            hostname: self.hostname().map(String::from),
        })
    }

    pub fn port_findings(&self) -> Vec<PortFinding> {
        self.ports
            .as_ref()
            .map(|p| p.ports.iter().map(NmapPort::finding).collect())
            .unwrap_or_default()
    }

    fn address_of(&self, addr_type: &str) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.addr_type == addr_type)
            .map(|a| a.addr.as_str())
    }
}

impl NmapPort {
    pub fn finding(&self) -> PortFinding {
        let service = self.service.as_ref();
        PortFinding {
            port: self.port_id,
            protocol: self.protocol.clone(),
            state: self.state.state.clone(),
            service: service
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            version: service.and_then(|s| s.version.clone()),
            product: service.and_then(|s| s.product.clone()),
        }
    }
}

impl NmapRun {
    /// Live hosts in report order.
    pub fn sightings(&self) -> Vec<HostSighting> {
        self.hosts.iter().filter_map(NmapHost::sighting).collect()
    }

    /// The report entry for `ip`, if nmap returned one.
    pub fn host(&self, ip: &str) -> Option<&NmapHost> {
        self.hosts.iter().find(|h| h.ip() == Some(ip))
    }
}

/// Parse nmap XML bytes into a structured `NmapRun`.
pub fn parse_nmap_xml(xml: &[u8]) -> Result<NmapRun> {
    quick_xml::de::from_reader(xml).map_err(|e| DiscoverError::XmlParse(format!("{e}")))
}
