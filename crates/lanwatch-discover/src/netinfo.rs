//! Local interface enumeration for `network/info`.
//!
//! Enumeration problems never propagate: the caller always gets a range to
//! suggest, falling back to the configured default.

use std::io;
use std::net::Ipv4Addr;

use if_addrs::{get_if_addrs, IfAddr};
use ipnet::Ipv4Net;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub broadcast: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub interfaces: Vec<InterfaceInfo>,
    pub network_range: String,
}

/// Non-loopback IPv4 interfaces of this machine.
pub fn list_interfaces() -> io::Result<Vec<InterfaceInfo>> {
    let mut out = Vec::new();
    for iface in get_if_addrs()? {
        if iface.is_loopback() {
            continue;
        }
        if let IfAddr::V4(v4) = &iface.addr {
            out.push(InterfaceInfo {
                name: iface.name.clone(),
                ip: v4.ip,
                netmask: v4.netmask,
                broadcast: v4.broadcast,
            });
        }
    }
    Ok(out)
}

/// Network of the first interface, e.g. `192.168.1.42/255.255.255.0` → `192.168.1.0/24`.
pub fn infer_range(interfaces: &[InterfaceInfo]) -> Option<String> {
    interfaces
        .iter()
        .find_map(|i| Ipv4Net::with_netmask(i.ip, i.netmask).ok())
        .map(|net| net.trunc().to_string())
}

pub fn network_info(default_range: &str) -> NetworkInfo {
    from_enumeration(list_interfaces(), default_range)
}

fn from_enumeration(result: io::Result<Vec<InterfaceInfo>>, default_range: &str) -> NetworkInfo {
    let interfaces = match result {
        Ok(interfaces) => interfaces,
        Err(e) => {
            tracing::warn!(error = %e, "Interface enumeration failed, using default range");
            Vec::new()
        }
    };

    let network_range = infer_range(&interfaces).unwrap_or_else(|| default_range.to_string());
    NetworkInfo {
        interfaces,
        network_range,
    }
}
