//! Error types for the lanwatch-discover crate.

use lanwatch_core::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Probing capability unavailable ({path}): {reason}")]
    ProbeUnavailable { path: String, reason: String },

    #[error("Nmap exited with code {code}: {stderr}")]
    NmapFailed { code: i32, stderr: String },

    #[error("Nmap did not finish within {secs}s")]
    NmapTimeout { secs: u64 },

    #[error("Failed to parse nmap XML output: {0}")]
    XmlParse(String),

    #[error("Scan task failed: {0}")]
    ScanFailure(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
