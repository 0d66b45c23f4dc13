use thiserror::Error;

/// Errors surfaced synchronously to callers of the scan API.
///
/// Failures inside a running scan never appear here; they are recorded on
/// the polled [`ScanResult`](crate::types::ScanResult) instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Invalid scan request: {0}")]
    InvalidRequest(String),

    #[error("Scan not found: {scan_id}")]
    NotFound { scan_id: String },
}

impl ScanError {
    pub fn not_found(scan_id: impl ToString) -> Self {
        Self::NotFound {
            scan_id: scan_id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
