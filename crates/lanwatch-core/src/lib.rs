//! lanwatch-core: Shared types and error handling for the lanwatch discovery service.
//!
//! This crate provides the polling contract used across all lanwatch components:
//! - Scan requests, modes and identifiers
//! - The scan result snapshot and its per-device records
//! - Read-side views (device listings, scan listings, cancel outcomes)
//! - The synchronous error taxonomy surfaced to callers

pub mod error;
pub mod types;

pub use error::ScanError;
pub use types::{
    CancelOutcome, DeviceListing, DeviceRecord, PortFinding, RiskTier, ScanControlBlock, ScanId,
    ScanJob, ScanListing, ScanMode, ScanRequest, ScanResult, ScanStatus,
};
