//! lanwatch-discover: Scan orchestration for the lanwatch discovery service.
//!
//! Turns scan requests into background probe tasks, enriches every live host
//! with a vendor label, hostname and risk tier, and publishes incremental
//! progress into an in-memory registry that clients poll.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod netinfo;
pub mod nmap_xml;
pub mod prober;
pub mod registry;
pub mod risk;
pub mod vendor;

pub use coordinator::ScanCoordinator;
pub use error::DiscoverError;
pub use registry::ScanRegistry;
