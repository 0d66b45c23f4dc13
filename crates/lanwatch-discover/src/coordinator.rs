//! Scan lifecycle orchestration.
//!
//! `submit` registers a scan and spawns one tokio task for it; the caller
//! never awaits that task. The task reports everything through the
//! [`ScanRegistry`]: progress, devices, and the terminal state. A semaphore
//! bounds how many scans probe at once; the rest wait as `pending`.
//!
//! Progress milestones: discovery done = 20, host count known = 40, then
//! `40 + floor(processed / total * 60)` per host, 100 on completion.

use std::sync::Arc;
use std::time::Instant;

use lanwatch_core::error::Result;
use lanwatch_core::types::{UNKNOWN_DEVICE, UNKNOWN_MAC};
use lanwatch_core::{
    CancelOutcome, DeviceListing, DeviceRecord, ScanControlBlock, ScanId, ScanJob, ScanListing,
    ScanMode, ScanRequest, ScanResult, ScanStatus,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::DiscoverConfig;
use crate::error::DiscoverError;
use crate::prober::{self, HostSighting, ProbeProvider};
use crate::registry::ScanRegistry;
use crate::risk::RiskClassifier;
use crate::vendor::VendorResolver;

/// Accepts scan requests and drives each one in the background.
///
/// Clone is cheap (inner Arcs).
#[derive(Clone)]
pub struct ScanCoordinator {
    registry: Arc<ScanRegistry>,
    pipeline: Arc<HostPipeline>,
    admission: Arc<Semaphore>,
}

impl ScanCoordinator {
    pub fn new(
        registry: Arc<ScanRegistry>,
        prober: Arc<dyn ProbeProvider>,
        config: &DiscoverConfig,
    ) -> Self {
        let pipeline = HostPipeline {
            prober,
            vendors: VendorResolver::new(&config.vendor),
            classifier: RiskClassifier::new(&config.risk),
        };
        Self {
            registry,
            pipeline: Arc::new(pipeline),
            admission: Arc::new(Semaphore::new(config.max_concurrent_scans.max(1))),
        }
    }

    /// Select the probing backend and build a coordinator with a fresh registry.
    pub async fn from_config(config: &DiscoverConfig) -> Self {
        let prober = prober::select_provider(config).await;
        Self::new(Arc::new(ScanRegistry::new()), prober, config)
    }

    /// Name of the process-wide probing backend.
    pub fn prober_name(&self) -> &'static str {
        self.pipeline.prober.name()
    }

    /// Validate and start a scan, returning its initial (empty) result.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: &ScanRequest) -> Result<ScanResult> {
        let job = request.validate()?;
        let scan_id = ScanId::new();

        let permit = self.admission.clone().try_acquire_owned().ok();
        let status = if permit.is_some() {
            ScanStatus::Running
        } else {
            ScanStatus::Pending
        };

        let initial = ScanResult::new(scan_id, &job, status);
        self.registry
            .insert(ScanControlBlock::new(scan_id, &job), initial.clone());

        tracing::info!(
            scan_id = %scan_id,
            target = %job.target,
            mode = %job.mode,
            status = %status,
            prober = self.prober_name(),
            "Scan submitted"
        );

        let task = ScanTask {
            scan_id,
            job,
            registry: self.registry.clone(),
            pipeline: self.pipeline.clone(),
            admission: self.admission.clone(),
        };
        tokio::spawn(task.run(permit));

        Ok(initial)
    }

    pub fn status(&self, scan_id: &ScanId) -> Result<ScanResult> {
        self.registry.snapshot(scan_id)
    }

    pub fn devices(&self, scan_id: &ScanId) -> Result<DeviceListing> {
        self.registry.snapshot(scan_id).map(DeviceListing::from)
    }

    /// Flip the scan to `cancelled` and interrupt its task.
    ///
    /// A queued scan leaves the admission queue; a running scan's probe is
    /// aborted, so its slot is free for the next pending scan.
    pub fn cancel(&self, scan_id: &ScanId) -> Result<CancelOutcome> {
        let outcome = self.registry.cancel(scan_id)?;
        tracing::info!(scan_id = %scan_id, outcome = outcome.message(), "Cancel requested");
        Ok(outcome)
    }

    pub fn list(&self) -> ScanListing {
        self.registry.list()
    }
}

/// How the host loop ended when it did not fail.
#[derive(Debug, PartialEq, Eq)]
enum LoopExit {
    Finished,
    Cancelled,
}

/// Per-scan background unit of work.
struct ScanTask {
    scan_id: ScanId,
    job: ScanJob,
    registry: Arc<ScanRegistry>,
    pipeline: Arc<HostPipeline>,
    admission: Arc<Semaphore>,
}

impl ScanTask {
    async fn run(self, permit: Option<OwnedSemaphorePermit>) {
        let scan_id = self.scan_id;
        let registry = self.registry.clone();

        // No token means the scan was cancelled before this task first ran.
        let Some(cancelled) = registry.cancellation(&scan_id) else {
            return;
        };

        let _permit = match permit {
            Some(permit) => permit,
            None => tokio::select! {
                acquired = self.admission.clone().acquire_owned() => match acquired {
                    Ok(permit) => permit,
                    Err(e) => {
                        registry.fail(&scan_id, format!("admission closed: {e}"));
                        registry.deactivate(&scan_id);
                        return;
                    }
                },
                _ = cancelled.cancelled() => {
                    tracing::info!(scan_id = %scan_id, "Scan cancelled while queued");
                    return;
                }
            },
        };

        // Cancelled between acquiring the permit and starting.
        if !registry.mark_running(&scan_id) {
            registry.deactivate(&scan_id);
            return;
        }

        let start = Instant::now();

        // The body runs in its own task so a panic surfaces as a JoinError.
        // Aborting it on cancel drops any in-flight nmap child and frees the permit.
        let mut body = tokio::spawn(self.execute());
        let joined = tokio::select! {
            joined = &mut body => joined,
            _ = cancelled.cancelled() => {
                body.abort();
                tracing::info!(scan_id = %scan_id, "Scan cancelled, probe aborted");
                return;
            }
        };

        match joined {
            Ok(Ok(LoopExit::Finished)) => {
                if registry.complete(&scan_id) {
                    tracing::info!(
                        scan_id = %scan_id,
                        duration_ms = start.elapsed().as_millis(),
                        "Scan complete"
                    );
                }
            }
            Ok(Ok(LoopExit::Cancelled)) => {
                tracing::info!(scan_id = %scan_id, "Scan cancelled, stopping");
            }
            Ok(Err(e)) => {
                tracing::warn!(scan_id = %scan_id, error = %e, "Scan failed");
                registry.fail(&scan_id, e.to_string());
            }
            Err(e) => {
                tracing::error!(scan_id = %scan_id, error = %e, "Scan task panicked");
                registry.fail(&scan_id, DiscoverError::ScanFailure(e.to_string()).to_string());
            }
        }

        registry.deactivate(&scan_id);
    }

    async fn execute(self) -> crate::error::Result<LoopExit> {
        let scan_id = &self.scan_id;
        let hosts = self
            .pipeline
            .prober
            .discover_hosts(&self.job.target)
            .await?;
        self.registry.advance(scan_id, 20);

        tokio::task::yield_now().await;
        if !self.registry.is_active(scan_id) {
            return Ok(LoopExit::Cancelled);
        }

        let total = hosts.len();
        self.registry.set_total(scan_id, total);
        self.registry.advance(scan_id, 40);
        tracing::info!(scan_id = %scan_id, hosts_up = total, "Host discovery complete");

        for (index, sighting) in hosts.iter().enumerate() {
            if !self.registry.is_active(scan_id) {
                return Ok(LoopExit::Cancelled);
            }

            let record = match self.pipeline.inspect(sighting, self.job.mode).await {
                HostOutcome::Resolved(record) => record,
                HostOutcome::Degraded { record, error } => {
                    tracing::warn!(
                        scan_id = %scan_id,
                        ip = %sighting.ip,
                        error = %error,
                        "Host inspection degraded"
                    );
                    record
                }
            };

            if !self
                .registry
                .append_device(scan_id, record, host_progress(index + 1, total))
            {
                return Ok(LoopExit::Cancelled);
            }
            tokio::task::yield_now().await;
        }

        Ok(LoopExit::Finished)
    }
}

/// `40 + floor(done / total * 60)`.
fn host_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (40 + done.min(total) * 60 / total) as u8
}

/// Result of inspecting one host; a failure still produces a record.
#[derive(Debug)]
enum HostOutcome {
    Resolved(DeviceRecord),
    Degraded {
        record: DeviceRecord,
        error: DiscoverError,
    },
}

/// Enrichment shared by every scan: prober, vendor lookup, risk tables.
struct HostPipeline {
    prober: Arc<dyn ProbeProvider>,
    vendors: VendorResolver,
    classifier: RiskClassifier,
}

impl HostPipeline {
    async fn inspect(&self, sighting: &HostSighting, mode: ScanMode) -> HostOutcome {
        match self.build_record(sighting, mode).await {
            Ok(record) => HostOutcome::Resolved(record),
            Err(error) => HostOutcome::Degraded {
                record: DeviceRecord::degraded(&sighting.ip, error.to_string()),
                error,
            },
        }
    }

    async fn build_record(
        &self,
        sighting: &HostSighting,
        mode: ScanMode,
    ) -> crate::error::Result<DeviceRecord> {
        let ip = sighting.ip.as_str();

        let mac = match &sighting.mac {
            Some(mac) => Some(mac.clone()),
            None => self.retry_hardware_address(ip).await,
        };

        let vendor = match &mac {
            Some(mac) => self.vendors.resolve(mac).await,
            None => UNKNOWN_DEVICE.to_string(),
        };

        let hostname = match &sighting.hostname {
            Some(name) => name.clone(),
            None => self
                .reverse_lookup(ip)
                .await
                .unwrap_or_else(|| vendor.clone()),
        };

        let ports = if mode.wants_ports() {
            self.prober.enumerate_ports(ip, mode).await?
        } else {
            Vec::new()
        };

        // No vulnerability source yet; vuln mode only deepens the port phase.
        let vulnerabilities: Vec<String> = Vec::new();

        let open_ports: Vec<u16> = ports.iter().filter(|p| p.is_open()).map(|p| p.port).collect();
        let risk = self.classifier.classify(&open_ports, &vulnerabilities);

        Ok(DeviceRecord {
            ip: ip.to_string(),
            mac: mac.unwrap_or_else(|| UNKNOWN_MAC.to_string()),
            hostname,
            vendor,
            status: "up".to_string(),
            ports,
            vulnerabilities,
            risk,
            error: None,
        })
    }

    async fn retry_hardware_address(&self, ip: &str) -> Option<String> {
        match self.prober.resolve_hardware_address(ip).await {
            Ok(mac) => mac,
            Err(e) => {
                tracing::debug!(ip = %ip, error = %e, "ARP retry failed");
                None
            }
        }
    }

    async fn reverse_lookup(&self, ip: &str) -> Option<String> {
        match self.prober.reverse_lookup(ip).await {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(ip = %ip, error = %e, "Reverse lookup failed");
                None
            }
        }
    }
}
