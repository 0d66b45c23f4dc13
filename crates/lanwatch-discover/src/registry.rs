//! In-memory scan registry.
//!
//! Two concurrent maps keyed by [`ScanId`]: the control blocks of active
//! scans, and every result snapshot ever created. Results are never evicted,
//! so an identifier stays resolvable for the life of the process.
//!
//! Every task-side write goes through [`ScanRegistry::update`], which only
//! applies while the result is non-terminal. The check and the write happen
//! under the same entry lock, so a scan flipped to `cancelled` can never be
//! written back to `running` or `completed`.
//!
//! A scan's status is the single source of truth for listing: an id is
//! active exactly while its result is non-terminal.

use std::collections::HashMap;

use chrono::Utc;
use dashmap::DashMap;
use lanwatch_core::error::Result;
use lanwatch_core::{
    CancelOutcome, DeviceRecord, ScanControlBlock, ScanError, ScanId, ScanListing, ScanResult,
    ScanStatus,
};
use tokio_util::sync::CancellationToken;

/// Control block plus the token that interrupts the scan's task.
#[derive(Debug)]
struct ActiveScan {
    block: ScanControlBlock,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct ScanRegistry {
    active: DashMap<ScanId, ActiveScan>,
    results: DashMap<ScanId, ScanResult>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted scan.
    pub fn insert(&self, block: ScanControlBlock, result: ScanResult) {
        let scan_id = block.scan_id;
        self.active.insert(
            scan_id,
            ActiveScan {
                block,
                cancel: CancellationToken::new(),
            },
        );
        self.results.insert(scan_id, result);
    }

    /// Point-in-time copy of a scan's result.
    pub fn snapshot(&self, scan_id: &ScanId) -> Result<ScanResult> {
        self.results
            .get(scan_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| ScanError::not_found(scan_id))
    }

    pub fn is_active(&self, scan_id: &ScanId) -> bool {
        self.active.contains_key(scan_id)
    }

    /// Token fired when the scan is cancelled; `None` once it is inactive.
    pub fn cancellation(&self, scan_id: &ScanId) -> Option<CancellationToken> {
        self.active.get(scan_id).map(|a| a.cancel.clone())
    }

    /// Drop the control block; returns whether one was present.
    pub fn deactivate(&self, scan_id: &ScanId) -> bool {
        self.active.remove(scan_id).is_some()
    }

    /// Flip a non-terminal scan to `cancelled`, then drop its control block
    /// and fire its token.
    pub fn cancel(&self, scan_id: &ScanId) -> Result<CancelOutcome> {
        let outcome = {
            let mut result = self
                .results
                .get_mut(scan_id)
                .ok_or_else(|| ScanError::not_found(scan_id))?;

            if result.status.is_terminal() {
                CancelOutcome::AlreadyFinished
            } else {
                result.status = ScanStatus::Cancelled;
                result.timestamp = Utc::now();
                CancelOutcome::Cancelled
            }
        };

        if let Some((_, active)) = self.active.remove(scan_id) {
            active.cancel.cancel();
        }
        Ok(outcome)
    }

    /// Apply `f` to a non-terminal result. Returns `false` when the scan is
    /// unknown or already terminal, in which case nothing is written.
    pub fn update(&self, scan_id: &ScanId, f: impl FnOnce(&mut ScanResult)) -> bool {
        match self.results.get_mut(scan_id) {
            Some(mut result) if !result.status.is_terminal() => {
                f(result.value_mut());
                result.timestamp = Utc::now();
                true
            }
            _ => false,
        }
    }

    pub fn mark_running(&self, scan_id: &ScanId) -> bool {
        self.update(scan_id, |r| r.status = ScanStatus::Running)
    }

    /// Raise progress; lower values are ignored.
    pub fn advance(&self, scan_id: &ScanId, progress: u8) -> bool {
        self.update(scan_id, |r| r.progress = r.progress.max(progress.min(100)))
    }

    pub fn set_total(&self, scan_id: &ScanId, total_devices: usize) -> bool {
        self.update(scan_id, |r| r.total_devices = total_devices)
    }

    pub fn append_device(&self, scan_id: &ScanId, device: DeviceRecord, progress: u8) -> bool {
        self.update(scan_id, |r| {
            r.devices.push(device);
            r.progress = r.progress.max(progress.min(100));
        })
    }

    pub fn complete(&self, scan_id: &ScanId) -> bool {
        self.update(scan_id, |r| {
            r.status = ScanStatus::Completed;
            r.progress = 100;
        })
    }

    /// Terminal error; devices appended so far are kept.
    pub fn fail(&self, scan_id: &ScanId, detail: impl Into<String>) -> bool {
        let detail = detail.into();
        self.update(scan_id, |r| {
            r.status = ScanStatus::Error;
            r.error = Some(detail);
        })
    }

    /// Every known scan, split by status: non-terminal scans (oldest start
    /// first) and terminal scans (most recent last).
    pub fn list(&self) -> ScanListing {
        // Collected up front so no active-map lock is held while results are read.
        let started: HashMap<ScanId, _> = self
            .active
            .iter()
            .map(|a| (a.block.scan_id, a.block.started_at))
            .collect();

        let mut active = Vec::new();
        let mut completed = Vec::new();
        for result in self.results.iter() {
            if result.status.is_terminal() {
                completed.push((result.timestamp, result.scan_id));
            } else {
                let started_at = started
                    .get(&result.scan_id)
                    .copied()
                    .unwrap_or(result.timestamp);
                active.push((started_at, result.scan_id));
            }
        }
        active.sort();
        completed.sort();

        ScanListing {
            active: active.into_iter().map(|(_, id)| id).collect(),
            completed: completed.into_iter().map(|(_, id)| id).collect(),
            total: self.results.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanwatch_core::{ScanMode, ScanRequest};

    fn register(registry: &ScanRegistry) -> ScanId {
        let job = ScanRequest::new("10.0.0.0/24", ScanMode::Ping)
            .validate()
            .unwrap();
        let scan_id = ScanId::new();
        registry.insert(
            ScanControlBlock::new(scan_id, &job),
            ScanResult::new(scan_id, &job, ScanStatus::Running),
        );
        scan_id
    }

    #[test]
    fn test_unknown_scan_is_not_found() {
        let registry = ScanRegistry::new();
        let scan_id = ScanId::new();
        assert_eq!(
            registry.snapshot(&scan_id).unwrap_err(),
            ScanError::not_found(scan_id)
        );
        assert!(registry.cancel(&scan_id).is_err());
    }

    #[test]
    fn test_cancel_twice() {
        let registry = ScanRegistry::new();
        let scan_id = register(&registry);

        assert_eq!(registry.cancel(&scan_id).unwrap(), CancelOutcome::Cancelled);
        assert_eq!(
            registry.cancel(&scan_id).unwrap(),
            CancelOutcome::AlreadyFinished
        );
        assert_eq!(
            registry.snapshot(&scan_id).unwrap().status,
            ScanStatus::Cancelled
        );
    }

    #[test]
    fn test_cancelled_scan_rejects_writes() {
        let registry = ScanRegistry::new();
        let scan_id = register(&registry);
        registry.cancel(&scan_id).unwrap();

        assert!(!registry.append_device(&scan_id, DeviceRecord::degraded("10.0.0.1", "x"), 60));
        assert!(!registry.complete(&scan_id));

        let result = registry.snapshot(&scan_id).unwrap();
        assert_eq!(result.status, ScanStatus::Cancelled);
        assert!(result.devices.is_empty());
    }

    #[test]
    fn test_progress_never_decreases() {
        let registry = ScanRegistry::new();
        let scan_id = register(&registry);

        registry.advance(&scan_id, 40);
        registry.advance(&scan_id, 20);
        assert_eq!(registry.snapshot(&scan_id).unwrap().progress, 40);

        registry.advance(&scan_id, 250);
        assert_eq!(registry.snapshot(&scan_id).unwrap().progress, 100);
    }

    #[test]
    fn test_failure_keeps_partial_devices() {
        let registry = ScanRegistry::new();
        let scan_id = register(&registry);

        registry.append_device(&scan_id, DeviceRecord::degraded("10.0.0.1", "x"), 60);
        registry.fail(&scan_id, "nmap exited with code 1");

        let result = registry.snapshot(&scan_id).unwrap();
        assert_eq!(result.status, ScanStatus::Error);
        assert_eq!(result.devices.len(), 1);
        assert_eq!(result.error.as_deref(), Some("nmap exited with code 1"));
    }

    #[test]
    fn test_cancel_fires_token() {
        let registry = ScanRegistry::new();
        let scan_id = register(&registry);
        let token = registry.cancellation(&scan_id).unwrap();
        assert!(!token.is_cancelled());

        registry.cancel(&scan_id).unwrap();
        assert!(token.is_cancelled());
        assert!(registry.cancellation(&scan_id).is_none());
    }

    #[test]
    fn test_terminal_scan_listed_once_before_deactivate() {
        let registry = ScanRegistry::new();
        let finished = register(&registry);
        let failed = register(&registry);

        // The task has written the terminal state but not yet dropped its block.
        registry.complete(&finished);
        registry.fail(&failed, "nmap exited with code 1");
        assert!(registry.is_active(&finished));

        let listing = registry.list();
        assert!(listing.active.is_empty());
        assert_eq!(listing.completed.len(), 2);
        assert!(listing.completed.contains(&finished));
        assert!(listing.completed.contains(&failed));
    }

    #[test]
    fn test_list_partitions() {
        let registry = ScanRegistry::new();
        let running = register(&registry);
        let finished = register(&registry);
        registry.complete(&finished);
        registry.deactivate(&finished);

        let listing = registry.list();
        assert_eq!(listing.active, vec![running]);
        assert_eq!(listing.completed, vec![finished]);
        assert_eq!(listing.total, 2);
    }
}
