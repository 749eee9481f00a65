//! Per-live-update bookkeeping of consumed events and status baselines.
//!
//! A monitor lives exactly as long as its spec: any structural spec
//! change discards the whole monitor, so no dedup or merge state can
//! survive a spec edit.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use surge_api::{
    ContainerInfo, FileEvent, ImageBuildStatus, LiveUpdateSpec, LiveUpdateStatus,
    WorkloadApplyStatus, WorkloadDiscoveryStatus,
};

/// Identity of a container tracked across sync attempts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitorContainerKey {
    pub container_id: String,
    pub pod_name: String,
    pub namespace: String,
}

/// Last known sync result for one container
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorContainerStatus {
    pub last_file_time_synced: Option<DateTime<Utc>>,
    /// Set when the attempt that produced this entry failed; the
    /// container needs a full rebuild before live updates resume.
    pub unrecoverable: bool,
}

/// Accumulated observation state for one live-update
#[derive(Debug)]
pub struct Monitor {
    /// The spec this monitor was built for
    pub spec: LiveUpdateSpec,
    /// Last consumed event per file-watch, for dedup
    pub last_file_events: HashMap<String, FileEvent>,
    /// Latest modification time observed per path, across all events
    pub mod_time_by_path: HashMap<PathBuf, DateTime<Utc>>,
    /// Baseline status snapshots for change detection
    pub last_apply_status: Option<WorkloadApplyStatus>,
    pub last_discovery_status: Option<WorkloadDiscoveryStatus>,
    pub last_image_status: Option<ImageBuildStatus>,
    /// Set when any detector reports new information; cleared after
    /// every sync attempt regardless of its outcome
    pub has_changes_to_sync: bool,
    /// Per-container results that persist across reconciliations
    pub containers: HashMap<MonitorContainerKey, MonitorContainerStatus>,
}

impl Monitor {
    pub fn new(spec: LiveUpdateSpec) -> Self {
        Self {
            spec,
            last_file_events: HashMap::new(),
            mod_time_by_path: HashMap::new(),
            last_apply_status: None,
            last_discovery_status: None,
            last_image_status: None,
            has_changes_to_sync: false,
            containers: HashMap::new(),
        }
    }

    /// Fold a batch of file events into the merged path map, keeping the
    /// strictly-later modification time per path.
    pub fn merge_file_events(&mut self, events: &[FileEvent]) {
        for event in events {
            for path in &event.seen_files {
                match self.mod_time_by_path.get(path) {
                    Some(existing) if *existing >= event.time => {}
                    _ => {
                        self.mod_time_by_path.insert(path.clone(), event.time);
                    }
                }
            }
        }
    }

    /// Paths whose merged modification time is strictly after `since`.
    /// `None` takes everything.
    pub fn changed_paths_since(&self, since: Option<DateTime<Utc>>) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .mod_time_by_path
            .iter()
            .filter(|(_, time)| match since {
                Some(since) => **time > since,
                None => true,
            })
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Newest modification time across all merged paths
    pub fn latest_mod_time(&self) -> Option<DateTime<Utc>> {
        self.mod_time_by_path.values().max().copied()
    }

    /// Record the per-container outcome of a sync attempt.
    ///
    /// A failure status carries no container entries, so the attempted
    /// targets are taken from the input and marked unrecoverable; their
    /// previously synced times are kept.
    pub fn record_sync_result(&mut self, targets: &[ContainerInfo], status: &LiveUpdateStatus) {
        if status.is_failed() {
            for c in targets {
                let key = MonitorContainerKey {
                    container_id: c.container_id.clone(),
                    pod_name: c.pod_name.clone(),
                    namespace: c.namespace.clone(),
                };
                let last_synced = self
                    .containers
                    .get(&key)
                    .and_then(|s| s.last_file_time_synced);
                self.containers.insert(
                    key,
                    MonitorContainerStatus {
                        last_file_time_synced: last_synced,
                        unrecoverable: true,
                    },
                );
            }
            return;
        }

        for c in &status.containers {
            self.containers.insert(
                MonitorContainerKey {
                    container_id: c.container_id.clone(),
                    pod_name: c.pod_name.clone(),
                    namespace: c.namespace.clone(),
                },
                MonitorContainerStatus {
                    last_file_time_synced: c.last_file_time_synced,
                    unrecoverable: false,
                },
            );
        }
    }

    /// Whether any tracked container was left needing a full rebuild
    pub fn has_unrecoverable_containers(&self) -> bool {
        self.containers.values().any(|c| c.unrecoverable)
    }
}
