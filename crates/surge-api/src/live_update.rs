//! The LiveUpdate object: which local file changes flow into which
//! containers, and how.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::meta::ObjectMeta;

/// Failure reason: the live-update's own configuration could not be
/// resolved against the changed files. Requires a spec or file-state fix.
pub const REASON_INVALID: &str = "Invalid";

/// Failure reason: infrastructure-level error applying changes to a
/// container. The caller is expected to fall back to a full rebuild.
pub const REASON_UPDATE_FAILED: &str = "UpdateFailed";

/// Failure reason: containers ended a batch in different effective states.
pub const REASON_PODS_INCONSISTENT: &str = "PodsInconsistent";

/// A live-update specification and its last known status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveUpdate {
    pub meta: ObjectMeta,
    pub spec: LiveUpdateSpec,
    #[serde(default)]
    pub status: LiveUpdateStatus,
}

impl LiveUpdate {
    pub fn name(&self) -> &str {
        &self.meta.name
    }
}

/// What to watch, where to copy, and what to run after a copy.
///
/// Compared structurally: any edit invalidates all accumulated engine
/// state for the object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveUpdateSpec {
    /// FileWatch objects whose events feed this live-update
    #[serde(default)]
    pub file_watch_names: Vec<String>,
    /// Workload dependencies that gate and target the sync
    #[serde(default)]
    pub selector: Option<WorkloadSelector>,
    /// Local-to-container path prefixes for copied files
    #[serde(default)]
    pub syncs: Vec<SyncRule>,
    /// Commands to run in the container after files land
    #[serde(default)]
    pub runs: Vec<RunStep>,
    /// Whether a successful sync requires a container restart
    #[serde(default)]
    pub restart: RestartStrategy,
}

impl LiveUpdateSpec {
    /// Whether the target process must be restarted after a sync
    pub fn should_restart(&self) -> bool {
        matches!(self.restart, RestartStrategy::Always)
    }
}

/// Names of the workload-shaped dependencies a live-update follows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSelector {
    /// WorkloadDiscovery object reporting running containers
    #[serde(default)]
    pub discovery_name: Option<String>,
    /// WorkloadApply object reporting the last declarative apply
    #[serde(default)]
    pub apply_name: Option<String>,
    /// ImageBuild object reporting the last image build
    #[serde(default)]
    pub image_name: Option<String>,
}

/// Maps a local path prefix to a container path prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRule {
    pub local_path: PathBuf,
    pub container_path: PathBuf,
}

/// A command template, run when any of its trigger paths change.
/// An empty trigger set runs on every sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStep {
    /// Command and arguments, exec-style
    pub args: Vec<String>,
    /// Local path prefixes that trigger this step
    #[serde(default)]
    pub trigger_paths: Vec<PathBuf>,
}

/// Hot-reload vs restart policy for a successful sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartStrategy {
    /// Leave the target process running, patched in place
    #[default]
    None,
    /// Restart the target process after every sync
    Always,
}

/// Last observed outcome of synchronization.
///
/// Invariant: `failed` and a non-empty `containers` list are mutually
/// exclusive. A failure descriptor means the entire attempt was aborted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveUpdateStatus {
    /// Set when the whole sync attempt was aborted
    #[serde(default)]
    pub failed: Option<FailureState>,
    /// Per-container results of the last attempt
    #[serde(default)]
    pub containers: Vec<ContainerStatus>,
}

impl LiveUpdateStatus {
    /// Build a failure status with no container entries
    pub fn failure(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            failed: Some(FailureState {
                reason: reason.into(),
                message: message.into(),
                last_transition_time: None,
            }),
            containers: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }
}

/// Describes why a sync attempt was aborted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureState {
    /// Stable machine-readable reason (one of the REASON_* constants)
    pub reason: String,
    /// Human-readable detail
    pub message: String,
    /// When this failure reason first appeared. Preserved across
    /// attempts that fail for the same reason.
    #[serde(default)]
    pub last_transition_time: Option<DateTime<Utc>>,
}

/// Result of syncing one container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub container_name: String,
    pub container_id: String,
    pub pod_name: String,
    pub namespace: String,
    /// Modification time of the newest file included in the sync
    #[serde(default)]
    pub last_file_time_synced: Option<DateTime<Utc>>,
    /// Error from the last run step, if one failed in this container
    #[serde(default)]
    pub last_exec_error: Option<String>,
}
