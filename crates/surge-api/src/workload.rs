//! Workload-shaped dependency objects: which containers exist, what the
//! last declarative apply did, and what the last image build produced.
//! The engine only compares their statuses for change detection and
//! reads discovered containers as sync targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::meta::ObjectMeta;

/// Reports the workload instances currently running
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadDiscovery {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: WorkloadDiscoveryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadDiscoveryStatus {
    #[serde(default)]
    pub pods: Vec<DiscoveredPod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPod {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub containers: Vec<DiscoveredContainer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredContainer {
    pub name: String,
    /// Runtime container ID; empty while the container is being created
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ready: bool,
}

/// Reports the result of the last declarative apply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadApply {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: WorkloadApplyStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadApplyStatus {
    #[serde(default)]
    pub last_apply_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reports the result of the last image build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBuild {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: ImageBuildStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBuildStatus {
    /// Image reference produced by the build
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}
