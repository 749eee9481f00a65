//! Core object model and collaborator traits for the Surge live-update
//! engine.
//!
//! This crate defines the declarative objects the engine reconciles
//! (LiveUpdate, FileWatch, and the workload-shaped dependencies) and the
//! interfaces it consumes from the surrounding control plane.

pub mod container;
pub mod error;
pub mod file_watch;
pub mod live_update;
pub mod meta;
pub mod store;
pub mod workload;

// Re-export commonly used types
pub use crate::container::{Cmd, ContainerInfo};
pub use crate::error::{ApiError, ApiResult};
pub use crate::file_watch::{FileEvent, FileWatch, FileWatchStatus};
pub use crate::live_update::{
    ContainerStatus, FailureState, LiveUpdate, LiveUpdateSpec, LiveUpdateStatus, RestartStrategy,
    RunStep, SyncRule, WorkloadSelector, REASON_INVALID, REASON_PODS_INCONSISTENT,
    REASON_UPDATE_FAILED,
};
pub use crate::meta::{ObjectKind, ObjectMeta, ObjectRef, MANAGED_BY_ANNOTATION};
pub use crate::store::{EventSink, LifecycleEvent, ObjectStore};
pub use crate::workload::{
    DiscoveredContainer, DiscoveredPod, ImageBuild, ImageBuildStatus, WorkloadApply,
    WorkloadApplyStatus, WorkloadDiscovery, WorkloadDiscoveryStatus,
};
