//! Interfaces the engine consumes from the surrounding control plane.

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::file_watch::FileWatch;
use crate::live_update::{LiveUpdate, LiveUpdateStatus};
use crate::workload::{ImageBuild, WorkloadApply, WorkloadDiscovery};

/// Read/write access to the declarative object store.
///
/// Every read may be stale relative to a concurrent writer; the engine
/// re-fetches rather than trusting cached copies. A missing object is
/// reported as `ApiError::NotFound`, which callers treat as "not yet
/// materialized" rather than as a failure.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch a live-update by name
    async fn get_live_update(&self, name: &str) -> ApiResult<LiveUpdate>;

    /// Fetch a file-watch by name
    async fn get_file_watch(&self, name: &str) -> ApiResult<FileWatch>;

    /// Fetch a workload discovery result by name
    async fn get_workload_discovery(&self, name: &str) -> ApiResult<WorkloadDiscovery>;

    /// Fetch a workload apply result by name
    async fn get_workload_apply(&self, name: &str) -> ApiResult<WorkloadApply>;

    /// Fetch an image build result by name
    async fn get_image_build(&self, name: &str) -> ApiResult<ImageBuild>;

    /// Replace the status subresource of a live-update
    async fn update_live_update_status(
        &self,
        name: &str,
        status: LiveUpdateStatus,
    ) -> ApiResult<()>;
}

/// Lifecycle notifications published to the rest of the system
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A live-update was observed (created or updated)
    Upserted(Box<LiveUpdate>),
    /// A live-update was deleted, by name
    Deleted(String),
}

/// Fire-and-forget notification sink for lifecycle events
pub trait EventSink: Send + Sync + 'static {
    fn dispatch(&self, event: LifecycleEvent);
}
