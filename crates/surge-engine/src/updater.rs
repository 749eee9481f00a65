//! The container-mutation capability and the policy for choosing
//! between its two mechanisms.

use std::path::PathBuf;

use async_trait::async_trait;

use surge_api::{Cmd, ContainerInfo};

use crate::archive::FileArchive;
use crate::config::{ClusterContext, UpdateMode};
use crate::sync::TargetKind;

/// Failure applying an update to one container
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// A run step exited non-zero. Per-container and recoverable: other
    /// containers should still receive the same files.
    #[error("run step \"{cmd}\" failed with exit code: {exit_code}")]
    RunStepFailure { cmd: Cmd, exit_code: i32 },

    /// Infrastructure-level failure (archive transport, copy, delete).
    /// Fatal for the whole attempt.
    #[error("{0}")]
    Failed(String),
}

impl UpdateError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Applies a live-update to one running container: extract the archive,
/// delete removed paths, run the boiled commands, and optionally restart
/// the target process.
#[async_trait]
pub trait ContainerUpdater: Send + Sync + 'static {
    async fn update_container(
        &self,
        container: &ContainerInfo,
        archive: &FileArchive,
        to_delete: &[PathBuf],
        cmds: &[Cmd],
        hot_reload: bool,
    ) -> Result<(), UpdateError>;
}

/// The closed set of mutation mechanisms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterKind {
    /// Mutate through the container runtime directly
    Docker,
    /// Mutate through in-cluster exec
    Exec,
}

/// Choose a mechanism for one apply call.
///
/// Compose targets and forced-container mode always use the runtime;
/// forced-exec mode always uses exec; otherwise the runtime is preferred
/// exactly when the local Docker daemon builds into the target cluster.
pub fn select_updater(
    mode: UpdateMode,
    target: TargetKind,
    cluster: &ClusterContext,
) -> UpdaterKind {
    if target == TargetKind::Compose || mode == UpdateMode::Container {
        return UpdaterKind::Docker;
    }
    if mode == UpdateMode::Exec {
        return UpdaterKind::Exec;
    }
    if cluster.builds_with_docker() {
        return UpdaterKind::Docker;
    }
    UpdaterKind::Exec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_target_forces_docker() {
        let cluster = ClusterContext::new("gke_prod_us-east1");
        assert_eq!(
            select_updater(UpdateMode::Auto, TargetKind::Compose, &cluster),
            UpdaterKind::Docker
        );
    }

    #[test]
    fn test_forced_modes_win_over_cluster() {
        let local = ClusterContext::new("docker-desktop");
        assert_eq!(
            select_updater(UpdateMode::Exec, TargetKind::Cluster, &local),
            UpdaterKind::Exec
        );
        let remote = ClusterContext::new("gke_prod_us-east1");
        assert_eq!(
            select_updater(UpdateMode::Container, TargetKind::Cluster, &remote),
            UpdaterKind::Docker
        );
    }

    #[test]
    fn test_auto_follows_cluster_reachability() {
        assert_eq!(
            select_updater(
                UpdateMode::Auto,
                TargetKind::Cluster,
                &ClusterContext::new("minikube")
            ),
            UpdaterKind::Docker
        );
        assert_eq!(
            select_updater(
                UpdateMode::Auto,
                TargetKind::Cluster,
                &ClusterContext::new("gke_prod_us-east1")
            ),
            UpdaterKind::Exec
        );
    }
}
