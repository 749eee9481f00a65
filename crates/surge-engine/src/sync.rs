//! The sync engine: turns accumulated changed files plus a live-update
//! spec into one idempotent batch of container mutations, and classifies
//! the outcome.
//!
//! All failures here land in the returned status, never in an error:
//! the control loop completes normally even when the live-update itself
//! is unhealthy.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use surge_api::{
    ContainerInfo, ContainerStatus, LiveUpdateSpec, LiveUpdateStatus, REASON_INVALID,
    REASON_PODS_INCONSISTENT, REASON_UPDATE_FAILED,
};

use crate::archive::FileArchive;
use crate::paths;
use crate::updater::{ContainerUpdater, UpdateError};

/// Kind of deployment target for one apply call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Containers running in a cluster workload
    Cluster,
    /// Containers running under a compose-style runtime
    Compose,
}

/// Inputs for one sync attempt
#[derive(Debug, Clone)]
pub struct Input {
    pub target: TargetKind,
    /// Containers that must all receive the same files
    pub containers: Vec<ContainerInfo>,
    /// Local paths changed since the last sync
    pub changed_files: Vec<PathBuf>,
    /// Modification time of the newest changed file; now if absent
    pub last_file_time_synced: Option<DateTime<Utc>>,
}

/// Run one batch: resolve the spec against the changed files, mutate
/// every target container, classify the result.
pub(crate) async fn apply_spec(
    updater: &dyn ContainerUpdater,
    spec: &LiveUpdateSpec,
    input: &Input,
) -> LiveUpdateStatus {
    let hot_reload = !spec.should_restart();

    let cmds = match paths::boil_run_steps(&spec.runs, &input.changed_files) {
        Ok(cmds) => cmds,
        Err(err) => {
            return LiveUpdateStatus::failure(REASON_INVALID, format!("Building exec: {}", err))
        }
    };

    let mappings = match paths::map_changed_paths(&spec.syncs, &input.changed_files) {
        Ok(mappings) => mappings,
        Err(err) => {
            return LiveUpdateStatus::failure(REASON_INVALID, format!("Mapping paths: {}", err))
        }
    };
    let (to_remove, to_archive) = match paths::partition_missing(mappings) {
        Ok(parts) => parts,
        Err(err) => {
            return LiveUpdateStatus::failure(REASON_INVALID, format!("Mapping paths: {}", err))
        }
    };

    let suffix = if input.containers.len() == 1 { "" } else { "(s)" };
    if !to_remove.is_empty() {
        info!(
            "Will delete {} file(s) from container{}",
            to_remove.len(),
            suffix
        );
        for m in &to_remove {
            info!(
                "- '{}' (matched local path: '{}')",
                m.container_path.display(),
                m.local_path.display()
            );
        }
    }
    if !to_archive.is_empty() {
        info!(
            "Will copy {} file(s) to container{}",
            to_archive.len(),
            suffix
        );
        for m in &to_archive {
            info!("- {}", m);
        }
    }

    let archive = match FileArchive::for_mappings(&to_archive) {
        Ok(archive) => archive,
        Err(err) => {
            return LiveUpdateStatus::failure(
                REASON_UPDATE_FAILED,
                format!("Building archive: {}", err),
            )
        }
    };
    let removals = paths::removal_paths(&to_remove);

    let mut result = LiveUpdateStatus::default();
    let mut last_exec_error: Option<ContainerStatus> = None;

    for container in &input.containers {
        let mut c_status = ContainerStatus {
            container_name: container.container_name.clone(),
            container_id: container.container_id.clone(),
            pod_name: container.pod_name.clone(),
            namespace: container.namespace.clone(),
            last_file_time_synced: Some(input.last_file_time_synced.unwrap_or_else(Utc::now)),
            last_exec_error: None,
        };

        match updater
            .update_container(container, &archive, &removals, &cmds, hot_reload)
            .await
        {
            Ok(()) => {
                info!("  → Container {} updated!", container.short_id());
            }
            Err(err @ UpdateError::RunStepFailure { .. }) => {
                // Keep going: all containers should end up with the same
                // files even when a run step fails for one of them.
                warn!(
                    "  → Failed to update container {}: {}",
                    container.short_id(),
                    err
                );
                c_status.last_exec_error = Some(err.to_string());
                last_exec_error = Some(c_status.clone());
            }
            Err(err) => {
                // Not the user's fault. Files may now differ between
                // containers, so stop before making it worse.
                return LiveUpdateStatus::failure(
                    REASON_UPDATE_FAILED,
                    format!("Updating pod {}: {}", container.pod_name, err),
                );
            }
        }

        result.containers.push(c_status);
    }

    // A batch where some containers ran the steps cleanly and others did
    // not leaves replicas running different code. Only uniform outcomes
    // are representable as per-container status.
    if let Some(failed) = &last_exec_error {
        if let Some(clean) = result
            .containers
            .iter()
            .find(|c| c.last_exec_error.is_none())
        {
            return LiveUpdateStatus::failure(
                REASON_PODS_INCONSISTENT,
                format!(
                    "Pods in inconsistent state. Success: pod {}. Failure: pod {}. Error: {}",
                    clean.pod_name,
                    failed.pod_name,
                    failed.last_exec_error.as_deref().unwrap_or("unknown")
                ),
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use surge_api::{Cmd, RunStep, SyncRule};

    /// Scripted outcome per container ID
    #[derive(Debug, Clone, Copy)]
    enum Script {
        Succeed,
        FailRunStep(i32),
        FailInfra,
    }

    #[derive(Default)]
    struct FakeUpdater {
        scripts: HashMap<String, Script>,
        calls: Mutex<Vec<(String, bool)>>,
    }

    impl FakeUpdater {
        fn scripted(scripts: &[(&str, Script)]) -> Self {
            Self {
                scripts: scripts
                    .iter()
                    .map(|(id, s)| (id.to_string(), *s))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn called_ids(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(id, _)| id.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ContainerUpdater for FakeUpdater {
        async fn update_container(
            &self,
            container: &ContainerInfo,
            _archive: &FileArchive,
            _to_delete: &[PathBuf],
            _cmds: &[Cmd],
            hot_reload: bool,
        ) -> Result<(), UpdateError> {
            self.calls
                .lock()
                .unwrap()
                .push((container.container_id.clone(), hot_reload));
            match self
                .scripts
                .get(&container.container_id)
                .copied()
                .unwrap_or(Script::Succeed)
            {
                Script::Succeed => Ok(()),
                Script::FailRunStep(code) => Err(UpdateError::RunStepFailure {
                    cmd: Cmd::new(["make", "build"]),
                    exit_code: code,
                }),
                Script::FailInfra => Err(UpdateError::failed("copying files: connection reset")),
            }
        }
    }

    fn container(id: &str, pod: &str) -> ContainerInfo {
        ContainerInfo {
            container_name: "main".to_string(),
            container_id: id.to_string(),
            pod_name: pod.to_string(),
            namespace: "default".to_string(),
        }
    }

    /// Spec and input whose one changed file really exists on disk
    fn spec_and_input(
        dir: &tempfile::TempDir,
        containers: Vec<ContainerInfo>,
    ) -> (LiveUpdateSpec, Input) {
        let local = dir.path().join("app.py");
        std::fs::write(&local, "print('hi')").unwrap();
        let spec = LiveUpdateSpec {
            syncs: vec![SyncRule {
                local_path: dir.path().to_path_buf(),
                container_path: PathBuf::from("/app"),
            }],
            ..Default::default()
        };
        let input = Input {
            target: TargetKind::Cluster,
            containers,
            changed_files: vec![local],
            last_file_time_synced: None,
        };
        (spec, input)
    }

    #[tokio::test]
    async fn test_invalid_spec_never_contacts_updater() {
        let updater = FakeUpdater::default();
        let spec = LiveUpdateSpec {
            runs: vec![RunStep {
                args: vec![],
                trigger_paths: vec![],
            }],
            ..Default::default()
        };
        let input = Input {
            target: TargetKind::Cluster,
            containers: vec![container("c1", "pod-1")],
            changed_files: vec![],
            last_file_time_synced: None,
        };

        let status = apply_spec(&updater, &spec, &input).await;
        assert_eq!(status.failed.as_ref().unwrap().reason, REASON_INVALID);
        assert!(status.containers.is_empty());
        assert!(updater.called_ids().is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_file_is_invalid() {
        let updater = FakeUpdater::default();
        let spec = LiveUpdateSpec::default();
        let input = Input {
            target: TargetKind::Cluster,
            containers: vec![container("c1", "pod-1")],
            changed_files: vec![PathBuf::from("/stray/file.py")],
            last_file_time_synced: None,
        };

        let status = apply_spec(&updater, &spec, &input).await;
        assert_eq!(status.failed.as_ref().unwrap().reason, REASON_INVALID);
        assert!(updater.called_ids().is_empty());
    }

    #[tokio::test]
    async fn test_all_containers_updated() {
        let dir = tempfile::tempdir().unwrap();
        let updater = FakeUpdater::default();
        let (spec, input) = spec_and_input(
            &dir,
            vec![container("c1", "pod-1"), container("c2", "pod-2")],
        );

        let status = apply_spec(&updater, &spec, &input).await;
        assert!(status.failed.is_none());
        assert_eq!(status.containers.len(), 2);
        assert!(status.containers.iter().all(|c| c.last_exec_error.is_none()));
        assert_eq!(updater.called_ids(), vec!["c1".to_string(), "c2".to_string()]);
    }

    #[tokio::test]
    async fn test_uniform_run_step_failure_is_not_inconsistency() {
        let dir = tempfile::tempdir().unwrap();
        let updater = FakeUpdater::scripted(&[
            ("c1", Script::FailRunStep(2)),
            ("c2", Script::FailRunStep(2)),
        ]);
        let (spec, input) = spec_and_input(
            &dir,
            vec![container("c1", "pod-1"), container("c2", "pod-2")],
        );

        let status = apply_spec(&updater, &spec, &input).await;
        assert!(status.failed.is_none());
        assert_eq!(status.containers.len(), 2);
        assert!(status
            .containers
            .iter()
            .all(|c| c.last_exec_error.is_some()));
    }

    #[tokio::test]
    async fn test_mixed_outcome_is_pods_inconsistent_in_either_order() {
        for scripts in [
            [("c1", Script::Succeed), ("c2", Script::FailRunStep(1))],
            [("c1", Script::FailRunStep(1)), ("c2", Script::Succeed)],
        ] {
            let dir = tempfile::tempdir().unwrap();
            let updater = FakeUpdater::scripted(&scripts);
            let (spec, input) = spec_and_input(
                &dir,
                vec![container("c1", "pod-1"), container("c2", "pod-2")],
            );

            let status = apply_spec(&updater, &spec, &input).await;
            let failed = status.failed.as_ref().unwrap();
            assert_eq!(failed.reason, REASON_PODS_INCONSISTENT);
            assert!(status.containers.is_empty());
            // Both containers were still contacted.
            assert_eq!(updater.called_ids().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_infrastructure_failure_aborts_batch() {
        let dir = tempfile::tempdir().unwrap();
        let updater = FakeUpdater::scripted(&[("c1", Script::FailInfra)]);
        let (spec, input) = spec_and_input(
            &dir,
            vec![container("c1", "pod-1"), container("c2", "pod-2")],
        );

        let status = apply_spec(&updater, &spec, &input).await;
        assert_eq!(status.failed.as_ref().unwrap().reason, REASON_UPDATE_FAILED);
        assert!(status.containers.is_empty());
        // The second container was never contacted.
        assert_eq!(updater.called_ids(), vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_restart_strategy_disables_hot_reload() {
        let dir = tempfile::tempdir().unwrap();
        let updater = FakeUpdater::default();
        let (mut spec, input) = spec_and_input(&dir, vec![container("c1", "pod-1")]);
        spec.restart = surge_api::RestartStrategy::Always;

        apply_spec(&updater, &spec, &input).await;
        let calls = updater.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("c1".to_string(), false)]);
    }
}
