//! The live-update control loop.
//!
//! One reconciliation pass fetches the object, folds fresh dependency
//! state into its monitor, and runs the sync engine when anything
//! actionable accumulated. A synchronous force-apply entry point drives
//! the same sync logic under the same lock.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use surge_api::{
    ContainerInfo, EventSink, LifecycleEvent, LiveUpdate, LiveUpdateSpec, LiveUpdateStatus,
    ObjectRef, ObjectStore,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::indexer::Indexer;
use crate::monitor::{Monitor, MonitorContainerKey};
use crate::sync::{self, Input, TargetKind};
use crate::updater::{select_updater, ContainerUpdater, UpdaterKind};

/// Mutable state guarded by the engine's single lock: the monitor table
/// and the dependency index. Reconciliation passes and force-apply calls
/// serialize through it, so sync attempts for one name never overlap.
#[derive(Default)]
struct EngineState {
    monitors: HashMap<String, Monitor>,
    indexer: Indexer,
}

/// Manages the LiveUpdate objects in the store
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    sink: Arc<dyn EventSink>,
    docker_updater: Arc<dyn ContainerUpdater>,
    exec_updater: Arc<dyn ContainerUpdater>,
    config: EngineConfig,
    state: Mutex<EngineState>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        sink: Arc<dyn EventSink>,
        docker_updater: Arc<dyn ContainerUpdater>,
        exec_updater: Arc<dyn ContainerUpdater>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            sink,
            docker_updater,
            exec_updater,
            config,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// Run one reconciliation pass for the named live-update.
    ///
    /// An error return means the pass could not complete (store
    /// transport failure) and the scheduler should retry with backoff.
    /// Sync-domain failures end up in the object's status instead.
    pub async fn reconcile(&self, name: &str) -> EngineResult<()> {
        let mut state = self.state.lock().await;

        let lu = match self.store.get_live_update(name).await {
            Ok(lu) => Some(lu),
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                state.indexer.on_reconcile(name, None);
                return Err(err.into());
            }
        };
        state.indexer.on_reconcile(name, lu.as_ref());

        let lu = match lu {
            Some(lu) if lu.meta.deletion_timestamp.is_none() => lu,
            _ => {
                self.sink.dispatch(LifecycleEvent::Deleted(name.to_string()));
                state.monitors.remove(name);
                return Ok(());
            }
        };

        // The store is the source of truth; keep the rest of the system
        // up to date with what we observed.
        self.sink
            .dispatch(LifecycleEvent::Upserted(Box::new(lu.clone())));

        if lu.meta.managed_by().is_some() {
            // Another controller is staging this object for takeover.
            // Publish observations but do not sync.
            return Ok(());
        }

        let monitor = Self::ensure_monitor(&mut state.monitors, name, &lu.spec);

        let has_file_changes = self.detect_file_watch_changes(monitor).await?;
        let has_workload_changes = self.detect_workload_changes(monitor).await?;

        if has_file_changes || has_workload_changes {
            monitor.has_changes_to_sync = true;
        }

        if monitor.has_changes_to_sync {
            self.maybe_sync(&lu, monitor).await?;
        }

        // The attempt itself is the boundary, not its outcome.
        monitor.has_changes_to_sync = false;

        Ok(())
    }

    /// Return the monitor tracking this live-update. Any structural spec
    /// change wipes all accumulated state: dedup baselines built for one
    /// dependency set must not gate observations of another.
    fn ensure_monitor<'a>(
        monitors: &'a mut HashMap<String, Monitor>,
        name: &str,
        spec: &LiveUpdateSpec,
    ) -> &'a mut Monitor {
        match monitors.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let entry = entry.into_mut();
                if entry.spec != *spec {
                    info!("spec changed for {:?}; resetting accumulated state", name);
                    *entry = Monitor::new(spec.clone());
                }
                entry
            }
            Entry::Vacant(entry) => entry.insert(Monitor::new(spec.clone())),
        }
    }

    /// Consume new file events off every watched FileWatch.
    /// Returns true if any watch reported something unseen.
    async fn detect_file_watch_changes(&self, monitor: &mut Monitor) -> EngineResult<bool> {
        let names = monitor.spec.file_watch_names.clone();
        let mut has_change = false;
        for fwn in &names {
            if self.detect_one_file_watch(monitor, fwn).await? {
                has_change = true;
            }
        }
        Ok(has_change)
    }

    async fn detect_one_file_watch(&self, monitor: &mut Monitor, fwn: &str) -> EngineResult<bool> {
        let fw = match self.store.get_file_watch(fwn).await {
            Ok(fw) => fw,
            // The watch simply hasn't materialized yet.
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let events = fw.status.file_events;
        let newest = match events.last() {
            Some(newest) => newest,
            None => return Ok(false),
        };
        if monitor.last_file_events.get(fwn) == Some(newest) {
            return Ok(false);
        }
        monitor.last_file_events.insert(fwn.to_string(), newest.clone());

        // Consume every event in the batch, not just the newest.
        monitor.merge_file_events(&events);
        Ok(true)
    }

    /// Compare the workload-shaped dependencies against their baselines.
    /// Missing objects are skipped, not errors; every snapshot is
    /// refreshed after the comparison so it gates the next pass.
    async fn detect_workload_changes(&self, monitor: &mut Monitor) -> EngineResult<bool> {
        let selector = match monitor.spec.selector.clone() {
            Some(selector) => selector,
            None => return Ok(false),
        };

        let mut changed = false;

        let apply = match &selector.apply_name {
            Some(name) => match self.store.get_workload_apply(name).await {
                Ok(obj) => Some(obj.status),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err.into()),
            },
            None => None,
        };
        if let Some(status) = &apply {
            if monitor.last_apply_status.as_ref() != Some(status) {
                changed = true;
            }
        }

        let discovery = match &selector.discovery_name {
            Some(name) => match self.store.get_workload_discovery(name).await {
                Ok(obj) => Some(obj.status),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err.into()),
            },
            None => None,
        };
        if let Some(status) = &discovery {
            if monitor.last_discovery_status.as_ref() != Some(status) {
                changed = true;
            }
        }

        let image = match &selector.image_name {
            Some(name) => match self.store.get_image_build(name).await {
                Ok(obj) => Some(obj.status),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err.into()),
            },
            None => None,
        };
        if let Some(status) = &image {
            if monitor.last_image_status.as_ref() != Some(status) {
                changed = true;
            }
        }

        monitor.last_apply_status = apply;
        monitor.last_discovery_status = discovery;
        monitor.last_image_status = image;

        Ok(changed)
    }

    /// Turn the accumulated monitor state into one apply call: the
    /// discovered containers, and every merged path newer than the
    /// least-synced container's baseline.
    async fn maybe_sync(&self, lu: &LiveUpdate, monitor: &mut Monitor) -> EngineResult<()> {
        let containers = discovered_containers(monitor);
        if containers.is_empty() {
            debug!("{}: no running containers discovered; deferring sync", lu.name());
            return Ok(());
        }
        if monitor.has_unrecoverable_containers() {
            debug!(
                "{}: waiting for rebuild of unrecoverable container(s)",
                lu.name()
            );
            return Ok(());
        }

        let baseline = containers
            .iter()
            .map(|c| {
                monitor
                    .containers
                    .get(&container_key(c))
                    .and_then(|s| s.last_file_time_synced)
            })
            .min()
            .flatten();
        let changed_files = monitor.changed_paths_since(baseline);
        if changed_files.is_empty() {
            debug!("{}: no file changes newer than last sync", lu.name());
            return Ok(());
        }

        let input = Input {
            target: TargetKind::Cluster,
            containers,
            changed_files,
            last_file_time_synced: monitor.latest_mod_time(),
        };
        self.apply(lu, &lu.spec, &input, Some(monitor)).await?;
        Ok(())
    }

    /// Live-update containers by copying files and running exec
    /// commands, then write the resulting status back to the store.
    ///
    /// This is the synchronous entry point for callers that decide on
    /// their own when to apply (and fall back to a full rebuild when the
    /// returned status reports a fatal failure). It serializes with the
    /// control loop through the same lock.
    pub async fn force_apply(
        &self,
        name: &str,
        spec: &LiveUpdateSpec,
        input: &Input,
    ) -> EngineResult<LiveUpdateStatus> {
        let obj = self.store.get_live_update(name).await?;

        let mut state = self.state.lock().await;
        let monitor = state.monitors.get_mut(name);
        self.apply(&obj, spec, input, monitor).await
    }

    /// Shared by the control-loop path and the force-apply path.
    /// Assumes the engine lock is held.
    async fn apply(
        &self,
        obj: &LiveUpdate,
        spec: &LiveUpdateSpec,
        input: &Input,
        monitor: Option<&mut Monitor>,
    ) -> EngineResult<LiveUpdateStatus> {
        let updater = self.updater_for(input.target);
        let mut status = sync::apply_spec(updater, spec, input).await;

        if let Some(monitor) = monitor {
            monitor.record_sync_result(&input.containers, &status);
        }

        // Flapping on the same root cause keeps the original transition
        // time; a new reason starts a new clock.
        if let Some(failed) = &mut status.failed {
            failed.last_transition_time = match &obj.status.failed {
                Some(prev) if prev.reason == failed.reason => prev.last_transition_time,
                _ => Some(Utc::now()),
            };
        }

        if status != obj.status {
            self.store
                .update_live_update_status(obj.name(), status.clone())
                .await?;
        }

        Ok(status)
    }

    fn updater_for(&self, target: TargetKind) -> &dyn ContainerUpdater {
        match select_updater(self.config.update_mode, target, &self.config.cluster_context) {
            UpdaterKind::Docker => self.docker_updater.as_ref(),
            UpdaterKind::Exec => self.exec_updater.as_ref(),
        }
    }

    /// Names of live-updates depending on the given object, for the
    /// watch-routing layer to re-enqueue.
    pub async fn dependents_of(&self, key: &ObjectRef) -> Vec<String> {
        self.state.lock().await.indexer.dependents(key)
    }
}

fn container_key(c: &ContainerInfo) -> MonitorContainerKey {
    MonitorContainerKey {
        container_id: c.container_id.clone(),
        pod_name: c.pod_name.clone(),
        namespace: c.namespace.clone(),
    }
}

/// Sync targets from the last discovery snapshot: every discovered
/// container that has a runtime ID.
fn discovered_containers(monitor: &Monitor) -> Vec<ContainerInfo> {
    let mut containers = Vec::new();
    if let Some(discovery) = &monitor.last_discovery_status {
        for pod in &discovery.pods {
            for c in &pod.containers {
                if c.id.is_empty() {
                    continue;
                }
                containers.push(ContainerInfo {
                    container_name: c.name.clone(),
                    container_id: c.id.clone(),
                    pod_name: pod.name.clone(),
                    namespace: pod.namespace.clone(),
                });
            }
        }
    }
    containers
}
