//! Reverse index from dependency objects to the live-updates that
//! depend on them, so the routing layer can re-enqueue dependents when a
//! dependency changes.

use std::collections::{HashMap, HashSet};

use surge_api::{LiveUpdate, ObjectKind, ObjectRef};

/// Extract every dependency key a live-update should be indexed under.
///
/// Pure function of the spec: one key per file-watch name plus the
/// discovery/apply/image names when the selector carries them.
pub fn index_live_update(lu: &LiveUpdate) -> Vec<ObjectRef> {
    let mut keys = Vec::new();

    for fwn in &lu.spec.file_watch_names {
        keys.push(ObjectRef::new(ObjectKind::FileWatch, fwn.clone()));
    }

    if let Some(selector) = &lu.spec.selector {
        if let Some(name) = &selector.discovery_name {
            keys.push(ObjectRef::new(ObjectKind::WorkloadDiscovery, name.clone()));
        }
        if let Some(name) = &selector.apply_name {
            keys.push(ObjectRef::new(ObjectKind::WorkloadApply, name.clone()));
        }
        if let Some(name) = &selector.image_name {
            keys.push(ObjectRef::new(ObjectKind::ImageBuild, name.clone()));
        }
    }

    keys
}

/// Tracks which live-updates depend on which objects
#[derive(Debug, Default)]
pub struct Indexer {
    /// Dependency keys per live-update name
    forward: HashMap<String, Vec<ObjectRef>>,
    /// Live-update names per dependency key
    reverse: HashMap<ObjectRef, HashSet<String>>,
}

impl Indexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the index for one live-update. Called on every fetch,
    /// with `None` on not-found so stale entries are cleared.
    pub fn on_reconcile(&mut self, name: &str, lu: Option<&LiveUpdate>) {
        if let Some(old_keys) = self.forward.remove(name) {
            for key in old_keys {
                if let Some(dependents) = self.reverse.get_mut(&key) {
                    dependents.remove(name);
                    if dependents.is_empty() {
                        self.reverse.remove(&key);
                    }
                }
            }
        }

        if let Some(lu) = lu {
            let keys = index_live_update(lu);
            for key in &keys {
                self.reverse
                    .entry(key.clone())
                    .or_default()
                    .insert(name.to_string());
            }
            self.forward.insert(name.to_string(), keys);
        }
    }

    /// Names of live-updates that depend on the given object, sorted for
    /// deterministic scheduling
    pub fn dependents(&self, key: &ObjectRef) -> Vec<String> {
        let mut names: Vec<String> = self
            .reverse
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}
