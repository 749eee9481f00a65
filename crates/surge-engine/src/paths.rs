//! Resolution of changed local paths against a live-update's sync rules
//! and run steps. Errors here mean the configuration cannot be applied
//! to the current file state; callers classify them as Invalid without
//! contacting any container.

use std::fmt;
use std::path::PathBuf;

use surge_api::{Cmd, RunStep, SyncRule};

/// Failure resolving a live-update's configuration against changed files
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("file {path:?} matches no sync rule")]
    NoMatchingSync { path: PathBuf },

    #[error("run step {index} has an empty command")]
    EmptyRunStep { index: usize },

    #[error("inspecting {path:?}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A changed local path and where it lands in the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub local_path: PathBuf,
    pub container_path: PathBuf,
}

impl fmt::Display for PathMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.local_path.display(),
            self.container_path.display()
        )
    }
}

/// Map each changed path through the most specific matching sync rule.
///
/// A path that matches no rule is an error: the caller's file set and
/// sync configuration disagree, and silently dropping the file would
/// leave containers stale.
pub fn map_changed_paths(
    syncs: &[SyncRule],
    changed: &[PathBuf],
) -> Result<Vec<PathMapping>, ResolveError> {
    let mut mappings = Vec::with_capacity(changed.len());
    for path in changed {
        let (rule, rel) = syncs
            .iter()
            .filter_map(|rule| {
                path.strip_prefix(&rule.local_path)
                    .ok()
                    .map(|rel| (rule, rel))
            })
            .max_by_key(|(rule, _)| rule.local_path.components().count())
            .ok_or_else(|| ResolveError::NoMatchingSync { path: path.clone() })?;

        let container_path = if rel.as_os_str().is_empty() {
            rule.container_path.clone()
        } else {
            rule.container_path.join(rel)
        };
        mappings.push(PathMapping {
            local_path: path.clone(),
            container_path,
        });
    }
    Ok(mappings)
}

/// Split mappings into (to_remove, to_archive) by local existence:
/// a path no longer present locally must be deleted in the container.
pub fn partition_missing(
    mappings: Vec<PathMapping>,
) -> Result<(Vec<PathMapping>, Vec<PathMapping>), ResolveError> {
    let mut to_remove = Vec::new();
    let mut to_archive = Vec::new();
    for mapping in mappings {
        match std::fs::metadata(&mapping.local_path) {
            Ok(_) => to_archive.push(mapping),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => to_remove.push(mapping),
            Err(err) => {
                return Err(ResolveError::Stat {
                    path: mapping.local_path,
                    source: err,
                })
            }
        }
    }
    Ok((to_remove, to_archive))
}

/// Container paths for the removal half of a partition
pub fn removal_paths(to_remove: &[PathMapping]) -> Vec<PathBuf> {
    to_remove.iter().map(|m| m.container_path.clone()).collect()
}

/// Resolve run steps against the changed files: a step executes when its
/// trigger set is empty or any changed local path falls under a trigger.
pub fn boil_run_steps(
    runs: &[RunStep],
    changed_local: &[PathBuf],
) -> Result<Vec<Cmd>, ResolveError> {
    let mut cmds = Vec::new();
    for (index, step) in runs.iter().enumerate() {
        if step.args.is_empty() {
            return Err(ResolveError::EmptyRunStep { index });
        }
        if step.trigger_paths.is_empty() || triggered(&step.trigger_paths, changed_local) {
            cmds.push(Cmd::new(step.args.clone()));
        }
    }
    Ok(cmds)
}

fn triggered(triggers: &[PathBuf], changed: &[PathBuf]) -> bool {
    changed
        .iter()
        .any(|path| triggers.iter().any(|trigger| path.starts_with(trigger)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(local: &str, container: &str) -> SyncRule {
        SyncRule {
            local_path: PathBuf::from(local),
            container_path: PathBuf::from(container),
        }
    }

    #[test]
    fn test_map_picks_most_specific_rule() {
        let syncs = vec![rule("/src", "/app"), rule("/src/web", "/app/static")];
        let mappings =
            map_changed_paths(&syncs, &[PathBuf::from("/src/web/index.html")]).unwrap();
        assert_eq!(
            mappings[0].container_path,
            PathBuf::from("/app/static/index.html")
        );
    }

    #[test]
    fn test_map_unmatched_path_is_an_error() {
        let syncs = vec![rule("/src", "/app")];
        let err = map_changed_paths(&syncs, &[PathBuf::from("/etc/hosts")]).unwrap_err();
        assert!(matches!(err, ResolveError::NoMatchingSync { .. }));
    }

    #[test]
    fn test_partition_missing_by_local_existence() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.py");
        std::fs::write(&present, "print('hi')").unwrap();
        let missing = dir.path().join("deleted.py");

        let mappings = vec![
            PathMapping {
                local_path: present.clone(),
                container_path: PathBuf::from("/app/present.py"),
            },
            PathMapping {
                local_path: missing,
                container_path: PathBuf::from("/app/deleted.py"),
            },
        ];

        let (to_remove, to_archive) = partition_missing(mappings).unwrap();
        assert_eq!(to_remove.len(), 1);
        assert_eq!(to_remove[0].container_path, PathBuf::from("/app/deleted.py"));
        assert_eq!(to_archive.len(), 1);
        assert_eq!(to_archive[0].local_path, present);
    }

    #[test]
    fn test_boil_filters_by_trigger_paths() {
        let runs = vec![
            RunStep {
                args: vec!["make".to_string(), "build".to_string()],
                trigger_paths: vec![PathBuf::from("/src/native")],
            },
            RunStep {
                args: vec!["touch".to_string(), "/tmp/reload".to_string()],
                trigger_paths: vec![],
            },
        ];

        let cmds = boil_run_steps(&runs, &[PathBuf::from("/src/web/app.js")]).unwrap();
        assert_eq!(cmds, vec![Cmd::new(["touch", "/tmp/reload"])]);

        let cmds = boil_run_steps(&runs, &[PathBuf::from("/src/native/lib.c")]).unwrap();
        assert_eq!(cmds.len(), 2);
    }

    #[test]
    fn test_boil_rejects_empty_command() {
        let runs = vec![RunStep {
            args: vec![],
            trigger_paths: vec![],
        }];
        let err = boil_run_steps(&runs, &[]).unwrap_err();
        assert!(matches!(err, ResolveError::EmptyRunStep { index: 0 }));
    }
}
