use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Annotation marking a live-update as staged by another controller.
/// While it is set, the engine publishes observations but never syncs.
pub const MANAGED_BY_ANNOTATION: &str = "surge.dev/managed-by";

/// Metadata shared by every object in the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object name, unique per kind
    pub name: String,
    /// Free-form annotations
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Set when the object is being deleted
    #[serde(default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Create metadata with just a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value of the managed-by annotation, if set and non-empty
    pub fn managed_by(&self) -> Option<&str> {
        self.annotations
            .get(MANAGED_BY_ANNOTATION)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// The closed set of object kinds the engine reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    LiveUpdate,
    FileWatch,
    WorkloadDiscovery,
    WorkloadApply,
    ImageBuild,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::LiveUpdate => "LiveUpdate",
            ObjectKind::FileWatch => "FileWatch",
            ObjectKind::WorkloadDiscovery => "WorkloadDiscovery",
            ObjectKind::WorkloadApply => "WorkloadApply",
            ObjectKind::ImageBuild => "ImageBuild",
        };
        write!(f, "{}", s)
    }
}

/// Reference to an object by kind and name, used as a dependency key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_by_ignores_empty_value() {
        let mut meta = ObjectMeta::named("frontend");
        assert_eq!(meta.managed_by(), None);

        meta.annotations
            .insert(MANAGED_BY_ANNOTATION.to_string(), String::new());
        assert_eq!(meta.managed_by(), None);

        meta.annotations
            .insert(MANAGED_BY_ANNOTATION.to_string(), "buildcontrol".to_string());
        assert_eq!(meta.managed_by(), Some("buildcontrol"));
    }

    #[test]
    fn test_object_ref_equality() {
        let a = ObjectRef::new(ObjectKind::FileWatch, "fw-1");
        let b = ObjectRef::new(ObjectKind::FileWatch, "fw-1");
        let c = ObjectRef::new(ObjectKind::ImageBuild, "fw-1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
