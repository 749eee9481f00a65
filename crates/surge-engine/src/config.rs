use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// How the engine chooses a container-mutation mechanism
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Pick per target: Docker for compose targets and local clusters,
    /// exec otherwise
    #[default]
    Auto,
    /// Always mutate through the container runtime
    Container,
    /// Always mutate through in-cluster exec
    Exec,
}

impl FromStr for UpdateMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(UpdateMode::Auto),
            "container" => Ok(UpdateMode::Container),
            "exec" => Ok(UpdateMode::Exec),
            other => Err(EngineError::config(format!(
                "unknown update mode {:?} (expected auto, container, or exec)",
                other
            ))),
        }
    }
}

/// Name of the cluster context the engine deploys into
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterContext(pub String);

impl ClusterContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Whether the local Docker daemon builds directly into this cluster,
    /// making runtime-level container mutation reachable without exec.
    pub fn builds_with_docker(&self) -> bool {
        matches!(
            self.0.as_str(),
            "docker-desktop" | "docker-for-desktop" | "minikube" | "microk8s" | "kind-kind"
        )
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Container-mutation mechanism selection
    #[serde(default)]
    pub update_mode: UpdateMode,
    /// Cluster context the engine targets
    #[serde(default)]
    pub cluster_context: ClusterContext,
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}
