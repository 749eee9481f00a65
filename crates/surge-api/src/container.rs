use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a running container targeted by a sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub container_name: String,
    pub container_id: String,
    pub pod_name: String,
    pub namespace: String,
}

impl ContainerInfo {
    /// Short form of the container ID for log lines
    pub fn short_id(&self) -> &str {
        let end = self.container_id.len().min(10);
        &self.container_id[..end]
    }
}

/// A literal command to execute inside a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cmd {
    pub argv: Vec<String>,
}

impl Cmd {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}
