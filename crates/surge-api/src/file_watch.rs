use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::meta::ObjectMeta;

/// External object reporting batches of observed local file changes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileWatch {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: FileWatchStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileWatchStatus {
    /// Events in observation order; the last entry is the most recent
    #[serde(default)]
    pub file_events: Vec<FileEvent>,
}

/// One batch of file changes observed at a single time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    /// When the batch was observed
    pub time: DateTime<Utc>,
    /// Local paths seen changed in this batch
    pub seen_files: Vec<PathBuf>,
}

impl FileEvent {
    pub fn new(time: DateTime<Utc>, seen_files: Vec<PathBuf>) -> Self {
        Self { time, seen_files }
    }
}
