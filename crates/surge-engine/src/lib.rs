//! Reconciliation engine for Surge live-updates.
//!
//! This crate implements the control loop that watches LiveUpdate
//! objects, accumulates file-change and workload observations per
//! object, and synchronizes changed files into running containers.

pub mod archive;
pub mod config;
pub mod error;
pub mod indexer;
pub mod monitor;
pub mod paths;
pub mod reconciler;
pub mod sync;
pub mod updater;

// Re-export commonly used types
pub use crate::archive::FileArchive;
pub use crate::config::{ClusterContext, EngineConfig, UpdateMode};
pub use crate::error::{EngineError, EngineResult};
pub use crate::indexer::{index_live_update, Indexer};
pub use crate::monitor::{Monitor, MonitorContainerKey, MonitorContainerStatus};
pub use crate::paths::{PathMapping, ResolveError};
pub use crate::reconciler::Reconciler;
pub use crate::sync::{Input, TargetKind};
pub use crate::updater::{select_updater, ContainerUpdater, UpdateError, UpdaterKind};
