//! Surge live-update engine.
//!
//! This crate ties together the declarative object model and the
//! reconciliation engine that synchronizes local file changes into
//! running containers.

pub use surge_api as api;
pub use surge_engine as engine;

/// Initialize logging for the entire system
pub fn init() {
    tracing_subscriber::fmt::init();
}

/// Version of the Surge system
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
