//! Shared plumbing for the block editor bridge: errors, configuration, telemetry.

pub mod config;
pub mod error;

#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use config::EditorConfig;
pub use error::{BridgeError, ConfigError, Result};
