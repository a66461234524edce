//! Error types shared by the editor bridge crates.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for bridge operations.
///
/// Most bridge operations are total: a runtime that is not ready or a host
/// that went away turns into a logged no-op or a safe default. The variants
/// here are what callers can still observe.
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    /// The embedded runtime has no root view attached.
    #[error("embedded editor runtime is not ready")]
    #[diagnostic(code(bridge::runtime_not_ready))]
    RuntimeNotReady,

    /// The controller is not attached to a host screen.
    #[error("editor controller is not attached to a host")]
    #[diagnostic(code(bridge::not_attached))]
    NotAttached,

    /// Fetching the title or content from the embedded runtime timed out.
    #[error("timed out waiting for the editor to return its {what}")]
    #[diagnostic(
        code(bridge::content_fetch_timeout),
        help("this is transient, retry from a background thread")
    )]
    ContentFetchTimeout { what: &'static str },

    #[error("upload of media {local_id} failed: {message}")]
    #[diagnostic(code(bridge::upload_failed))]
    UploadFailed { local_id: String, message: String },

    #[error("camera and storage permissions were denied")]
    #[diagnostic(code(bridge::permission_denied))]
    PermissionDenied,

    /// The host does not implement a contract the editor relies on.
    #[error("host must implement {contract}")]
    #[diagnostic(code(bridge::host_contract))]
    HostContract { contract: &'static str },

    #[error("invalid lifecycle transition: {event} while {from}")]
    #[diagnostic(code(bridge::lifecycle))]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration loading errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    #[diagnostic(code(config::invalid_env))]
    InvalidEnv { var: &'static str, value: String },

    #[error("failed to read config file {}", path.display())]
    #[diagnostic(code(config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported config file format: {}", path.display())]
    #[diagnostic(code(config::format), help("use a .toml or .json file"))]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to parse TOML config")]
    #[diagnostic(code(config::toml))]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON config")]
    #[diagnostic(code(config::json))]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
