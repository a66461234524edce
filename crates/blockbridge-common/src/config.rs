use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings for one composing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EditorConfig {
    /// Debug build: shows the developer menu item.
    pub debug: bool,
    /// Load the embedded editor bundle from a local dev server instead of the packaged one.
    pub build_from_source: bool,
    /// How long `get_title`/`get_content` wait on the embedded runtime.
    pub fetch_timeout_ms: u64,
    /// Debounce for options-menu invalidation after undo/redo state changes.
    pub options_invalidate_delay_ms: u64,
    /// Whether the formatting toolbar starts expanded.
    pub toolbar_expanded: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debug: cfg!(debug_assertions),
            build_from_source: false,
            fetch_timeout_ms: Self::DEFAULT_FETCH_TIMEOUT_MS,
            options_invalidate_delay_ms: Self::DEFAULT_OPTIONS_DELAY_MS,
            toolbar_expanded: false,
        }
    }
}

impl EditorConfig {
    pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;
    /// Matches the platform's medium animation time.
    pub const DEFAULT_OPTIONS_DELAY_MS: u64 = 400;

    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `BLOCKBRIDGE_DEBUG`: `true`/`false` (default: debug build)
    /// - `BLOCKBRIDGE_BUILD_FROM_SOURCE`: `true`/`false` (default: false)
    /// - `BLOCKBRIDGE_FETCH_TIMEOUT_MS`: fetch timeout in milliseconds (default: 5000)
    /// - `BLOCKBRIDGE_OPTIONS_DELAY_MS`: options-menu debounce (default: 400)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`EditorConfig::from_env`] but reading through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("BLOCKBRIDGE_DEBUG") {
            config.debug = parse_bool("BLOCKBRIDGE_DEBUG", value)?;
        }
        if let Some(value) = lookup("BLOCKBRIDGE_BUILD_FROM_SOURCE") {
            config.build_from_source = parse_bool("BLOCKBRIDGE_BUILD_FROM_SOURCE", value)?;
        }
        if let Some(value) = lookup("BLOCKBRIDGE_FETCH_TIMEOUT_MS") {
            config.fetch_timeout_ms = parse_millis("BLOCKBRIDGE_FETCH_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("BLOCKBRIDGE_OPTIONS_DELAY_MS") {
            config.options_invalidate_delay_ms =
                parse_millis("BLOCKBRIDGE_OPTIONS_DELAY_MS", value)?;
        }

        Ok(config)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load configuration from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let read = || {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&read()?),
            Some("json") => Ok(serde_json::from_str(&read()?)?),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn options_invalidate_delay(&self) -> Duration {
        Duration::from_millis(self.options_invalidate_delay_ms)
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv { var, value }),
    }
}

fn parse_millis(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
