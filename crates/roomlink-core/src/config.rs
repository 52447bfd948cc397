//! Configuration resolution for roomlink.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (<config dir>/roomlink/settings.json)
//! 3. Project config (.roomlink/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! Files may be partial; each layer only overrides the keys it names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Complete roomlink configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub publisher: PublisherConfig,
    pub poller: PollerConfig,
    pub logging: LoggingConfig,
}

/// Where booking records live.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// `SQLite` file shared by host and client processes. `None` means the
    /// store is not configured.
    pub database_path: Option<PathBuf>,
}

/// Meeting code publisher timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PublisherConfig {
    /// Trailing-edge debounce after the last local change.
    pub update_delay_ms: u64,
    /// Window in which re-sending the last written value is suppressed.
    pub throttle_window_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            update_delay_ms: 1_000,
            throttle_window_ms: 1_000,
        }
    }
}

impl PublisherConfig {
    pub const fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }

    pub const fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_ms)
    }
}

/// Room link poller timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollerConfig {
    pub poll_interval_ms: u64,
    /// Age under which a previous read is reused instead of hitting the store.
    pub cache_expiry_ms: u64,
    /// Upper bound on a single store read.
    pub read_timeout_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            cache_expiry_ms: 60_000,
            read_timeout_ms: 4_000,
        }
    }
}

impl PollerConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn cache_expiry(&self) -> Duration {
        Duration::from_millis(self.cache_expiry_ms)
    }

    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let global = global_config_path();
    let project = project_dir.map(|dir| dir.join(".roomlink").join("settings.json"));
    let mut config = load_layers(global.as_deref(), project.as_deref())?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("roomlink").join("settings.json"))
}

/// Default location of the shared booking database.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("roomlink").join("bookings.db"))
}

fn load_layers(global: Option<&Path>, project: Option<&Path>) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    for path in [global, project].into_iter().flatten() {
        if path.exists() {
            merge_json(&mut merged, load_config_file(path)?);
        }
    }
    serde_json::from_value(merged).map_err(|e| Error::Config(format!("Invalid configuration: {e}")))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(Error::Config(format!(
            "Config file {} must contain a JSON object",
            path.display()
        )))
    }
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    fn millis(var: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut u64) {
        if let Some(n) = var(key).and_then(|v| v.trim().parse().ok()) {
            *slot = n;
        }
    }

    if let Some(path) = var("ROOMLINK_DB_PATH").filter(|v| !v.is_empty()) {
        config.store.database_path = Some(PathBuf::from(path));
    }
    millis(&var, "ROOMLINK_UPDATE_DELAY_MS", &mut config.publisher.update_delay_ms);
    millis(&var, "ROOMLINK_THROTTLE_MS", &mut config.publisher.throttle_window_ms);
    millis(&var, "ROOMLINK_POLL_INTERVAL_MS", &mut config.poller.poll_interval_ms);
    millis(&var, "ROOMLINK_CACHE_EXPIRY_MS", &mut config.poller.cache_expiry_ms);
    millis(&var, "ROOMLINK_READ_TIMEOUT_MS", &mut config.poller.read_timeout_ms);
    if let Some(level) = var("ROOMLINK_LOG_LEVEL").filter(|v| !v.is_empty()) {
        config.logging.level = level;
    }
}
