//! TOML-based configuration persistence for the engine.
//!
//! Reads and writes `EngineConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\NestBoard\config.toml`
//! - Linux:    `~/.config/nestboard/config.toml`
//! - macOS:    `~/Library/Application Support/NestBoard/config.toml`
//!
//! Every field carries a `#[serde(default = "...")]` so the engine starts
//! correctly before a config file exists and keeps working when an older file
//! is missing newer fields.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nestboard_core::GestureConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level engine configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub gesture: GestureSection,
    #[serde(default)]
    pub injection: InjectionSection,
    #[serde(default)]
    pub ime: ImeSection,
    #[serde(default)]
    pub feedback: FeedbackSection,
}

/// General engine behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    /// Layout identifier resolved by the key registry (e.g. `"ansi-104"`,
    /// `"kr-106"`).  Unknown identifiers fall back to the default layout.
    #[serde(default = "default_layout")]
    pub layout: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Gesture timing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GestureSection {
    /// Press duration (ms) at or above which a modifier/toggle locks.
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
    /// Minimum interval (ms) between two clicks of the same key.
    #[serde(default = "default_min_gesture_interval_ms")]
    pub min_gesture_interval_ms: u64,
}

/// Injection retry and health settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionSection {
    /// Retries after the first attempt for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay (ms) between attempts.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Budget (ms) for one delivery attempt.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Consecutive final failures that mark the engine degraded.
    #[serde(default = "default_degraded_threshold")]
    pub degraded_threshold: u32,
    /// Consecutive successes that restore the engine to healthy.
    #[serde(default = "default_recovery_streak")]
    pub recovery_streak: u32,
    /// Interval (ms) between liveness probes while degraded.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// Samples retained by the delivery metrics window.
    #[serde(default = "default_metrics_window")]
    pub metrics_window: usize,
}

/// Input-method synchronisation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImeSection {
    /// Interval (ms) between OS input-method state polls.
    #[serde(default = "default_ime_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Feedback cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackSection {
    /// Switch profile identifier (e.g. `"mxbrown"`).
    #[serde(default = "default_switch_type")]
    pub switch_type: String,
    /// Maximum cached clips.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Seconds a clip may sit unused before maintenance reclaims it.
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: u64,
    /// Budget (ms) for one sample load.
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
    /// Interval (s) between maintenance passes and resource reports.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
}

impl GestureSection {
    /// Converts the on-disk millisecond fields to the domain timing config.
    pub fn to_gesture_config(&self) -> GestureConfig {
        GestureConfig {
            long_press: Duration::from_millis(self.long_press_ms),
            min_gesture_interval: Duration::from_millis(self.min_gesture_interval_ms),
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_layout() -> String {
    "ansi-104".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_long_press_ms() -> u64 {
    600
}
fn default_min_gesture_interval_ms() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    25
}
fn default_attempt_timeout_ms() -> u64 {
    150
}
fn default_degraded_threshold() -> u32 {
    3
}
fn default_recovery_streak() -> u32 {
    3
}
fn default_probe_interval_ms() -> u64 {
    5000
}
fn default_metrics_window() -> usize {
    128
}
fn default_ime_poll_interval_ms() -> u64 {
    200
}
fn default_switch_type() -> String {
    "mxbrown".to_string()
}
fn default_cache_capacity() -> usize {
    64
}
fn default_max_idle_secs() -> u64 {
    300
}
fn default_load_timeout_ms() -> u64 {
    250
}
fn default_report_interval_secs() -> u64 {
    60
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            layout: default_layout(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GestureSection {
    fn default() -> Self {
        Self {
            long_press_ms: default_long_press_ms(),
            min_gesture_interval_ms: default_min_gesture_interval_ms(),
        }
    }
}

impl Default for InjectionSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            degraded_threshold: default_degraded_threshold(),
            recovery_streak: default_recovery_streak(),
            probe_interval_ms: default_probe_interval_ms(),
            metrics_window: default_metrics_window(),
        }
    }
}

impl Default for ImeSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_ime_poll_interval_ms(),
        }
    }
}

impl Default for FeedbackSection {
    fn default() -> Self {
        Self {
            switch_type: default_switch_type(),
            cache_capacity: default_cache_capacity(),
            max_idle_secs: default_max_idle_secs(),
            load_timeout_ms: default_load_timeout_ms(),
            report_interval_secs: default_report_interval_secs(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `EngineConfig` from disk, returning `EngineConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: EngineConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the config directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &EngineConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("NestBoard"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("nestboard"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("NestBoard")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
