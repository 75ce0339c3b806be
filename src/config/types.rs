//! Configuration types for warden
//!
//! This module defines the settings structure that can be loaded from
//! TOML files and/or environment variables. Policy documents are not part
//! of it; see [`crate::policy::loader`].

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Evaluation engine settings
    pub engine: EngineConfig,

    /// Where policy documents live and how often they are reread
    pub policy: PolicyConfig,

    /// Cluster topology source
    pub cluster: ClusterConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Evaluation engine settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name of the protected configuration index
    pub config_index: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_index: "warden".to_string(),
        }
    }
}

/// Policy document source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Directory holding roles.toml, roles_mapping.toml and action_groups.toml
    pub dir: String,

    /// Seconds between policy reloads in `serve` (0 disables reloading)
    pub reload_interval_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            dir: "policy".to_string(),
            reload_interval_secs: 30,
        }
    }
}

impl PolicyConfig {
    /// Policy directory with `~` expanded
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).into_owned())
    }

    pub fn reload_interval(&self) -> Option<Duration> {
        (self.reload_interval_secs > 0).then(|| Duration::from_secs(self.reload_interval_secs))
    }
}

/// Cluster topology source
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// TOML file listing indices and aliases
    pub topology_file: Option<String>,
}

impl ClusterConfig {
    pub fn topology_path(&self) -> Option<PathBuf> {
        self.topology_file
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
