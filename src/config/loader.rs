//! Configuration loader with layered sources
//!
//! Loads settings from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (WARDEN__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "warden.toml",
    ".warden.toml",
    "~/.config/warden/config.toml",
    "/etc/warden/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        // Explicit path provided - must exist
        let expanded = shellexpand::tilde(path);
        if !Path::new(expanded.as_ref()).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // e.g. WARDEN__ENGINE__CONFIG_INDEX, WARDEN__POLICY__DIR
    builder = builder.add_source(
        Environment::with_prefix("WARDEN")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.engine.config_index.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "engine.config_index".to_string(),
        });
    }

    if config.policy.dir.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "policy.dir".to_string(),
        });
    }

    if let Some(file) = &config.cluster.topology_file
        && file.trim().is_empty()
    {
        return Err(ConfigError::Invalid {
            message: "cluster.topology_file must not be empty when set".to_string(),
        });
    }

    if !matches!(
        config.logging.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::Invalid {
            message: format!(
                "logging.level must be one of trace, debug, info, warn, error, got: {}",
                config.logging.level
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;

    #[test]
    fn test_load_config_from_str_basic() {
        let toml = r#"
[engine]
config_index = "searchguard"

[policy]
dir = "/etc/warden/policy"
reload_interval_secs = 5

[logging]
level = "debug"
format = "json"
"#;

        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.engine.config_index, "searchguard");
        assert_eq!(config.policy.dir, "/etc/warden/policy");
        assert_eq!(config.policy.reload_interval_secs, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.engine.config_index, "warden");
        assert_eq!(config.policy.reload_interval_secs, 30);
    }

    #[test]
    fn test_empty_config_index_error() {
        let toml = r#"
[engine]
config_index = ""
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn test_invalid_log_level_error() {
        let toml = r#"
[logging]
level = "loud"
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file_error() {
        let result = load_config(Some("/nonexistent/warden.toml"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
