//! Configuration loading tests

use warden::config::{LogFormat, load_config, load_config_from_str};
use warden::error::ConfigError;

const FULL_CONFIG: &str = r#"
[engine]
config_index = "searchguard"

[policy]
dir = "/etc/warden/policy"
reload_interval_secs = 0

[cluster]
topology_file = "/etc/warden/topology.toml"

[logging]
level = "warn"
format = "json"
"#;

#[test]
fn test_full_config() {
    let config = load_config_from_str(FULL_CONFIG).unwrap();

    assert_eq!(config.engine.config_index, "searchguard");
    assert_eq!(config.policy.dir, "/etc/warden/policy");
    assert_eq!(config.policy.reload_interval(), None);
    assert_eq!(
        config.cluster.topology_path().as_deref(),
        Some(std::path::Path::new("/etc/warden/topology.toml"))
    );
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = load_config_from_str(
        r#"
[policy]
dir = "custom"
"#,
    )
    .unwrap();

    assert_eq!(config.policy.dir, "custom");
    assert_eq!(config.policy.reload_interval_secs, 30);
    assert_eq!(config.engine.config_index, "warden");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_empty_policy_dir_rejected() {
    let result = load_config_from_str(
        r#"
[policy]
dir = ""
"#,
    );
    assert!(matches!(result, Err(ConfigError::Missing { .. })));
}

#[test]
fn test_empty_topology_file_rejected() {
    let result = load_config_from_str(
        r#"
[cluster]
topology_file = ""
"#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

#[test]
fn test_unknown_log_format_rejected() {
    let result = load_config_from_str(
        r#"
[logging]
format = "xml"
"#,
    );
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
#[serial_test::serial]
fn test_explicit_file() {
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("warden.toml");
    fs::write(&config_path, FULL_CONFIG).unwrap();

    let config = load_config(Some(config_path.to_str().unwrap())).unwrap();
    assert_eq!(config.engine.config_index, "searchguard");
}

#[test]
#[serial_test::serial]
fn test_env_overrides_file() {
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("warden.toml");
    fs::write(&config_path, FULL_CONFIG).unwrap();

    unsafe {
        env::set_var("WARDEN__ENGINE__CONFIG_INDEX", "from_env");
        env::set_var("WARDEN__POLICY__RELOAD_INTERVAL_SECS", "5");
    }

    let config = load_config(Some(config_path.to_str().unwrap()));

    // Cleanup
    unsafe {
        env::remove_var("WARDEN__ENGINE__CONFIG_INDEX");
        env::remove_var("WARDEN__POLICY__RELOAD_INTERVAL_SECS");
    }

    let config = config.unwrap();
    assert_eq!(config.engine.config_index, "from_env");
    assert_eq!(config.policy.reload_interval_secs, 5);
    assert_eq!(config.policy.dir, "/etc/warden/policy");
}

#[test]
#[serial_test::serial]
fn test_missing_explicit_file() {
    let result = load_config(Some("/nonexistent/path/warden.toml"));
    assert!(matches!(result, Err(ConfigError::Load(_))));
}
