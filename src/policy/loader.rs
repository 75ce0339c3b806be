//! File-backed policy documents
//!
//! A policy directory holds three TOML documents:
//!
//! - `roles.toml` (required)
//! - `roles_mapping.toml` (required)
//! - `action_groups.toml` (optional, no groups when absent)

use crate::error::ConfigError;
use crate::policy::types::{ActionGroupsConfig, PolicyDocuments, RolesConfig, RolesMappingConfig};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

pub const ROLES_FILE: &str = "roles.toml";
pub const ROLES_MAPPING_FILE: &str = "roles_mapping.toml";
pub const ACTION_GROUPS_FILE: &str = "action_groups.toml";

/// Load all policy documents from a directory
pub fn load_policy_dir(dir: &Path) -> Result<PolicyDocuments, ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::Load(format!(
            "Policy directory not found: {}",
            dir.display()
        )));
    }

    let roles = read_document(dir, ROLES_FILE)?.ok_or_else(|| missing(dir, ROLES_FILE))?;
    let mapping =
        read_document(dir, ROLES_MAPPING_FILE)?.ok_or_else(|| missing(dir, ROLES_MAPPING_FILE))?;
    let groups = read_document(dir, ACTION_GROUPS_FILE)?.unwrap_or_default();

    load_policy_from_str(&roles, &mapping, &groups)
}

/// Parse policy documents from TOML strings (useful for testing)
pub fn load_policy_from_str(
    roles: &str,
    roles_mapping: &str,
    action_groups: &str,
) -> Result<PolicyDocuments, ConfigError> {
    let roles: RolesConfig = parse(ROLES_FILE, roles)?;
    let mapping: RolesMappingConfig = parse(ROLES_MAPPING_FILE, roles_mapping)?;
    let groups: ActionGroupsConfig = parse(ACTION_GROUPS_FILE, action_groups)?;

    debug!(
        roles = roles.len(),
        mappings = mapping.len(),
        action_groups = groups.len(),
        "Parsed policy documents"
    );

    Ok(PolicyDocuments::new(roles, mapping, groups))
}

fn read_document(dir: &Path, name: &str) -> Result<Option<String>, ConfigError> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

fn parse<T: DeserializeOwned>(name: &str, content: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Load(format!("{}: {}", name, e)))
}

fn missing(dir: &Path, name: &str) -> ConfigError {
    ConfigError::Missing {
        field: dir.join(name).display().to_string(),
    }
}
