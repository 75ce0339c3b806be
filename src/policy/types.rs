//! Policy document types
//!
//! These mirror the three policy documents a configuration repository
//! supplies: roles, roles mapping and action groups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved per-resource key holding the row filter template
pub const DLS_KEY: &str = "_dls_";

/// Reserved per-resource key holding the redacted field list
pub const FLS_KEY: &str = "_fls_";

/// Keys that live next to sub-type patterns but are never sub-types
pub const RESERVED_KEYS: &[&str] = &[DLS_KEY, FLS_KEY];

/// All role definitions, keyed by role name
pub type RolesConfig = BTreeMap<String, RoleDefinition>;

/// All role mappings, keyed by role name
pub type RolesMappingConfig = BTreeMap<String, RoleMapping>;

/// All action groups, keyed by group name
pub type ActionGroupsConfig = BTreeMap<String, Vec<String>>;

/// A role: cluster-wide grants plus per-resource grants
///
/// ```toml
/// [sg_role_starfleet]
/// cluster = ["CLUSTER_MONITOR"]
///
/// [sg_role_starfleet.indices.starfleet]
/// ships = ["READ"]
/// _dls_ = '{"term": {"owner": "${user.name}"}}'
/// _fls_ = ["secret"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDefinition {
    /// Cluster-scoped action patterns
    pub cluster: Vec<String>,

    /// Resource pattern -> permissions on that resource
    pub indices: BTreeMap<String, IndexPermissions>,
}

impl RoleDefinition {
    /// A role with neither cluster nor resource grants is skipped
    pub fn is_empty(&self) -> bool {
        self.cluster.is_empty() && self.indices.is_empty()
    }
}

/// Permissions attached to one resource pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPermissions {
    /// Row filter template
    #[serde(rename = "_dls_", default, skip_serializing_if = "Option::is_none")]
    pub dls: Option<String>,

    /// Redacted field names
    #[serde(rename = "_fls_", default, skip_serializing_if = "Vec::is_empty")]
    pub fls: Vec<String>,

    /// Sub-type pattern -> action patterns
    #[serde(flatten)]
    pub types: BTreeMap<String, Vec<String>>,
}

impl IndexPermissions {
    /// Sub-type grants, never including the reserved directive keys
    pub fn type_grants(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.types
            .iter()
            .filter(|(name, _)| !RESERVED_KEYS.contains(&name.as_str()))
    }
}

/// Who may assume a role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleMapping {
    /// User name patterns
    pub users: Vec<String>,

    /// Backend role patterns
    #[serde(alias = "backendroles")]
    pub backend_roles: Vec<String>,

    /// Host patterns, matched against address literal and resolved hostname
    pub hosts: Vec<String>,
}

/// The full set of policy documents a snapshot is compiled from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocuments {
    pub roles: Option<RolesConfig>,
    pub roles_mapping: Option<RolesMappingConfig>,
    pub action_groups: ActionGroupsConfig,
}

impl PolicyDocuments {
    pub fn new(
        roles: RolesConfig,
        roles_mapping: RolesMappingConfig,
        action_groups: ActionGroupsConfig,
    ) -> Self {
        Self {
            roles: Some(roles),
            roles_mapping: Some(roles_mapping),
            action_groups,
        }
    }

    /// Both roles and roles mapping have been supplied
    pub fn is_complete(&self) -> bool {
        self.roles.is_some() && self.roles_mapping.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_role_with_directives() {
        let doc = r#"
[sg_role_starfleet]
cluster = ["CLUSTER_MONITOR"]

[sg_role_starfleet.indices.starfleet]
ships = ["READ"]
public = ["indices:*"]
_dls_ = '{"term": {"owner": "${user.name}"}}'
_fls_ = ["secret", "salary"]
"#;
        let roles: RolesConfig = toml::from_str(doc).unwrap();
        let role = &roles["sg_role_starfleet"];
        assert_eq!(role.cluster, vec!["CLUSTER_MONITOR"]);

        let perms = &role.indices["starfleet"];
        assert_eq!(
            perms.dls.as_deref(),
            Some(r#"{"term": {"owner": "${user.name}"}}"#)
        );
        assert_eq!(perms.fls, vec!["secret", "salary"]);

        let types: Vec<&str> = perms.type_grants().map(|(t, _)| t.as_str()).collect();
        assert_eq!(types, vec!["public", "ships"]);
    }

    #[test]
    fn test_type_grants_skip_reserved_keys() {
        let mut perms = IndexPermissions::default();
        perms.types.insert("ships".into(), vec!["READ".into()]);
        perms.types.insert(DLS_KEY.into(), vec!["bogus".into()]);
        perms.types.insert(FLS_KEY.into(), vec!["bogus".into()]);

        let types: Vec<&str> = perms.type_grants().map(|(t, _)| t.as_str()).collect();
        assert_eq!(types, vec!["ships"]);
    }

    #[test]
    fn test_deserialize_role_mapping_aliases() {
        let doc = r#"
[sg_role_starfleet]
users = ["worf"]
backend_roles = ["starfleet"]
hosts = ["*.starfleetintranet.com"]

[sg_role_klingons]
backendroles = ["klingon"]
"#;
        let mapping: RolesMappingConfig = toml::from_str(doc).unwrap();
        assert_eq!(mapping["sg_role_starfleet"].users, vec!["worf"]);
        assert_eq!(mapping["sg_role_starfleet"].backend_roles, vec!["starfleet"]);
        assert_eq!(mapping["sg_role_klingons"].backend_roles, vec!["klingon"]);
        assert!(mapping["sg_role_klingons"].hosts.is_empty());
    }

    #[test]
    fn test_empty_role() {
        assert!(RoleDefinition::default().is_empty());
    }

    #[test]
    fn test_documents_completeness() {
        let mut docs = PolicyDocuments::default();
        assert!(!docs.is_complete());
        docs.roles = Some(RolesConfig::new());
        assert!(!docs.is_complete());
        docs.roles_mapping = Some(RolesMappingConfig::new());
        assert!(docs.is_complete());
    }
}
