//! Compiled policy snapshots
//!
//! A [`PolicySnapshot`] is built once from the policy documents and never
//! mutated afterwards. [`PolicyStore`] publishes new snapshots by atomically
//! swapping an `Arc`. Readers take no lock, and an evaluation that grabbed a
//! snapshot keeps a consistent view even while an update is published.

use crate::error::ConfigError;
use crate::policy::action_groups::ActionGroupResolver;
use crate::policy::role_mapper::RoleMapper;
use crate::policy::types::{
    ActionGroupsConfig, IndexPermissions, PolicyDocuments, RoleDefinition, RolesConfig,
    RolesMappingConfig,
};
use crate::policy::wildcard::{PatternMatcher, WildcardPattern};
use std::collections::BTreeMap;
use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

/// Sub-type pattern with its expanded action patterns
#[derive(Debug, Clone)]
pub struct TypeGrant {
    pub pattern: WildcardPattern,
    pub actions: PatternMatcher,
}

/// Everything a role grants on one resource pattern
#[derive(Debug, Clone)]
pub struct IndexGrant {
    pub pattern: WildcardPattern,
    pub types: Vec<TypeGrant>,
    pub dls: Option<String>,
    pub fls: Vec<String>,
}

impl IndexGrant {
    fn compile(
        pattern: &str,
        permissions: &IndexPermissions,
        groups: ActionGroupResolver<'_>,
    ) -> Result<Self, ConfigError> {
        let types = permissions
            .type_grants()
            .map(|(type_pattern, actions)| {
                let expanded: Vec<String> = groups.expand(actions).into_iter().collect();
                Ok(TypeGrant {
                    pattern: WildcardPattern::new(type_pattern)?,
                    actions: PatternMatcher::new(&expanded)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            pattern: WildcardPattern::new(pattern)?,
            types,
            dls: permissions.dls.clone().filter(|q| !q.is_empty()),
            fls: permissions.fls.clone(),
        })
    }
}

/// A role with every pattern compiled and every action group expanded
#[derive(Debug, Clone)]
pub struct CompiledRole {
    pub cluster: PatternMatcher,
    pub indices: Vec<IndexGrant>,
}

impl CompiledRole {
    fn compile(role: &RoleDefinition, groups: ActionGroupResolver<'_>) -> Result<Self, ConfigError> {
        let cluster_actions: Vec<String> = groups.expand(&role.cluster).into_iter().collect();
        let indices = role
            .indices
            .iter()
            .map(|(pattern, permissions)| IndexGrant::compile(pattern, permissions, groups))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cluster: PatternMatcher::new(&cluster_actions)?,
            indices,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cluster.is_empty() && self.indices.is_empty()
    }
}

/// Immutable, compiled view of all policy documents
#[derive(Debug, Default)]
pub struct PolicySnapshot {
    documents: PolicyDocuments,
    roles: BTreeMap<String, CompiledRole>,
    mapper: RoleMapper,
}

impl PolicySnapshot {
    /// Validate and compile a set of policy documents
    pub fn compile(documents: PolicyDocuments) -> Result<Self, ConfigError> {
        let groups = ActionGroupResolver::new(&documents.action_groups);

        let mut roles = BTreeMap::new();
        for (name, role) in documents.roles.iter().flatten() {
            if role.is_empty() {
                debug!(role = name.as_str(), "Role has no grants");
            }
            let compiled = CompiledRole::compile(role, groups).map_err(|e| match e {
                ConfigError::InvalidPattern { pattern, reason } => ConfigError::InvalidPattern {
                    pattern,
                    reason: format!("in role '{}': {}", name, reason),
                },
                other => other,
            })?;
            roles.insert(name.clone(), compiled);
        }

        let mapper = match &documents.roles_mapping {
            Some(mapping) => RoleMapper::new(mapping)?,
            None => RoleMapper::default(),
        };

        Ok(Self {
            documents,
            roles,
            mapper,
        })
    }

    /// Roles and roles mapping have both been supplied
    pub fn is_initialized(&self) -> bool {
        self.documents.is_complete()
    }

    pub fn role(&self, name: &str) -> Option<&CompiledRole> {
        self.roles.get(name)
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    pub fn role_mapper(&self) -> &RoleMapper {
        &self.mapper
    }

    /// Action group expansion over this snapshot's group table
    pub fn action_groups(&self) -> ActionGroupResolver<'_> {
        ActionGroupResolver::new(&self.documents.action_groups)
    }

    /// The documents this snapshot was compiled from
    pub fn documents(&self) -> &PolicyDocuments {
        &self.documents
    }
}

/// A change to one policy document
#[derive(Debug, Clone)]
pub enum PolicyUpdate {
    Roles(RolesConfig),
    RolesMapping(RolesMappingConfig),
    ActionGroups(ActionGroupsConfig),
}

impl PolicyUpdate {
    pub fn section(&self) -> &'static str {
        match self {
            PolicyUpdate::Roles(_) => "roles",
            PolicyUpdate::RolesMapping(_) => "rolesmapping",
            PolicyUpdate::ActionGroups(_) => "actiongroups",
        }
    }
}

/// Holder of the current snapshot
#[derive(Debug, Default)]
pub struct PolicyStore {
    current: ArcSwap<PolicySnapshot>,
    /// Serializes writers so concurrent section updates are not lost
    update: Mutex<()>,
}

impl PolicyStore {
    /// A store with nothing loaded; evaluations fail until initialized
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile documents and create a store holding the result
    pub fn from_documents(documents: PolicyDocuments) -> Result<Self, ConfigError> {
        Ok(Self::with_snapshot(PolicySnapshot::compile(documents)?))
    }

    pub fn with_snapshot(snapshot: PolicySnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            update: Mutex::new(()),
        }
    }

    /// The snapshot current at the time of the call
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.current.load_full()
    }

    /// Replace the current snapshot wholesale
    pub fn publish(&self, snapshot: PolicySnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Compile and publish a complete set of documents
    pub fn replace(&self, documents: PolicyDocuments) -> Result<(), ConfigError> {
        let _update = self.lock_update();
        let snapshot = PolicySnapshot::compile(documents)?;
        info!(roles = snapshot.role_count(), "Published policy snapshot");
        self.publish(snapshot);
        Ok(())
    }

    /// Apply a change to one policy document.
    ///
    /// The previous snapshot stays in place if the result does not compile.
    pub fn on_change(&self, update: PolicyUpdate) -> Result<(), ConfigError> {
        let _update = self.lock_update();
        let section = update.section();

        let mut documents = self.snapshot().documents().clone();
        match update {
            PolicyUpdate::Roles(roles) => documents.roles = Some(roles),
            PolicyUpdate::RolesMapping(mapping) => documents.roles_mapping = Some(mapping),
            PolicyUpdate::ActionGroups(groups) => documents.action_groups = groups,
        }

        let snapshot = PolicySnapshot::compile(documents).inspect_err(|e| {
            error!(section, error = %e, "Rejected policy update");
        })?;
        info!(section, initialized = snapshot.is_initialized(), "Applied policy update");
        self.publish(snapshot);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_initialized()
    }

    fn lock_update(&self) -> MutexGuard<'_, ()> {
        self.update.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("policy update lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::types::RoleMapping;

    fn roles() -> RolesConfig {
        toml::from_str(
            r#"
[sg_role_starfleet]
cluster = ["CLUSTER_MONITOR"]

[sg_role_starfleet.indices.starfleet]
ships = ["READ"]
_dls_ = ""
_fls_ = ["secret"]
"#,
        )
        .unwrap()
    }

    fn action_groups() -> ActionGroupsConfig {
        toml::from_str(
            r#"
READ = ["indices:data/read*"]
CLUSTER_MONITOR = ["cluster:monitor/*"]
"#,
        )
        .unwrap()
    }

    fn mapping() -> RolesMappingConfig {
        RolesMappingConfig::from([(
            "sg_role_starfleet".to_string(),
            RoleMapping {
                users: vec!["worf".into()],
                ..Default::default()
            },
        )])
    }

    #[test]
    fn test_compile_expands_action_groups() {
        let snapshot =
            PolicySnapshot::compile(PolicyDocuments::new(roles(), mapping(), action_groups()))
                .unwrap();
        assert!(snapshot.is_initialized());

        let role = snapshot.role("sg_role_starfleet").unwrap();
        assert!(role.cluster.matches("cluster:monitor/health"));
        assert!(!role.cluster.matches("CLUSTER_MONITOR"));

        let grant = &role.indices[0];
        assert_eq!(grant.pattern.as_str(), "starfleet");
        assert!(grant.types[0].actions.matches("indices:data/read/search"));
        assert_eq!(grant.dls, None);
        assert_eq!(grant.fls, vec!["secret"]);
    }

    #[test]
    fn test_compile_reports_role_of_invalid_pattern() {
        let mut roles = roles();
        roles.get_mut("sg_role_starfleet").unwrap().cluster = vec!["/[bad/".into()];
        let err = PolicySnapshot::compile(PolicyDocuments::new(roles, mapping(), action_groups()))
            .unwrap_err();
        match err {
            ConfigError::InvalidPattern { reason, .. } => assert!(reason.contains("sg_role_starfleet")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_store_starts_uninitialized() {
        let store = PolicyStore::new();
        assert!(!store.is_initialized());
        assert_eq!(store.snapshot().role_count(), 0);
    }

    #[test]
    fn test_on_change_builds_up_sections() {
        let store = PolicyStore::new();
        store.on_change(PolicyUpdate::ActionGroups(action_groups())).unwrap();
        store.on_change(PolicyUpdate::Roles(roles())).unwrap();
        assert!(!store.is_initialized());

        store.on_change(PolicyUpdate::RolesMapping(mapping())).unwrap();
        assert!(store.is_initialized());
        assert_eq!(store.snapshot().role_count(), 1);
    }

    #[test]
    fn test_rejected_update_keeps_previous_snapshot() {
        let store =
            PolicyStore::from_documents(PolicyDocuments::new(roles(), mapping(), action_groups()))
                .unwrap();
        let before = store.snapshot();

        let mut broken = roles();
        broken.get_mut("sg_role_starfleet").unwrap().cluster = vec!["/[bad/".into()];
        assert!(store.on_change(PolicyUpdate::Roles(broken)).is_err());

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_held_snapshot_survives_publish() {
        let store =
            PolicyStore::from_documents(PolicyDocuments::new(roles(), mapping(), action_groups()))
                .unwrap();
        let held = store.snapshot();

        store.on_change(PolicyUpdate::Roles(RolesConfig::new())).unwrap();

        assert_eq!(held.role_count(), 1);
        assert_eq!(store.snapshot().role_count(), 0);
    }

    #[test]
    fn test_readers_run_alongside_publishing() {
        let full = PolicyDocuments::new(roles(), mapping(), action_groups());
        let store = PolicyStore::from_documents(full.clone()).unwrap();
        let empty = PolicyDocuments::new(RolesConfig::new(), mapping(), action_groups());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let snapshot = store.snapshot();
                        assert!(snapshot.is_initialized());
                        assert!(snapshot.role_count() <= 1);
                    }
                });
            }
            scope.spawn(|| {
                for round in 0..100 {
                    let documents = if round % 2 == 0 { empty.clone() } else { full.clone() };
                    store.replace(documents).unwrap();
                }
            });
        });

        assert_eq!(store.snapshot().role_count(), 1);
    }
}
