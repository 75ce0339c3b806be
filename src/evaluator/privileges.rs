//! Privilege evaluation
//!
//! Decides whether a user may perform an action on the resources a request
//! addresses. Evaluation is synchronous and reads exactly one policy
//! snapshot, so a concurrent policy update is either fully visible or not
//! at all.
//!
//! The order of checks:
//! 1. Snapshot restore is refused outright
//! 2. Requested indices and sub-types are resolved against the topology
//! 3. Mutating the configuration index (directly or through `_all`) is refused
//! 4. Caching and realtime reads are turned off for those same targets
//! 5. Roles are mapped from the user and caller address
//! 6. Cluster-scoped actions are allowed by the first role granting them;
//!    resource-scoped actions are allowed when any role has a resource
//!    grant covering every requested index and sub-type
//! 7. Row filters and redacted fields of every covering grant are attached

use crate::audit::AuditLog;
use crate::error::{ConfigError, EvaluationError};
use crate::evaluator::decision::Decision;
use crate::evaluator::request::{Request, TransportAddress, User};
use crate::evaluator::resolve::{RequestedResources, resolve};
use crate::evaluator::topology::ClusterTopology;
use crate::policy::snapshot::{CompiledRole, IndexGrant, PolicySnapshot, PolicyStore};
use crate::policy::wildcard::PatternMatcher;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Mutating actions never allowed on the configuration index
pub const DENIED_CONFIG_INDEX_ACTIONS: &[&str] = &[
    "indices:data/write*",
    "indices:admin/close",
    "indices:admin/delete",
];

/// Action prefixes checked against a role's cluster grants
pub const CLUSTER_SCOPED_PREFIXES: &[&str] = &[
    "cluster:",
    "indices:admin/template/delete",
    "indices:admin/template/get",
    "indices:admin/template/put",
    "indices:data/read/scroll",
];

/// Action prefix refused for every regular user
pub const SNAPSHOT_RESTORE_PREFIX: &str = "cluster:admin/snapshot/restore";

/// Row filter placeholder replaced with the caller's name
pub const USER_NAME_PLACEHOLDER: &str = "${user.name}";

/// Whether an action is matched against cluster grants instead of
/// resource grants
pub fn is_cluster_scoped(action: &str) -> bool {
    CLUSTER_SCOPED_PREFIXES
        .iter()
        .any(|prefix| action.starts_with(prefix))
}

/// The privilege evaluator
pub struct PrivilegesEvaluator {
    store: Arc<PolicyStore>,
    audit: Arc<dyn AuditLog>,
    config_index: String,
    denied_actions: PatternMatcher,
}

impl PrivilegesEvaluator {
    /// Create an evaluator reading policy from `store` and protecting
    /// `config_index`
    pub fn new(
        store: Arc<PolicyStore>,
        audit: Arc<dyn AuditLog>,
        config_index: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config_index = config_index.into();
        if config_index.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "engine.config_index".to_string(),
            });
        }

        Ok(Self {
            store,
            audit,
            config_index,
            denied_actions: PatternMatcher::new(DENIED_CONFIG_INDEX_ACTIONS)?,
        })
    }

    pub fn config_index(&self) -> &str {
        &self.config_index
    }

    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    /// Roles and roles mapping are both loaded
    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    /// Roles assigned to `user` when calling from `caller`
    pub fn map_roles(
        &self,
        user: Option<&User>,
        caller: Option<&TransportAddress>,
    ) -> Result<BTreeSet<String>, EvaluationError> {
        let snapshot = self.initialized_snapshot()?;
        Ok(snapshot.role_mapper().map_roles(user, caller))
    }

    /// Evaluate `action` on `request` for `user`.
    ///
    /// A denial is `Ok` with `allowed == false`. Errors are reserved for
    /// callers that break the contract: a request without a remote address
    /// or an evaluator without loaded policy.
    pub fn evaluate(
        &self,
        user: &User,
        action: &str,
        request: &mut Request,
        topology: &dyn ClusterTopology,
    ) -> Result<Decision, EvaluationError> {
        if action.starts_with(SNAPSHOT_RESTORE_PREFIX) {
            self.audit.log_missing_privileges(action, request);
            warn!(action, "Action is not allowed for a regular user");
            return Ok(Decision::denied());
        }

        let caller = request
            .context
            .remote_address
            .clone()
            .ok_or(EvaluationError::MissingContext {
                field: "remote_address",
            })?;

        let snapshot = self.initialized_snapshot()?;

        debug!(%user, action, %caller, "Evaluating permissions");

        let requested = resolve(&request.body, topology);
        debug!(
            indices = ?requested.indices,
            types = ?requested.types,
            "Requested resolved indices and types"
        );

        let touches_config_index =
            requested.contains_index(&self.config_index) || requested.targets_all_indices();

        if touches_config_index && self.denied_actions.matches(action) {
            self.audit.log_config_index_attempt(request, action);
            if requested.targets_all_indices() {
                warn!(action, "Action on '_all' indices is not allowed for a regular user");
            } else {
                warn!(
                    action,
                    index = self.config_index.as_str(),
                    "Action on the configuration index is not allowed for a regular user"
                );
            }
            return Ok(Decision::denied());
        }

        if touches_config_index {
            if request.body.disable_request_cache() {
                debug!("Disabled search request cache for this request");
            }
            if request.body.disable_realtime() {
                debug!("Disabled realtime for this request");
            }
        }

        let roles = snapshot.role_mapper().map_roles(Some(user), Some(&caller));
        debug!(?roles, "Mapped roles");

        let decision = if is_cluster_scoped(action) {
            evaluate_cluster(&snapshot, &roles, action)
        } else {
            evaluate_resources(&snapshot, &roles, user, action, &requested, topology)
        };

        if decision.is_denied() {
            info!(action, ?roles, "No permission match");
        }

        decision.attach_to(&mut request.context);
        Ok(decision)
    }

    fn initialized_snapshot(&self) -> Result<Arc<PolicySnapshot>, EvaluationError> {
        let snapshot = self.store.snapshot();
        if !snapshot.is_initialized() {
            return Err(EvaluationError::NotInitialized);
        }
        Ok(snapshot)
    }
}

impl std::fmt::Debug for PrivilegesEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivilegesEvaluator")
            .field("config_index", &self.config_index)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Roles that exist and grant something
fn defined_roles<'a>(
    snapshot: &'a PolicySnapshot,
    roles: &'a BTreeSet<String>,
) -> impl Iterator<Item = (&'a str, &'a CompiledRole)> {
    roles.iter().filter_map(|name| match snapshot.role(name) {
        Some(role) if !role.is_empty() => Some((name.as_str(), role)),
        _ => {
            debug!(role = name.as_str(), "Role is undefined or empty");
            None
        }
    })
}

/// The first role granting the action wins; later roles are not consulted
fn evaluate_cluster(snapshot: &PolicySnapshot, roles: &BTreeSet<String>, action: &str) -> Decision {
    for (name, role) in defined_roles(snapshot, roles) {
        if let Some(pattern) = role.cluster.find_match(action) {
            debug!(role = name, action, pattern, "Cluster action granted, skipping other roles");
            return Decision::allowed();
        }
        trace!(role = name, action, "No cluster grant, checking next role");
    }
    Decision::denied()
}

/// Every role is tried so that directives of all covering grants merge
fn evaluate_resources(
    snapshot: &PolicySnapshot,
    roles: &BTreeSet<String>,
    user: &User,
    action: &str,
    requested: &RequestedResources,
    topology: &dyn ClusterTopology,
) -> Decision {
    let mut covering: Vec<(&str, &IndexGrant)> = Vec::new();

    for (name, role) in defined_roles(snapshot, roles) {
        debug!(role = name, "Evaluating role");
        for grant in &role.indices {
            if covers(grant, action, requested, topology) {
                debug!(role = name, pattern = grant.pattern.as_str(), "Grant covers the request");
                covering.push((name, grant));
            }
        }
    }

    let mut decision = Decision {
        allowed: !covering.is_empty(),
        ..Decision::default()
    };

    for (name, grant) in covering {
        if let Some(dls) = &grant.dls {
            let query = dls.replace(USER_NAME_PLACEHOLDER, &user.name);
            debug!(role = name, pattern = grant.pattern.as_str(), query = query.as_str(), "Row filter");
            decision.dls_queries.insert(query);
        }
        if !grant.fls.is_empty() {
            debug!(role = name, pattern = grant.pattern.as_str(), fields = ?grant.fls, "Redacted fields");
            decision.fls_fields.extend(grant.fls.iter().cloned());
        }
    }

    decision
}

/// Whether one resource grant covers every requested index and sub-type
fn covers(
    grant: &IndexGrant,
    action: &str,
    requested: &RequestedResources,
    topology: &dyn ClusterTopology,
) -> bool {
    let matched_indices = if grant.pattern.has_wildcard() {
        let matched = grant.pattern.matching(&requested.indices);
        if matched.is_empty() {
            trace!(pattern = grant.pattern.as_str(), "No wildcard match");
            return false;
        }
        matched
    } else {
        let permitted = permitted_indices(grant.pattern.as_str(), topology);
        trace!(pattern = grant.pattern.as_str(), ?permitted, "Resolved permitted indices");
        requested
            .indices
            .intersection(&permitted)
            .cloned()
            .collect()
    };

    let mut outstanding_indices = requested.indices.clone();
    let mut outstanding_types = requested.types.clone();

    for type_grant in &grant.types {
        let matched_types = type_grant.pattern.matching(&requested.types);
        if matched_types.is_empty() {
            trace!(
                pattern = grant.pattern.as_str(),
                sub_type = type_grant.pattern.as_str(),
                "No sub-type match"
            );
            continue;
        }

        if type_grant.actions.matches(action) {
            trace!(
                pattern = grant.pattern.as_str(),
                sub_type = type_grant.pattern.as_str(),
                action,
                "Action granted"
            );
            outstanding_indices.retain(|index| !matched_indices.contains(index));
            outstanding_types.retain(|sub_type| !matched_types.contains(sub_type));
        }
    }

    trace!(
        pattern = grant.pattern.as_str(),
        ?outstanding_indices,
        ?outstanding_types,
        "Remaining after grant"
    );
    outstanding_indices.is_empty() && outstanding_types.is_empty()
}

/// Concrete indices a literal grant pattern stands for. Names the topology
/// does not know are taken literally.
fn permitted_indices(pattern: &str, topology: &dyn ClusterTopology) -> BTreeSet<String> {
    if !topology.has_index_or_alias(pattern) {
        trace!(pattern, "Permitted index not found, using it literally");
        return BTreeSet::from([pattern.to_string()]);
    }

    topology.concrete_indices(pattern).unwrap_or_else(|e| {
        debug!(pattern, error = %e, "Cannot resolve permitted index, using it literally");
        BTreeSet::from([pattern.to_string()])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NoopAuditLog;
    use crate::evaluator::request::{ActionRequest, SearchRequest};
    use crate::evaluator::topology::StaticTopology;
    use crate::policy::loader::load_policy_from_str;
    use rstest::rstest;
    use std::net::{IpAddr, Ipv4Addr};

    const ROLES: &str = r#"
[sg_role_starfleet.indices.starfleet]
ships = ["indices:data/read*"]

[sg_role_public.indices."pub*"]
"*" = ["indices:*"]
"#;

    const MAPPING: &str = r#"
[sg_role_starfleet]
users = ["picard"]

[sg_role_public]
users = ["picard"]
"#;

    fn evaluator() -> PrivilegesEvaluator {
        let docs = load_policy_from_str(ROLES, MAPPING, "").unwrap();
        let store = Arc::new(PolicyStore::from_documents(docs).unwrap());
        PrivilegesEvaluator::new(store, Arc::new(NoopAuditLog), "warden").unwrap()
    }

    fn topology() -> StaticTopology {
        StaticTopology::new(["starfleet", "public", "warden"])
    }

    fn search(indices: &[&str], types: &[&str]) -> Request {
        Request::new(ActionRequest::Search(SearchRequest {
            indices: indices.iter().map(|s| s.to_string()).collect(),
            types: types.iter().map(|s| s.to_string()).collect(),
            request_cache: None,
        }))
        .with_remote_address(TransportAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST)))
    }

    #[rstest]
    #[case("cluster:monitor/health", true)]
    #[case("indices:admin/template/put", true)]
    #[case("indices:data/read/scroll/clear", true)]
    #[case("indices:data/read/search", false)]
    #[case("indices:admin/create", false)]
    fn test_cluster_scoped_actions(#[case] action: &str, #[case] expected: bool) {
        assert_eq!(is_cluster_scoped(action), expected);
    }

    #[test]
    fn test_empty_config_index_rejected() {
        let result = PrivilegesEvaluator::new(
            Arc::new(PolicyStore::new()),
            Arc::new(NoopAuditLog),
            " ",
        );
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_literal_grant_covers_requested_type() {
        let evaluator = evaluator();
        let mut request = search(&["starfleet"], &["ships"]);
        let decision = evaluator
            .evaluate(&User::new("picard"), "indices:data/read/search", &mut request, &topology())
            .unwrap();
        assert!(decision.is_allowed());
        assert!(!decision.has_directives());
    }

    #[test]
    fn test_grant_must_cover_every_index() {
        let evaluator = evaluator();
        let mut request = search(&["starfleet", "public"], &["ships"]);
        let decision = evaluator
            .evaluate(&User::new("picard"), "indices:data/read/search", &mut request, &topology())
            .unwrap();
        assert!(decision.is_denied());
    }

    #[test]
    fn test_unknown_literal_grant_is_taken_literally() {
        let topology = StaticTopology::new(["public"]);
        let requested = RequestedResources {
            indices: BTreeSet::from(["starfleet".to_string()]),
            types: BTreeSet::from(["ships".to_string()]),
        };
        let snapshot = evaluator().store().snapshot();
        let grant = &snapshot.role("sg_role_starfleet").unwrap().indices[0];
        assert!(covers(grant, "indices:data/read/get", &requested, &topology));
        assert!(!covers(grant, "indices:data/write/index", &requested, &topology));
    }

    #[test]
    fn test_map_roles_requires_initialized_store() {
        let evaluator =
            PrivilegesEvaluator::new(Arc::new(PolicyStore::new()), Arc::new(NoopAuditLog), "warden")
                .unwrap();
        assert_eq!(
            evaluator.map_roles(Some(&User::new("picard")), None),
            Err(EvaluationError::NotInitialized)
        );
    }
}
