//! Role mapping
//!
//! Computes which roles an identity may assume. Each mapping entry is tested
//! independently, and an entry is assigned when any of its criteria matches:
//! a backend role, the user name, or the caller's address or hostname.

use crate::error::ConfigError;
use crate::evaluator::request::{TransportAddress, User};
use crate::policy::types::{RoleMapping, RolesMappingConfig};
use crate::policy::wildcard::PatternMatcher;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Compiled criteria of one role mapping entry
#[derive(Debug, Clone, Default)]
struct MappingCriteria {
    users: PatternMatcher,
    backend_roles: PatternMatcher,
    hosts: PatternMatcher,
}

impl MappingCriteria {
    fn compile(mapping: &RoleMapping) -> Result<Self, ConfigError> {
        Ok(Self {
            users: PatternMatcher::new(&mapping.users)?,
            backend_roles: PatternMatcher::new(&mapping.backend_roles)?,
            hosts: PatternMatcher::new(&mapping.hosts)?,
        })
    }

    fn matches(&self, user: &User, caller: Option<&TransportAddress>) -> bool {
        if self.backend_roles.matches_any(&user.backend_roles) {
            return true;
        }

        if self.users.matches(&user.name) {
            return true;
        }

        if let Some(caller) = caller {
            if self.hosts.matches(&caller.address.to_string()) {
                return true;
            }
            if let Some(host) = &caller.host
                && self.hosts.matches(host)
            {
                return true;
            }
        }

        false
    }
}

/// Maps identities to role names
#[derive(Debug, Clone, Default)]
pub struct RoleMapper {
    mappings: BTreeMap<String, MappingCriteria>,
}

impl RoleMapper {
    /// Compile a role mapper from the roles mapping document
    pub fn new(config: &RolesMappingConfig) -> Result<Self, ConfigError> {
        let mappings = config
            .iter()
            .map(|(role, mapping)| {
                Ok::<_, ConfigError>((role.clone(), MappingCriteria::compile(mapping)?))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;
        Ok(Self { mappings })
    }

    /// Role names assigned to `user` when calling from `caller`, in
    /// lexicographic order. No user means no roles.
    pub fn map_roles(
        &self,
        user: Option<&User>,
        caller: Option<&TransportAddress>,
    ) -> BTreeSet<String> {
        let Some(user) = user else {
            return BTreeSet::new();
        };

        self.mappings
            .iter()
            .filter(|(role, criteria)| {
                let matched = criteria.matches(user, caller);
                trace!(role = role.as_str(), user = user.name.as_str(), matched, "Role mapping");
                matched
            })
            .map(|(role, _)| role.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
