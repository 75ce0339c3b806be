//! Action group expansion
//!
//! An action group names a list of members, each either a literal action
//! pattern or another group. Expansion follows group references until only
//! literal patterns remain. A group that is already being expanded further
//! up the chain contributes nothing when it is reached again, so cyclic
//! definitions terminate.

use crate::policy::types::ActionGroupsConfig;
use std::collections::BTreeSet;
use tracing::{trace, warn};

/// Expands action patterns against a table of action groups
#[derive(Debug, Clone, Copy)]
pub struct ActionGroupResolver<'a> {
    groups: &'a ActionGroupsConfig,
}

impl<'a> ActionGroupResolver<'a> {
    pub fn new(groups: &'a ActionGroupsConfig) -> Self {
        Self { groups }
    }

    /// Flattened literal members of a group; empty if `name` is not a group
    pub fn group_members(&self, name: &str) -> BTreeSet<String> {
        let mut members = BTreeSet::new();
        if self.groups.contains_key(name) {
            let mut expanding = vec![name.to_string()];
            self.collect(name, &mut expanding, &mut members);
        }
        members
    }

    /// Expand a list of action patterns into the set of literal patterns.
    ///
    /// A pattern whose group expansion is empty (including one that names no
    /// group at all) is kept verbatim.
    pub fn expand<S: AsRef<str>>(&self, patterns: &[S]) -> BTreeSet<String> {
        let mut resolved = BTreeSet::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let members = self.group_members(pattern);
            if members.is_empty() {
                resolved.insert(pattern.to_string());
            } else {
                trace!(group = pattern, ?members, "Expanded action group");
                resolved.extend(members);
            }
        }
        resolved
    }

    fn collect(&self, name: &str, expanding: &mut Vec<String>, out: &mut BTreeSet<String>) {
        let Some(entries) = self.groups.get(name) else {
            return;
        };

        for entry in entries {
            if !self.groups.contains_key(entry) {
                out.insert(entry.clone());
                continue;
            }

            if expanding.iter().any(|g| g == entry) {
                warn!(
                    group = entry.as_str(),
                    chain = ?expanding,
                    "Cyclic action group reference, ignoring"
                );
                continue;
            }

            expanding.push(entry.clone());
            self.collect(entry, expanding, out);
            expanding.pop();
        }
    }
}
