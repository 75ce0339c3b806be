//! Resource resolution
//!
//! Turns the raw targets of a request into concrete index names and the set
//! of requested sub-types. Topology failures never abort resolution; the raw
//! names are used instead.

use crate::evaluator::request::{ActionRequest, RequestShape, TargetsResources};
use crate::evaluator::topology::{ALL_INDICES, ClusterTopology};
use std::collections::BTreeSet;
use tracing::debug;

/// Sentinel sub-type standing for "every sub-type"
pub const ALL_TYPES: &str = "_all";

/// Concrete indices and sub-types a request touches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedResources {
    pub indices: BTreeSet<String>,
    pub types: BTreeSet<String>,
}

impl RequestedResources {
    /// Every index, every sub-type
    pub fn all() -> Self {
        Self {
            indices: BTreeSet::from([ALL_INDICES.to_string()]),
            types: BTreeSet::from([ALL_TYPES.to_string()]),
        }
    }

    pub fn contains_index(&self, name: &str) -> bool {
        self.indices.contains(name)
    }

    /// Whether the request was collapsed to the "every index" sentinel
    pub fn targets_all_indices(&self) -> bool {
        self.indices.contains(ALL_INDICES)
    }

    fn normalized(mut self) -> Self {
        if is_all_indices(&self.indices) {
            debug!(indices = ?self.indices, "Treating requested indices as '_all'");
            self.indices = BTreeSet::from([ALL_INDICES.to_string()]);
        }
        if self.types.is_empty() {
            self.types.insert(ALL_TYPES.to_string());
        }
        self
    }
}

/// An empty set or the lone `_all` expression both mean every index
fn is_all_indices(indices: &BTreeSet<String>) -> bool {
    indices.is_empty() || (indices.len() == 1 && indices.contains(ALL_INDICES))
}

/// Resolve the indices and sub-types a request addresses
pub fn resolve(request: &ActionRequest, topology: &dyn ClusterTopology) -> RequestedResources {
    let resolved = match request.shape() {
        RequestShape::Untargeted => {
            debug!(kind = request.kind(), "Request names no indices");
            return RequestedResources::all();
        }
        RequestShape::Single(targets) => resolve_targets(targets, topology),
        RequestShape::Composite(parts) => {
            let mut merged = RequestedResources::default();
            for part in parts {
                let resolved = resolve_targets(part, topology);
                merged.indices.extend(resolved.indices);
                merged.types.extend(resolved.types);
            }
            merged
        }
    };

    resolved.normalized()
}

fn resolve_targets(
    request: &dyn TargetsResources,
    topology: &dyn ClusterTopology,
) -> RequestedResources {
    let types: BTreeSet<String> = request.sub_types().into_iter().map(str::to_string).collect();
    let targets = request.targets();
    debug!(raw_indices = ?targets, ?types, "Resolving request targets");

    let declared: Vec<&str> = targets.iter().flatten().copied().collect();
    if declared.is_empty() {
        debug!("No indices found in request, assume _all");
        return RequestedResources {
            indices: topology.all_concrete_indices(),
            types,
        };
    }

    let indices = match topology.resolve_expressions(&declared) {
        Ok(indices) => {
            debug!(?declared, ?indices, "Resolved request indices");
            indices
        }
        Err(e) => {
            debug!(?declared, error = %e, "Cannot resolve indices, using the raw values");
            declared.iter().map(|s| s.to_string()).collect()
        }
    };

    RequestedResources { indices, types }
}
