//! Cluster topology
//!
//! Resolves index names, aliases and patterns to the concrete indices the
//! cluster currently knows about. Lookups are made fresh on every
//! evaluation; the evaluator never caches them.

use crate::error::{ConfigError, TopologyError};
use crate::policy::wildcard::{WildcardPattern, contains_wildcard};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Expression that stands for every index
pub const ALL_INDICES: &str = "_all";

/// Live view of indices and aliases
pub trait ClusterTopology: Send + Sync {
    /// Whether `name` is an existing index or alias
    fn has_index_or_alias(&self, name: &str) -> bool;

    /// Concrete indices an expression resolves to.
    ///
    /// Wildcard expressions that match nothing resolve to an empty set;
    /// unknown literal names are an error.
    fn concrete_indices(&self, expression: &str) -> Result<BTreeSet<String>, TopologyError>;

    /// Every concrete index
    fn all_concrete_indices(&self) -> BTreeSet<String>;

    /// Union of the concrete indices of several expressions
    fn resolve_expressions(&self, expressions: &[&str]) -> Result<BTreeSet<String>, TopologyError> {
        let mut resolved = BTreeSet::new();
        for expression in expressions {
            resolved.extend(self.concrete_indices(expression)?);
        }
        Ok(resolved)
    }
}

/// In-memory topology
///
/// ```toml
/// indices = ["starfleet", "starfleet_academy", "public"]
///
/// [aliases]
/// sf = ["starfleet", "starfleet_academy"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StaticTopology {
    indices: BTreeSet<String>,
    aliases: BTreeMap<String, BTreeSet<String>>,
}

impl StaticTopology {
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            indices: indices.into_iter().map(Into::into).collect(),
            aliases: BTreeMap::new(),
        }
    }

    /// Add an alias pointing at existing indices
    pub fn with_alias<I, S>(mut self, alias: impl Into<String>, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .insert(alias.into(), indices.into_iter().map(Into::into).collect());
        self
    }

    /// Parse a topology from TOML, rejecting aliases of unknown indices
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let topology: StaticTopology =
            toml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
        topology.validate()?;
        Ok(topology)
    }

    /// Load a topology file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (alias, targets) in &self.aliases {
            if self.indices.contains(alias) {
                return Err(ConfigError::Invalid {
                    message: format!("alias '{}' collides with an index of the same name", alias),
                });
            }
            if let Some(missing) = targets.iter().find(|t| !self.indices.contains(*t)) {
                return Err(ConfigError::Invalid {
                    message: format!("alias '{}' points at unknown index '{}'", alias, missing),
                });
            }
        }
        Ok(())
    }

    fn expand_wildcard(&self, expression: &str) -> Result<BTreeSet<String>, TopologyError> {
        let Ok(pattern) = WildcardPattern::new(expression) else {
            return Err(TopologyError::IndexNotFound {
                name: expression.to_string(),
            });
        };

        let mut resolved = pattern.matching(&self.indices);
        for (alias, targets) in &self.aliases {
            if pattern.matches(alias) {
                resolved.extend(targets.iter().cloned());
            }
        }
        Ok(resolved)
    }
}

impl ClusterTopology for StaticTopology {
    fn has_index_or_alias(&self, name: &str) -> bool {
        self.indices.contains(name) || self.aliases.contains_key(name)
    }

    fn concrete_indices(&self, expression: &str) -> Result<BTreeSet<String>, TopologyError> {
        if expression == ALL_INDICES || expression == "*" {
            return Ok(self.all_concrete_indices());
        }

        if contains_wildcard(expression) {
            return self.expand_wildcard(expression);
        }

        if self.indices.contains(expression) {
            return Ok(BTreeSet::from([expression.to_string()]));
        }

        self.aliases
            .get(expression)
            .cloned()
            .ok_or_else(|| TopologyError::IndexNotFound {
                name: expression.to_string(),
            })
    }

    fn all_concrete_indices(&self) -> BTreeSet<String> {
        self.indices.clone()
    }
}
