//! Evaluation result
//!
//! A decision is the allow/deny outcome plus the row filters and redacted
//! fields every satisfying grant contributed.

use crate::evaluator::request::RequestContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Header carrying the row filter queries for downstream enforcement
pub const DLS_HEADER: &str = "_warden_dls_query";

/// Header carrying the redacted field names for downstream enforcement
pub const FLS_HEADER: &str = "_warden_fls_fields";

/// Result of evaluating a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,

    /// Row filter queries (DLS), placeholders already substituted
    #[serde(default)]
    pub dls_queries: BTreeSet<String>,

    /// Redacted field names (FLS)
    #[serde(default)]
    pub fls_fields: BTreeSet<String>,
}

impl Decision {
    /// A denial with no directives
    pub fn denied() -> Self {
        Self::default()
    }

    /// An allow with no directives
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            ..Default::default()
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    pub fn has_directives(&self) -> bool {
        !self.dls_queries.is_empty() || !self.fls_fields.is_empty()
    }

    /// Attach non-empty directive sets to the request context as JSON arrays
    pub fn attach_to(&self, context: &mut RequestContext) {
        if !self.dls_queries.is_empty() {
            context.put_header(DLS_HEADER, json_array(&self.dls_queries));
        }
        if !self.fls_fields.is_empty() {
            context.put_header(FLS_HEADER, json_array(&self.fls_fields));
        }
    }
}

fn json_array(items: &BTreeSet<String>) -> String {
    Value::from(items.iter().cloned().collect::<Vec<_>>()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_has_no_directives() {
        let decision = Decision::denied();
        assert!(decision.is_denied());
        assert!(!decision.has_directives());
    }

    #[test]
    fn test_attach_only_non_empty_sets() {
        let mut context = RequestContext::default();
        let decision = Decision {
            allowed: true,
            dls_queries: BTreeSet::new(),
            fls_fields: BTreeSet::from(["salary".to_string(), "secret".to_string()]),
        };
        decision.attach_to(&mut context);

        assert_eq!(context.header(DLS_HEADER), None);
        assert_eq!(context.header(FLS_HEADER), Some(r#"["salary","secret"]"#));
    }

    #[test]
    fn test_nothing_attached_for_plain_allow() {
        let mut context = RequestContext::default();
        Decision::allowed().attach_to(&mut context);
        assert!(context.headers.is_empty());
    }
}
