//! Audit collaborator
//!
//! The evaluator reports two kinds of security-relevant denials. Where they
//! end up is the embedder's choice; the evaluator receives an implementation
//! when it is constructed.

use crate::evaluator::request::Request;
use tracing::warn;

/// Sink for audit events raised during evaluation
pub trait AuditLog: Send + Sync {
    /// An administrative action was refused regardless of role grants
    fn log_missing_privileges(&self, action: &str, request: &Request);

    /// A mutating action targeted the protected configuration index
    fn log_config_index_attempt(&self, request: &Request, action: &str);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLog;

impl AuditLog for NoopAuditLog {
    fn log_missing_privileges(&self, _action: &str, _request: &Request) {}

    fn log_config_index_attempt(&self, _request: &Request, _action: &str) {}
}

/// Emits events as structured `warn` records on the `audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn log_missing_privileges(&self, action: &str, request: &Request) {
        warn!(
            target: "audit",
            event = "missing_privileges",
            action,
            kind = request.body.kind(),
            remote_address = ?request.context.remote_address,
            "Missing privileges"
        );
    }

    fn log_config_index_attempt(&self, request: &Request, action: &str) {
        warn!(
            target: "audit",
            event = "config_index_attempt",
            action,
            kind = request.body.kind(),
            remote_address = ?request.context.remote_address,
            "Attempt to modify the configuration index"
        );
    }
}
