//! Warden
//!
//! Role-based privilege evaluation for multi-tenant document-store clusters.
//!
//! ## Features
//!
//! - **Role mapping** by user name, backend role or caller host
//! - **Action groups** that nest, with cycles detected instead of followed
//! - **Resource resolution** through aliases and wildcards against the live topology
//! - **Row and field level security** directives collected from every covering grant
//! - **Hot policy updates** through atomically published, precompiled snapshots
//!
//! ## Evaluation Model
//!
//! ```text
//! request → resolved indices/types ─┐
//! user + caller → mapped roles ─────┼→ per-role grant matching → Decision
//! roles + action groups → grants ───┘
//! ```
//!
//! A denial is an ordinary [`Decision`]. Errors are reserved for callers
//! that break the evaluator's contract.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use warden::{
//!     NoopAuditLog, PolicyStore, PrivilegesEvaluator, StaticTopology, load_policy_dir,
//!     evaluator::{ActionRequest, Request, SearchRequest, TransportAddress, User},
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = Arc::new(PolicyStore::from_documents(load_policy_dir("policy".as_ref())?)?);
//! let evaluator = PrivilegesEvaluator::new(store, Arc::new(NoopAuditLog), "warden")?;
//! let topology = StaticTopology::new(["starfleet"]);
//!
//! let mut request = Request::new(ActionRequest::Search(SearchRequest {
//!     indices: vec!["starfleet".into()],
//!     ..Default::default()
//! }))
//! .with_remote_address(TransportAddress::new("10.0.0.1".parse()?));
//!
//! let decision = evaluator.evaluate(
//!     &User::new("worf"),
//!     "indices:data/read/search",
//!     &mut request,
//!     &topology,
//! )?;
//! println!("allowed: {}", decision.allowed);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod policy;
pub mod transport;

// Re-export main types
pub use audit::{AuditLog, NoopAuditLog, TracingAuditLog};
pub use config::{AppConfig, load_config};
pub use error::{AppError, ConfigError, EvaluationError, Result, TopologyError};
pub use evaluator::{ClusterTopology, Decision, PrivilegesEvaluator, StaticTopology};
pub use policy::{PolicyDocuments, PolicySnapshot, PolicyStore, PolicyUpdate, load_policy_dir};
