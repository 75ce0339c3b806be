//! Evaluator module
//!
//! Turns a user, an action and a request into an allow/deny [`Decision`]
//! plus the row filters and redacted fields downstream enforcement needs.
//!
//! - [`request`]: identities, caller addresses and the request kinds
//! - [`topology`]: index and alias lookups against the live cluster
//! - [`resolve`]: which indices and sub-types a request addresses
//! - [`privileges`]: the decision itself
//! - [`decision`]: the result and how it is attached to a request

pub mod decision;
pub mod privileges;
pub mod request;
pub mod resolve;
pub mod topology;

pub use decision::{DLS_HEADER, Decision, FLS_HEADER};
pub use privileges::{PrivilegesEvaluator, is_cluster_scoped};
pub use request::{
    ActionRequest, BulkRequest, GetRequest, IndicesRequest, MultiGetRequest, MultiSearchRequest,
    Request, RequestContext, SearchRequest, TargetsResources, TransportAddress, User,
    WriteRequest,
};
pub use resolve::{RequestedResources, resolve};
pub use topology::{ALL_INDICES, ClusterTopology, StaticTopology};
