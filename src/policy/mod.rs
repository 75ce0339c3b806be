//! Policy module
//!
//! Loads, validates and compiles the three policy documents that decide who
//! may do what.
//!
//! ## Documents
//!
//! - **Roles** grant cluster-wide action patterns and, per resource pattern,
//!   per sub-type action patterns. A resource entry may carry a row filter
//!   (`_dls_`) and redacted fields (`_fls_`).
//! - **Roles mapping** assigns a role to identities by user name, backend
//!   role or caller host.
//! - **Action groups** name sets of action patterns and may nest.
//!
//! ## Example
//!
//! ```toml
//! # roles.toml
//! [sg_role_starfleet]
//! cluster = ["CLUSTER_MONITOR"]
//!
//! [sg_role_starfleet.indices."pub*"]
//! "*" = ["READ"]
//!
//! # roles_mapping.toml
//! [sg_role_starfleet]
//! backendroles = ["starfleet"]
//!
//! # action_groups.toml
//! READ = ["indices:data/read*"]
//! CLUSTER_MONITOR = ["cluster:monitor/*"]
//! ```
//!
//! Documents are compiled into an immutable [`PolicySnapshot`] held by a
//! [`PolicyStore`]; evaluations read one snapshot for their whole duration.

pub mod action_groups;
pub mod loader;
pub mod role_mapper;
pub mod snapshot;
pub mod types;
pub mod wildcard;

pub use action_groups::ActionGroupResolver;
pub use loader::{load_policy_dir, load_policy_from_str};
pub use role_mapper::RoleMapper;
pub use snapshot::{CompiledRole, IndexGrant, PolicySnapshot, PolicyStore, PolicyUpdate, TypeGrant};
pub use types::{
    ActionGroupsConfig, IndexPermissions, PolicyDocuments, RoleDefinition, RoleMapping,
    RolesConfig, RolesMappingConfig,
};
pub use wildcard::{PatternMatcher, WildcardPattern};
