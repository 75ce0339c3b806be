//! Request model
//!
//! Requests are a closed set of kinds. Single-target kinds expose their
//! declared targets and sub-types through [`TargetsResources`], composite
//! kinds expose their sub-requests, and untargeted kinds expose neither.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,

    /// Group memberships assigned by the authentication backend
    #[serde(default)]
    pub backend_roles: BTreeSet<String>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend_roles: BTreeSet::new(),
        }
    }

    pub fn with_backend_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend_roles.extend(roles.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User [name={}, roles={:?}]", self.name, self.backend_roles)
    }
}

/// Network origin of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportAddress {
    pub address: IpAddr,

    /// Resolved hostname, if known
    #[serde(default)]
    pub host: Option<String>,
}

impl TransportAddress {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            host: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

impl fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}/{}", host, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Values carried alongside a request through the filter chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Where the request came from; required for resource-scoped evaluation
    #[serde(default)]
    pub remote_address: Option<TransportAddress>,

    /// Opaque headers for downstream collaborators
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn put_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Capability of a request that names target resources
pub trait TargetsResources {
    /// Raw target expressions as declared. `None` is an unset target slot.
    fn targets(&self) -> Vec<Option<&str>>;

    /// Declared sub-types; empty when the request names none
    fn sub_types(&self) -> Vec<&str>;
}

/// How a request addresses resources
pub enum RequestShape<'a> {
    /// No notion of target resources
    Untargeted,
    /// One set of targets
    Single(&'a dyn TargetsResources),
    /// Bundles several sub-requests
    Composite(Vec<&'a dyn TargetsResources>),
}

fn default_true() -> bool {
    true
}

/// Search over one or more resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    /// Whether shard request caching may be used; unset means the cluster default
    #[serde(default)]
    pub request_cache: Option<bool>,
}

impl TargetsResources for SearchRequest {
    fn targets(&self) -> Vec<Option<&str>> {
        self.indices.iter().map(|i| Some(i.as_str())).collect()
    }

    fn sub_types(&self) -> Vec<&str> {
        self.types.iter().map(String::as_str).collect()
    }
}

/// Fetch of a single document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_true")]
    pub realtime: bool,
}

impl GetRequest {
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            index: Some(index.into()),
            doc_type: Some(doc_type.into()),
            id: id.into(),
            realtime: true,
        }
    }
}

impl TargetsResources for GetRequest {
    fn targets(&self) -> Vec<Option<&str>> {
        vec![self.index.as_deref()]
    }

    fn sub_types(&self) -> Vec<&str> {
        self.doc_type.as_deref().into_iter().collect()
    }
}

/// Fetch of several documents, possibly across resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiGetRequest {
    #[serde(default)]
    pub items: Vec<GetRequest>,
    #[serde(default = "default_true")]
    pub realtime: bool,
}

/// Index, update or delete of a single document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl TargetsResources for WriteRequest {
    fn targets(&self) -> Vec<Option<&str>> {
        vec![self.index.as_deref()]
    }

    fn sub_types(&self) -> Vec<&str> {
        self.doc_type.as_deref().into_iter().collect()
    }
}

/// Batch of document writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub items: Vec<WriteRequest>,
}

/// Batch of searches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSearchRequest {
    #[serde(default)]
    pub requests: Vec<SearchRequest>,
}

/// Resource-scoped administrative request (create, delete, close, mapping, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicesRequest {
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl TargetsResources for IndicesRequest {
    fn targets(&self) -> Vec<Option<&str>> {
        self.indices.iter().map(|i| Some(i.as_str())).collect()
    }

    fn sub_types(&self) -> Vec<&str> {
        self.types.iter().map(String::as_str).collect()
    }
}

/// The body of a request, by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRequest {
    Cluster,
    Search(SearchRequest),
    Get(GetRequest),
    MultiGet(MultiGetRequest),
    Write(WriteRequest),
    Bulk(BulkRequest),
    MultiSearch(MultiSearchRequest),
    Indices(IndicesRequest),
}

impl ActionRequest {
    /// How this request addresses resources
    pub fn shape(&self) -> RequestShape<'_> {
        match self {
            ActionRequest::Cluster => RequestShape::Untargeted,
            ActionRequest::Search(r) => RequestShape::Single(r),
            ActionRequest::Get(r) => RequestShape::Single(r),
            ActionRequest::Write(r) => RequestShape::Single(r),
            ActionRequest::Indices(r) => RequestShape::Single(r),
            ActionRequest::MultiGet(r) => RequestShape::Composite(
                r.items.iter().map(|i| i as &dyn TargetsResources).collect(),
            ),
            ActionRequest::Bulk(r) => RequestShape::Composite(
                r.items.iter().map(|i| i as &dyn TargetsResources).collect(),
            ),
            ActionRequest::MultiSearch(r) => RequestShape::Composite(
                r.requests
                    .iter()
                    .map(|i| i as &dyn TargetsResources)
                    .collect(),
            ),
        }
    }

    /// Get the request kind as a string
    pub const fn kind(&self) -> &'static str {
        match self {
            ActionRequest::Cluster => "cluster",
            ActionRequest::Search(_) => "search",
            ActionRequest::Get(_) => "get",
            ActionRequest::MultiGet(_) => "multi_get",
            ActionRequest::Write(_) => "write",
            ActionRequest::Bulk(_) => "bulk",
            ActionRequest::MultiSearch(_) => "multi_search",
            ActionRequest::Indices(_) => "indices",
        }
    }

    /// Turn off result caching. Returns false if the request is not search-shaped.
    pub fn disable_request_cache(&mut self) -> bool {
        match self {
            ActionRequest::Search(r) => {
                r.request_cache = Some(false);
                true
            }
            _ => false,
        }
    }

    /// Turn off realtime reads. Returns false if the request is not realtime-capable.
    pub fn disable_realtime(&mut self) -> bool {
        match self {
            ActionRequest::Get(r) => {
                r.realtime = false;
                true
            }
            ActionRequest::MultiGet(r) => {
                r.realtime = false;
                for item in &mut r.items {
                    item.realtime = false;
                }
                true
            }
            _ => false,
        }
    }
}

/// A request as seen by the evaluator: body plus context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub body: ActionRequest,
    #[serde(default)]
    pub context: RequestContext,
}

impl Request {
    pub fn new(body: ActionRequest) -> Self {
        Self {
            body,
            context: RequestContext::default(),
        }
    }

    pub fn with_remote_address(mut self, address: TransportAddress) -> Self {
        self.context.remote_address = Some(address);
        self
    }
}
