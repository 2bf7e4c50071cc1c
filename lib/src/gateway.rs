//! The capability the driver consumes from a remote triple store.
//!
//! A [`RemoteStoreGateway`] performs one logical network call per method invocation. It never
//! buffers, retries or tracks transactions on its own; the session decides which transaction a
//! call runs under and hands the handle in explicitly.

use crate::errors::GatewayError;
use crate::options::Capability;
use oxigraph::model::{NamedNode, NamedOrBlankNode, Quad, Term};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;

/// Opaque reference to a transaction opened on the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionHandle(String);

impl TransactionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role based permissions attached to graphs created or touched by a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphPermissions {
    roles: BTreeMap<String, BTreeSet<Capability>>,
}

impl GraphPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, role: impl Into<String>, capability: Capability) -> Self {
        self.grant(role, capability);
        self
    }

    pub fn grant(&mut self, role: impl Into<String>, capability: Capability) {
        self.roles.entry(role.into()).or_default().insert(capability);
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterates `(role, capability)` pairs in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Capability)> + '_ {
        self.roles
            .iter()
            .flat_map(|(role, caps)| caps.iter().map(move |cap| (role.as_str(), *cap)))
    }
}

/// Everything the remote store needs to evaluate one query or update.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub bindings: &'a BTreeMap<String, Term>,
    pub base_uri: Option<&'a str>,
    pub include_inferred: bool,
    pub rulesets: &'a [String],
    pub permissions: &'a GraphPermissions,
    /// `(start, page_length)`, 1-based start as the store counts rows.
    pub page: Option<(u64, u64)>,
    pub transaction: Option<&'a TransactionHandle>,
}

/// Byte stream of a query response.
pub type ResponseBody = Box<dyn Read + Send>;

/// Triple pattern used by removals; `None` positions are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementPattern {
    pub subject: Option<NamedOrBlankNode>,
    pub predicate: Option<NamedNode>,
    pub object: Option<Term>,
}

pub trait RemoteStoreGateway: Send + Sync {
    /// Short description used in log lines.
    fn describe(&self) -> String;

    /// Runs a SELECT query. The body is a SPARQL 1.1 JSON results document.
    fn tuple_query(&self, request: QueryRequest<'_>) -> Result<ResponseBody, GatewayError>;

    /// Runs a CONSTRUCT or DESCRIBE query. The body is an N-Triples document.
    fn graph_query(&self, request: QueryRequest<'_>) -> Result<ResponseBody, GatewayError>;

    fn boolean_query(&self, request: QueryRequest<'_>) -> Result<bool, GatewayError>;

    fn update(&self, request: QueryRequest<'_>) -> Result<(), GatewayError>;

    /// Adds all quads in one call. Every quad carries a named graph; the driver never sends the
    /// default graph sentinel.
    fn bulk_add(
        &self,
        quads: &[Quad],
        base_uri: Option<&str>,
        permissions: &GraphPermissions,
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError>;

    /// Removes every statement matching `pattern` in the given graphs.
    fn remove(
        &self,
        pattern: &StatementPattern,
        contexts: &[NamedNode],
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError>;

    fn clear(
        &self,
        contexts: &[NamedNode],
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError>;

    fn clear_all(&self, transaction: Option<&TransactionHandle>) -> Result<(), GatewayError>;

    fn open_transaction(&self) -> Result<TransactionHandle, GatewayError>;

    fn commit(&self, transaction: &TransactionHandle) -> Result<(), GatewayError>;

    fn rollback(&self, transaction: &TransactionHandle) -> Result<(), GatewayError>;
}
