//! Reserved identifiers and the canned SPARQL used by the session's read helpers.

use oxigraph::model::NamedNodeRef;
use std::time::Duration;

/// Graph the remote store uses for triples added without a context.
pub const DEFAULT_GRAPH: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://marklogic.com/semantics#default-graph");

/// Prefix for IRIs minted from blank nodes before they leave the driver.
pub const SKOLEM_PREFIX: &str = "http://marklogic.com/semantics/blank/";

pub const DEFAULT_CACHE_SIZE: usize = 750;
pub const DEFAULT_CACHE_MILLIS: u64 = 800;
pub const DEFAULT_INITIAL_DELAY_MILLIS: u64 = 50;
pub const DEFAULT_HANDOFF_CAPACITY: usize = 64;

// canned queries; graph filters are appended by the session
pub const SOMETHING: &str = "ASK { ?s ?p ?o }";
pub const COUNT_VARIABLE: &str = "ct";
pub const CONTEXT_IDS: &str = "SELECT DISTINCT ?ctx WHERE { GRAPH ?ctx { ?s ?p ?o } }";

// media types exchanged with the remote store
pub const SPARQL_QUERY: &str = "application/sparql-query";
pub const SPARQL_UPDATE: &str = "application/sparql-update";
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
pub const N_TRIPLES: &str = "application/n-triples";
pub const N_QUADS: &str = "application/n-quads";

// documents loaded by URL
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const FETCH_ACCEPT: &str = "text/turtle, application/n-triples;q=0.9, application/n-quads;q=0.9, \
application/trig;q=0.9, application/rdf+xml;q=0.8, text/n3;q=0.5, */*;q=0.1";
