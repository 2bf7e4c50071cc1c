//! Classifies raw query text into the result shape it produces.
//!
//! This is a textual check on the first keyword after the prolog, not a parse. Queries that
//! are otherwise malformed are left for the remote store to reject at evaluation time.

use crate::errors::{DriverError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    // whitespace, comments, PREFIX and BASE declarations ahead of the query form
    static ref PROLOG: Regex = Regex::new(
        r"(?i)\A(?:\s+|#[^\n]*(?:\n|\z)|PREFIX\s*[^\s:]*:\s*<[^>]*>|BASE\s*<[^>]*>)*"
    )
    .expect("prolog pattern is valid");
}

const UPDATE_VERBS: &[&str] = &[
    "INSERT", "DELETE", "LOAD", "CLEAR", "CREATE", "DROP", "COPY", "MOVE", "ADD", "WITH",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueryLanguage {
    Sparql,
    Serql,
}

impl FromStr for QueryLanguage {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sparql" => Ok(QueryLanguage::Sparql),
            "serql" => Ok(QueryLanguage::Serql),
            _ => Err(DriverError::UnsupportedQueryLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryLanguage::Sparql => f.write_str("SPARQL"),
            QueryLanguage::Serql => f.write_str("SeRQL"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueryForm {
    /// SELECT: rows of bindings.
    Tuple,
    /// ASK
    Boolean,
    /// CONSTRUCT, DESCRIBE and anything unrecognised.
    Graph,
    Update,
}

/// Returns `query` without its leading prolog.
pub fn strip_prolog(query: &str) -> &str {
    match PROLOG.find(query) {
        Some(m) => &query[m.end()..],
        None => query,
    }
}

/// Decides the form of `query` without touching the network.
pub fn classify(language: QueryLanguage, query: &str) -> Result<QueryForm> {
    if language != QueryLanguage::Sparql {
        return Err(DriverError::UnsupportedQueryLanguage(language.to_string()));
    }
    let body = strip_prolog(query);
    let keyword: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase();
    let form = match keyword.as_str() {
        "SELECT" => QueryForm::Tuple,
        "ASK" => QueryForm::Boolean,
        verb if UPDATE_VERBS.contains(&verb) => QueryForm::Update,
        _ => QueryForm::Graph,
    };
    Ok(form)
}
