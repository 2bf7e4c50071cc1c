//! Rewrites blank nodes into stable IRIs before statements leave the driver.
//!
//! The remote store cannot keep blank node identity across independent bulk writes, so every
//! blank node is replaced by `prefix + local id`. The assignments are remembered for the life of
//! the session; the table is cleared when the session closes.

use oxigraph::model::{BlankNode, GraphName, NamedNode, NamedOrBlankNode, Quad, Term};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug)]
pub struct Skolemizer {
    prefix: String,
    assigned: Mutex<HashMap<BlankNode, NamedNode>>,
}

impl Skolemizer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            assigned: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the IRI standing in for `node`, minting it on first use.
    pub fn iri_for(&self, node: &BlankNode) -> NamedNode {
        let mut assigned = self.assigned.lock().unwrap_or_else(|e| e.into_inner());
        assigned
            .entry(node.clone())
            .or_insert_with(|| {
                NamedNode::new_unchecked(format!("{}{}", self.prefix, node.as_str()))
            })
            .clone()
    }

    pub fn subject(&self, subject: NamedOrBlankNode) -> NamedOrBlankNode {
        match subject {
            NamedOrBlankNode::BlankNode(b) => self.iri_for(&b).into(),
            other => other,
        }
    }

    pub fn term(&self, term: Term) -> Term {
        match term {
            Term::BlankNode(b) => self.iri_for(&b).into(),
            other => other,
        }
    }

    pub fn quad(&self, quad: Quad) -> Quad {
        Quad::new(
            self.subject(quad.subject),
            quad.predicate,
            self.term(quad.object),
            match quad.graph_name {
                GraphName::BlankNode(b) => self.iri_for(&b).into(),
                other => other,
            },
        )
    }

    /// Number of blank nodes seen so far.
    pub fn len(&self) -> usize {
        self.assigned.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.assigned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
