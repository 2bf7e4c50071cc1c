//! Executable queries bound to a session.
//!
//! All four query shapes share one [`QueryContext`] (text, base IRI, bindings, inference flag,
//! rulesets and graph permissions) and are run by one free function each. Every evaluation
//! flushes the session's write cache first so it observes the session's own writes.

use crate::cursor::{GraphCursor, StatementCursor, StatementShape, TupleCursor};
use crate::dispatch::QueryForm;
use crate::errors::{DriverError, Result};
use crate::gateway::{GraphPermissions, QueryRequest, TransactionHandle};
use crate::session::SessionCore;
use log::debug;
use oxigraph::model::{Term, Triple};
use oxigraph::sparql::QuerySolution;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    pub query: String,
    pub base_uri: Option<String>,
    pub bindings: BTreeMap<String, Term>,
    pub include_inferred: bool,
    pub rulesets: Vec<String>,
    pub permissions: GraphPermissions,
}

impl QueryContext {
    pub fn new(query: impl Into<String>, base_uri: Option<&str>) -> Self {
        Self {
            query: query.into(),
            base_uri: base_uri.map(str::to_string),
            bindings: BTreeMap::new(),
            include_inferred: true,
            rulesets: Vec::new(),
            permissions: GraphPermissions::default(),
        }
    }

    pub(crate) fn request<'a>(
        &'a self,
        page: Option<(u64, u64)>,
        transaction: Option<&'a TransactionHandle>,
    ) -> QueryRequest<'a> {
        QueryRequest {
            query: &self.query,
            bindings: &self.bindings,
            base_uri: self.base_uri.as_deref(),
            include_inferred: self.include_inferred,
            rulesets: &self.rulesets,
            permissions: &self.permissions,
            page,
            transaction,
        }
    }
}

/// Binding and option management shared by every query shape.
///
/// Bindings persist across evaluations until removed or cleared.
pub trait ExecutableQuery {
    fn context(&self) -> &QueryContext;

    fn context_mut(&mut self) -> &mut QueryContext;

    fn query_text(&self) -> &str {
        &self.context().query
    }

    fn set_binding(&mut self, name: impl Into<String>, value: impl Into<Term>)
    where
        Self: Sized,
    {
        self.context_mut()
            .bindings
            .insert(name.into(), value.into());
    }

    fn remove_binding(&mut self, name: &str) {
        self.context_mut().bindings.remove(name);
    }

    fn clear_bindings(&mut self) {
        self.context_mut().bindings.clear();
    }

    fn bindings(&self) -> &BTreeMap<String, Term> {
        &self.context().bindings
    }

    fn set_include_inferred(&mut self, include_inferred: bool) {
        self.context_mut().include_inferred = include_inferred;
    }

    fn include_inferred(&self) -> bool {
        self.context().include_inferred
    }

    fn set_rulesets(&mut self, rulesets: Vec<String>) {
        self.context_mut().rulesets = rulesets;
    }

    fn set_graph_permissions(&mut self, permissions: GraphPermissions) {
        self.context_mut().permissions = permissions;
    }
}

/// Flushes pending writes before a read. A flush failure is reported as a failed evaluation.
fn prepare_read(session: &SessionCore) -> Result<Option<TransactionHandle>> {
    session.ensure_open()?;
    session.sync().map_err(DriverError::into_query_evaluation)?;
    Ok(session.transaction())
}

pub(crate) fn evaluate_tuple(
    session: &SessionCore,
    context: &QueryContext,
    page: Option<(u64, u64)>,
) -> Result<TupleCursor> {
    let tx = prepare_read(session)?;
    debug!("evaluating tuple query (tx: {tx:?})");
    let body = session
        .gateway()
        .tuple_query(context.request(page, tx.as_ref()))
        .map_err(|e| DriverError::query_evaluation("tuple query failed", e))?;
    let cursor = TupleCursor::spawn(body, session.config().handoff_capacity)?;
    session.track_stream(tx.as_ref(), cursor.in_flight());
    Ok(cursor)
}

/// Runs a tuple query whose rows describe statements and rebuilds them as quads.
pub(crate) fn evaluate_statements(
    session: &SessionCore,
    context: &QueryContext,
    shape: StatementShape,
) -> Result<StatementCursor> {
    let tx = prepare_read(session)?;
    let body = session
        .gateway()
        .tuple_query(context.request(None, tx.as_ref()))
        .map_err(|e| DriverError::query_evaluation("statement lookup failed", e))?;
    let cursor = StatementCursor::spawn(body, session.config().handoff_capacity, shape)?;
    session.track_stream(tx.as_ref(), cursor.in_flight());
    Ok(cursor)
}

pub(crate) fn evaluate_graph(session: &SessionCore, context: &QueryContext) -> Result<GraphCursor> {
    let tx = prepare_read(session)?;
    debug!("evaluating graph query (tx: {tx:?})");
    let body = session
        .gateway()
        .graph_query(context.request(None, tx.as_ref()))
        .map_err(|e| DriverError::query_evaluation("graph query failed", e))?;
    let cursor = GraphCursor::spawn(body, session.config().handoff_capacity)?;
    session.track_stream(tx.as_ref(), cursor.in_flight());
    Ok(cursor)
}

pub(crate) fn evaluate_boolean(session: &SessionCore, context: &QueryContext) -> Result<bool> {
    let tx = prepare_read(session)?;
    session
        .gateway()
        .boolean_query(context.request(None, tx.as_ref()))
        .map_err(|e| DriverError::query_evaluation("boolean query failed", e))
}

pub(crate) fn execute_update(session: &SessionCore, context: &QueryContext) -> Result<()> {
    session.ensure_open()?;
    session.sync()?;
    let tx = session.write_transaction();
    debug!("executing update (tx: {tx:?})");
    session
        .gateway()
        .update(context.request(None, tx.as_ref()))
        .map_err(|e| DriverError::update_execution("update failed", e))
}

macro_rules! executable_query {
    ($name:ident) => {
        impl ExecutableQuery for $name {
            fn context(&self) -> &QueryContext {
                &self.context
            }

            fn context_mut(&mut self) -> &mut QueryContext {
                &mut self.context
            }
        }
    };
}

/// A SELECT query.
pub struct TupleQuery {
    session: Arc<SessionCore>,
    context: QueryContext,
}

impl TupleQuery {
    pub(crate) fn new(session: Arc<SessionCore>, context: QueryContext) -> Self {
        Self { session, context }
    }

    pub fn evaluate(&self) -> Result<TupleCursor> {
        evaluate_tuple(&self.session, &self.context, None)
    }

    /// Evaluates one page of rows. `start` is 1-based.
    pub fn evaluate_page(&self, start: u64, page_length: u64) -> Result<TupleCursor> {
        evaluate_tuple(&self.session, &self.context, Some((start, page_length)))
    }

    /// Feeds every row to `handler`. The cursor is closed whether or not the handler fails.
    pub fn evaluate_with<F>(&self, mut handler: F) -> Result<()>
    where
        F: FnMut(QuerySolution) -> Result<()>,
    {
        let mut cursor = self.evaluate()?;
        let outcome = cursor.try_for_each(|row| handler(row?));
        cursor.close();
        outcome
    }
}

executable_query!(TupleQuery);

/// A CONSTRUCT or DESCRIBE query.
pub struct GraphQuery {
    session: Arc<SessionCore>,
    context: QueryContext,
}

impl GraphQuery {
    pub(crate) fn new(session: Arc<SessionCore>, context: QueryContext) -> Self {
        Self { session, context }
    }

    pub fn evaluate(&self) -> Result<GraphCursor> {
        evaluate_graph(&self.session, &self.context)
    }

    pub fn evaluate_with<F>(&self, mut handler: F) -> Result<()>
    where
        F: FnMut(Triple) -> Result<()>,
    {
        let mut cursor = self.evaluate()?;
        let outcome = cursor.try_for_each(|triple| handler(triple?));
        cursor.close();
        outcome
    }
}

executable_query!(GraphQuery);

/// An ASK query.
pub struct BooleanQuery {
    session: Arc<SessionCore>,
    context: QueryContext,
}

impl BooleanQuery {
    pub(crate) fn new(session: Arc<SessionCore>, context: QueryContext) -> Self {
        Self { session, context }
    }

    pub fn evaluate(&self) -> Result<bool> {
        evaluate_boolean(&self.session, &self.context)
    }
}

executable_query!(BooleanQuery);

/// A SPARQL Update request.
pub struct UpdateQuery {
    session: Arc<SessionCore>,
    context: QueryContext,
}

impl UpdateQuery {
    pub(crate) fn new(session: Arc<SessionCore>, context: QueryContext) -> Self {
        Self { session, context }
    }

    pub fn execute(&self) -> Result<()> {
        execute_update(&self.session, &self.context)
    }
}

executable_query!(UpdateQuery);

/// Result of dispatching raw query text.
pub enum PreparedQuery {
    Tuple(TupleQuery),
    Graph(GraphQuery),
    Boolean(BooleanQuery),
    Update(UpdateQuery),
}

impl std::fmt::Debug for PreparedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (form, context) = match self {
            PreparedQuery::Tuple(q) => ("Tuple", q.context()),
            PreparedQuery::Graph(q) => ("Graph", q.context()),
            PreparedQuery::Boolean(q) => ("Boolean", q.context()),
            PreparedQuery::Update(q) => ("Update", q.context()),
        };
        f.debug_tuple(form).field(context).finish()
    }
}

impl PreparedQuery {
    pub(crate) fn new(form: QueryForm, session: Arc<SessionCore>, context: QueryContext) -> Self {
        match form {
            QueryForm::Tuple => PreparedQuery::Tuple(TupleQuery::new(session, context)),
            QueryForm::Graph => PreparedQuery::Graph(GraphQuery::new(session, context)),
            QueryForm::Boolean => PreparedQuery::Boolean(BooleanQuery::new(session, context)),
            QueryForm::Update => PreparedQuery::Update(UpdateQuery::new(session, context)),
        }
    }

    pub fn form(&self) -> QueryForm {
        match self {
            PreparedQuery::Tuple(_) => QueryForm::Tuple,
            PreparedQuery::Graph(_) => QueryForm::Graph,
            PreparedQuery::Boolean(_) => QueryForm::Boolean,
            PreparedQuery::Update(_) => QueryForm::Update,
        }
    }
}

impl ExecutableQuery for PreparedQuery {
    fn context(&self) -> &QueryContext {
        match self {
            PreparedQuery::Tuple(q) => q.context(),
            PreparedQuery::Graph(q) => q.context(),
            PreparedQuery::Boolean(q) => q.context(),
            PreparedQuery::Update(q) => q.context(),
        }
    }

    fn context_mut(&mut self) -> &mut QueryContext {
        match self {
            PreparedQuery::Tuple(q) => q.context_mut(),
            PreparedQuery::Graph(q) => q.context_mut(),
            PreparedQuery::Boolean(q) => q.context_mut(),
            PreparedQuery::Update(q) => q.context_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::NamedNode;

    #[test]
    fn request_carries_context() {
        let mut context = QueryContext::new("SELECT * { ?s ?p ?o }", Some("http://example.org/"));
        context
            .bindings
            .insert("s".to_string(), NamedNode::new_unchecked("http://a").into());
        context.include_inferred = false;
        context.rulesets = vec!["rdfs.rules".to_string()];
        let tx = TransactionHandle::new("42");
        let request = context.request(Some((1, 10)), Some(&tx));
        assert_eq!(request.base_uri, Some("http://example.org/"));
        assert_eq!(request.bindings.len(), 1);
        assert!(!request.include_inferred);
        assert_eq!(request.rulesets, ["rdfs.rules".to_string()]);
        assert_eq!(request.page, Some((1, 10)));
        assert_eq!(request.transaction.map(TransactionHandle::id), Some("42"));
    }

    #[test]
    fn new_context_includes_inferred_by_default() {
        let context = QueryContext::new("ASK {}", None);
        assert!(context.include_inferred);
        assert!(context.bindings.is_empty());
        assert!(context.permissions.is_empty());
    }
}
