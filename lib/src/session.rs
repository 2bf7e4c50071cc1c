//! The driver session: transaction state, the write cache and every public operation.
//!
//! Lock order is write cache, then transaction slot. A flush reads the transaction slot while
//! holding the cache lock, so nothing may hold the transaction slot and then flush.
//!
//! Every write sent under a transaction first reads the cursors still streaming in that
//! transaction to their end, so a write never overtakes a read already on the wire.

use crate::buffer::{BatchSink, FlushTimer, WriteBuffer};
use crate::config::Config;
use crate::consts::{CONTEXT_IDS, COUNT_VARIABLE, SOMETHING};
use crate::cursor::{InFlight, OpenStreams, StatementCursor, StatementShape};
use crate::dispatch::{self, QueryLanguage};
use crate::errors::{DriverError, Result};
use crate::fetch;
use crate::gateway::{GraphPermissions, RemoteStoreGateway, StatementPattern, TransactionHandle};
use crate::options::IsolationLevel;
use crate::query::{
    self, BooleanQuery, ExecutableQuery, GraphQuery, PreparedQuery, QueryContext, TupleQuery,
    UpdateQuery,
};
use crate::skolem::Skolemizer;
use crate::util::{
    file_base_iri, format_from_path, into_graph, parse_document, with_named_graph, write_quads,
};
use log::{debug, info, warn};
use oxigraph::io::RdfFormat;
use oxigraph::model::{GraphName, NamedNode, NamedOrBlankNode, Quad, Term};
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends batches to the gateway under whatever transaction is open at flush time.
pub(crate) struct GatewaySink {
    gateway: Arc<dyn RemoteStoreGateway>,
    skolem: Skolemizer,
    default_graph: NamedNode,
    transaction: Arc<Mutex<Option<TransactionHandle>>>,
    permissions: Arc<RwLock<GraphPermissions>>,
    streams: OpenStreams,
}

impl GatewaySink {
    fn settle(&self, transaction: Option<&TransactionHandle>) {
        if let Some(transaction) = transaction {
            self.streams.complete(transaction);
        }
    }

    /// Skolemizes blank nodes, names the default graph and bulk-adds `quads`.
    fn send(&self, quads: &[Quad], base_uri: Option<&str>) -> Result<()> {
        if quads.is_empty() {
            return Ok(());
        }
        let prepared: Vec<Quad> = quads
            .iter()
            .map(|quad| with_named_graph(self.skolem.quad(quad.clone()), &self.default_graph))
            .collect();
        let transaction = lock(&self.transaction).clone();
        self.settle(transaction.as_ref());
        let permissions = self
            .permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.gateway
            .bulk_add(&prepared, base_uri, &permissions, transaction.as_ref())
            .map_err(|e| DriverError::repository("failed to add statements", e))
    }
}

impl BatchSink for Arc<GatewaySink> {
    fn write_batch(&self, batch: &[Quad]) -> Result<()> {
        self.send(batch, None)
    }
}

pub(crate) struct SessionCore {
    gateway: Arc<dyn RemoteStoreGateway>,
    config: Config,
    default_graph: NamedNode,
    sink: Arc<GatewaySink>,
    buffer: Option<Arc<WriteBuffer<Arc<GatewaySink>>>>,
    timer: Mutex<Option<FlushTimer>>,
    transaction: Arc<Mutex<Option<TransactionHandle>>>,
    rulesets: RwLock<Vec<String>>,
    permissions: Arc<RwLock<GraphPermissions>>,
    closed: AtomicBool,
}

impl SessionCore {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::RepositoryState(
                "session is closed".to_string(),
            ));
        }
        Ok(())
    }

    /// Flushes the write cache, if there is one.
    pub(crate) fn sync(&self) -> Result<()> {
        match &self.buffer {
            Some(buffer) => buffer.force_flush(),
            None => Ok(()),
        }
    }

    pub(crate) fn transaction(&self) -> Option<TransactionHandle> {
        lock(&self.transaction).clone()
    }

    /// Remembers a cursor opened under `transaction` until it stops streaming.
    pub(crate) fn track_stream(
        &self,
        transaction: Option<&TransactionHandle>,
        stream: Weak<dyn InFlight>,
    ) {
        if let Some(transaction) = transaction {
            self.sink.streams.track(transaction, stream);
        }
    }

    /// Transaction for a write that is about to go out, with that transaction's open cursors
    /// read to their end.
    pub(crate) fn write_transaction(&self) -> Option<TransactionHandle> {
        let transaction = self.transaction();
        self.sink.settle(transaction.as_ref());
        transaction
    }

    pub(crate) fn gateway(&self) -> &dyn RemoteStoreGateway {
        self.gateway.as_ref()
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn default_graph(&self) -> &NamedNode {
        &self.default_graph
    }

    fn context(&self, query: &str, base_uri: Option<&str>) -> QueryContext {
        let mut context = QueryContext::new(query, base_uri);
        context.rulesets = self
            .rulesets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        context.permissions = self
            .permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        context
    }

    fn write(&self, quad: Quad) -> Result<()> {
        match &self.buffer {
            Some(buffer) => buffer.add(quad),
            None => self.sink.send(&[quad], None),
        }
    }

    /// Store graph IRIs for `contexts`; the default graph maps to its reserved IRI.
    fn graph_iris(&self, contexts: &[GraphName]) -> Vec<NamedNode> {
        contexts
            .iter()
            .map(|graph| match graph {
                GraphName::NamedNode(node) => node.clone(),
                GraphName::BlankNode(node) => self.sink.skolem.iri_for(node),
                GraphName::DefaultGraph => self.default_graph.clone(),
            })
            .collect()
    }
}

/// ` FILTER (?var IN (...))` restricting a graph variable, or nothing when `graphs` is empty.
fn graph_filter(variable: &str, graphs: &[NamedNode]) -> String {
    if graphs.is_empty() {
        return String::new();
    }
    let list: Vec<String> = graphs.iter().map(ToString::to_string).collect();
    format!(" FILTER (?{variable} IN ({}))", list.join(", "))
}

/// A connection-like handle to a remote triple store.
///
/// At most one transaction is open at a time. Without one, every write is committed by the
/// store on its own. Reads flush the write cache first, so they see every write issued on this
/// session. Dropping the session closes it.
pub struct Session {
    core: Arc<SessionCore>,
}

impl Session {
    pub fn new(gateway: Arc<dyn RemoteStoreGateway>, config: Config) -> Result<Self> {
        config.validate()?;
        let default_graph = config.default_graph()?;
        let transaction = Arc::new(Mutex::new(None));
        let permissions = Arc::new(RwLock::new(GraphPermissions::default()));
        let sink = Arc::new(GatewaySink {
            gateway: gateway.clone(),
            skolem: Skolemizer::new(config.skolem_prefix.clone()),
            default_graph: default_graph.clone(),
            transaction: transaction.clone(),
            permissions: permissions.clone(),
            streams: OpenStreams::default(),
        });

        let (buffer, timer) = if config.write_cache.is_enabled() {
            let buffer = Arc::new(WriteBuffer::new(
                sink.clone(),
                config.cache_size,
                config.cache_period(),
            ));
            let timer =
                FlushTimer::start(buffer.clone(), config.initial_delay(), config.cache_period())
                    .map_err(|e| DriverError::repository("could not start flush timer", e))?;
            (Some(buffer), Some(timer))
        } else {
            (None, None)
        };

        info!(
            "opened session against {} (write cache: {:?})",
            gateway.describe(),
            config.write_cache
        );
        Ok(Self {
            core: Arc::new(SessionCore {
                gateway,
                config,
                default_graph,
                sink,
                buffer,
                timer: Mutex::new(timer),
                transaction,
                rulesets: RwLock::new(Vec::new()),
                permissions,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn with_defaults(gateway: Arc<dyn RemoteStoreGateway>) -> Result<Self> {
        Self::new(gateway, Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.core.config
    }

    pub fn is_closed(&self) -> bool {
        self.core.closed.load(Ordering::Acquire)
    }

    /// Number of statements waiting in the write cache.
    pub fn pending_writes(&self) -> usize {
        self.core.buffer.as_ref().map_or(0, |buffer| buffer.len())
    }

    /// Sends every cached write now. Use this where durability matters.
    pub fn sync(&self) -> Result<()> {
        self.core.ensure_open()?;
        self.core.sync()
    }

    // query preparation

    /// Classifies `query` and prepares the matching query object.
    pub fn prepare_query(
        &self,
        language: QueryLanguage,
        query: &str,
        base_uri: Option<&str>,
    ) -> Result<PreparedQuery> {
        let form = dispatch::classify(language, query)?;
        self.core.ensure_open()?;
        debug!("prepared {form:?} query");
        Ok(PreparedQuery::new(
            form,
            self.core.clone(),
            self.core.context(query, base_uri),
        ))
    }

    pub fn prepare_tuple_query(&self, query: &str, base_uri: Option<&str>) -> Result<TupleQuery> {
        self.core.ensure_open()?;
        Ok(TupleQuery::new(
            self.core.clone(),
            self.core.context(query, base_uri),
        ))
    }

    pub fn prepare_graph_query(&self, query: &str, base_uri: Option<&str>) -> Result<GraphQuery> {
        self.core.ensure_open()?;
        Ok(GraphQuery::new(
            self.core.clone(),
            self.core.context(query, base_uri),
        ))
    }

    pub fn prepare_boolean_query(
        &self,
        query: &str,
        base_uri: Option<&str>,
    ) -> Result<BooleanQuery> {
        self.core.ensure_open()?;
        Ok(BooleanQuery::new(
            self.core.clone(),
            self.core.context(query, base_uri),
        ))
    }

    pub fn prepare_update(&self, update: &str, base_uri: Option<&str>) -> Result<UpdateQuery> {
        self.core.ensure_open()?;
        Ok(UpdateQuery::new(
            self.core.clone(),
            self.core.context(update, base_uri),
        ))
    }

    /// Inference rulesets copied into every query prepared from now on.
    pub fn set_rulesets(&self, rulesets: Vec<String>) {
        *self
            .core
            .rulesets
            .write()
            .unwrap_or_else(PoisonError::into_inner) = rulesets;
    }

    pub fn rulesets(&self) -> Vec<String> {
        self.core
            .rulesets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Permissions applied to bulk writes and copied into every query prepared from now on.
    pub fn set_graph_permissions(&self, permissions: GraphPermissions) {
        *self
            .core
            .permissions
            .write()
            .unwrap_or_else(PoisonError::into_inner) = permissions;
    }

    pub fn graph_permissions(&self) -> GraphPermissions {
        self.core
            .permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // transactions

    pub fn is_active(&self) -> bool {
        lock(&self.core.transaction).is_some()
    }

    /// Cursors of the open transaction whose response is still being read.
    pub fn open_cursors(&self) -> usize {
        self.core
            .transaction()
            .map_or(0, |transaction| self.core.sink.streams.count(&transaction))
    }

    pub fn begin(&self) -> Result<()> {
        self.begin_with(IsolationLevel::SUPPORTED)
    }

    /// Opens a transaction. Cached writes are sent first so they stay outside of it.
    pub fn begin_with(&self, level: IsolationLevel) -> Result<()> {
        level.ensure_supported()?;
        self.core.ensure_open()?;
        if self.is_active() {
            return Err(DriverError::TransactionState(
                "only one active transaction allowed".to_string(),
            ));
        }
        self.core.sync()?;
        let mut slot = lock(&self.core.transaction);
        // a concurrent begin may have won between the check and the flush
        if slot.is_some() {
            return Err(DriverError::TransactionState(
                "only one active transaction allowed".to_string(),
            ));
        }
        let handle = self
            .core
            .gateway
            .open_transaction()
            .map_err(|e| DriverError::repository("failed to open transaction", e))?;
        debug!("began transaction {handle}");
        *slot = Some(handle);
        Ok(())
    }

    /// Flushes cached writes into the open transaction and commits it.
    ///
    /// A failed commit still forgets the handle; it is never retried.
    pub fn commit(&self) -> Result<()> {
        self.core.ensure_open()?;
        if !self.is_active() {
            return Err(DriverError::TransactionState(
                "no active transaction to commit".to_string(),
            ));
        }
        self.core.sync()?;
        let handle = lock(&self.core.transaction).take().ok_or_else(|| {
            DriverError::TransactionState("no active transaction to commit".to_string())
        })?;
        self.core.sink.settle(Some(&handle));
        self.core.gateway.commit(&handle).map_err(|e| {
            DriverError::repository(format!("failed to commit transaction {handle}"), e)
        })?;
        debug!("committed transaction {handle}");
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        self.core.ensure_open()?;
        if !self.is_active() {
            return Err(DriverError::TransactionState(
                "no active transaction to rollback".to_string(),
            ));
        }
        self.core.sync()?;
        let handle = lock(&self.core.transaction).take().ok_or_else(|| {
            DriverError::TransactionState("no active transaction to rollback".to_string())
        })?;
        self.core.sink.settle(Some(&handle));
        self.core.gateway.rollback(&handle).map_err(|e| {
            DriverError::repository(format!("failed to roll back transaction {handle}"), e)
        })?;
        debug!("rolled back transaction {handle}");
        Ok(())
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        IsolationLevel::SUPPORTED
    }

    pub fn set_isolation_level(&self, level: IsolationLevel) -> Result<()> {
        self.core.ensure_open()?;
        level.ensure_supported()
    }

    /// Fails while a transaction is open; otherwise writes are already auto-committed.
    pub fn set_auto_commit(&self) -> Result<()> {
        self.core.ensure_open()?;
        if self.is_active() {
            return Err(DriverError::TransactionState(
                "cannot switch to auto-commit with an active transaction".to_string(),
            ));
        }
        Ok(())
    }

    // writes

    /// Adds one statement. A quad in the default graph goes to the store's default graph.
    pub fn add_quad(&self, quad: Quad) -> Result<()> {
        self.core.ensure_open()?;
        self.core.write(quad)
    }

    /// Adds `subject predicate object` to each of `contexts`, or to the default graph when
    /// `contexts` is empty.
    pub fn add(
        &self,
        subject: impl Into<NamedOrBlankNode>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
        contexts: &[GraphName],
    ) -> Result<()> {
        self.core.ensure_open()?;
        let quad = Quad::new(subject, predicate, object, GraphName::DefaultGraph);
        if contexts.is_empty() {
            return self.core.write(quad);
        }
        for graph in contexts {
            self.core.write(into_graph(quad.clone(), Some(graph)))?;
        }
        Ok(())
    }

    pub fn add_all<I>(&self, quads: I) -> Result<()>
    where
        I: IntoIterator<Item = Quad>,
    {
        self.core.ensure_open()?;
        for quad in quads {
            self.core.write(quad)?;
        }
        Ok(())
    }

    /// Parses a document locally and bulk-adds it in batches of at most `cache_size`.
    ///
    /// Statements are placed in each of `contexts`; with no contexts they keep the graph the
    /// document gives them. A syntax error stops the load; batches sent before it stay.
    pub fn add_reader(
        &self,
        reader: impl Read,
        base_iri: Option<&str>,
        format: RdfFormat,
        contexts: &[GraphName],
    ) -> Result<()> {
        self.core.ensure_open()?;
        self.core.sync()?;
        let batch_size = self.core.config.cache_size;
        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;
        for quad in parse_document(reader, format, base_iri)? {
            let quad = quad?;
            if contexts.is_empty() {
                batch.push(quad);
            } else {
                for graph in contexts {
                    batch.push(into_graph(quad.clone(), Some(graph)));
                }
            }
            if batch.len() >= batch_size {
                self.core.sink.send(&batch, base_iri)?;
                total += batch.len();
                batch.clear();
            }
        }
        self.core.sink.send(&batch, base_iri)?;
        total += batch.len();
        info!("loaded {total} statements ({format})");
        Ok(())
    }

    /// Loads a file. The format defaults to the one implied by the extension and the base IRI
    /// to the file's own URI.
    pub fn add_file(
        &self,
        path: &Path,
        base_iri: Option<&str>,
        format: Option<RdfFormat>,
        contexts: &[GraphName],
    ) -> Result<()> {
        let format = format.unwrap_or_else(|| format_from_path(path));
        let base = match base_iri {
            Some(base) => base.to_string(),
            None => file_base_iri(path)?,
        };
        let file = std::fs::File::open(path)
            .map_err(|e| DriverError::parse(format!("cannot open {}", path.display()), e))?;
        self.add_reader(BufReader::new(file), Some(&base), format, contexts)
    }

    /// Loads the document at `url`; `file:` URLs are read from disk.
    ///
    /// The format defaults to the media type the server reports, then to the one implied by
    /// the URL's extension. The base IRI defaults to the URL itself.
    pub fn add_url(
        &self,
        url: &str,
        base_iri: Option<&str>,
        format: Option<RdfFormat>,
        contexts: &[GraphName],
    ) -> Result<()> {
        self.core.ensure_open()?;
        let parsed =
            Url::parse(url).map_err(|e| DriverError::parse(format!("invalid URL {url}"), e))?;
        let base = base_iri.unwrap_or(url);
        if parsed.scheme() == "file" {
            let path = parsed.to_file_path().map_err(|()| DriverError::Parse {
                message: format!("{url} does not name a local file"),
                source: None,
            })?;
            return self.add_file(&path, Some(base), format, contexts);
        }
        let document = fetch::fetch_document(&parsed)?;
        let format = format
            .or(document.format)
            .unwrap_or_else(|| fetch::format_from_url(&parsed));
        debug!("loading {} as {format}", document.url);
        self.add_reader(BufReader::new(document.body), Some(base), format, contexts)
    }

    /// Removes every statement matching the pattern; `None` matches anything. With no
    /// contexts the pattern is removed from every graph.
    pub fn remove(
        &self,
        subject: Option<&NamedOrBlankNode>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
        contexts: &[GraphName],
    ) -> Result<()> {
        self.core.ensure_open()?;
        self.core.sync()?;
        let skolem = &self.core.sink.skolem;
        let pattern = StatementPattern {
            subject: subject.map(|s| skolem.subject(s.clone())),
            predicate: predicate.cloned(),
            object: object.map(|o| skolem.term(o.clone())),
        };
        let graphs = self.core.graph_iris(contexts);
        let transaction = self.core.write_transaction();
        self.core
            .gateway
            .remove(&pattern, &graphs, transaction.as_ref())
            .map_err(|e| DriverError::repository("failed to remove statements", e))
    }

    pub fn remove_quad(&self, quad: &Quad) -> Result<()> {
        self.remove(
            Some(&quad.subject),
            Some(&quad.predicate),
            Some(&quad.object),
            std::slice::from_ref(&quad.graph_name),
        )
    }

    pub fn remove_all<'a, I>(&self, quads: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Quad>,
    {
        for quad in quads {
            self.remove_quad(quad)?;
        }
        Ok(())
    }

    /// Deletes the given graphs, or everything when `contexts` is empty.
    pub fn clear(&self, contexts: &[GraphName]) -> Result<()> {
        self.core.ensure_open()?;
        self.core.sync()?;
        let transaction = self.core.write_transaction();
        let outcome = if contexts.is_empty() {
            self.core.gateway.clear_all(transaction.as_ref())
        } else {
            let graphs = self.core.graph_iris(contexts);
            self.core.gateway.clear(&graphs, transaction.as_ref())
        };
        outcome.map_err(|e| DriverError::repository("failed to clear graphs", e))
    }

    pub fn clear_all(&self) -> Result<()> {
        self.clear(&[])
    }

    // reads

    /// Counts statements in `contexts`, or in the whole store.
    pub fn size(&self, contexts: &[GraphName]) -> Result<u64> {
        let graphs = self.core.graph_iris(contexts);
        let text = format!(
            "SELECT (COUNT(?s) AS ?{COUNT_VARIABLE}) WHERE {{ GRAPH ?g {{ ?s ?p ?o }}{} }}",
            graph_filter("g", &graphs)
        );
        let mut query = self.prepare_tuple_query(&text, None)?;
        query.set_include_inferred(false);
        let mut cursor = query.evaluate()?;
        let row = cursor.next_solution()?;
        cursor.close();
        let count = match row.as_ref().and_then(|row| row.get(COUNT_VARIABLE)) {
            Some(Term::Literal(literal)) => literal.value().parse::<u64>().ok(),
            _ => None,
        };
        count.ok_or_else(|| DriverError::QueryEvaluation {
            message: "count query returned no usable ?ct binding".to_string(),
            source: None,
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size(&[])? == 0)
    }

    fn bind_pattern<Q: ExecutableQuery>(
        &self,
        query: &mut Q,
        subject: Option<&NamedOrBlankNode>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) {
        let skolem = &self.core.sink.skolem;
        if let Some(subject) = subject {
            query.set_binding("s", skolem.subject(subject.clone()));
        }
        if let Some(predicate) = predicate {
            query.set_binding("p", predicate.clone());
        }
        if let Some(object) = object {
            query.set_binding("o", skolem.term(object.clone()));
        }
    }

    pub fn has_statement(
        &self,
        subject: Option<&NamedOrBlankNode>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
        include_inferred: bool,
        contexts: &[GraphName],
    ) -> Result<bool> {
        let text = if contexts.is_empty() {
            SOMETHING.to_string()
        } else {
            let graphs = self.core.graph_iris(contexts);
            format!(
                "ASK {{ GRAPH ?ctx {{ ?s ?p ?o }}{} }}",
                graph_filter("ctx", &graphs)
            )
        };
        let mut query = self.prepare_boolean_query(&text, None)?;
        query.set_include_inferred(include_inferred);
        self.bind_pattern(&mut query, subject, predicate, object);
        query.evaluate()
    }

    /// Lazily streams the statements matching the pattern. Each statement reports its graph
    /// unless quad mode is off, in which case everything is reported in the default graph.
    pub fn get_statements(
        &self,
        subject: Option<&NamedOrBlankNode>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
        include_inferred: bool,
        contexts: &[GraphName],
    ) -> Result<StatementCursor> {
        let graphs = self.core.graph_iris(contexts);
        let text = format!(
            "SELECT * WHERE {{ GRAPH ?ctx {{ ?s ?p ?o }}{} }}",
            graph_filter("ctx", &graphs)
        );
        let mut query = self.prepare_tuple_query(&text, None)?;
        query.set_include_inferred(include_inferred);
        self.bind_pattern(&mut query, subject, predicate, object);
        let shape = StatementShape {
            subject: subject.cloned(),
            predicate: predicate.cloned(),
            object: object.cloned(),
            graph: (!self.core.config.quad_mode).then_some(GraphName::DefaultGraph),
            default_graph: self.core.default_graph().clone(),
        };
        query::evaluate_statements(&self.core, query.context(), shape)
    }

    /// Feeds matching statements to `handler`, closing the cursor afterwards.
    pub fn export_statements<F>(
        &self,
        subject: Option<&NamedOrBlankNode>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
        include_inferred: bool,
        mut handler: F,
        contexts: &[GraphName],
    ) -> Result<()>
    where
        F: FnMut(Quad) -> Result<()>,
    {
        let mut cursor =
            self.get_statements(subject, predicate, object, include_inferred, contexts)?;
        let outcome = cursor.try_for_each(|quad| handler(quad?));
        cursor.close();
        outcome
    }

    /// Serializes the given graphs, or the whole store, to `writer`.
    pub fn export_to_writer<W: Write>(
        &self,
        writer: W,
        format: RdfFormat,
        contexts: &[GraphName],
    ) -> Result<W> {
        let cursor = self.get_statements(None, None, None, true, contexts)?;
        write_quads(writer, format, cursor)
    }

    /// Lazily lists the named graphs that hold at least one statement.
    pub fn context_ids(&self) -> Result<impl Iterator<Item = Result<NamedNode>>> {
        let cursor = self.prepare_tuple_query(CONTEXT_IDS, None)?.evaluate()?;
        Ok(cursor.filter_map(|row| match row {
            Ok(row) => match row.get("ctx") {
                Some(Term::NamedNode(node)) => Some(Ok(node.clone())),
                _ => None,
            },
            Err(e) => Some(Err(e)),
        }))
    }

    /// Releases the session. An open transaction is rolled back, otherwise cached writes are
    /// flushed; failures of either are logged and swallowed. Later calls fail with
    /// [`DriverError::RepositoryState`].
    pub fn close(&self) {
        if self.core.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut timer) = lock(&self.core.timer).take() {
            timer.stop();
        }
        let open = lock(&self.core.transaction).take();
        match open {
            Some(handle) => {
                // writes cached inside the transaction die with it
                let dropped = self.core.buffer.as_ref().map_or(0, |b| b.discard());
                debug!("discarded {dropped} cached writes of transaction {handle}");
                if let Err(e) = self.core.gateway.rollback(&handle) {
                    warn!("Rollback of transaction {handle} during close failed: {e}");
                }
            }
            None => {
                if let Err(e) = self.core.sync() {
                    warn!("Flushing cached writes during close failed: {e}");
                }
            }
        }
        self.core.sink.skolem.clear();
        info!("closed session against {}", self.core.gateway.describe());
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("gateway", &self.core.gateway.describe())
            .field("active", &self.is_active())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_filter_lists_graphs() {
        assert_eq!(graph_filter("g", &[]), "");
        let graphs = [
            NamedNode::new_unchecked("http://example.org/a"),
            NamedNode::new_unchecked("http://example.org/b"),
        ];
        assert_eq!(
            graph_filter("g", &graphs),
            " FILTER (?g IN (<http://example.org/a>, <http://example.org/b>))"
        );
    }
}
