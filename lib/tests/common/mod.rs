#![allow(dead_code)]

use oxigraph::model::{GraphName, NamedNode, Quad, Term};
use rdfdriver::{
    Config, GatewayError, GraphPermissions, QueryRequest, RemoteStoreGateway, ResponseBody,
    Session, StatementPattern, TransactionHandle,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_GRAPH: &str = "http://marklogic.com/semantics#default-graph";

pub fn iri(value: &str) -> NamedNode {
    NamedNode::new_unchecked(value)
}

pub fn ex(local: &str) -> NamedNode {
    iri(&format!("http://example.org/{local}"))
}

pub fn graph(local: &str) -> GraphName {
    GraphName::NamedNode(ex(local))
}

#[derive(Default)]
struct StoreState {
    committed: Vec<Quad>,
    open: Option<(TransactionHandle, Vec<Quad>)>,
    next_transaction: u32,
    batches: Vec<Vec<Quad>>,
    last_transaction: Option<Option<TransactionHandle>>,
    failing: HashSet<&'static str>,
    stall: Option<Duration>,
}

type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Tuple response body that is slow to arrive and logs `stream_released` once dropped.
struct SlowBody {
    inner: Cursor<Vec<u8>>,
    delay: Duration,
    calls: CallLog,
}

impl Read for SlowBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::thread::sleep(self.delay);
        self.inner.read(buf)
    }
}

impl Drop for SlowBody {
    fn drop(&mut self) {
        self.calls.lock().unwrap().push("stream_released");
    }
}

/// In-memory stand-in for a remote store. Understands the handful of query shapes the session
/// generates itself and records every call it receives.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<StoreState>,
    calls: CallLog,
}

impl MemoryGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every later call to `operation` fail until [`MemoryGateway::recover`].
    pub fn fail(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.remove(operation);
    }

    /// Makes every tuple response wait `delay` before each read of its body.
    pub fn stall_streams(&self, delay: Duration) {
        self.state.lock().unwrap().stall = Some(delay);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| **c == operation).count()
    }

    /// Every quad list handed to `bulk_add`, including rejected ones.
    pub fn batches(&self) -> Vec<Vec<Quad>> {
        self.state.lock().unwrap().batches.clone()
    }

    pub fn committed(&self) -> Vec<Quad> {
        self.state.lock().unwrap().committed.clone()
    }

    /// Transaction the most recent query, update or write ran under.
    pub fn last_transaction(&self) -> Option<Option<TransactionHandle>> {
        self.state.lock().unwrap().last_transaction.clone()
    }

    /// Waits for `operation` to have been called at least `n` times.
    pub fn wait_for(&self, operation: &str, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.count(operation) >= n {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        self.count(operation) >= n
    }

    fn enter(
        &self,
        operation: &'static str,
        transaction: Option<&TransactionHandle>,
    ) -> Result<std::sync::MutexGuard<'_, StoreState>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        self.calls.lock().unwrap().push(operation);
        state.last_transaction = Some(transaction.cloned());
        if state.failing.contains(operation) {
            return Err(GatewayError::Status {
                status: 500,
                body: format!("injected {operation} failure"),
            });
        }
        Ok(state)
    }
}

impl StoreState {
    fn visible(&self, transaction: Option<&TransactionHandle>) -> Vec<Quad> {
        let mut quads = self.committed.clone();
        if let (Some((open, staged)), Some(tx)) = (&self.open, transaction) {
            if open == tx {
                quads.extend(staged.iter().cloned());
            }
        }
        quads
    }

    fn target(
        &mut self,
        transaction: Option<&TransactionHandle>,
    ) -> Result<&mut Vec<Quad>, GatewayError> {
        match transaction {
            None => Ok(&mut self.committed),
            Some(tx) => match &mut self.open {
                Some((open, staged)) if open == tx => Ok(staged),
                _ => Err(GatewayError::Status {
                    status: 400,
                    body: format!("unknown transaction {tx}"),
                }),
            },
        }
    }
}

/// IRIs listed in a ` FILTER (?g IN (...))` clause; empty when the query has none.
fn filtered_graphs(query: &str) -> Vec<String> {
    match query.find(" IN (") {
        Some(start) => query[start..]
            .split('<')
            .skip(1)
            .filter_map(|chunk| chunk.split_once('>').map(|(iri, _)| iri.to_string()))
            .collect(),
        None => Vec::new(),
    }
}

fn matches(quad: &Quad, bindings: &BTreeMap<String, Term>, graphs: &[String]) -> bool {
    let subject: Term = quad.subject.clone().into();
    let predicate: Term = quad.predicate.clone().into();
    let bound = |name: &str, value: &Term| bindings.get(name).map_or(true, |b| b == value);
    let in_graph = match &quad.graph_name {
        GraphName::NamedNode(g) => graphs.is_empty() || graphs.iter().any(|i| i == g.as_str()),
        _ => graphs.is_empty(),
    };
    bound("s", &subject) && bound("p", &predicate) && bound("o", &quad.object) && in_graph
}

pub fn term_json(term: &Term) -> Value {
    match term {
        Term::NamedNode(n) => json!({"type": "uri", "value": n.as_str()}),
        Term::BlankNode(b) => json!({"type": "bnode", "value": b.as_str()}),
        Term::Literal(l) => match l.language() {
            Some(lang) => json!({"type": "literal", "value": l.value(), "xml:lang": lang}),
            None => json!({
                "type": "literal",
                "value": l.value(),
                "datatype": l.datatype().as_str(),
            }),
        },
        #[allow(unreachable_patterns)]
        _ => Value::Null,
    }
}

pub fn results_json(variables: &[&str], rows: Vec<Value>) -> String {
    json!({
        "head": {"vars": variables},
        "results": {"bindings": rows},
    })
    .to_string()
}

fn body(text: String) -> ResponseBody {
    Box::new(Cursor::new(text.into_bytes()))
}

impl MemoryGateway {
    fn tuple_body(&self, stall: Option<Duration>, text: String) -> ResponseBody {
        match stall {
            Some(delay) => Box::new(SlowBody {
                inner: Cursor::new(text.into_bytes()),
                delay,
                calls: self.calls.clone(),
            }),
            None => body(text),
        }
    }
}

fn graph_value(quad: &Quad) -> Value {
    match &quad.graph_name {
        GraphName::NamedNode(g) => json!({"type": "uri", "value": g.as_str()}),
        _ => json!({"type": "uri", "value": DEFAULT_GRAPH}),
    }
}

impl RemoteStoreGateway for MemoryGateway {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn tuple_query(&self, request: QueryRequest<'_>) -> Result<ResponseBody, GatewayError> {
        let state = self.enter("tuple_query", request.transaction)?;
        let graphs = filtered_graphs(request.query);
        let stall = state.stall;
        let quads: Vec<Quad> = state
            .visible(request.transaction)
            .into_iter()
            .filter(|q| matches(q, request.bindings, &graphs))
            .collect();
        if request.query.contains("COUNT(") {
            let row = json!({"ct": {
                "type": "literal",
                "value": quads.len().to_string(),
                "datatype": "http://www.w3.org/2001/XMLSchema#integer",
            }});
            return Ok(body(results_json(&["ct"], vec![row])));
        }
        if request.query.starts_with("SELECT DISTINCT ?ctx") {
            let mut seen = HashSet::new();
            let rows = quads
                .iter()
                .filter(|q| seen.insert(q.graph_name.clone()))
                .map(|q| json!({"ctx": graph_value(q)}))
                .collect();
            return Ok(body(results_json(&["ctx"], rows)));
        }
        let rows = quads
            .iter()
            .map(|q| {
                json!({
                    "s": term_json(&q.subject.clone().into()),
                    "p": term_json(&q.predicate.clone().into()),
                    "o": term_json(&q.object),
                    "ctx": graph_value(q),
                })
            })
            .collect();
        drop(state);
        Ok(self.tuple_body(stall, results_json(&["s", "p", "o", "ctx"], rows)))
    }

    fn graph_query(&self, request: QueryRequest<'_>) -> Result<ResponseBody, GatewayError> {
        let state = self.enter("graph_query", request.transaction)?;
        let text: String = state
            .visible(request.transaction)
            .iter()
            .filter(|q| matches(q, request.bindings, &[]))
            .map(|q| format!("{} {} {} .\n", q.subject, q.predicate, q.object))
            .collect();
        Ok(body(text))
    }

    fn boolean_query(&self, request: QueryRequest<'_>) -> Result<bool, GatewayError> {
        let state = self.enter("boolean_query", request.transaction)?;
        let graphs = filtered_graphs(request.query);
        Ok(state
            .visible(request.transaction)
            .iter()
            .any(|q| matches(q, request.bindings, &graphs)))
    }

    fn update(&self, request: QueryRequest<'_>) -> Result<(), GatewayError> {
        self.enter("update", request.transaction)?;
        Ok(())
    }

    fn bulk_add(
        &self,
        quads: &[Quad],
        _base_uri: Option<&str>,
        _permissions: &GraphPermissions,
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.batches.push(quads.to_vec());
        drop(state);
        let mut state = self.enter("bulk_add", transaction)?;
        state.target(transaction)?.extend(quads.iter().cloned());
        Ok(())
    }

    fn remove(
        &self,
        pattern: &StatementPattern,
        contexts: &[NamedNode],
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError> {
        let mut state = self.enter("remove", transaction)?;
        let mut bindings = BTreeMap::new();
        if let Some(s) = &pattern.subject {
            bindings.insert("s".to_string(), Term::from(s.clone()));
        }
        if let Some(p) = &pattern.predicate {
            bindings.insert("p".to_string(), Term::from(p.clone()));
        }
        if let Some(o) = &pattern.object {
            bindings.insert("o".to_string(), o.clone());
        }
        let graphs: Vec<String> = contexts.iter().map(|g| g.as_str().to_string()).collect();
        state.committed.retain(|q| !matches(q, &bindings, &graphs));
        if let Some((_, staged)) = &mut state.open {
            staged.retain(|q| !matches(q, &bindings, &graphs));
        }
        Ok(())
    }

    fn clear(
        &self,
        contexts: &[NamedNode],
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError> {
        let mut state = self.enter("clear", transaction)?;
        let graphs: Vec<String> = contexts.iter().map(|g| g.as_str().to_string()).collect();
        state
            .committed
            .retain(|q| !matches(q, &BTreeMap::new(), &graphs));
        Ok(())
    }

    fn clear_all(&self, transaction: Option<&TransactionHandle>) -> Result<(), GatewayError> {
        let mut state = self.enter("clear_all", transaction)?;
        state.committed.clear();
        Ok(())
    }

    fn open_transaction(&self) -> Result<TransactionHandle, GatewayError> {
        let mut state = self.enter("open_transaction", None)?;
        state.next_transaction += 1;
        let handle = TransactionHandle::new(format!("tx-{}", state.next_transaction));
        state.open = Some((handle.clone(), Vec::new()));
        Ok(handle)
    }

    fn commit(&self, transaction: &TransactionHandle) -> Result<(), GatewayError> {
        let mut state = self.enter("commit", Some(transaction))?;
        match state.open.take() {
            Some((open, staged)) if open == *transaction => {
                state.committed.extend(staged);
                Ok(())
            }
            other => {
                state.open = other;
                Err(GatewayError::Status {
                    status: 400,
                    body: format!("unknown transaction {transaction}"),
                })
            }
        }
    }

    fn rollback(&self, transaction: &TransactionHandle) -> Result<(), GatewayError> {
        let mut state = self.enter("rollback", Some(transaction))?;
        state.open = None;
        Ok(())
    }
}

/// A session whose writes are never cached.
pub fn uncached(gateway: &Arc<MemoryGateway>) -> Session {
    let config = Config::builder()
        .write_cache(rdfdriver::CacheMode::Disabled)
        .build()
        .unwrap();
    Session::new(gateway.clone(), config).unwrap()
}

/// A cached session whose timer stays out of the way of the test.
pub fn cached(gateway: &Arc<MemoryGateway>, cache_size: usize) -> Session {
    let config = Config::builder()
        .cache_size(cache_size)
        .cache_millis(60_000u64)
        .initial_delay_millis(60_000u64)
        .build()
        .unwrap();
    Session::new(gateway.clone(), config).unwrap()
}
