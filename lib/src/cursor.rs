//! Pull-based cursors over streamed query responses.
//!
//! Each cursor owns one decoder thread. The thread turns the response body into records and
//! pushes them through a bounded channel; the caller pulls them lazily. Closing a cursor sets
//! the cancel flag, drops the receiving end (which wakes a decoder blocked on a full channel)
//! and joins the thread, so the response body is released before `close` returns.
//!
//! Cursors opened inside a transaction are tracked by the session in [`OpenStreams`]. Before a
//! write goes out under that transaction, the session reads each such stream to its end into
//! the cursor's own memory, so the write never overtakes a read still on the wire.

use crate::errors::{DriverError, Result};
use crate::gateway::{ResponseBody, TransactionHandle};
use log::{debug, warn};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{GraphName, NamedNode, NamedOrBlankNode, Quad, Term, Triple};
use oxigraph::sparql::results::{
    QueryResultsFormat, QueryResultsParser, ReaderQueryResultsParserOutput,
};
use oxigraph::sparql::{QuerySolution, Variable};
use std::collections::VecDeque;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, TryLockError, Weak};
use std::thread::JoinHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub enum CursorState {
    NotStarted,
    Streaming,
    Exhausted,
    Closed,
    Failed(DriverError),
}

enum Handoff<T> {
    Record(T),
    Failed(DriverError),
}

/// Producer side of a cursor, handed to the decoder running on the background thread.
pub struct Publisher<T> {
    sender: SyncSender<Handoff<T>>,
    cancelled: Arc<AtomicBool>,
}

impl<T> Publisher<T> {
    /// Pushes one record, blocking while the channel is full.
    /// Returns `false` once the cursor was closed; the decoder should stop.
    pub fn publish(&self, record: T) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.sender.send(Handoff::Record(record)).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Consumer side of the hand-off. `receiver` is gone once the decoder finished or the cursor
/// was closed; `drained` holds records read ahead by [`InFlight::complete`].
struct Intake<T> {
    receiver: Option<Receiver<Handoff<T>>>,
    drained: VecDeque<Handoff<T>>,
}

impl<T> Intake<T> {
    fn pull(&mut self) -> Option<Handoff<T>> {
        if let Some(item) = self.drained.pop_front() {
            return Some(item);
        }
        let item = self.receiver.as_ref()?.recv().ok();
        if item.is_none() {
            // decoder finished and dropped its sender
            self.receiver = None;
        }
        item
    }

    fn shut(&mut self) {
        self.receiver = None;
        self.drained.clear();
    }
}

/// A response that may still be arriving.
pub(crate) trait InFlight: Send + Sync {
    fn is_streaming(&self) -> bool;

    /// Reads the rest of the response into memory and returns how many items were buffered.
    fn complete(&self) -> usize;
}

impl<T: Send> InFlight for Mutex<Intake<T>> {
    fn is_streaming(&self) -> bool {
        match self.try_lock() {
            Ok(intake) => intake.receiver.is_some(),
            // the owner is blocked in a pull
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(e)) => e.into_inner().receiver.is_some(),
        }
    }

    fn complete(&self) -> usize {
        let mut intake = lock(self);
        let Some(receiver) = intake.receiver.take() else {
            return 0;
        };
        let before = intake.drained.len();
        intake.drained.extend(receiver.iter());
        intake.drained.len() - before
    }
}

fn is_live(stream: &Weak<dyn InFlight>) -> bool {
    stream.upgrade().is_some_and(|s| s.is_streaming())
}

/// Cursors of one session that are still streaming, keyed by the transaction they read under.
#[derive(Default)]
pub(crate) struct OpenStreams {
    entries: Mutex<Vec<(TransactionHandle, Weak<dyn InFlight>)>>,
}

impl OpenStreams {
    pub(crate) fn track(&self, transaction: &TransactionHandle, stream: Weak<dyn InFlight>) {
        let mut entries = lock(&self.entries);
        entries.retain(|(_, s)| is_live(s));
        entries.push((transaction.clone(), stream));
    }

    fn live(&self, transaction: &TransactionHandle) -> Vec<Arc<dyn InFlight>> {
        let mut entries = lock(&self.entries);
        entries.retain(|(_, s)| is_live(s));
        entries
            .iter()
            .filter(|(tx, _)| tx == transaction)
            .filter_map(|(_, s)| s.upgrade())
            .collect()
    }

    pub(crate) fn count(&self, transaction: &TransactionHandle) -> usize {
        self.live(transaction).len()
    }

    /// Reads every stream still open under `transaction` to its end.
    pub(crate) fn complete(&self, transaction: &TransactionHandle) {
        for stream in self.live(transaction) {
            let buffered = stream.complete();
            debug!("read ahead {buffered} results of an open cursor in transaction {transaction}");
        }
    }
}

/// Single-pass cursor fed by a background decoder.
pub struct BackgroundCursor<T> {
    intake: Arc<Mutex<Intake<T>>>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    lookahead: Option<T>,
    state: CursorState,
}

impl<T: Send + 'static> BackgroundCursor<T> {
    /// Starts `decode` on a thread named `name`, reading from `stream`.
    ///
    /// A decoder error is queued behind the records that preceded it and surfaces on the pull
    /// that reaches it.
    pub fn spawn<R, D>(name: &str, capacity: usize, stream: R, decode: D) -> Result<Self>
    where
        R: Read + Send + 'static,
        D: FnOnce(R, &Publisher<T>) -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let cancelled = Arc::new(AtomicBool::new(false));
        let publisher = Publisher {
            sender,
            cancelled: cancelled.clone(),
        };
        let worker = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if let Err(e) = decode(stream, &publisher) {
                    if publisher.is_cancelled() {
                        debug!("decoder stopped after cancellation: {e}");
                    } else {
                        let _ = publisher.sender.send(Handoff::Failed(e));
                    }
                }
            })
            .map_err(|e| DriverError::query_evaluation("could not start result decoder", e))?;
        Ok(Self {
            intake: Arc::new(Mutex::new(Intake {
                receiver: Some(receiver),
                drained: VecDeque::new(),
            })),
            cancelled,
            worker: Some(worker),
            lookahead: None,
            state: CursorState::NotStarted,
        })
    }

    pub(crate) fn in_flight(&self) -> Weak<dyn InFlight> {
        let intake: Weak<Mutex<Intake<T>>> = Arc::downgrade(&self.intake);
        intake
    }
}

impl<T> BackgroundCursor<T> {
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Blocks until the next record is available or the stream ended.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.lookahead.is_some() {
            return Ok(true);
        }
        match &self.state {
            CursorState::Exhausted | CursorState::Closed => return Ok(false),
            CursorState::Failed(e) => return Err(e.clone()),
            CursorState::NotStarted | CursorState::Streaming => {}
        }
        let next = lock(&self.intake).pull();
        match next {
            Some(Handoff::Record(record)) => {
                self.state = CursorState::Streaming;
                self.lookahead = Some(record);
                Ok(true)
            }
            Some(Handoff::Failed(e)) => {
                self.release();
                self.state = CursorState::Failed(e.clone());
                Err(e)
            }
            None => {
                self.release();
                self.state = CursorState::Exhausted;
                Ok(false)
            }
        }
    }

    pub fn next_record(&mut self) -> Result<Option<T>> {
        if self.has_next()? {
            Ok(self.lookahead.take())
        } else {
            Ok(None)
        }
    }

    /// Stops the decoder and releases the response stream. Safe to call repeatedly.
    ///
    /// A decoder blocked on a full channel stops at once. One blocked reading the network
    /// finishes that read first, so `close` can take as long as the gateway's read timeout.
    pub fn close(&mut self) {
        self.lookahead = None;
        self.release();
        if !matches!(self.state, CursorState::Failed(_)) {
            self.state = CursorState::Closed;
        }
    }

    fn release(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        lock(&self.intake).shut();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("result decoder thread panicked");
            }
        }
    }
}

impl<T> Iterator for BackgroundCursor<T> {
    type Item = Result<T>;

    /// Yields a failure once and then ends; `has_next` keeps re-raising it.
    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, CursorState::Failed(_)) {
            return None;
        }
        self.next_record().transpose()
    }
}

impl<T> Drop for BackgroundCursor<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Rows of a SELECT query.
pub struct TupleCursor {
    variables: Arc<OnceLock<Vec<Variable>>>,
    inner: BackgroundCursor<QuerySolution>,
}

impl TupleCursor {
    /// Decodes a SPARQL JSON results document in the background.
    pub fn spawn(body: ResponseBody, capacity: usize) -> Result<Self> {
        let variables = Arc::new(OnceLock::new());
        let header = variables.clone();
        let inner = BackgroundCursor::spawn(
            "rdfdriver-tuples",
            capacity,
            body,
            move |body, publisher| {
                decode_solutions(body, publisher, |vars| {
                    let _ = header.set(vars.to_vec());
                })
            },
        )?;
        Ok(Self { variables, inner })
    }

    pub(crate) fn in_flight(&self) -> Weak<dyn InFlight> {
        self.inner.in_flight()
    }

    /// Projected variables, available once the response header was decoded.
    pub fn variables(&mut self) -> Result<&[Variable]> {
        self.inner.has_next()?;
        Ok(self.variables.get().map(Vec::as_slice).unwrap_or(&[]))
    }

    pub fn has_next(&mut self) -> Result<bool> {
        self.inner.has_next()
    }

    pub fn next_solution(&mut self) -> Result<Option<QuerySolution>> {
        self.inner.next_record()
    }

    pub fn state(&self) -> &CursorState {
        self.inner.state()
    }

    pub fn close(&mut self) {
        self.inner.close()
    }
}

impl Iterator for TupleCursor {
    type Item = Result<QuerySolution>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Triples of a CONSTRUCT or DESCRIBE query.
pub struct GraphCursor {
    inner: BackgroundCursor<Triple>,
}

impl GraphCursor {
    /// Decodes an N-Triples document in the background.
    pub fn spawn(body: ResponseBody, capacity: usize) -> Result<Self> {
        let inner = BackgroundCursor::spawn(
            "rdfdriver-triples",
            capacity,
            body,
            |body, publisher| {
                for quad in RdfParser::from_format(RdfFormat::NTriples).for_reader(body) {
                    let quad = quad.map_err(|e| {
                        DriverError::query_evaluation("malformed graph query results", e)
                    })?;
                    if !publisher.publish(Triple::from(quad)) {
                        break;
                    }
                }
                Ok(())
            },
        )?;
        Ok(Self { inner })
    }

    pub(crate) fn in_flight(&self) -> Weak<dyn InFlight> {
        self.inner.in_flight()
    }

    pub fn has_next(&mut self) -> Result<bool> {
        self.inner.has_next()
    }

    pub fn next_triple(&mut self) -> Result<Option<Triple>> {
        self.inner.next_record()
    }

    pub fn state(&self) -> &CursorState {
        self.inner.state()
    }

    pub fn close(&mut self) {
        self.inner.close()
    }
}

impl Iterator for GraphCursor {
    type Item = Result<Triple>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Fixed positions of a statement lookup. Unbound positions are read from the `s`, `p`, `o`
/// and `ctx` columns of each row.
#[derive(Debug, Clone)]
pub struct StatementShape {
    pub subject: Option<NamedOrBlankNode>,
    pub predicate: Option<NamedNode>,
    pub object: Option<Term>,
    pub graph: Option<GraphName>,
    /// Rows in this graph are reported in the default graph.
    pub default_graph: NamedNode,
}

impl StatementShape {
    fn quad(&self, row: &QuerySolution) -> Result<Quad> {
        let subject = match &self.subject {
            Some(s) => s.clone(),
            None => match column(row, "s")? {
                Term::NamedNode(n) => n.into(),
                Term::BlankNode(b) => b.into(),
                other => return Err(bad_row(format!("{other} is not a valid subject"))),
            },
        };
        let predicate = match &self.predicate {
            Some(p) => p.clone(),
            None => match column(row, "p")? {
                Term::NamedNode(n) => n,
                other => return Err(bad_row(format!("{other} is not a valid predicate"))),
            },
        };
        let object = match &self.object {
            Some(o) => o.clone(),
            None => column(row, "o")?,
        };
        let graph = match (&self.graph, row.get("ctx")) {
            (Some(g), _) => g.clone(),
            (None, Some(Term::NamedNode(n))) if *n == self.default_graph => GraphName::DefaultGraph,
            (None, Some(Term::NamedNode(n))) => n.clone().into(),
            (None, _) => GraphName::DefaultGraph,
        };
        Ok(Quad::new(subject, predicate, object, graph))
    }
}

fn column(row: &QuerySolution, name: &str) -> Result<Term> {
    row.get(name)
        .cloned()
        .ok_or_else(|| bad_row(format!("result row has no binding for ?{name}")))
}

fn bad_row(message: String) -> DriverError {
    DriverError::QueryEvaluation {
        message,
        source: None,
    }
}

/// Statements matching a pattern, rebuilt from tuple rows.
pub struct StatementCursor {
    inner: BackgroundCursor<Quad>,
}

impl StatementCursor {
    pub fn spawn(body: ResponseBody, capacity: usize, shape: StatementShape) -> Result<Self> {
        let inner = BackgroundCursor::spawn(
            "rdfdriver-statements",
            capacity,
            body,
            move |body, publisher| {
                let rows = BackgroundRows { shape, publisher };
                decode_solutions(body, &rows, |_| {})
            },
        )?;
        Ok(Self { inner })
    }

    pub(crate) fn in_flight(&self) -> Weak<dyn InFlight> {
        self.inner.in_flight()
    }

    pub fn has_next(&mut self) -> Result<bool> {
        self.inner.has_next()
    }

    pub fn next_statement(&mut self) -> Result<Option<Quad>> {
        self.inner.next_record()
    }

    pub fn close(&mut self) {
        self.inner.close()
    }
}

impl Iterator for StatementCursor {
    type Item = Result<Quad>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Where decoded rows go.
trait RowSink {
    fn accept(&self, row: QuerySolution) -> Result<bool>;
}

impl RowSink for Publisher<QuerySolution> {
    fn accept(&self, row: QuerySolution) -> Result<bool> {
        Ok(self.publish(row))
    }
}

struct BackgroundRows<'a> {
    shape: StatementShape,
    publisher: &'a Publisher<Quad>,
}

impl RowSink for BackgroundRows<'_> {
    fn accept(&self, row: QuerySolution) -> Result<bool> {
        let quad = self.shape.quad(&row)?;
        Ok(self.publisher.publish(quad))
    }
}

fn decode_solutions<S, H>(body: impl Read, sink: &S, on_header: H) -> Result<()>
where
    S: RowSink + ?Sized,
    H: FnOnce(&[Variable]),
{
    let output = QueryResultsParser::from_format(QueryResultsFormat::Json)
        .for_reader(body)
        .map_err(|e| DriverError::query_evaluation("malformed tuple query results", e))?;
    match output {
        ReaderQueryResultsParserOutput::Solutions(solutions) => {
            on_header(solutions.variables());
            for solution in solutions {
                let solution = solution
                    .map_err(|e| DriverError::query_evaluation("malformed tuple query results", e))?;
                if !sink.accept(solution)? {
                    break;
                }
            }
            Ok(())
        }
        ReaderQueryResultsParserOutput::Boolean(_) => Err(DriverError::QueryEvaluation {
            message: "expected a solution sequence, got a boolean result".to_string(),
            source: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    /// In-memory body that records when it is dropped.
    struct TrackedBody {
        inner: Cursor<Vec<u8>>,
        released: Arc<AtomicBool>,
    }

    impl Read for TrackedBody {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for TrackedBody {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn tracked(data: String) -> (ResponseBody, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let body = TrackedBody {
            inner: Cursor::new(data.into_bytes()),
            released: released.clone(),
        };
        (Box::new(body), released)
    }

    fn ntriples(count: usize) -> String {
        (0..count)
            .map(|i| format!("<http://example.org/s{i}> <http://example.org/p> \"{i}\" .\n"))
            .collect()
    }

    #[test]
    fn graph_cursor_yields_triples_in_order() {
        let body: ResponseBody = Box::new(Cursor::new(ntriples(3).into_bytes()));
        let cursor = GraphCursor::spawn(body, 2).unwrap();
        let subjects: Vec<String> = cursor
            .map(|t| t.unwrap().subject.to_string())
            .collect();
        assert_eq!(
            subjects,
            vec![
                "<http://example.org/s0>",
                "<http://example.org/s1>",
                "<http://example.org/s2>"
            ]
        );
    }

    #[test]
    fn early_close_releases_stream_and_stops_decoder() {
        let (body, released) = tracked(ntriples(5000));
        let mut cursor = GraphCursor::spawn(body, 4).unwrap();
        assert!(cursor.next_triple().unwrap().is_some());

        let started = Instant::now();
        cursor.close();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(released.load(Ordering::SeqCst));
        assert!(matches!(cursor.state(), CursorState::Closed));
        assert!(!cursor.has_next().unwrap());
        // closing twice is harmless
        cursor.close();
    }

    #[test]
    fn dropping_an_unread_cursor_releases_stream() {
        let (body, released) = tracked(ntriples(2000));
        let cursor = GraphCursor::spawn(body, 1).unwrap();
        drop(cursor);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn parse_failure_surfaces_on_next_pull_and_sticks() {
        let data = "<http://example.org/s> <http://example.org/p> <http://example.org/o> .\n\
                    this is not n-triples\n";
        let body: ResponseBody = Box::new(Cursor::new(data.as_bytes().to_vec()));
        let mut cursor = GraphCursor::spawn(body, 8).unwrap();
        assert!(cursor.next_triple().unwrap().is_some());
        let first = cursor.next_triple().unwrap_err();
        assert!(matches!(first, DriverError::QueryEvaluation { .. }));
        assert!(matches!(cursor.state(), CursorState::Failed(_)));
        let second = cursor.has_next().unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
    }

    /// Body whose first read blocks for `delay`, like a slow network.
    struct StalledBody {
        inner: Cursor<Vec<u8>>,
        delay: Option<Duration>,
    }

    impl Read for StalledBody {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(delay) = self.delay.take() {
                std::thread::sleep(delay);
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn completed_stream_is_served_from_memory() {
        let (body, released) = tracked(ntriples(50));
        let mut cursor = GraphCursor::spawn(body, 2).unwrap();
        assert!(cursor.next_triple().unwrap().is_some());

        let stream = cursor.in_flight().upgrade().unwrap();
        assert!(stream.is_streaming());
        assert_eq!(stream.complete(), 49);
        assert!(released.load(Ordering::SeqCst));
        assert!(!stream.is_streaming());
        assert_eq!(stream.complete(), 0);

        assert_eq!(cursor.by_ref().filter(Result::is_ok).count(), 49);
        assert!(matches!(cursor.state(), CursorState::Exhausted));
    }

    #[test]
    fn open_streams_forget_finished_cursors() {
        let streams = OpenStreams::default();
        let tx = TransactionHandle::new("tx-1");
        let other = TransactionHandle::new("tx-2");
        let mut first = GraphCursor::spawn(Box::new(Cursor::new(ntriples(10).into_bytes())), 1)
            .unwrap();
        let second = GraphCursor::spawn(Box::new(Cursor::new(ntriples(10).into_bytes())), 1)
            .unwrap();
        streams.track(&tx, first.in_flight());
        streams.track(&other, second.in_flight());
        assert_eq!(streams.count(&tx), 1);

        first.close();
        assert_eq!(streams.count(&tx), 0);
        assert_eq!(streams.count(&other), 1);
        drop(second);
        assert_eq!(streams.count(&other), 0);
    }

    #[test]
    fn close_waits_for_a_read_in_progress() {
        let body: ResponseBody = Box::new(StalledBody {
            inner: Cursor::new(ntriples(3).into_bytes()),
            delay: Some(Duration::from_millis(150)),
        });
        let mut cursor = GraphCursor::spawn(body, 4).unwrap();
        let started = Instant::now();
        cursor.close();
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(matches!(cursor.state(), CursorState::Closed));
    }

    #[test]
    fn tuple_cursor_reports_variables_and_rows() {
        let json = r#"{"head":{"vars":["s","n"]},"results":{"bindings":[
            {"s":{"type":"uri","value":"http://example.org/a"},"n":{"type":"literal","value":"1"}},
            {"s":{"type":"uri","value":"http://example.org/b"}}
        ]}}"#;
        let body: ResponseBody = Box::new(Cursor::new(json.as_bytes().to_vec()));
        let mut cursor = TupleCursor::spawn(body, 4).unwrap();
        let names: Vec<&str> = cursor
            .variables()
            .unwrap()
            .iter()
            .map(Variable::as_str)
            .collect();
        assert_eq!(names, vec!["s", "n"]);
        let rows: Vec<QuerySolution> = cursor.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].get("n").is_none());
        assert!(matches!(cursor.state(), CursorState::Exhausted));
    }

    #[test]
    fn boolean_document_is_rejected_by_tuple_cursor() {
        let body: ResponseBody = Box::new(Cursor::new(br#"{"head":{},"boolean":true}"#.to_vec()));
        let mut cursor = TupleCursor::spawn(body, 4).unwrap();
        assert!(cursor.has_next().is_err());
    }

    #[test]
    fn statement_cursor_fills_bound_positions() {
        let json = r#"{"head":{"vars":["o","ctx"]},"results":{"bindings":[
            {"o":{"type":"literal","value":"x"},"ctx":{"type":"uri","value":"http://example.org/g"}},
            {"o":{"type":"literal","value":"y"},"ctx":{"type":"uri","value":"http://marklogic.com/semantics#default-graph"}}
        ]}}"#;
        let body: ResponseBody = Box::new(Cursor::new(json.as_bytes().to_vec()));
        let shape = StatementShape {
            subject: Some(NamedNode::new_unchecked("http://example.org/s").into()),
            predicate: Some(NamedNode::new_unchecked("http://example.org/p")),
            object: None,
            graph: None,
            default_graph: crate::consts::DEFAULT_GRAPH.into_owned(),
        };
        let quads: Vec<Quad> = StatementCursor::spawn(body, 4, shape)
            .unwrap()
            .map(|q| q.unwrap())
            .collect();
        assert_eq!(quads.len(), 2);
        assert_eq!(
            quads[0].graph_name,
            GraphName::from(NamedNode::new_unchecked("http://example.org/g"))
        );
        assert_eq!(quads[1].graph_name, GraphName::DefaultGraph);
    }
}
