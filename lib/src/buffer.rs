//! Write cache that coalesces single-statement adds into batched network writes.
//!
//! Pending statements live in one mutex-guarded set. `add`, the periodic timer and explicit
//! flushes all go through that lock, so a flush never overlaps another flush or a mutation of the
//! pending set. The set is cleared only after the sink accepted the batch; a failed flush leaves
//! every statement in place for the next attempt.

use crate::errors::Result;
use log::{debug, warn};
use oxigraph::model::Quad;
use std::collections::HashSet;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Destination of a flushed batch.
pub trait BatchSink: Send + Sync {
    fn write_batch(&self, batch: &[Quad]) -> Result<()>;
}

#[derive(Debug)]
struct PendingWrites {
    order: Vec<Quad>,
    seen: HashSet<Quad>,
    last_flush: Instant,
}

impl PendingWrites {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
            last_flush: Instant::now(),
        }
    }

    fn insert(&mut self, quad: Quad) {
        if self.seen.insert(quad.clone()) {
            self.order.push(quad);
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

pub struct WriteBuffer<S: BatchSink> {
    sink: S,
    cache_size: usize,
    max_age: Duration,
    pending: Mutex<PendingWrites>,
}

impl<S: BatchSink> WriteBuffer<S> {
    pub fn new(sink: S, cache_size: usize, max_age: Duration) -> Self {
        Self {
            sink,
            cache_size: cache_size.max(1),
            max_age,
            pending: Mutex::new(PendingWrites::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Buffers `quad`. Reaching the size threshold flushes synchronously before returning, and
    /// the flush error, if any, is returned to the caller.
    pub fn add(&self, quad: Quad) -> Result<()> {
        let mut pending = self.lock();
        // a previous threshold flush failed; do not grow past the limit
        if pending.len() >= self.cache_size {
            self.flush_locked(&mut pending)?;
        }
        pending.insert(quad);
        if pending.len() >= self.cache_size {
            self.flush_locked(&mut pending)?;
        }
        Ok(())
    }

    /// Timer entry point. Flushes when the buffer is nearly full or its contents went stale.
    /// Returns whether a flush happened.
    pub fn tick(&self) -> Result<bool> {
        let mut pending = self.lock();
        if pending.is_empty() {
            return Ok(false);
        }
        let nearly_full = pending.len() >= self.cache_size.saturating_sub(1);
        let stale = pending.last_flush.elapsed() > self.max_age;
        if nearly_full || stale {
            self.flush_locked(&mut pending)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Flushes whatever is pending. Callers use this before reads and transaction boundaries.
    pub fn force_flush(&self) -> Result<()> {
        let mut pending = self.lock();
        if pending.is_empty() {
            return Ok(());
        }
        self.flush_locked(&mut pending)
    }

    /// How long the timer may sleep before the next check. Never longer than `period`, and never
    /// past the moment the pending set turns stale.
    pub fn next_check(&self, period: Duration) -> Duration {
        let pending = self.lock();
        let remaining = self.max_age.saturating_sub(pending.last_flush.elapsed());
        if remaining.is_zero() {
            period
        } else {
            // staleness is a strict comparison
            period.min(remaining + Duration::from_millis(1))
        }
    }

    /// Drops all pending statements without sending them. Returns how many were dropped.
    pub fn discard(&self) -> usize {
        let mut pending = self.lock();
        let dropped = pending.len();
        pending.clear();
        dropped
    }

    fn flush_locked(&self, pending: &mut PendingWrites) -> Result<()> {
        debug!("flushing write cache: {} statements", pending.len());
        self.sink.write_batch(&pending.order)?;
        pending.clear();
        pending.last_flush = Instant::now();
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, PendingWrites> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Background thread that calls [`WriteBuffer::tick`] at most `period` apart, waking early when
/// the pending set is about to go stale.
///
/// Failures on this path are logged and swallowed; nobody is waiting on the result. Stopping
/// the timer (explicitly or on drop) wakes the thread immediately and joins it.
pub struct FlushTimer {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FlushTimer {
    pub fn start<S>(
        buffer: Arc<WriteBuffer<S>>,
        initial_delay: Duration,
        period: Duration,
    ) -> std::io::Result<Self>
    where
        S: BatchSink + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("rdfdriver-flush".into())
            .spawn(move || {
                let mut wait = initial_delay;
                loop {
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(e) = buffer.tick() {
                                warn!("Background flush of write cache failed: {e}");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    wait = buffer.next_check(period);
                }
                debug!("write cache timer stopped");
            })?;
        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("write cache timer thread panicked");
            }
        }
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
