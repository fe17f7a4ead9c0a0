//! Background, order-preserving delivery of reports to the Agent.
//!
//! A single worker thread owns all outbound report I/O:
//! - `submit()` never blocks the caller (unbounded FIFO channel)
//! - each report is attempted at most once; failures are logged, not retried
//! - `stop()` drains for a bounded time, then abandons what is left

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use tracing::{debug, info, warn};

use super::types::{ReportItem, UploadError};

/// Poll interval while waiting for the queue to drain
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Sends reports to their destination
pub trait ReportUploader: Send + Sync + 'static {
    /// Send one report to its own endpoint
    fn upload(&self, item: &ReportItem) -> Result<(), UploadError>;

    /// Send several reports as one tagged array
    fn upload_batch(&self, items: &[ReportItem]) -> Result<(), UploadError>;
}

/// How queued reports are grouped into requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// One request per report
    Individual,
    /// Up to `max_items` already-queued reports per request
    Batch { max_items: usize },
}

impl DeliveryMode {
    /// Batch mode for sizes above one, individual otherwise
    pub fn for_batch_size(batch_size: usize) -> Self {
        if batch_size > 1 {
            DeliveryMode::Batch {
                max_items: batch_size,
            }
        } else {
            DeliveryMode::Individual
        }
    }
}

enum Message {
    Report(ReportItem),
    Shutdown,
}

#[derive(Debug, Default)]
struct DrainState {
    /// Submitted, not yet picked up by the worker
    queued: usize,
    /// Picked up and being uploaded
    in_flight: usize,
    /// Set when a drain timed out; the worker discards what is still queued
    abandoned: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<DrainState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, DrainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move `count` queued reports to in-flight, unless the drain was abandoned
    fn claim(&self, count: usize) -> bool {
        let mut state = self.state();
        state.queued = state.queued.saturating_sub(count);
        if state.abandoned {
            return false;
        }
        state.in_flight += count;
        true
    }

    fn finish(&self, count: usize) {
        let mut state = self.state();
        state.in_flight = state.in_flight.saturating_sub(count);
    }
}

/// Asynchronous report delivery channel
pub struct ReportQueue {
    tx: Sender<Message>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    drain_timeout: Duration,
}

impl ReportQueue {
    /// Spawn the worker thread
    pub fn start(uploader: impl ReportUploader, mode: DeliveryMode, drain_timeout: Duration) -> Self {
        let (tx, rx) = unbounded();
        let shared = Arc::new(Shared::default());

        let worker_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || run_worker(rx, uploader, mode, worker_shared));

        debug!(?mode, drain_timeout_ms = drain_timeout.as_millis() as u64, "report queue started");

        Self {
            tx,
            shared,
            worker: Mutex::new(Some(handle)),
            stopped: AtomicBool::new(false),
            drain_timeout,
        }
    }

    /// Queue a report for delivery (non-blocking)
    pub fn submit(&self, item: ReportItem) {
        if self.stopped.load(Ordering::SeqCst) {
            warn!(kind = item.kind(), "report queue is stopped, dropping report");
            return;
        }

        self.shared.state().queued += 1;
        if self.tx.send(Message::Report(item)).is_err() {
            let mut state = self.shared.state();
            state.queued = state.queued.saturating_sub(1);
            warn!("report worker has exited, dropping report");
        }
    }

    /// Reports submitted whose upload has not finished yet
    pub fn pending(&self) -> usize {
        let state = self.shared.state();
        state.queued + state.in_flight
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Drain the queue for at most the configured timeout
    ///
    /// Returns the number of reports left undelivered (0 on a full drain).
    /// An upload already in progress at the deadline is left to finish and
    /// is not counted. Calling it again returns the current backlog without
    /// waiting.
    pub fn stop(&self) -> usize {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return self.pending();
        }

        let _ = self.tx.send(Message::Shutdown);
        let deadline = Instant::now() + self.drain_timeout;

        while self.pending() > 0 {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(DRAIN_POLL.min(deadline - now));
        }

        let (undelivered, in_flight) = {
            let mut state = self.shared.state();
            if state.queued + state.in_flight > 0 {
                state.abandoned = true;
            }
            (state.queued, state.in_flight)
        };
        if undelivered + in_flight > 0 {
            warn!(
                undelivered,
                in_flight,
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "report queue did not drain in time, {} report(s) were not delivered",
                undelivered
            );
            return undelivered;
        }

        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                while !handle.is_finished() && Instant::now() < deadline {
                    thread::sleep(DRAIN_POLL);
                }
                if handle.is_finished() {
                    let _ = handle.join();
                }
            }
        }

        info!("report queue drained");
        0
    }
}

impl Drop for ReportQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    rx: Receiver<Message>,
    uploader: impl ReportUploader,
    mode: DeliveryMode,
    shared: Arc<Shared>,
) {
    loop {
        let first = match rx.recv() {
            Ok(Message::Report(item)) => item,
            Ok(Message::Shutdown) | Err(_) => break,
        };

        let mut batch = vec![first];
        let mut shutdown = false;
        if let DeliveryMode::Batch { max_items } = mode {
            while batch.len() < max_items {
                match rx.try_recv() {
                    Ok(Message::Report(item)) => batch.push(item),
                    Ok(Message::Shutdown) => {
                        shutdown = true;
                        break;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }

        if shared.claim(batch.len()) {
            deliver(&uploader, mode, &batch);
            shared.finish(batch.len());
        } else {
            debug!(count = batch.len(), "discarding reports after drain timeout");
        }

        if shutdown {
            break;
        }
    }
    debug!("report worker exiting");
}

fn deliver(uploader: &impl ReportUploader, mode: DeliveryMode, batch: &[ReportItem]) {
    match mode {
        DeliveryMode::Individual => {
            for item in batch {
                if let Err(e) = uploader.upload(item) {
                    warn!(kind = item.kind(), error = %e, "failed to deliver report");
                }
            }
        }
        DeliveryMode::Batch { .. } => {
            if let Err(e) = uploader.upload_batch(batch) {
                warn!(count = batch.len(), error = %e, "failed to deliver report batch");
            }
        }
    }
}
