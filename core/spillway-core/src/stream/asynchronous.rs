//! Asynchronous Stream: one-block-ahead prefetch on a background worker
//!
//! ```text
//!  consumer thread                         worker thread
//!  ───────────────                         ─────────────
//!  read_prefix()/poll() ── spawn ──────▶  [child.read_prefix()] child.read()
//!  poll(timeout) ◀── handle ready? ──────        │
//!  read() ◀──────────── result ──────────────────┘
//!        └── spawn next ────────────────▶  child.read()
//! ```
//!
//! The child sits behind a lock shared with the worker. A task holds the
//! lock for the whole computation, so the consumer side only touches the
//! child while the worker is idle.

use crate::config::AsyncStreamConfig;
use crate::error::{SpillwayError, SpillwayResult};
use crate::stream::{BlockInputStream, BlockStreamProfile};
use crate::task::{SingleWorker, TaskHandle, WaitOutcome};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Child stream shared between the consumer and the worker.
type SharedChild = Arc<Mutex<Box<dyn BlockInputStream>>>;

/// 비동기 블록 스트림: 별도 스레드에서 자식 스트림을 실행
///
/// Wraps one child and keeps at most one block computation in flight on a
/// dedicated worker thread. [`poll`](Self::poll) lets the consumer wait for
/// the next block with a bound, e.g. to check for cancellation in between.
///
/// Caller obligations, not checked:
/// - after `poll` returned `true`, call `read` before polling again
///   (polling again returns `true` without side effects)
/// - after `read` returned `None`, stop reading (further reads return
///   `None`)
///
/// A failure from the child is returned by the next `read` (or by
/// `read_suffix` if no `read` follows). After that the stream is poisoned:
/// every later call fails with [`SpillwayError::Poisoned`].
pub struct AsynchronousBlockStream {
    header: SchemaRef,
    config: AsyncStreamConfig,
    child: SharedChild,
    /// Set once a panic unwound through the child; it is never touched again.
    child_lost: bool,
    worker: Option<SingleWorker>,
    pending: Option<TaskHandle<SpillwayResult<Option<RecordBatch>>>>,
    /// Completed result not yet taken by `read`.
    ready: Option<SpillwayResult<Option<RecordBatch>>>,
    started: bool,
    /// The child's `read_prefix` has not run yet.
    first: bool,
    poisoned: Option<String>,
    profile: BlockStreamProfile,
}

impl AsynchronousBlockStream {
    pub fn new(child: Box<dyn BlockInputStream>) -> Self {
        Self::with_config(child, AsyncStreamConfig::default())
    }

    pub fn with_config(child: Box<dyn BlockInputStream>, config: AsyncStreamConfig) -> Self {
        Self {
            header: child.header(),
            config,
            child: Arc::new(Mutex::new(child)),
            child_lost: false,
            worker: None,
            pending: None,
            ready: None,
            started: false,
            first: true,
            poisoned: None,
            profile: BlockStreamProfile::new(),
        }
    }

    pub fn config(&self) -> &AsyncStreamConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether a block computation is running on the worker.
    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait at most `timeout` for the next block, starting the first
    /// computation if needed. `true` means `read` will not block.
    pub fn poll(&mut self, timeout: Duration) -> SpillwayResult<bool> {
        self.check_poisoned()?;
        if !self.started {
            self.schedule_next()?;
            self.started = true;
        }

        let Some(handle) = self.pending.take() else {
            return Ok(true);
        };
        match handle.wait_timeout(timeout) {
            WaitOutcome::Ready(outcome) => {
                self.complete(outcome);
                Ok(true)
            }
            WaitOutcome::Pending(handle) => {
                self.pending = Some(handle);
                Ok(false)
            }
        }
    }

    fn next_block(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        self.check_poisoned()?;

        let result = if !self.started {
            // First block is computed on the caller thread.
            self.started = true;
            let first = std::mem::replace(&mut self.first, false);
            self.with_child(|child| calculate(child, first))
        } else {
            self.wait_pending();
            self.ready.take().unwrap_or(Ok(None))
        };

        match result {
            Err(e) => Err(self.poison(e)),
            Ok(None) => Ok(None),
            Ok(Some(block)) => {
                if let Err(e) = self.schedule_next() {
                    return Err(self.poison(e));
                }
                Ok(Some(block))
            }
        }
    }

    /// Queue one more block computation on the worker.
    fn schedule_next(&mut self) -> SpillwayResult<()> {
        if self.child_lost {
            return Err(child_lost());
        }
        if self.worker.is_none() {
            self.worker = Some(SingleWorker::new(&self.config.thread_name)?);
        }
        let Some(worker) = self.worker.as_ref() else {
            return Err(SpillwayError::WorkerPanicked("prefetch worker missing".to_string()));
        };

        let first = std::mem::replace(&mut self.first, false);
        let child = Arc::clone(&self.child);
        debug!(worker = worker.name(), first, "prefetch scheduled");
        self.pending = Some(worker.spawn(move || calculate(&mut **child.lock(), first)));
        Ok(())
    }

    /// Run `f` on the child from the consumer thread. Only called while no
    /// task is in flight, so the lock is uncontended.
    fn with_child<T>(
        &self,
        f: impl FnOnce(&mut dyn BlockInputStream) -> SpillwayResult<T>,
    ) -> SpillwayResult<T> {
        if self.child_lost {
            return Err(child_lost());
        }
        f(&mut **self.child.lock())
    }

    fn wait_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            let outcome = handle.wait();
            self.complete(outcome);
        }
    }

    fn complete(&mut self, outcome: SpillwayResult<SpillwayResult<Option<RecordBatch>>>) {
        match outcome {
            Ok(result) => self.ready = Some(result),
            Err(e) => {
                // The task panicked inside the child.
                self.child_lost = true;
                self.ready = Some(Err(e));
            }
        }
    }

    fn check_poisoned(&self) -> SpillwayResult<()> {
        match &self.poisoned {
            Some(message) => Err(SpillwayError::Poisoned(message.clone())),
            None => Ok(()),
        }
    }

    fn poison(&mut self, err: SpillwayError) -> SpillwayError {
        self.poisoned = Some(err.to_string());
        err
    }
}

/// One background step: the child's prefix on the first call, then one block.
fn calculate(child: &mut dyn BlockInputStream, first: bool) -> SpillwayResult<Option<RecordBatch>> {
    if first {
        child.read_prefix()?;
    }
    child.read()
}

fn child_lost() -> SpillwayError {
    SpillwayError::Poisoned("child stream was lost in a failed computation".to_string())
}

impl BlockInputStream for AsynchronousBlockStream {
    fn name(&self) -> &'static str {
        "Asynchronous"
    }

    fn header(&self) -> SchemaRef {
        Arc::clone(&self.header)
    }

    /// Starts the first computation; the child's own prefix runs on the worker.
    fn read_prefix(&mut self) -> SpillwayResult<()> {
        self.check_poisoned()?;
        if !self.started {
            self.schedule_next()?;
            self.started = true;
        }
        Ok(())
    }

    fn read(&mut self) -> SpillwayResult<Option<RecordBatch>> {
        let started = Instant::now();
        let result = self.next_block();
        self.profile.observe(&result, started.elapsed());
        result
    }

    /// Waits for the worker to go idle, then finishes the child on this thread.
    /// A block prefetched but never read is discarded.
    fn read_suffix(&mut self) -> SpillwayResult<()> {
        self.check_poisoned()?;
        if !self.started {
            return Ok(());
        }

        self.wait_pending();
        if let Some(Err(e)) = self.ready.take() {
            return Err(self.poison(e));
        }
        self.with_child(|child| child.read_suffix())?;
        self.started = false;
        Ok(())
    }

    /// The child is shared with the worker and cannot be lent out by plain
    /// reference; see [`for_each_child`](Self::for_each_child).
    fn children(&self) -> Vec<&dyn BlockInputStream> {
        Vec::new()
    }

    /// Blocks until a running computation finishes. A child lost to a panic
    /// is skipped.
    fn for_each_child(&self, visit: &mut dyn FnMut(&dyn BlockInputStream)) {
        if self.child_lost {
            return;
        }
        let child = self.child.lock();
        visit(&**child);
    }

    fn profile(&self) -> Option<&BlockStreamProfile> {
        Some(&self.profile)
    }
}

impl Drop for AsynchronousBlockStream {
    fn drop(&mut self) {
        self.wait_pending();
        if let Some(Err(e)) = self.ready.take() {
            warn!(error = %e, "asynchronous stream dropped with an undelivered failure");
        }
    }
}
