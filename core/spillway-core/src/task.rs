//! Single-worker task facility.
//!
//! A [`SingleWorker`] owns one background thread and runs the tasks handed
//! to it in submission order. Each submission returns a [`TaskHandle`] that
//! acts as the readiness signal for that task: the consumer either blocks on
//! it, or checks it with a bounded wait and gets the handle back if the task
//! is still running.
//!
//! A panic inside a task is caught on the worker and reported to whoever
//! waits on the handle as [`SpillwayError::WorkerPanicked`].

use crate::error::{SpillwayError, SpillwayResult};
use crossbeam::channel::{Receiver, RecvTimeoutError, bounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

/// One dedicated background thread.
pub struct SingleWorker {
    pool: ThreadPool,
    name: String,
}

impl SingleWorker {
    /// Start the worker thread under the given name.
    pub fn new(name: &str) -> SpillwayResult<Self> {
        let thread_name = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(1)
            .thread_name(move |_| thread_name.clone())
            .build()
            .map_err(|e| {
                SpillwayError::WorkerPanicked(format!("failed to start worker '{}': {}", name, e))
            })?;

        Ok(Self {
            pool,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue `task` on the worker thread.
    pub fn spawn<T, F>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        self.pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(task)).map_err(panic_message);
            // The receiver may already be gone if the owner stopped caring.
            let _ = tx.send(outcome);
        });
        TaskHandle { rx }
    }
}

/// Result of a bounded wait on a [`TaskHandle`].
pub enum WaitOutcome<T> {
    /// The task finished; its value or the failure that ended it.
    Ready(SpillwayResult<T>),
    /// Still running; the handle is returned for a later wait.
    Pending(TaskHandle<T>),
}

/// Completion handle for one task.
pub struct TaskHandle<T> {
    rx: Receiver<Result<T, String>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task finished.
    pub fn wait(self) -> SpillwayResult<T> {
        match self.rx.recv() {
            Ok(outcome) => outcome.map_err(SpillwayError::WorkerPanicked),
            Err(_) => Err(worker_gone()),
        }
    }

    /// Wait at most `timeout` for the task to finish.
    pub fn wait_timeout(self, timeout: Duration) -> WaitOutcome<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => WaitOutcome::Ready(outcome.map_err(SpillwayError::WorkerPanicked)),
            Err(RecvTimeoutError::Timeout) => WaitOutcome::Pending(self),
            Err(RecvTimeoutError::Disconnected) => WaitOutcome::Ready(Err(worker_gone())),
        }
    }

    /// Whether the result is available without blocking.
    pub fn is_finished(&self) -> bool {
        !self.rx.is_empty()
    }
}

fn worker_gone() -> SpillwayError {
    SpillwayError::WorkerPanicked("worker dropped the task without a result".to_string())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}
