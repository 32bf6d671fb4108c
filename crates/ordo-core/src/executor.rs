//! UI executor: the single-threaded task queue owned by the host event loop.
//!
//! Data sources never touch a live view from an arbitrary call stack. Apply
//! completions, background diff results and queued signal slots are posted to
//! a [`UiExecutor`], and the host drains the queue from its UI thread.
//!
//! [`MainQueue`] is the stock implementation. The host keeps the queue on the
//! UI thread and calls [`MainQueue::process_all`] once per event-loop
//! iteration; everything else posts through a cloned [`QueueHandle`].
//!
//! ```
//! use ordo_core::executor::{MainQueue, UiExecutor};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let queue = MainQueue::new();
//! let handle = queue.handle();
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! let counter = hits.clone();
//! handle.post(Box::new(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! })).unwrap();
//!
//! assert_eq!(queue.process_all(), 1);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::logging::targets;
use crate::thread_check::ThreadAffinity;

/// A unique identifier for a posted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A boxed task closure.
pub type BoxedTask = Box<dyn FnOnce() + Send + 'static>;

/// Where work that must run on the UI thread is sent.
///
/// Implementations must run tasks in the order they were posted and must
/// never run a task re-entrantly from inside `post`.
pub trait UiExecutor: Send + Sync {
    /// Queue a task for the UI thread.
    fn post(&self, task: BoxedTask) -> Result<TaskId>;
}

struct TaskData {
    id: TaskId,
    task: BoxedTask,
}

/// Posted tasks that have not run yet, and which of them are cancelled.
#[derive(Default)]
struct TaskLedger {
    pending: HashSet<TaskId>,
    cancelled: HashSet<TaskId>,
}

impl TaskLedger {
    fn cancel(&mut self, id: TaskId) -> bool {
        self.pending.contains(&id) && self.cancelled.insert(id)
    }

    /// Forgets `id` as it leaves the queue. Returns whether it was cancelled.
    fn take(&mut self, id: TaskId) -> bool {
        self.pending.remove(&id);
        self.cancelled.remove(&id)
    }
}

type SharedLedger = Arc<Mutex<TaskLedger>>;

/// The UI thread's task queue.
///
/// Created on the UI thread, which it then considers its owner: draining from
/// any other thread is a debug assertion failure.
pub struct MainQueue {
    sender: Sender<TaskData>,
    receiver: Receiver<TaskData>,
    ledger: SharedLedger,
    /// Maximum number of tasks to process per [`process_batch`](Self::process_batch).
    batch_size: usize,
    affinity: ThreadAffinity,
}

impl Default for MainQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MainQueue {
    /// Create a new queue bound to the current thread.
    pub fn new() -> Self {
        Self::with_batch_size(32)
    }

    /// Create a new queue with a custom batch size.
    pub fn with_batch_size(batch_size: usize) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            ledger: SharedLedger::default(),
            batch_size: batch_size.max(1),
            affinity: ThreadAffinity::current(),
        }
    }

    /// A cloneable, thread-safe handle for posting into this queue.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            sender: self.sender.clone(),
            ledger: self.ledger.clone(),
        }
    }

    /// Mark a pending task as cancelled so it is skipped when dequeued.
    ///
    /// Returns `false` if the task already ran or was already marked.
    pub fn cancel(&self, id: TaskId) -> bool {
        self.ledger.lock().cancel(id)
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Process up to `batch_size` tasks.
    ///
    /// Returns the number of tasks run.
    pub fn process_batch(&self) -> usize {
        self.affinity.debug_assert_same_thread();
        let mut count = 0;
        while count < self.batch_size {
            match self.receiver.try_recv() {
                Ok(data) => {
                    if self.run(data) {
                        count += 1;
                    }
                }
                Err(_) => break,
            }
        }
        count
    }

    /// Process tasks until the queue is empty, including tasks posted by the
    /// tasks being run.
    ///
    /// Returns the number of tasks run.
    pub fn process_all(&self) -> usize {
        self.affinity.debug_assert_same_thread();
        let mut count = 0;
        while let Ok(data) = self.receiver.try_recv() {
            if self.run(data) {
                count += 1;
            }
        }
        if count > 0 {
            tracing::trace!(target: targets::EXECUTOR, count, "drained UI queue");
        }
        count
    }

    /// Keep processing tasks until `done` returns `true` or `timeout` elapses.
    ///
    /// Blocks waiting for tasks posted from other threads (for example a
    /// background diff). Returns whether `done` was satisfied.
    pub fn process_until<F>(&self, mut done: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        self.affinity.debug_assert_same_thread();
        let deadline = Instant::now() + timeout;
        loop {
            self.process_all();
            if done() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.receiver.recv_timeout(remaining) {
                Ok(data) => {
                    self.run(data);
                }
                Err(RecvTimeoutError::Timeout) => return done(),
                Err(RecvTimeoutError::Disconnected) => return done(),
            }
        }
    }

    fn run(&self, data: TaskData) -> bool {
        if self.ledger.lock().take(data.id) {
            tracing::trace!(target: targets::EXECUTOR, task = data.id.as_u64(), "skipping cancelled task");
            return false;
        }
        (data.task)();
        true
    }
}

impl UiExecutor for MainQueue {
    fn post(&self, task: BoxedTask) -> Result<TaskId> {
        post_into(&self.sender, &self.ledger, task)
    }
}

/// A posting handle for a [`MainQueue`], usable from any thread.
#[derive(Clone)]
pub struct QueueHandle {
    sender: Sender<TaskData>,
    ledger: SharedLedger,
}

impl QueueHandle {
    /// Cancel a task posted to the queue, if it has not run yet.
    pub fn cancel(&self, id: TaskId) -> bool {
        self.ledger.lock().cancel(id)
    }
}

impl UiExecutor for QueueHandle {
    fn post(&self, task: BoxedTask) -> Result<TaskId> {
        post_into(&self.sender, &self.ledger, task)
    }
}

fn post_into(sender: &Sender<TaskData>, ledger: &SharedLedger, task: BoxedTask) -> Result<TaskId> {
    let id = next_task_id();
    ledger.lock().pending.insert(id);
    if sender.send(TaskData { id, task }).is_err() {
        ledger.lock().pending.remove(&id);
        return Err(Error::ExecutorClosed);
    }
    Ok(id)
}

static_assertions::assert_impl_all!(QueueHandle: Send, Sync);
