//! Background pool for pure-value computations such as snapshot diffing.
//!
//! Snapshots are plain values, so the diff between two of them can be
//! computed on any thread. The pool runs that work on rayon workers and hands
//! the result back either through a [`TaskHandle`] or by posting a callback
//! onto a [`UiExecutor`], so the live view is only ever touched on the UI
//! thread.
//!
//! ```
//! use ordo_core::executor::MainQueue;
//! use ordo_core::threadpool::{ThreadPool, ThreadPoolConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
//! assert_eq!(pool.spawn(|| 6 * 7).wait(), Some(42));
//!
//! let queue = MainQueue::new();
//! let result = Arc::new(parking_lot::Mutex::new(None));
//! let slot = result.clone();
//! pool.spawn_with_callback(|| "diffed", Arc::new(queue.handle()), move |value| {
//!     *slot.lock() = Some(value);
//! });
//! assert!(queue.process_until(|| result.lock().is_some(), Duration::from_secs(5)));
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};
use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};
use crate::executor::UiExecutor;
use crate::logging::targets;

/// Global thread pool instance.
static GLOBAL_POOL: OnceLock<Option<Arc<ThreadPool>>> = OnceLock::new();

/// Counter for unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A handle to a spawned task that allows waiting for its result.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: u64,
    receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Get the unique task ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Check if the task has completed.
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Try to get the result without blocking.
    pub fn try_get(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the task completes.
    ///
    /// Returns `None` if the task panicked.
    pub fn wait(self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Wait for the task with a timeout.
    pub fn wait_timeout(self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Configuration for creating a thread pool.
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of worker threads. `None` means use the number of CPU cores.
    pub num_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "ordo-diff".to_string(),
        }
    }
}

impl ThreadPoolConfig {
    /// Create a new configuration with custom thread count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }

    /// Set the worker thread name prefix.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// A rayon-backed pool for background computations.
pub struct ThreadPool {
    pool: RayonThreadPool,
    active_tasks: Arc<AtomicUsize>,
}

impl ThreadPool {
    /// Build a pool from `config`.
    pub fn new(config: ThreadPoolConfig) -> Result<Self> {
        let prefix = config.thread_name.clone();
        let mut builder =
            ThreadPoolBuilder::new().thread_name(move |index| format!("{prefix}-{index}"));
        if let Some(threads) = config.num_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build().map_err(Error::thread_pool)?;
        tracing::debug!(
            target: targets::THREADPOOL,
            threads = pool.current_num_threads(),
            "background pool started"
        );
        Ok(Self {
            pool,
            active_tasks: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The process-wide pool, created with default settings on first use.
    ///
    /// `None` when the pool cannot be built; the failure is logged once.
    pub fn global() -> Option<Arc<ThreadPool>> {
        GLOBAL_POOL
            .get_or_init(|| match Self::new(ThreadPoolConfig::default()) {
                Ok(pool) => Some(Arc::new(pool)),
                Err(err) => {
                    tracing::error!(target: targets::THREADPOOL, %err, "cannot start shared pool");
                    None
                }
            })
            .clone()
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn active_count(&self) -> usize {
        self.active_tasks.load(Ordering::SeqCst)
    }

    /// Run `work` on the pool and return a handle to its result.
    pub fn spawn<F, T>(&self, work: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = bounded(1);
        let active = self.active_tasks.clone();
        active.fetch_add(1, Ordering::SeqCst);
        self.pool.spawn(move || {
            let value = work();
            active.fetch_sub(1, Ordering::SeqCst);
            let _ = sender.send(value);
        });
        TaskHandle { id, receiver }
    }

    /// Run `work` on the pool and post `callback` with its result onto
    /// `executor`.
    pub fn spawn_with_callback<F, T, C>(&self, work: F, executor: Arc<dyn UiExecutor>, callback: C)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        let active = self.active_tasks.clone();
        active.fetch_add(1, Ordering::SeqCst);
        self.pool.spawn(move || {
            let value = work();
            active.fetch_sub(1, Ordering::SeqCst);
            if let Err(err) = executor.post(Box::new(move || callback(value))) {
                tracing::error!(target: targets::THREADPOOL, %err, "background result dropped");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MainQueue;
    use parking_lot::Mutex;

    #[test]
    fn test_spawn_and_wait() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
        let handle = pool.spawn(|| (1..=10).sum::<u32>());
        assert_eq!(handle.wait(), Some(55));
    }

    #[test]
    fn test_wait_timeout() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(1)).unwrap();
        let handle = pool.spawn(|| 7);
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)), Some(7));
    }

    #[test]
    fn test_callback_runs_on_executor_thread() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
        let queue = MainQueue::new();
        let ui_thread = std::thread::current().id();
        let seen = Arc::new(Mutex::new(None));

        let slot = seen.clone();
        pool.spawn_with_callback(
            || 3,
            Arc::new(queue.handle()),
            move |value| {
                *slot.lock() = Some((value, std::thread::current().id()));
            },
        );

        assert!(queue.process_until(|| seen.lock().is_some(), Duration::from_secs(5)));
        assert_eq!(*seen.lock(), Some((3, ui_thread)));
    }

    #[test]
    fn test_global_pool_is_shared() {
        let first = ThreadPool::global().unwrap();
        let second = ThreadPool::global().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.spawn(|| 2 + 2).wait(), Some(4));
    }

    #[test]
    fn test_config_builder() {
        let config = ThreadPoolConfig::with_threads(3).with_thread_name("diff");
        assert_eq!(config.num_threads, Some(3));
        assert_eq!(config.thread_name, "diff");
    }
}
