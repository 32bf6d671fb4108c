//! Error types for ordo's event-loop plumbing.

use std::thread::ThreadId;

/// A specialized Result type for ordo-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the executor, the background pool and thread checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The UI executor was dropped and can no longer accept tasks.
    #[error("UI executor has been shut down")]
    ExecutorClosed,

    /// The background thread pool could not be built.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),

    /// An operation with thread affinity was attempted from another thread.
    #[error("Operation requires thread {expected:?} but ran on {actual:?}")]
    WrongThread {
        /// The thread the object is bound to.
        expected: ThreadId,
        /// The thread the call came from.
        actual: ThreadId,
    },
}

impl Error {
    /// Create a thread pool error from any displayable cause.
    pub fn thread_pool(cause: impl std::fmt::Display) -> Self {
        Self::ThreadPool(cause.to_string())
    }
}
