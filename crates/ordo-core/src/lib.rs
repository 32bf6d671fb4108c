//! Event-loop plumbing for ordo.
//!
//! Data sources live on the host toolkit's UI thread. This crate provides the
//! pieces that make that affinity explicit instead of implicit:
//!
//! - **UI executor**: [`executor::UiExecutor`] and the stock
//!   [`executor::MainQueue`], a single-threaded FIFO task queue the host
//!   drains from its event loop
//! - **Thread affinity**: [`thread_check::ThreadAffinity`] debug checks
//! - **Signals**: [`Signal`], used for selection, drag, hover and expansion
//!   handlers
//! - **Background pool**: [`threadpool::ThreadPool`], a rayon pool whose
//!   results are marshalled back through the executor
//! - **Logging**: `tracing` targets and a text tree formatter
//!
//! # Example
//!
//! ```
//! use ordo_core::executor::{MainQueue, UiExecutor};
//! use ordo_core::Signal;
//! use std::sync::Arc;
//!
//! let queue = MainQueue::new();
//! let expanded = Signal::<u64>::new();
//! expanded.connect_queued(Arc::new(queue.handle()), |item| {
//!     println!("expanded {item}");
//! });
//!
//! expanded.emit(7);
//! queue.process_all();
//! ```

mod error;
pub mod executor;
pub mod logging;
pub mod signal;
pub mod thread_check;
pub mod threadpool;

pub use error::{Error, Result};
pub use executor::{BoxedTask, MainQueue, QueueHandle, TaskId, UiExecutor};
pub use logging::{PerfSpan, TreeFormatOptions, TreeFormatter, TreeStyle};
pub use signal::{ConnectionId, ConnectionType, Signal};
pub use thread_check::ThreadAffinity;
pub use threadpool::{TaskHandle, ThreadPool, ThreadPoolConfig};
