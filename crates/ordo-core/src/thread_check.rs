//! Thread affinity checks.
//!
//! Host view toolkits forbid mutating view state from more than one thread.
//! Objects that talk to a live view record the thread they were created on
//! with [`ThreadAffinity`] and verify every view-touching call against it.
//!
//! ```
//! use ordo_core::thread_check::ThreadAffinity;
//!
//! struct Adapter {
//!     affinity: ThreadAffinity,
//! }
//!
//! impl Adapter {
//!     fn update(&self) {
//!         self.affinity.debug_assert_same_thread();
//!         // ... safe to touch the view ...
//!     }
//! }
//!
//! Adapter { affinity: ThreadAffinity::current() }.update();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

use crate::error::{Error, Result};

/// Flag to enable/disable runtime thread checks globally.
static THREAD_CHECKS_ENABLED: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

/// Enable or disable runtime thread checks.
///
/// Checks default to on in debug builds and off in release builds.
pub fn set_thread_checks_enabled(enabled: bool) {
    THREAD_CHECKS_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Whether runtime thread checks are currently enabled.
#[inline]
pub fn thread_checks_enabled() -> bool {
    THREAD_CHECKS_ENABLED.load(Ordering::Relaxed)
}

/// Records the thread an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// The bound thread.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Whether the calling thread is the bound thread.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Return an error if called from a different thread.
    pub fn check(&self) -> Result<()> {
        let actual = std::thread::current().id();
        if actual == self.thread_id {
            Ok(())
        } else {
            Err(Error::WrongThread {
                expected: self.thread_id,
                actual,
            })
        }
    }

    /// Panic in debug builds (when checks are enabled) if called from a
    /// different thread.
    #[inline]
    #[track_caller]
    pub fn debug_assert_same_thread(&self) {
        if cfg!(debug_assertions) && thread_checks_enabled() {
            if let Err(err) = self.check() {
                panic!("thread affinity violated: {err}");
            }
        }
    }
}
