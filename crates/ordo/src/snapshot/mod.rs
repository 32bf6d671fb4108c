//! Snapshots: value descriptions of what a view displays.
//!
//! - [`Snapshot`] holds ordered sections of ordered items, for collection and
//!   table views.
//! - [`TreeSnapshot`] holds an ordered forest with expansion state, for
//!   outline views.
//!
//! Both are built by the caller, handed to a data source's `apply`, and
//! reconciled against the currently displayed snapshot by [`crate::diff`].
//! Edits that would break identifier uniqueness or the forest shape return a
//! [`SnapshotError`] and leave the snapshot untouched.

mod error;
mod flat;
mod tree;

pub use error::{Result, SnapshotError};
pub use flat::Snapshot;
pub use tree::TreeSnapshot;
