//! ordo: diffable snapshots for collection, table and outline views.
//!
//! Describe what a view should display as a value, a [`Snapshot`] of
//! sections and items or a [`TreeSnapshot`] of nested items, and hand it to
//! a data source. The data source diffs it against what the view currently
//! shows and replays the minimal set of inserts, deletes, moves and reloads
//! on the view, one apply at a time.
//!
//! # Layers
//!
//! - [`snapshot`]: the snapshot value types and their edits
//! - [`diff`]: the diff engine, identity-keyed with move minimization
//! - [`apply`]: the coordinator that serializes applies into a view
//! - [`view`]: the traits a host toolkit implements for its widgets
//! - [`data_source`]: collection, table and outline data sources
//! - [`selection`], [`configuration`], [`registry`]: selection, per-item
//!   appearance state and typed cell registration
//!
//! # Example
//!
//! ```
//! use ordo::{Snapshot, diff_snapshots};
//!
//! let mut old = Snapshot::<&str, u32>::new();
//! old.append_sections(["Main"]).unwrap();
//! old.append_items([1, 2, 3], None).unwrap();
//!
//! let mut new = old.clone();
//! new.delete_items(&[2]);
//! new.append_items([4], None).unwrap();
//!
//! let diff = diff_snapshots(&old, &new);
//! assert_eq!(diff.summary().items_deleted, 1);
//! assert_eq!(diff.summary().items_inserted, 1);
//! ```

pub mod apply;
pub mod configuration;
pub mod data_source;
pub mod diff;
pub mod identity;
pub mod prelude;
pub mod registry;
pub mod selection;
pub mod snapshot;
pub mod view;

pub use apply::{ApplyOption, ApplyTicket, Completion, DataSourceConfig};
pub use data_source::{CollectionDataSource, OutlineDataSource, TableDataSource};
pub use diff::{Change, Diff, TreeChange, TreeDiff, diff_snapshots, diff_trees};
pub use identity::{Identifier, IndexPath};
pub use snapshot::{Snapshot, SnapshotError, TreeSnapshot};
