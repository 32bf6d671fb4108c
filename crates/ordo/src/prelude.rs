//! Prelude module for ordo.
//!
//! Re-exports the types most host integrations need:
//!
//! ```
//! use ordo::prelude::*;
//! ```

// ============================================================================
// Snapshots and diffs
// ============================================================================

pub use crate::diff::{Change, Diff, TreeChange, TreeDiff, diff_snapshots, diff_trees};
pub use crate::identity::{Identifier, IndexPath};
pub use crate::snapshot::{Snapshot, SnapshotError, TreeSnapshot};

// ============================================================================
// Applying
// ============================================================================

pub use crate::apply::{ApplyBatch, ApplyOption, ApplyTicket, Completion, DataSourceConfig};

// ============================================================================
// Views and data sources
// ============================================================================

pub use crate::data_source::{
    CollectionDataSource, DataSourceHandlers, OutlineDataSource, RowChange, TableContent,
    TableDataSource, TableRow,
};
pub use crate::view::{CollectionView, OutlineView, TableView};

// ============================================================================
// Selection and cell state
// ============================================================================

pub use crate::configuration::{HighlightState, ItemConfigurationState, ListConfigurationState};
pub use crate::registry::CellRegistry;
pub use crate::selection::{SelectionMode, SelectionModel};

// ============================================================================
// Event loop
// ============================================================================

pub use ordo_core::{MainQueue, Signal, UiExecutor};
