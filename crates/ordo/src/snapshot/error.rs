//! Snapshot precondition errors.

use std::fmt::Debug;

/// Result type alias for snapshot edits.
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// A snapshot edit violated a structural precondition.
///
/// These are programmer errors in snapshot construction. The snapshot is
/// left untouched whenever one is returned. Identifiers are carried in their
/// `Debug` rendering so the error type stays independent of the snapshot's
/// identifier types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// A section identifier is already present.
    #[error("Section {0} is already in the snapshot")]
    DuplicateSection(String),

    /// An item identifier is already present somewhere in the snapshot.
    #[error("Item {0} is already in the snapshot")]
    DuplicateItem(String),

    /// A referenced section is absent.
    #[error("Section {0} is not in the snapshot")]
    SectionNotFound(String),

    /// A referenced item is absent.
    #[error("Item {0} is not in the snapshot")]
    ItemNotFound(String),

    /// Items were appended without naming a section and none exists.
    #[error("Cannot append items: the snapshot has no sections")]
    NoSections,

    /// A re-parent would make an item its own ancestor.
    #[error("Cannot move {item} under {target}: the target is the item itself or one of its descendants")]
    CyclicMove {
        /// The item being moved.
        item: String,
        /// The requested parent.
        target: String,
    },

    /// Only root items can be group items.
    #[error("Group item {0} is not a root item")]
    NotARootItem(String),
}

impl SnapshotError {
    pub(crate) fn duplicate_section(id: &impl Debug) -> Self {
        Self::DuplicateSection(format!("{id:?}"))
    }

    pub(crate) fn duplicate_item(id: &impl Debug) -> Self {
        Self::DuplicateItem(format!("{id:?}"))
    }

    pub(crate) fn section_not_found(id: &impl Debug) -> Self {
        Self::SectionNotFound(format!("{id:?}"))
    }

    pub(crate) fn item_not_found(id: &impl Debug) -> Self {
        Self::ItemNotFound(format!("{id:?}"))
    }

    pub(crate) fn cyclic_move(item: &impl Debug, target: &impl Debug) -> Self {
        Self::CyclicMove {
            item: format!("{item:?}"),
            target: format!("{target:?}"),
        }
    }

    pub(crate) fn not_a_root_item(id: &impl Debug) -> Self {
        Self::NotARootItem(format!("{id:?}"))
    }
}
