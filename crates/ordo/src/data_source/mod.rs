//! Data sources for collection, table and outline views.
//!
//! A data source owns an [`ApplyCoordinator`](crate::apply::ApplyCoordinator)
//! for one host view. It answers the view's structural queries (counts,
//! identifiers at positions, cells) from the snapshot the view currently
//! displays, and turns user actions into handler signals and, for deletes,
//! reorders and expansion, into new applies.
//!
//! | Data source | Model | View trait |
//! |-------------|-------|------------|
//! | [`CollectionDataSource`] | [`Snapshot`](crate::Snapshot) | [`CollectionView`](crate::view::CollectionView) |
//! | [`TableDataSource`] | [`TableContent`] | [`TableView`](crate::view::TableView) |
//! | [`OutlineDataSource`] | [`TreeSnapshot`](crate::TreeSnapshot) | [`OutlineView`](crate::view::OutlineView) |
//!
//! All data source methods must be called on the UI thread.

mod collection;
mod handlers;
mod interactions;
mod outline;
mod table;

use std::collections::HashSet;
use std::sync::Arc;

pub use collection::{CellProvider, CollectionDataSource};
pub use handlers::{DataSourceHandlers, ItemDrop, ItemPredicate, Reorder};
pub use interactions::Interactions;
pub use outline::{OutlineCellProvider, OutlineDataSource};
pub use table::{RowCellProvider, RowChange, RowDiff, TableContent, TableDataSource, TableRow};

use crate::apply::Completion;
use crate::identity::Identifier;
use crate::snapshot::{Result, Snapshot, SnapshotError};

/// The item to select once `deleted` are gone from `order`.
///
/// The first survivor after the last deleted item, else the nearest survivor
/// before it. `None` when nothing survives or nothing in `deleted` is shown.
pub(crate) fn next_survivor<I: Identifier>(order: &[I], deleted: &[I]) -> Option<I> {
    let deleted: HashSet<&I> = deleted.iter().collect();
    let last = order.iter().rposition(|id| deleted.contains(id))?;
    order[last + 1..]
        .iter()
        .find(|id| !deleted.contains(id))
        .or_else(|| order[..last].iter().rev().find(|id| !deleted.contains(id)))
        .cloned()
}

/// Wraps `completion` so interaction state for items missing from the
/// applied model is dropped first.
pub(crate) fn pruning_completion<I, F>(
    interactions: Arc<Interactions<I>>,
    exists: F,
    completion: Option<Completion>,
) -> Completion
where
    I: Identifier,
    F: Fn(&I) -> bool + Send + 'static,
{
    Box::new(move || {
        interactions.retain_existing(exists);
        if let Some(completion) = completion {
            completion();
        }
    })
}

/// Moves `items`, in order, before `before` or to the end of the last
/// section.
pub(crate) fn move_items_in<S, I>(
    snapshot: &mut Snapshot<S, I>,
    items: &[I],
    before: Option<&I>,
) -> Result<()>
where
    S: Identifier,
    I: Identifier,
{
    for id in items {
        match before {
            Some(before) => snapshot.move_item_before(id, before)?,
            None => {
                if !snapshot.contains_item(id) {
                    return Err(SnapshotError::item_not_found(id));
                }
                snapshot.delete_items(std::slice::from_ref(id));
                snapshot.append_items([id.clone()], None)?;
            }
        }
    }
    Ok(())
}

/// Completion of a user deletion: moves a lost selection to `next`, then
/// emits `did_delete`.
pub(crate) fn deletion_completion<I: Identifier>(
    interactions: Arc<Interactions<I>>,
    doomed: Vec<I>,
    next: Option<I>,
) -> Completion {
    let had_selection = doomed.iter().any(|id| interactions.selection().is_selected(id));
    Box::new(move || {
        if had_selection && !interactions.selection().has_selection() {
            if let Some(next) = next {
                interactions.select(&[next]);
            }
        }
        interactions.handlers().did_delete.emit(doomed);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_survivor_prefers_following() {
        assert_eq!(next_survivor(&[1, 2, 3, 4], &[2]), Some(3));
        assert_eq!(next_survivor(&[1, 2, 3, 4], &[2, 3]), Some(4));
    }

    #[test]
    fn test_next_survivor_falls_back_to_preceding() {
        assert_eq!(next_survivor(&[1, 2, 3, 4], &[4]), Some(3));
        assert_eq!(next_survivor(&[1, 2, 3, 4], &[2, 4]), Some(3));
    }

    #[test]
    fn test_next_survivor_none() {
        assert_eq!(next_survivor(&[1, 2], &[1, 2]), None);
        assert_eq!(next_survivor(&[1, 2], &[7]), None);
        assert_eq!(next_survivor::<u32>(&[], &[]), None);
    }
}
