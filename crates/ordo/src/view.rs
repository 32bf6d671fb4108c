//! Host view seams.
//!
//! A host toolkit plugs into ordo by implementing one of the traits below for
//! its collection, table or outline widget. Data sources call them on the UI
//! thread with either an incremental [`ApplyBatch`] or a full reload, and
//! the implementation finishes the [`ApplyTicket`] once the update is on
//! screen.
//!
//! Implementations replay changes in the order given. For flat snapshots the
//! order is deletes (descending), inserts (ascending), moves, then reloads,
//! which is what batch-update APIs of common toolkits expect.

use crate::apply::{ApplyBatch, ApplyTicket, ViewDriver};
use crate::data_source::TableContent;
use crate::identity::Identifier;
use crate::snapshot::{Snapshot, TreeSnapshot};

/// A sectioned grid or list of items.
pub trait CollectionView<S: Identifier, I: Identifier>: Send {
    /// Replay `batch.diff` and finish `ticket` when the update settles.
    fn perform_batch_updates(&mut self, batch: ApplyBatch<Snapshot<S, I>>, ticket: ApplyTicket);

    /// Discard displayed state, show `snapshot` and finish `ticket`.
    fn reload_data(&mut self, snapshot: &Snapshot<S, I>, ticket: ApplyTicket);
}

/// A single-column list of rows, with optional section header rows.
pub trait TableView<S: Identifier, I: Identifier>: Send {
    /// Replay the row changes in `batch.diff` and finish `ticket`.
    fn perform_row_updates(&mut self, batch: ApplyBatch<TableContent<S, I>>, ticket: ApplyTicket);

    /// Discard displayed rows, show `content` and finish `ticket`.
    fn reload_data(&mut self, content: &TableContent<S, I>, ticket: ApplyTicket);
}

/// A hierarchical list with expandable items.
pub trait OutlineView<I: Identifier>: Send {
    /// Replay `batch.diff` and finish `ticket`.
    fn perform_batch_updates(&mut self, batch: ApplyBatch<TreeSnapshot<I>>, ticket: ApplyTicket);

    /// Discard displayed items, show `tree` and finish `ticket`.
    fn reload_data(&mut self, tree: &TreeSnapshot<I>, ticket: ApplyTicket);
}

/// Adapts a [`CollectionView`] to the coordinator.
pub(crate) struct CollectionDriver<V>(pub(crate) V);

impl<S, I, V> ViewDriver<Snapshot<S, I>> for CollectionDriver<V>
where
    S: Identifier,
    I: Identifier,
    V: CollectionView<S, I>,
{
    fn perform_batch_updates(&mut self, batch: ApplyBatch<Snapshot<S, I>>, ticket: ApplyTicket) {
        self.0.perform_batch_updates(batch, ticket);
    }

    fn reload_data(&mut self, snapshot: &Snapshot<S, I>, ticket: ApplyTicket) {
        self.0.reload_data(snapshot, ticket);
    }
}

/// Adapts a [`TableView`] to the coordinator.
pub(crate) struct TableDriver<V>(pub(crate) V);

impl<S, I, V> ViewDriver<TableContent<S, I>> for TableDriver<V>
where
    S: Identifier,
    I: Identifier,
    V: TableView<S, I>,
{
    fn perform_batch_updates(&mut self, batch: ApplyBatch<TableContent<S, I>>, ticket: ApplyTicket) {
        self.0.perform_row_updates(batch, ticket);
    }

    fn reload_data(&mut self, content: &TableContent<S, I>, ticket: ApplyTicket) {
        self.0.reload_data(content, ticket);
    }
}

/// Adapts an [`OutlineView`] to the coordinator.
pub(crate) struct OutlineDriver<V>(pub(crate) V);

impl<I, V> ViewDriver<TreeSnapshot<I>> for OutlineDriver<V>
where
    I: Identifier,
    V: OutlineView<I>,
{
    fn perform_batch_updates(&mut self, batch: ApplyBatch<TreeSnapshot<I>>, ticket: ApplyTicket) {
        self.0.perform_batch_updates(batch, ticket);
    }

    fn reload_data(&mut self, tree: &TreeSnapshot<I>, ticket: ApplyTicket) {
        self.0.reload_data(tree, ticket);
    }
}
