//! Data source for sectioned collection views.

use std::fmt;
use std::sync::Arc;

use ordo_core::logging::targets;
use ordo_core::{Signal, UiExecutor};

use super::handlers::{DataSourceHandlers, Reorder};
use super::interactions::Interactions;
use super::{deletion_completion, move_items_in, next_survivor, pruning_completion};
use crate::apply::{ApplyCoordinator, ApplyOption, ApplyState, Completion, DataSourceConfig};
use crate::configuration::ItemConfigurationState;
use crate::identity::{Identifier, IndexPath};
use crate::selection::SelectionModel;
use crate::snapshot::{Result, Snapshot};
use crate::view::{CollectionDriver, CollectionView};

/// Builds the cell for the item at an index path.
pub type CellProvider<I, C> = Arc<dyn Fn(IndexPath, &I) -> Option<C> + Send + Sync>;

/// Feeds a [`CollectionView`] from [`Snapshot`]s.
///
/// # Example
///
/// ```
/// use ordo::apply::{ApplyBatch, ApplyTicket};
/// use ordo::data_source::CollectionDataSource;
/// use ordo::view::CollectionView;
/// use ordo::{IndexPath, Snapshot};
/// use ordo_core::MainQueue;
/// use std::sync::Arc;
///
/// struct Grid;
///
/// impl CollectionView<&'static str, u32> for Grid {
///     fn perform_batch_updates(
///         &mut self,
///         _batch: ApplyBatch<Snapshot<&'static str, u32>>,
///         ticket: ApplyTicket,
///     ) {
///         ticket.finish();
///     }
///
///     fn reload_data(&mut self, _snapshot: &Snapshot<&'static str, u32>, ticket: ApplyTicket) {
///         ticket.finish();
///     }
/// }
///
/// let queue = MainQueue::new();
/// let source = CollectionDataSource::new(Grid, Arc::new(queue.handle()), |at, item: &u32| {
///     Some(format!("{at} -> {item}"))
/// });
///
/// let mut snapshot = Snapshot::new();
/// snapshot.append_sections(["Main"]).unwrap();
/// snapshot.append_items([1, 2, 3], None).unwrap();
/// source.apply_snapshot(snapshot);
/// queue.process_all();
///
/// assert_eq!(source.number_of_items(0), 3);
/// assert_eq!(source.cell_for_item(IndexPath::new(0, 1)).as_deref(), Some("[0, 1] -> 2"));
/// ```
pub struct CollectionDataSource<S: Identifier, I: Identifier, C, V> {
    coordinator: ApplyCoordinator<Snapshot<S, I>, CollectionDriver<V>>,
    cell_provider: CellProvider<I, C>,
    interactions: Arc<Interactions<I>>,
}

impl<S, I, C, V> CollectionDataSource<S, I, C, V>
where
    S: Identifier,
    I: Identifier,
    V: CollectionView<S, I> + 'static,
{
    /// Creates a data source showing an empty snapshot.
    ///
    /// Must be called on the UI thread that drains `executor`.
    pub fn new<F>(view: V, executor: Arc<dyn UiExecutor>, cell_provider: F) -> Self
    where
        F: Fn(IndexPath, &I) -> Option<C> + Send + Sync + 'static,
    {
        Self::with_config(view, executor, DataSourceConfig::default(), cell_provider)
    }

    /// Creates a data source with explicit settings.
    pub fn with_config<F>(
        view: V,
        executor: Arc<dyn UiExecutor>,
        config: DataSourceConfig,
        cell_provider: F,
    ) -> Self
    where
        F: Fn(IndexPath, &I) -> Option<C> + Send + Sync + 'static,
    {
        Self {
            coordinator: ApplyCoordinator::new(
                Snapshot::new(),
                CollectionDriver(view),
                executor,
                config,
                None,
            ),
            cell_provider: Arc::new(cell_provider),
            interactions: Arc::new(Interactions::new()),
        }
    }

    // =========================================================================
    // Applying
    // =========================================================================

    /// The snapshot the view currently displays.
    ///
    /// A submitted snapshot becomes current once the view has finished
    /// displaying it, right before its completion runs.
    pub fn snapshot(&self) -> Snapshot<S, I> {
        self.coordinator.current()
    }

    /// Queues `snapshot` for display. Returns the apply id.
    pub fn apply(
        &self,
        snapshot: Snapshot<S, I>,
        option: ApplyOption,
        completion: Option<Completion>,
    ) -> u64 {
        let shown = snapshot.clone();
        let completion = pruning_completion(
            Arc::clone(&self.interactions),
            move |id| shown.contains_item(id),
            completion,
        );
        self.coordinator.apply(snapshot, option, Some(completion))
    }

    /// Queues `snapshot` with the configured default animation.
    pub fn apply_snapshot(&self, snapshot: Snapshot<S, I>) -> u64 {
        self.apply(snapshot, self.default_option(), None)
    }

    /// Coordinator phase.
    pub fn state(&self) -> ApplyState {
        self.coordinator.state()
    }

    /// Whether no apply is in flight or queued.
    pub fn is_idle(&self) -> bool {
        self.coordinator.is_idle()
    }

    /// Emitted with the apply id after each apply is displayed.
    pub fn applied(&self) -> &Signal<u64> {
        self.coordinator.applied()
    }

    /// Runs `f` against the view.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        self.coordinator.with_view(|driver| f(&mut driver.0))
    }

    // =========================================================================
    // View queries
    // =========================================================================

    /// Number of sections displayed.
    pub fn number_of_sections(&self) -> usize {
        self.coordinator.with_current(Snapshot::number_of_sections)
    }

    /// Number of items in the section at `section`, 0 when out of range.
    pub fn number_of_items(&self, section: usize) -> usize {
        self.coordinator.with_current(|snapshot| {
            snapshot
                .section_at(section)
                .and_then(|id| snapshot.number_of_items_in_section(id))
                .unwrap_or(0)
        })
    }

    /// The item displayed at `at`.
    pub fn item_identifier(&self, at: IndexPath) -> Option<I> {
        self.coordinator
            .with_current(|snapshot| snapshot.item_at(at).cloned())
    }

    /// Where `item` is displayed.
    pub fn index_path(&self, item: &I) -> Option<IndexPath> {
        self.coordinator
            .with_current(|snapshot| snapshot.index_path_of_item(item))
    }

    /// The section displayed at `index`.
    pub fn section_identifier(&self, index: usize) -> Option<S> {
        self.coordinator
            .with_current(|snapshot| snapshot.section_at(index).cloned())
    }

    /// Where `section` is displayed.
    pub fn index(&self, section: &S) -> Option<usize> {
        self.coordinator
            .with_current(|snapshot| snapshot.index_of_section(section))
    }

    /// The cell for the item at `at`, from the cell provider.
    pub fn cell_for_item(&self, at: IndexPath) -> Option<C> {
        let Some(item) = self.item_identifier(at) else {
            tracing::warn!(target: targets::DATA_SOURCE, %at, "cell requested outside the displayed snapshot");
            return None;
        };
        (self.cell_provider)(at, &item)
    }

    /// Appearance state of a displayed item.
    pub fn configuration_state(&self, item: &I) -> Option<ItemConfigurationState> {
        self.coordinator
            .with_current(|snapshot| snapshot.contains_item(item))
            .then(|| self.interactions.configuration_state(item))
    }

    /// The item that should be selected after `items` are deleted.
    pub fn next_item_after_deleting(&self, items: &[I]) -> Option<I> {
        self.coordinator
            .with_current(|snapshot| next_survivor(&snapshot.item_identifiers(), items))
    }

    // =========================================================================
    // User actions
    // =========================================================================

    /// Interaction state and event forwarding.
    pub fn interactions(&self) -> &Interactions<I> {
        &self.interactions
    }

    /// Handler signals.
    pub fn handlers(&self) -> &DataSourceHandlers<I> {
        self.interactions.handlers()
    }

    /// The selection.
    pub fn selection(&self) -> &SelectionModel<I> {
        self.interactions.selection()
    }

    /// The user selected `items`. Items that are not displayed are ignored.
    pub fn select_items(&self, items: &[I]) {
        let shown = self.displayed(items);
        self.interactions.select(&shown);
    }

    /// The user deselected `items`.
    pub fn deselect_items(&self, items: &[I]) {
        self.interactions.deselect(items);
    }

    /// The user asked to delete `items`.
    ///
    /// User edits build on the last submitted snapshot, so applies still in
    /// flight or queued are kept.
    /// Refused unless the `can_delete` predicate allows it. Otherwise emits
    /// `will_delete`, applies a snapshot without the items and, once it is
    /// displayed, moves a lost selection to the next item and emits
    /// `did_delete`.
    pub fn delete_items(&self, items: &[I]) -> bool {
        let latest = self.coordinator.latest();
        let doomed: Vec<I> = items
            .iter()
            .filter(|id| latest.contains_item(id))
            .cloned()
            .collect();
        if !self.handlers().can_delete(&doomed) {
            tracing::debug!(target: targets::DATA_SOURCE, ?items, "delete refused");
            return false;
        }
        let next = next_survivor(&latest.item_identifiers(), &doomed);
        let mut snapshot = latest;
        snapshot.delete_items(&doomed);
        self.handlers().will_delete.emit(doomed.clone());
        let completion = deletion_completion(Arc::clone(&self.interactions), doomed, next);
        self.apply(snapshot, self.default_option(), Some(completion));
        true
    }

    /// The user dragged `items` before `before`, or to the end of the last
    /// section when `None`.
    ///
    /// Returns `Ok(false)` when the `can_reorder` predicate refuses or the
    /// target is one of the moved items.
    pub fn move_items(&self, items: &[I], before: Option<&I>) -> Result<bool> {
        if !self.handlers().can_reorder(items) || before.is_some_and(|b| items.contains(b)) {
            return Ok(false);
        }
        let mut snapshot = self.coordinator.latest();
        move_items_in(&mut snapshot, items, before)?;

        let reorder = Reorder {
            items: items.to_vec(),
            before: before.cloned(),
        };
        let interactions = Arc::clone(&self.interactions);
        let completion: Completion =
            Box::new(move || interactions.handlers().reordered.emit(reorder));
        self.apply(snapshot, self.default_option(), Some(completion));
        Ok(true)
    }

    fn displayed(&self, items: &[I]) -> Vec<I> {
        self.coordinator.with_current(|snapshot| {
            items
                .iter()
                .filter(|id| snapshot.contains_item(id))
                .cloned()
                .collect()
        })
    }

    fn default_option(&self) -> ApplyOption {
        ApplyOption::Animated(self.coordinator.config().default_animation)
    }
}

impl<S, I, C, V> fmt::Debug for CollectionDataSource<S, I, C, V>
where
    S: Identifier,
    I: Identifier,
    V: CollectionView<S, I> + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionDataSource")
            .field("state", &self.coordinator.state())
            .field("sections", &self.coordinator.with_current(Snapshot::number_of_sections))
            .field("items", &self.coordinator.with_current(Snapshot::number_of_items))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{ApplyBatch, ApplyTicket};
    use ordo_core::MainQueue;
    use parking_lot::Mutex;

    type Model = Snapshot<&'static str, u32>;

    /// Finishes every update immediately and counts them.
    #[derive(Default)]
    struct InstantView {
        batches: usize,
        reloads: usize,
    }

    impl CollectionView<&'static str, u32> for InstantView {
        fn perform_batch_updates(&mut self, _batch: ApplyBatch<Model>, ticket: ApplyTicket) {
            self.batches += 1;
            ticket.finish();
        }

        fn reload_data(&mut self, _snapshot: &Model, ticket: ApplyTicket) {
            self.reloads += 1;
            ticket.finish();
        }
    }

    type Source = CollectionDataSource<&'static str, u32, String, InstantView>;

    fn source(queue: &MainQueue) -> Source {
        CollectionDataSource::new(InstantView::default(), Arc::new(queue.handle()), |at, item| {
            Some(format!("{at}={item}"))
        })
    }

    fn model(sections: Vec<(&'static str, Vec<u32>)>) -> Model {
        Snapshot::from_sections(sections).unwrap()
    }

    #[test]
    fn test_queries_follow_displayed_snapshot() {
        let queue = MainQueue::new();
        let source = source(&queue);
        source.apply_snapshot(model(vec![("A", vec![1, 2]), ("B", vec![3])]));
        assert_eq!(source.number_of_sections(), 0);

        queue.process_all();
        assert_eq!(source.number_of_sections(), 2);
        assert_eq!(source.number_of_items(1), 1);
        assert_eq!(source.number_of_items(5), 0);
        assert_eq!(source.item_identifier(IndexPath::new(1, 0)), Some(3));
        assert_eq!(source.index_path(&2), Some(IndexPath::new(0, 1)));
        assert_eq!(source.section_identifier(1), Some("B"));
        assert_eq!(source.index(&"A"), Some(0));
        assert_eq!(source.cell_for_item(IndexPath::new(0, 0)).as_deref(), Some("[0, 0]=1"));
        assert_eq!(source.cell_for_item(IndexPath::new(3, 0)), None);
    }

    #[test]
    fn test_selection_pruned_after_apply() {
        let queue = MainQueue::new();
        let source = source(&queue);
        source.apply_snapshot(model(vec![("A", vec![1, 2])]));
        queue.process_all();

        source.select_items(&[2]);
        assert!(source.configuration_state(&2).is_some_and(|s| s.selected));

        source.apply_snapshot(model(vec![("A", vec![1])]));
        queue.process_all();
        assert!(!source.selection().has_selection());
        assert_eq!(source.configuration_state(&2), None);
    }

    #[test]
    fn test_select_ignores_hidden_items() {
        let queue = MainQueue::new();
        let source = source(&queue);
        source.select_items(&[9]);
        assert!(!source.selection().has_selection());
    }

    #[test]
    fn test_delete_requires_permission() {
        let queue = MainQueue::new();
        let source = source(&queue);
        source.apply_snapshot(model(vec![("A", vec![1, 2, 3])]));
        queue.process_all();

        assert!(!source.delete_items(&[2]));
        source.handlers().set_can_delete(|_| true);
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = deleted.clone();
        source
            .handlers()
            .did_delete
            .connect(move |items| sink.lock().extend(items.iter().copied()));

        source.select_items(&[2]);
        assert!(source.delete_items(&[2]));
        queue.process_all();

        assert_eq!(source.snapshot(), model(vec![("A", vec![1, 3])]));
        assert_eq!(*deleted.lock(), vec![2]);
        assert_eq!(source.selection().selected(), vec![3]);
    }

    #[test]
    fn test_move_items() {
        let queue = MainQueue::new();
        let source = source(&queue);
        source.apply_snapshot(model(vec![("A", vec![1, 2]), ("B", vec![3])]));
        queue.process_all();

        assert!(!source.move_items(&[1], Some(&3)).unwrap());
        source.handlers().set_can_reorder(|_| true);
        assert!(source.move_items(&[1], Some(&3)).unwrap());
        queue.process_all();
        assert_eq!(source.snapshot(), model(vec![("A", vec![2]), ("B", vec![1, 3])]));

        assert!(source.move_items(&[2], None).unwrap());
        queue.process_all();
        assert_eq!(source.snapshot(), model(vec![("A", vec![]), ("B", vec![1, 3, 2])]));

        assert!(source.move_items(&[7], None).is_err());
    }

    #[test]
    fn test_next_item_after_deleting() {
        let queue = MainQueue::new();
        let source = source(&queue);
        source.apply_snapshot(model(vec![("A", vec![1, 2]), ("B", vec![3])]));
        queue.process_all();
        assert_eq!(source.next_item_after_deleting(&[2]), Some(3));
        assert_eq!(source.next_item_after_deleting(&[3]), Some(2));
    }

    #[test]
    fn test_reload_option() {
        let queue = MainQueue::new();
        let source = source(&queue);
        source.apply(model(vec![("A", vec![1])]), ApplyOption::UsingReloadData, None);
        queue.process_all();
        assert_eq!(source.with_view(|view| (view.batches, view.reloads)), (0, 1));
    }
}
