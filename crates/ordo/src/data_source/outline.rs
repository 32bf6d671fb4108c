//! Data source for outline views.

use std::sync::Arc;

use ordo_core::logging::targets;
use ordo_core::{Signal, UiExecutor};

use super::handlers::{DataSourceHandlers, Reorder};
use super::interactions::Interactions;
use super::{deletion_completion, next_survivor, pruning_completion};
use crate::apply::{ApplyCoordinator, ApplyOption, ApplyState, Completion, DataSourceConfig};
use crate::configuration::ItemConfigurationState;
use crate::identity::Identifier;
use crate::selection::SelectionModel;
use crate::snapshot::{Result, TreeSnapshot};
use crate::view::{OutlineDriver, OutlineView};

/// Builds the cell for an item at a nesting level.
pub type OutlineCellProvider<I, C> = Arc<dyn Fn(usize, &I) -> Option<C> + Send + Sync>;

/// Feeds an [`OutlineView`] from [`TreeSnapshot`]s.
///
/// Expansion is part of the tree. When the user expands or collapses an
/// item in the view, the adapter reports it through
/// [`item_did_expand`](Self::item_did_expand) or
/// [`item_did_collapse`](Self::item_did_collapse), and the data source
/// applies the updated tree without animation so its displayed tree keeps
/// matching the view.
pub struct OutlineDataSource<I: Identifier, C, V> {
    coordinator: ApplyCoordinator<TreeSnapshot<I>, OutlineDriver<V>>,
    cell_provider: OutlineCellProvider<I, C>,
    interactions: Arc<Interactions<I>>,
}

impl<I, C, V> OutlineDataSource<I, C, V>
where
    I: Identifier,
    V: OutlineView<I> + 'static,
{
    /// Creates a data source showing an empty tree.
    pub fn new<F>(view: V, executor: Arc<dyn UiExecutor>, cell_provider: F) -> Self
    where
        F: Fn(usize, &I) -> Option<C> + Send + Sync + 'static,
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
        F: Fn(usize, &I) -> Option<C> + Send + Sync + 'static,
    {
        Self {
            coordinator: ApplyCoordinator::new(
                TreeSnapshot::new(),
                OutlineDriver(view),
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

    /// The tree the view currently displays.
    pub fn snapshot(&self) -> TreeSnapshot<I> {
        self.coordinator.current()
    }

    /// Queues `tree` for display. Returns the apply id.
    pub fn apply(
        &self,
        tree: TreeSnapshot<I>,
        option: ApplyOption,
        completion: Option<Completion>,
    ) -> u64 {
        let shown = tree.clone();
        let completion = pruning_completion(
            Arc::clone(&self.interactions),
            move |id| shown.contains(id),
            completion,
        );
        self.coordinator.apply(tree, option, Some(completion))
    }

    /// Queues `tree` with the configured default animation.
    pub fn apply_snapshot(&self, tree: TreeSnapshot<I>) -> u64 {
        self.apply(tree, self.default_option(), None)
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

    /// Number of children of `of`, or of roots when `None`.
    pub fn number_of_children(&self, of: Option<&I>) -> usize {
        self.coordinator.with_current(|tree| tree.children(of).len())
    }

    /// The `index`th child of `of`, or root when `None`.
    pub fn child(&self, index: usize, of: Option<&I>) -> Option<I> {
        self.coordinator
            .with_current(|tree| tree.children(of).get(index).cloned())
    }

    /// The parent of `item`.
    pub fn parent(&self, item: &I) -> Option<I> {
        self.coordinator.with_current(|tree| tree.parent(item).cloned())
    }

    /// Whether `item` has children to disclose.
    pub fn is_expandable(&self, item: &I) -> bool {
        self.coordinator
            .with_current(|tree| !tree.children(Some(item)).is_empty())
    }

    /// Whether `item` is expanded in the displayed tree.
    pub fn is_expanded(&self, item: &I) -> bool {
        self.coordinator.with_current(|tree| tree.is_expanded(item))
    }

    /// Whether `item` is drawn as a group row.
    pub fn is_group_item(&self, item: &I) -> bool {
        self.coordinator.with_current(|tree| tree.is_group_item(item))
    }

    /// Nesting level of `item`.
    pub fn level(&self, item: &I) -> Option<usize> {
        self.coordinator.with_current(|tree| tree.level(item))
    }

    /// Items on screen, in row order.
    pub fn visible_items(&self) -> Vec<I> {
        self.coordinator.with_current(TreeSnapshot::visible_items)
    }

    /// The row of `item`, when it is on screen.
    pub fn row_for_item(&self, item: &I) -> Option<usize> {
        self.visible_items().iter().position(|id| id == item)
    }

    /// The cell for `item`, from the cell provider.
    pub fn cell_for_item(&self, item: &I) -> Option<C> {
        let Some(level) = self.level(item) else {
            tracing::warn!(target: targets::DATA_SOURCE, ?item, "cell requested for an item outside the displayed tree");
            return None;
        };
        (self.cell_provider)(level, item)
    }

    /// Appearance state of a displayed item, including expansion.
    pub fn configuration_state(&self, item: &I) -> Option<ItemConfigurationState> {
        let expanded = self
            .coordinator
            .with_current(|tree| tree.contains(item).then(|| tree.is_expanded(item)))?;
        let mut state = self.interactions.configuration_state(item);
        state.expanded = expanded;
        Some(state)
    }

    /// The item that should be selected after `items` are deleted, among the
    /// visible rows.
    pub fn next_item_after_deleting(&self, items: &[I]) -> Option<I> {
        self.coordinator.with_current(|tree| next_visible_survivor(tree, items))
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

    /// The user expanded `item` in the view.
    pub fn item_did_expand(&self, item: &I) -> Result<()> {
        self.set_expanded(item, true)
    }

    /// The user collapsed `item` in the view.
    pub fn item_did_collapse(&self, item: &I) -> Result<()> {
        self.set_expanded(item, false)
    }

    fn set_expanded(&self, item: &I, expanded: bool) -> Result<()> {
        let mut tree = self.coordinator.latest();
        if expanded {
            tree.expand(std::slice::from_ref(item))?;
        } else {
            tree.collapse(std::slice::from_ref(item))?;
        }
        let interactions = Arc::clone(&self.interactions);
        let id = item.clone();
        let completion: Completion = Box::new(move || {
            let handlers = interactions.handlers();
            if expanded {
                handlers.expanded.emit(id);
            } else {
                handlers.collapsed.emit(id);
            }
        });
        self.apply(tree, ApplyOption::WithoutAnimation, Some(completion));
        Ok(())
    }

    /// The user asked to delete `items` together with their descendants.
    ///
    /// See [`CollectionDataSource::delete_items`](super::CollectionDataSource::delete_items).
    pub fn delete_items(&self, items: &[I]) -> bool {
        let mut tree = self.coordinator.latest();
        let doomed: Vec<I> = items.iter().filter(|id| tree.contains(id)).cloned().collect();
        if !self.handlers().can_delete(&doomed) {
            tracing::debug!(target: targets::DATA_SOURCE, ?items, "delete refused");
            return false;
        }
        let next = next_visible_survivor(&tree, &doomed);
        tree.delete(&doomed);

        self.handlers().will_delete.emit(doomed.clone());
        let completion = deletion_completion(Arc::clone(&self.interactions), doomed, next);
        self.apply(tree, self.default_option(), Some(completion));
        true
    }

    /// The user dragged `items` under `parent` (roots when `None`) at
    /// `index`.
    ///
    /// `index` is the position among `parent`'s children once the moved
    /// items are taken out. Group items cannot be moved. Returns `Ok(false)`
    /// when the move is refused; a move under one of the moved items fails
    /// with [`CyclicMove`](crate::SnapshotError::CyclicMove) and nothing is
    /// applied.
    pub fn move_items(&self, items: &[I], parent: Option<&I>, index: usize) -> Result<bool> {
        let mut tree = self.coordinator.latest();
        if !self.handlers().can_reorder(items) || !items.iter().all(|id| tree.is_reorderable(id)) {
            return Ok(false);
        }
        for id in items {
            tree.move_item(id, usize::MAX, parent)?;
        }
        for (offset, id) in items.iter().enumerate() {
            tree.move_item(id, index.saturating_add(offset), parent)?;
        }

        let before = items
            .last()
            .and_then(|last| tree.index_in_parent(last))
            .and_then(|last| tree.children(parent).get(last + 1).cloned());
        let reorder = Reorder {
            items: items.to_vec(),
            before,
        };
        let interactions = Arc::clone(&self.interactions);
        let completion: Completion =
            Box::new(move || interactions.handlers().reordered.emit(reorder));
        self.apply(tree, self.default_option(), Some(completion));
        Ok(true)
    }

    fn displayed(&self, items: &[I]) -> Vec<I> {
        self.coordinator.with_current(|tree| {
            items
                .iter()
                .filter(|id| tree.contains(id))
                .cloned()
                .collect()
        })
    }

    fn default_option(&self) -> ApplyOption {
        ApplyOption::Animated(self.coordinator.config().default_animation)
    }
}

/// [`next_survivor`] over the visible rows, deleting descendants too.
fn next_visible_survivor<I: Identifier>(tree: &TreeSnapshot<I>, items: &[I]) -> Option<I> {
    let mut doomed = items.to_vec();
    for id in items {
        doomed.extend(tree.descendants(id));
    }
    next_survivor(&tree.visible_items(), &doomed)
}
