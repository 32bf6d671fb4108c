//! User-action handlers shared by every data source kind.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use ordo_core::Signal;

use crate::configuration::HighlightState;
use crate::identity::Identifier;

/// Predicate deciding whether a user action may proceed.
pub type ItemPredicate<I> = Arc<dyn Fn(&[I]) -> bool + Send + Sync>;

/// Items reordered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reorder<I> {
    /// The moved items, in their new order.
    pub items: Vec<I>,
    /// The item they were placed before, `None` for the end.
    pub before: Option<I>,
}

/// Items dropped onto the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDrop<I> {
    /// The dropped items.
    pub items: Vec<I>,
    /// The item they were dropped on, `None` for the view background.
    pub target: Option<I>,
}

/// Signals and predicates a data source forwards user actions to.
///
/// The view adapter reports what the user did; the data source updates its
/// own state (selection, hover, expansion) and then emits the matching
/// signal. Signals are emitted on the UI thread.
///
/// # Connection pattern
///
/// ```
/// use ordo::data_source::DataSourceHandlers;
///
/// let handlers = DataSourceHandlers::<u32>::new();
/// handlers.selected.connect(|items| println!("selected {items:?}"));
/// handlers.set_can_delete(|items| !items.contains(&0));
///
/// assert!(handlers.can_delete(&[1, 2]));
/// assert!(!handlers.can_delete(&[0]));
/// ```
pub struct DataSourceHandlers<I> {
    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------
    /// Emitted after items were selected by the user.
    pub selected: Signal<Vec<I>>,

    /// Emitted after items were deselected by the user.
    pub deselected: Signal<Vec<I>>,

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------
    /// Emitted before user-deleted items are removed from the view.
    pub will_delete: Signal<Vec<I>>,

    /// Emitted once user-deleted items are gone from the view.
    pub did_delete: Signal<Vec<I>>,

    /// Emitted once user-reordered items are displayed at their new place.
    pub reordered: Signal<Reorder<I>>,

    // -------------------------------------------------------------------------
    // Drag and drop
    // -------------------------------------------------------------------------
    /// Emitted when the user starts dragging items.
    pub drag_started: Signal<Vec<I>>,

    /// Emitted when items are dropped onto the view.
    pub dropped: Signal<ItemDrop<I>>,

    // -------------------------------------------------------------------------
    // Pointer feedback
    // -------------------------------------------------------------------------
    /// Emitted when the hovered item changes. `None` when the pointer left.
    pub hovered: Signal<Option<I>>,

    /// Emitted when items gain or lose a transient highlight.
    pub highlighted: Signal<(Vec<I>, HighlightState)>,

    // -------------------------------------------------------------------------
    // Display
    // -------------------------------------------------------------------------
    /// Emitted when the view is about to need cells for these items.
    pub prefetch: Signal<Vec<I>>,

    /// Emitted when a prefetch is no longer needed.
    pub cancel_prefetch: Signal<Vec<I>>,

    /// Emitted before an item's cell comes on screen.
    pub will_display: Signal<I>,

    /// Emitted after an item's cell left the screen.
    pub did_end_display: Signal<I>,

    // -------------------------------------------------------------------------
    // Outline
    // -------------------------------------------------------------------------
    /// Emitted after the user expanded an outline item.
    pub expanded: Signal<I>,

    /// Emitted after the user collapsed an outline item.
    pub collapsed: Signal<I>,

    can_delete: RwLock<Option<ItemPredicate<I>>>,
    can_reorder: RwLock<Option<ItemPredicate<I>>>,
}

impl<I: Identifier> Default for DataSourceHandlers<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Identifier> DataSourceHandlers<I> {
    /// Handlers with nothing connected. Deleting and reordering are refused
    /// until a predicate allows them.
    pub fn new() -> Self {
        Self {
            selected: Signal::new(),
            deselected: Signal::new(),
            will_delete: Signal::new(),
            did_delete: Signal::new(),
            reordered: Signal::new(),
            drag_started: Signal::new(),
            dropped: Signal::new(),
            hovered: Signal::new(),
            highlighted: Signal::new(),
            prefetch: Signal::new(),
            cancel_prefetch: Signal::new(),
            will_display: Signal::new(),
            did_end_display: Signal::new(),
            expanded: Signal::new(),
            collapsed: Signal::new(),
            can_delete: RwLock::new(None),
            can_reorder: RwLock::new(None),
        }
    }

    /// Allows user deletion of items for which `predicate` holds.
    pub fn set_can_delete<F>(&self, predicate: F)
    where
        F: Fn(&[I]) -> bool + Send + Sync + 'static,
    {
        *self.can_delete.write() = Some(Arc::new(predicate));
    }

    /// Allows user reordering of items for which `predicate` holds.
    pub fn set_can_reorder<F>(&self, predicate: F)
    where
        F: Fn(&[I]) -> bool + Send + Sync + 'static,
    {
        *self.can_reorder.write() = Some(Arc::new(predicate));
    }

    /// Whether the user may delete `items`.
    pub fn can_delete(&self, items: &[I]) -> bool {
        Self::check(&self.can_delete, items)
    }

    /// Whether the user may reorder `items`.
    pub fn can_reorder(&self, items: &[I]) -> bool {
        Self::check(&self.can_reorder, items)
    }

    fn check(predicate: &RwLock<Option<ItemPredicate<I>>>, items: &[I]) -> bool {
        // Cloned out so the predicate may replace itself.
        let predicate = predicate.read().clone();
        !items.is_empty() && predicate.is_some_and(|allow| allow(items))
    }
}

impl<I> fmt::Debug for DataSourceHandlers<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceHandlers")
            .field("can_delete", &self.can_delete.read().is_some())
            .field("can_reorder", &self.can_reorder.read().is_some())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(DataSourceHandlers<u64>: Send, Sync);
