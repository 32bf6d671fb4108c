//! Per-view interaction state: selection, hover, highlight, focus.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use ordo_core::logging::targets;

use super::handlers::{DataSourceHandlers, ItemDrop};
use crate::configuration::{HighlightState, ItemConfigurationState};
use crate::identity::Identifier;
use crate::selection::SelectionModel;

#[derive(Debug)]
struct InteractionState<I> {
    hovered: Option<I>,
    highlighted: HashMap<I, HighlightState>,
    focused: Option<I>,
    editing: Option<I>,
    disabled: HashSet<I>,
    emphasized: bool,
}

/// What the user is doing with a view's items.
///
/// The view adapter reports pointer, focus and display events here. State
/// that affects cell appearance is kept so
/// [`configuration_state`](Self::configuration_state) can describe an item;
/// every event is also forwarded to the matching [`DataSourceHandlers`]
/// signal. State for items that leave the displayed snapshot is dropped
/// after each apply.
pub struct Interactions<I> {
    handlers: DataSourceHandlers<I>,
    selection: SelectionModel<I>,
    state: Mutex<InteractionState<I>>,
}

impl<I: Identifier> Default for Interactions<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Identifier> Interactions<I> {
    pub(crate) fn new() -> Self {
        Self {
            handlers: DataSourceHandlers::new(),
            selection: SelectionModel::new(),
            state: Mutex::new(InteractionState {
                hovered: None,
                highlighted: HashMap::new(),
                focused: None,
                editing: None,
                disabled: HashSet::new(),
                emphasized: false,
            }),
        }
    }

    /// Handler signals.
    pub fn handlers(&self) -> &DataSourceHandlers<I> {
        &self.handlers
    }

    /// The selection.
    pub fn selection(&self) -> &SelectionModel<I> {
        &self.selection
    }

    /// Selects `ids` and emits [`selected`](DataSourceHandlers::selected)
    /// with the items that became selected.
    pub(crate) fn select(&self, ids: &[I]) {
        let fresh: Vec<I> = ids
            .iter()
            .filter(|id| !self.selection.is_selected(id))
            .cloned()
            .collect();
        self.selection.select(ids);
        let fresh: Vec<I> = fresh
            .into_iter()
            .filter(|id| self.selection.is_selected(id))
            .collect();
        if !fresh.is_empty() {
            self.handlers.selected.emit(fresh);
        }
    }

    /// Deselects `ids` and emits [`deselected`](DataSourceHandlers::deselected).
    pub(crate) fn deselect(&self, ids: &[I]) {
        let gone: Vec<I> = ids
            .iter()
            .filter(|id| self.selection.is_selected(id))
            .cloned()
            .collect();
        self.selection.deselect(&gone);
        if !gone.is_empty() {
            self.handlers.deselected.emit(gone);
        }
    }

    /// The pointer moved over `item`, or left the view when `None`.
    pub fn hover(&self, item: Option<I>) {
        {
            let mut state = self.state.lock();
            if state.hovered == item {
                return;
            }
            state.hovered = item.clone();
        }
        self.handlers.hovered.emit(item);
    }

    /// Currently hovered item.
    pub fn hovered(&self) -> Option<I> {
        self.state.lock().hovered.clone()
    }

    /// Sets the transient highlight of `items`.
    pub fn highlight(&self, items: &[I], highlight: HighlightState) {
        if items.is_empty() {
            return;
        }
        {
            let mut state = self.state.lock();
            for id in items {
                match highlight {
                    HighlightState::None => state.highlighted.remove(id),
                    other => state.highlighted.insert(id.clone(), other),
                };
            }
        }
        self.handlers.highlighted.emit((items.to_vec(), highlight));
    }

    /// Sets or clears keyboard focus.
    pub fn set_focused(&self, item: Option<I>) {
        self.state.lock().focused = item;
    }

    /// Sets or clears the item being edited.
    pub fn set_editing(&self, item: Option<I>) {
        self.state.lock().editing = item;
    }

    /// Whether the view is in an emphasized context (key window, first
    /// responder).
    pub fn set_emphasized(&self, emphasized: bool) {
        self.state.lock().emphasized = emphasized;
    }

    /// Enables or disables interaction with `items`.
    pub fn set_enabled(&self, items: &[I], enabled: bool) {
        let mut state = self.state.lock();
        for id in items {
            if enabled {
                state.disabled.remove(id);
            } else {
                state.disabled.insert(id.clone());
            }
        }
    }

    /// Whether `item` accepts interaction.
    pub fn is_enabled(&self, item: &I) -> bool {
        !self.state.lock().disabled.contains(item)
    }

    /// The view will soon need cells for `items`.
    pub fn prefetch(&self, items: &[I]) {
        if !items.is_empty() {
            self.handlers.prefetch.emit(items.to_vec());
        }
    }

    /// A previous prefetch is no longer needed.
    pub fn cancel_prefetch(&self, items: &[I]) {
        if !items.is_empty() {
            self.handlers.cancel_prefetch.emit(items.to_vec());
        }
    }

    /// `item`'s cell is about to come on screen.
    pub fn will_display(&self, item: I) {
        self.handlers.will_display.emit(item);
    }

    /// `item`'s cell left the screen.
    pub fn did_end_display(&self, item: I) {
        self.handlers.did_end_display.emit(item);
    }

    /// The user started dragging `items`.
    pub fn drag_started(&self, items: &[I]) {
        if !items.is_empty() {
            self.handlers.drag_started.emit(items.to_vec());
        }
    }

    /// Items were dropped onto the view.
    pub fn drop_items(&self, drop: ItemDrop<I>) {
        if let Some(target) = &drop.target {
            self.state.lock().highlighted.remove(target);
        }
        self.handlers.dropped.emit(drop);
    }

    /// Appearance state of `item`, without outline expansion.
    pub fn configuration_state(&self, item: &I) -> ItemConfigurationState {
        let selected = self.selection.is_selected(item);
        let state = self.state.lock();
        ItemConfigurationState {
            selected,
            editing: state.editing.as_ref() == Some(item),
            emphasized: state.emphasized,
            hovered: state.hovered.as_ref() == Some(item),
            enabled: !state.disabled.contains(item),
            focused: state.focused.as_ref() == Some(item),
            expanded: false,
            highlight: state.highlighted.get(item).copied().unwrap_or_default(),
            custom_states: Default::default(),
        }
    }

    /// Drops state held for items for which `exists` is false.
    pub(crate) fn retain_existing(&self, exists: impl Fn(&I) -> bool) {
        let deselected = self.selection.retain_existing(&exists);
        {
            let mut state = self.state.lock();
            if state.hovered.as_ref().is_some_and(|id| !exists(id)) {
                state.hovered = None;
            }
            if state.focused.as_ref().is_some_and(|id| !exists(id)) {
                state.focused = None;
            }
            if state.editing.as_ref().is_some_and(|id| !exists(id)) {
                state.editing = None;
            }
            state.highlighted.retain(|id, _| exists(id));
            state.disabled.retain(|id| exists(id));
        }
        if !deselected.is_empty() {
            tracing::trace!(target: targets::DATA_SOURCE, count = deselected.len(), "dropped selection of removed items");
            self.handlers.deselected.emit(deselected);
        }
    }
}

static_assertions::assert_impl_all!(Interactions<u64>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_select_reports_new_items() {
        let interactions = Interactions::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        interactions
            .handlers()
            .selected
            .connect(move |items| sink.lock().push(items.clone()));

        interactions.select(&[1]);
        interactions.select(&[1]);
        assert_eq!(*log.lock(), vec![vec![1]]);
    }

    #[test]
    fn test_configuration_state() {
        let interactions = Interactions::<u32>::new();
        interactions.select(&[2]);
        interactions.hover(Some(2));
        interactions.highlight(&[2], HighlightState::AsDropTarget);
        interactions.set_enabled(&[3], false);

        let state = interactions.configuration_state(&2);
        assert!(state.selected && state.hovered);
        assert_eq!(state.highlight, HighlightState::AsDropTarget);
        assert!(!interactions.configuration_state(&3).enabled);
    }

    #[test]
    fn test_retain_existing() {
        let interactions = Interactions::<u32>::new();
        interactions.select(&[5]);
        interactions.hover(Some(5));
        interactions.set_focused(Some(5));

        interactions.retain_existing(|id| *id != 5);
        let state = interactions.configuration_state(&5);
        assert!(!state.selected && !state.hovered && !state.focused);
    }

    #[test]
    fn test_hover_dedup() {
        let interactions = Interactions::<u32>::new();
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        interactions.handlers().hovered.connect(move |_| *sink.lock() += 1);
        interactions.hover(Some(1));
        interactions.hover(Some(1));
        interactions.hover(None);
        assert_eq!(*count.lock(), 2);
    }
}
