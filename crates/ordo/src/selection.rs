//! Identifier-based selection.
//!
//! [`SelectionModel`] tracks selected items by identifier rather than by
//! position, so a selection survives applies that move items around. Items
//! that disappear from the displayed snapshot are dropped from the selection
//! by the owning data source after each apply.
//!
//! # Example
//!
//! ```
//! use ordo::selection::{SelectionMode, SelectionModel};
//!
//! let selection = SelectionModel::<u32>::with_mode(SelectionMode::Multiple);
//! selection.selection_changed.connect(|(selected, deselected)| {
//!     println!("+{selected:?} -{deselected:?}");
//! });
//!
//! selection.select(&[1, 2]);
//! selection.deselect(&[1]);
//! assert_eq!(selection.selected(), vec![2]);
//! ```

use std::collections::HashSet;

use parking_lot::Mutex;

use ordo_core::Signal;

use crate::identity::Identifier;

/// How many items may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Nothing can be selected.
    None,
    /// At most one item (default).
    #[default]
    Single,
    /// Any number of items.
    Multiple,
}

struct SelectionState<I> {
    mode: SelectionMode,
    /// Selected items in selection order.
    selected: Vec<I>,
    lookup: HashSet<I>,
}

impl<I: Identifier> SelectionState<I> {
    fn add(&mut self, id: &I) -> bool {
        if self.lookup.insert(id.clone()) {
            self.selected.push(id.clone());
            true
        } else {
            false
        }
    }

    fn remove_where(&mut self, mut drop: impl FnMut(&I) -> bool) -> Vec<I> {
        let mut removed = Vec::new();
        self.selected.retain(|id| {
            if drop(id) {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        for id in &removed {
            self.lookup.remove(id);
        }
        removed
    }
}

/// Selected items of one view.
///
/// The state is behind a lock so the model can be shared with the data
/// source; [`selection_changed`](Self::selection_changed) is emitted after
/// the lock is released, so slots may query the model.
pub struct SelectionModel<I> {
    state: Mutex<SelectionState<I>>,
    /// Emitted with `(selected, deselected)` whenever the selection changes.
    pub selection_changed: Signal<(Vec<I>, Vec<I>)>,
}

impl<I: Identifier> Default for SelectionModel<I> {
    fn default() -> Self {
        Self::with_mode(SelectionMode::default())
    }
}

impl<I: Identifier> SelectionModel<I> {
    /// Single-selection model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Model with the given mode.
    pub fn with_mode(mode: SelectionMode) -> Self {
        Self {
            state: Mutex::new(SelectionState {
                mode,
                selected: Vec::new(),
                lookup: HashSet::new(),
            }),
            selection_changed: Signal::new(),
        }
    }

    /// Current mode.
    pub fn mode(&self) -> SelectionMode {
        self.state.lock().mode
    }

    /// Changes the mode, trimming the selection to what the mode allows.
    pub fn set_mode(&self, mode: SelectionMode) {
        let deselected = {
            let mut state = self.state.lock();
            state.mode = mode;
            match mode {
                SelectionMode::None => state.remove_where(|_| true),
                SelectionMode::Single => {
                    let keep = state.selected.last().cloned();
                    state.remove_where(|id| Some(id) != keep.as_ref())
                }
                SelectionMode::Multiple => Vec::new(),
            }
        };
        self.notify(Vec::new(), deselected);
    }

    /// Adds items to the selection. In single mode the last item replaces
    /// the selection.
    pub fn select(&self, ids: &[I]) {
        let (selected, deselected) = {
            let mut state = self.state.lock();
            match state.mode {
                SelectionMode::None => return,
                SelectionMode::Single => {
                    let Some(last) = ids.last() else {
                        return;
                    };
                    let deselected = state.remove_where(|id| id != last);
                    let selected = if state.add(last) {
                        vec![last.clone()]
                    } else {
                        Vec::new()
                    };
                    (selected, deselected)
                }
                SelectionMode::Multiple => {
                    let selected = ids.iter().filter(|id| state.add(id)).cloned().collect();
                    (selected, Vec::new())
                }
            }
        };
        self.notify(selected, deselected);
    }

    /// Removes items from the selection.
    pub fn deselect(&self, ids: &[I]) {
        let deselected = {
            let drop: HashSet<&I> = ids.iter().collect();
            self.state.lock().remove_where(|id| drop.contains(id))
        };
        self.notify(Vec::new(), deselected);
    }

    /// Replaces the selection.
    pub fn set_selection(&self, ids: &[I]) {
        let (selected, deselected) = {
            let mut state = self.state.lock();
            let ids = match state.mode {
                SelectionMode::None => &[][..],
                SelectionMode::Single => ids.len().checked_sub(1).map_or(&[][..], |i| &ids[i..]),
                SelectionMode::Multiple => ids,
            };
            let keep: HashSet<&I> = ids.iter().collect();
            let deselected = state.remove_where(|id| !keep.contains(id));
            let selected = ids.iter().filter(|id| state.add(id)).cloned().collect();
            (selected, deselected)
        };
        self.notify(selected, deselected);
    }

    /// Selects `id` if unselected, deselects it otherwise.
    pub fn toggle(&self, id: &I) {
        if self.is_selected(id) {
            self.deselect(std::slice::from_ref(id));
        } else {
            self.select(std::slice::from_ref(id));
        }
    }

    /// Deselects everything.
    pub fn clear(&self) {
        let deselected = self.state.lock().remove_where(|_| true);
        self.notify(Vec::new(), deselected);
    }

    /// Drops selected items for which `exists` is false. Returns them.
    pub fn retain_existing(&self, exists: impl Fn(&I) -> bool) -> Vec<I> {
        let deselected = self.state.lock().remove_where(|id| !exists(id));
        self.notify(Vec::new(), deselected.clone());
        deselected
    }

    /// Whether `id` is selected.
    pub fn is_selected(&self, id: &I) -> bool {
        self.state.lock().lookup.contains(id)
    }

    /// Selected items in selection order.
    pub fn selected(&self) -> Vec<I> {
        self.state.lock().selected.clone()
    }

    /// Number of selected items.
    pub fn selected_count(&self) -> usize {
        self.state.lock().selected.len()
    }

    /// Whether anything is selected.
    pub fn has_selection(&self) -> bool {
        !self.state.lock().selected.is_empty()
    }

    fn notify(&self, selected: Vec<I>, deselected: Vec<I>) {
        if !selected.is_empty() || !deselected.is_empty() {
            self.selection_changed.emit((selected, deselected));
        }
    }
}

static_assertions::assert_impl_all!(SelectionModel<u64>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_single_mode_replaces() {
        let selection = SelectionModel::<u32>::new();
        selection.select(&[1]);
        selection.select(&[2, 3]);
        assert_eq!(selection.selected(), vec![3]);
        assert!(!selection.is_selected(&1));
    }

    #[test]
    fn test_multiple_mode_accumulates() {
        let selection = SelectionModel::with_mode(SelectionMode::Multiple);
        selection.select(&[1, 2]);
        selection.select(&[2, 3]);
        assert_eq!(selection.selected(), vec![1, 2, 3]);
        selection.toggle(&2);
        assert_eq!(selection.selected(), vec![1, 3]);
    }

    #[test]
    fn test_none_mode_ignores() {
        let selection = SelectionModel::with_mode(SelectionMode::None);
        selection.select(&[1]);
        assert!(!selection.has_selection());
    }

    #[test]
    fn test_signal_reports_changes() {
        let selection = SelectionModel::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        selection
            .selection_changed
            .connect(move |change| sink.lock().push(change.clone()));

        selection.select(&[1]);
        selection.select(&[1]);
        selection.select(&[2]);
        assert_eq!(
            *log.lock(),
            vec![(vec![1], vec![]), (vec![2], vec![1])]
        );
    }

    #[test]
    fn test_retain_existing() {
        let selection = SelectionModel::with_mode(SelectionMode::Multiple);
        selection.select(&[1, 2, 3]);
        let dropped = selection.retain_existing(|id| *id != 2);
        assert_eq!(dropped, vec![2]);
        assert_eq!(selection.selected(), vec![1, 3]);
    }

    #[test]
    fn test_set_mode_trims() {
        let selection = SelectionModel::with_mode(SelectionMode::Multiple);
        selection.set_selection(&[4, 5, 6]);
        selection.set_mode(SelectionMode::Single);
        assert_eq!(selection.selected(), vec![6]);
    }
}
