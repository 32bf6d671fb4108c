//! Per-item state handed to cell configuration.
//!
//! Cell providers read these instead of querying the view: a data source
//! derives them from its selection, its interaction state and, for outlines,
//! the expansion state of the displayed tree.

use std::collections::BTreeMap;

/// Transient highlight shown while the user interacts with an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HighlightState {
    /// No highlight.
    #[default]
    None,
    /// The item is about to become selected.
    ForSelection,
    /// The item is about to become deselected.
    ForDeselection,
    /// The item is the target of a drop.
    AsDropTarget,
}

/// Configuration state of an item in a collection or outline view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemConfigurationState {
    /// The item is selected.
    pub selected: bool,
    /// The item is being edited.
    pub editing: bool,
    /// The view is in an emphasized (key window, first responder) context.
    pub emphasized: bool,
    /// The pointer is over the item.
    pub hovered: bool,
    /// The item accepts interaction.
    pub enabled: bool,
    /// The item has keyboard focus.
    pub focused: bool,
    /// The item is expanded (outline items only).
    pub expanded: bool,
    /// Transient highlight.
    pub highlight: HighlightState,
    /// Application-defined flags.
    pub custom_states: BTreeMap<String, bool>,
}

impl Default for ItemConfigurationState {
    fn default() -> Self {
        Self {
            selected: false,
            editing: false,
            emphasized: false,
            hovered: false,
            enabled: true,
            focused: false,
            expanded: false,
            highlight: HighlightState::None,
            custom_states: BTreeMap::new(),
        }
    }
}

impl ItemConfigurationState {
    /// Enabled, otherwise default state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selected state.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Sets the hovered state.
    pub fn with_hovered(mut self, hovered: bool) -> Self {
        self.hovered = hovered;
        self
    }

    /// Sets the highlight.
    pub fn with_highlight(mut self, highlight: HighlightState) -> Self {
        self.highlight = highlight;
        self
    }

    /// Sets an application-defined flag.
    pub fn with_custom_state(mut self, key: impl Into<String>, value: bool) -> Self {
        self.custom_states.insert(key.into(), value);
        self
    }

    /// Reads an application-defined flag; absent flags are `false`.
    pub fn custom_state(&self, key: &str) -> bool {
        self.custom_states.get(key).copied().unwrap_or(false)
    }

    /// Whether the item should draw as selected or about to be selected.
    pub fn is_visually_selected(&self) -> bool {
        match self.highlight {
            HighlightState::ForSelection => true,
            HighlightState::ForDeselection => false,
            HighlightState::None | HighlightState::AsDropTarget => self.selected,
        }
    }
}

/// Configuration state of a row in a table view.
///
/// Rows additionally know whether their neighbours are selected, so
/// consecutive selected rows can be drawn as one block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListConfigurationState {
    pub selected: bool,
    pub editing: bool,
    pub emphasized: bool,
    pub hovered: bool,
    pub enabled: bool,
    pub focused: bool,
    pub expanded: bool,
    /// The row below is selected.
    pub next_selected: bool,
    /// The row above is selected.
    pub previous_selected: bool,
    pub custom_states: BTreeMap<String, bool>,
}

impl ListConfigurationState {
    /// Row state from an item state and neighbour selection.
    pub fn from_item(
        item: ItemConfigurationState,
        previous_selected: bool,
        next_selected: bool,
    ) -> Self {
        Self {
            selected: item.selected,
            editing: item.editing,
            emphasized: item.emphasized,
            hovered: item.hovered,
            enabled: item.enabled,
            focused: item.focused,
            expanded: item.expanded,
            next_selected,
            previous_selected,
            custom_states: item.custom_states,
        }
    }

    /// Whether the row is selected but not joined to a selected row above.
    pub fn starts_selection_block(&self) -> bool {
        self.selected && !self.previous_selected
    }

    /// Whether the row is selected but not joined to a selected row below.
    pub fn ends_selection_block(&self) -> bool {
        self.selected && !self.next_selected
    }
}
