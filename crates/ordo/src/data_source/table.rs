//! Data source for single-column table views.
//!
//! Tables have no sections of their own. A [`TableContent`] flattens a
//! sectioned [`Snapshot`] into rows, optionally with a header row in front
//! of each section, and its diff is expressed in row indices.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ordo_core::logging::targets;
use ordo_core::{Signal, UiExecutor};

use super::handlers::{DataSourceHandlers, Reorder};
use super::interactions::Interactions;
use super::{deletion_completion, move_items_in, next_survivor, pruning_completion};
use crate::apply::{
    ApplyCoordinator, ApplyOption, ApplyState, Completion, DataSourceConfig, Diffable,
};
use crate::configuration::ListConfigurationState;
use crate::diff::{Change, Diff, diff_snapshots};
use crate::identity::Identifier;
use crate::selection::SelectionModel;
use crate::snapshot::{self, Snapshot};
use crate::view::{TableDriver, TableView};

/// Builds the cell for an item row.
pub type RowCellProvider<I, C> = Arc<dyn Fn(usize, &I) -> Option<C> + Send + Sync>;

type HeaderProvider<S, C> = Arc<dyn Fn(usize, &S) -> Option<C> + Send + Sync>;

/// A displayed table row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableRow<S, I> {
    /// The header row of a section.
    Header(S),
    /// An item row.
    Item(I),
}

impl<S, I> TableRow<S, I> {
    /// The item, for item rows.
    pub fn item(&self) -> Option<&I> {
        match self {
            Self::Item(id) => Some(id),
            Self::Header(_) => None,
        }
    }

    /// The section, for header rows.
    pub fn section(&self) -> Option<&S> {
        match self {
            Self::Header(id) => Some(id),
            Self::Item(_) => None,
        }
    }

    /// Whether this is a section header row.
    pub fn is_header(&self) -> bool {
        matches!(self, Self::Header(_))
    }
}

/// What a table view displays: a snapshot and whether section headers are
/// shown as rows.
#[derive(Clone, PartialEq)]
pub struct TableContent<S: Identifier, I: Identifier> {
    snapshot: Snapshot<S, I>,
    show_section_headers: bool,
}

impl<S: Identifier, I: Identifier> Default for TableContent<S, I> {
    fn default() -> Self {
        Self::new(Snapshot::new())
    }
}

impl<S: Identifier, I: Identifier> TableContent<S, I> {
    /// Item rows only.
    pub fn new(snapshot: Snapshot<S, I>) -> Self {
        Self {
            snapshot,
            show_section_headers: false,
        }
    }

    /// Item rows with a header row before each section.
    pub fn with_section_headers(snapshot: Snapshot<S, I>) -> Self {
        Self {
            snapshot,
            show_section_headers: true,
        }
    }

    /// The underlying snapshot.
    pub fn snapshot(&self) -> &Snapshot<S, I> {
        &self.snapshot
    }

    /// Consumes the content, returning the snapshot.
    pub fn into_snapshot(self) -> Snapshot<S, I> {
        self.snapshot
    }

    /// Whether header rows are shown.
    pub fn shows_section_headers(&self) -> bool {
        self.show_section_headers
    }

    /// Total number of rows.
    pub fn number_of_rows(&self) -> usize {
        let headers = if self.show_section_headers {
            self.snapshot.number_of_sections()
        } else {
            0
        };
        self.snapshot.number_of_items() + headers
    }

    /// All rows in display order.
    pub fn rows(&self) -> Vec<TableRow<S, I>> {
        let mut rows = Vec::with_capacity(self.number_of_rows());
        for (section, items) in self.snapshot.sections() {
            if self.show_section_headers {
                rows.push(TableRow::Header(section.clone()));
            }
            rows.extend(items.iter().cloned().map(TableRow::Item));
        }
        rows
    }

    /// The row at `row`.
    pub fn row(&self, row: usize) -> Option<TableRow<S, I>> {
        let header = usize::from(self.show_section_headers);
        let mut start = 0;
        for (section, items) in self.snapshot.sections() {
            let end = start + header + items.len();
            if row < end {
                return Some(match row - start {
                    0 if self.show_section_headers => TableRow::Header(section.clone()),
                    offset => TableRow::Item(items[offset - header].clone()),
                });
            }
            start = end;
        }
        None
    }

    /// Row index of `item`.
    pub fn row_of_item(&self, item: &I) -> Option<usize> {
        let path = self.snapshot.index_path_of_item(item)?;
        Some(self.section_start(path.section) + usize::from(self.show_section_headers) + path.item)
    }

    /// Row index of the header of `section`, when headers are shown.
    pub fn row_of_section_header(&self, section: &S) -> Option<usize> {
        if !self.show_section_headers {
            return None;
        }
        let index = self.snapshot.index_of_section(section)?;
        Some(self.section_start(index))
    }

    fn section_start(&self, section: usize) -> usize {
        let header = usize::from(self.show_section_headers);
        self.snapshot
            .sections()
            .take(section)
            .map(|(_, items)| header + items.len())
            .sum()
    }

    /// The rows as a one-section snapshot, carrying reload marks over.
    ///
    /// Reloading a section reloads its header row and all of its item rows.
    fn row_snapshot(&self) -> snapshot::Result<Snapshot<(), TableRow<S, I>>> {
        let mut rows = Snapshot::from_sections([((), self.rows())])?;

        let mut reloaded: Vec<TableRow<S, I>> = self
            .snapshot
            .reloaded_item_identifiers()
            .into_iter()
            .map(TableRow::Item)
            .collect();
        for section in self.snapshot.reloaded_section_identifiers() {
            if self.show_section_headers {
                reloaded.push(TableRow::Header(section.clone()));
            }
            if let Some(items) = self.snapshot.item_identifiers_in_section(&section) {
                reloaded.extend(items.iter().cloned().map(TableRow::Item));
            }
        }
        rows.reload_items(&reloaded)?;

        let reconfigured: Vec<TableRow<S, I>> = self
            .snapshot
            .reconfigured_item_identifiers()
            .into_iter()
            .map(TableRow::Item)
            .collect();
        rows.reconfigure_items(&reconfigured)?;
        Ok(rows)
    }
}

impl<S: Identifier, I: Identifier> fmt::Debug for TableContent<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableContent")
            .field("rows", &self.rows())
            .finish()
    }
}

/// A row-level change.
///
/// Row indices follow batch-update conventions: `Removed` and the source of
/// `Moved` refer to the old rows, everything else to the new rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange<S, I> {
    Removed { row: usize, id: TableRow<S, I> },
    Inserted { row: usize, id: TableRow<S, I> },
    Moved { from: usize, to: usize, id: TableRow<S, I> },
    Reloaded { row: usize, id: TableRow<S, I> },
    Reconfigured { row: usize, id: TableRow<S, I> },
}

impl<S, I> RowChange<S, I> {
    fn from_change(change: &Change<(), TableRow<S, I>>) -> Option<Self>
    where
        S: Clone,
        I: Clone,
    {
        Some(match change {
            Change::ItemDeleted { id, at } => Self::Removed {
                row: at.item,
                id: id.clone(),
            },
            Change::ItemInserted { id, at } => Self::Inserted {
                row: at.item,
                id: id.clone(),
            },
            Change::ItemMoved { id, from, to } => Self::Moved {
                from: from.item,
                to: to.item,
                id: id.clone(),
            },
            Change::ItemReloaded { id, at } => Self::Reloaded {
                row: at.item,
                id: id.clone(),
            },
            Change::ItemReconfigured { id, at } => Self::Reconfigured {
                row: at.item,
                id: id.clone(),
            },
            Change::SectionDeleted { .. }
            | Change::SectionInserted { .. }
            | Change::SectionMoved { .. }
            | Change::SectionReloaded { .. } => return None,
        })
    }
}

/// Row changes between two [`TableContent`]s, in replay order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDiff<S: Identifier, I: Identifier> {
    changes: Vec<RowChange<S, I>>,
    rows: Diff<(), TableRow<S, I>>,
}

impl<S: Identifier, I: Identifier> Default for RowDiff<S, I> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
            rows: Diff::default(),
        }
    }
}

impl<S: Identifier, I: Identifier> RowDiff<S, I> {
    /// Changes that turn `old` into `new`.
    pub fn between(old: &TableContent<S, I>, new: &TableContent<S, I>) -> Self {
        let (old_rows, new_rows) = match (old.row_snapshot(), new.row_snapshot()) {
            (Ok(old_rows), Ok(new_rows)) => (old_rows, new_rows),
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!(target: targets::DIFF, %err, "cannot flatten table rows");
                return Self::default();
            }
        };
        let rows = diff_snapshots(&old_rows, &new_rows);
        let changes = rows.iter().filter_map(RowChange::from_change).collect();
        Self { changes, rows }
    }

    /// The changes in replay order.
    pub fn changes(&self) -> &[RowChange<S, I>] {
        &self.changes
    }

    /// Iterates over the changes.
    pub fn iter(&self) -> std::slice::Iter<'_, RowChange<S, I>> {
        self.changes.iter()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Replays the changes on a copy of the old rows with batch-update
    /// semantics.
    pub fn apply_to(&self, rows: &mut Vec<TableRow<S, I>>) {
        let mut mirror = vec![((), std::mem::take(rows))];
        self.rows.apply_to(&mut mirror, |_| Vec::new());
        *rows = mirror.pop().map(|(_, rows)| rows).unwrap_or_default();
    }
}

impl<S: Identifier, I: Identifier> Diffable for TableContent<S, I> {
    type Diff = RowDiff<S, I>;

    fn diff_from(&self, old: &Self) -> Self::Diff {
        RowDiff::between(old, self)
    }

    fn change_count(diff: &Self::Diff) -> usize {
        diff.len()
    }

    fn clear_reload_marks(&mut self) {
        self.snapshot.clear_reload_marks();
    }
}

/// Feeds a [`TableView`] from [`Snapshot`]s.
pub struct TableDataSource<S: Identifier, I: Identifier, C, V> {
    coordinator: ApplyCoordinator<TableContent<S, I>, TableDriver<V>>,
    cell_provider: RowCellProvider<I, C>,
    header_provider: Option<HeaderProvider<S, C>>,
    show_section_headers: AtomicBool,
    interactions: Arc<Interactions<I>>,
}

impl<S, I, C, V> TableDataSource<S, I, C, V>
where
    S: Identifier,
    I: Identifier,
    V: TableView<S, I> + 'static,
{
    /// Creates a data source showing no rows.
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
                TableContent::default(),
                TableDriver(view),
                executor,
                config,
                None,
            ),
            cell_provider: Arc::new(cell_provider),
            header_provider: None,
            show_section_headers: AtomicBool::new(false),
            interactions: Arc::new(Interactions::new()),
        }
    }

    /// Shows a header row before each section, built by `provider`.
    pub fn with_section_headers<F>(mut self, provider: F) -> Self
    where
        F: Fn(usize, &S) -> Option<C> + Send + Sync + 'static,
    {
        self.header_provider = Some(Arc::new(provider));
        self.show_section_headers.store(true, Ordering::Relaxed);
        self
    }

    // =========================================================================
    // Applying
    // =========================================================================

    /// The snapshot the view currently displays.
    pub fn snapshot(&self) -> Snapshot<S, I> {
        self.coordinator.with_current(|content| content.snapshot.clone())
    }

    /// The displayed rows.
    pub fn content(&self) -> TableContent<S, I> {
        self.coordinator.current()
    }

    /// Queues `snapshot` for display. Returns the apply id.
    pub fn apply(
        &self,
        snapshot: Snapshot<S, I>,
        option: ApplyOption,
        completion: Option<Completion>,
    ) -> u64 {
        let content = TableContent {
            snapshot,
            show_section_headers: self.show_section_headers.load(Ordering::Relaxed),
        };
        let shown = content.snapshot.clone();
        let completion = pruning_completion(
            Arc::clone(&self.interactions),
            move |id| shown.contains_item(id),
            completion,
        );
        self.coordinator.apply(content, option, Some(completion))
    }

    /// Queues `snapshot` with the configured default animation.
    pub fn apply_snapshot(&self, snapshot: Snapshot<S, I>) -> u64 {
        self.apply(snapshot, self.default_option(), None)
    }

    /// Shows or hides section header rows, without animation.
    pub fn set_shows_section_headers(&self, show: bool) {
        if self.show_section_headers.swap(show, Ordering::Relaxed) != show {
            let latest = self.coordinator.latest().into_snapshot();
            self.apply(latest, ApplyOption::WithoutAnimation, None);
        }
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

    /// Number of rows displayed.
    pub fn number_of_rows(&self) -> usize {
        self.coordinator.with_current(TableContent::number_of_rows)
    }

    /// The row at `row`.
    pub fn row(&self, row: usize) -> Option<TableRow<S, I>> {
        self.coordinator.with_current(|content| content.row(row))
    }

    /// The item at `row`; `None` for header rows.
    pub fn item_identifier(&self, row: usize) -> Option<I> {
        match self.row(row)? {
            TableRow::Item(id) => Some(id),
            TableRow::Header(_) => None,
        }
    }

    /// The row of `item`.
    pub fn row_for_item(&self, item: &I) -> Option<usize> {
        self.coordinator.with_current(|content| content.row_of_item(item))
    }

    /// The header row of `section`.
    pub fn row_for_section(&self, section: &S) -> Option<usize> {
        self.coordinator
            .with_current(|content| content.row_of_section_header(section))
    }

    /// The section containing `row`.
    pub fn section_identifier(&self, row: usize) -> Option<S> {
        self.coordinator.with_current(|content| match content.row(row)? {
            TableRow::Header(section) => Some(section),
            TableRow::Item(item) => content.snapshot.section_identifier_for_item(&item).cloned(),
        })
    }

    /// Whether `row` is a section header, drawn as a group row.
    pub fn is_group_row(&self, row: usize) -> bool {
        self.row(row).is_some_and(|row| row.is_header())
    }

    /// The cell for `row`: the header provider for header rows, the cell
    /// provider otherwise.
    pub fn cell_for_row(&self, row: usize) -> Option<C> {
        match self.row(row) {
            Some(TableRow::Item(item)) => (self.cell_provider)(row, &item),
            Some(TableRow::Header(section)) => {
                self.header_provider.as_ref().and_then(|provider| provider(row, &section))
            }
            None => {
                tracing::warn!(target: targets::DATA_SOURCE, row, "cell requested outside the displayed rows");
                None
            }
        }
    }

    /// Appearance state of a displayed item row.
    pub fn configuration_state(&self, item: &I) -> Option<ListConfigurationState> {
        let (previous, next) = self.coordinator.with_current(|content| {
            let row = content.row_of_item(item)?;
            let previous = row.checked_sub(1).and_then(|r| content.row(r));
            let next = content.row(row + 1);
            Some((previous, next))
        })?;
        let selected = |row: Option<TableRow<S, I>>| {
            row.and_then(|row| row.item().cloned())
                .is_some_and(|id| self.selection().is_selected(&id))
        };
        Some(ListConfigurationState::from_item(
            self.interactions.configuration_state(item),
            selected(previous),
            selected(next),
        ))
    }

    /// The item that should be selected after `items` are deleted.
    pub fn next_item_after_deleting(&self, items: &[I]) -> Option<I> {
        self.coordinator
            .with_current(|content| next_survivor(&content.snapshot.item_identifiers(), items))
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

    /// The user asked to delete `items`. See
    /// [`CollectionDataSource::delete_items`](super::CollectionDataSource::delete_items).
    pub fn delete_items(&self, items: &[I]) -> bool {
        let latest = self.coordinator.latest().into_snapshot();
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

    /// The user dragged rows of `items` before `before`, or to the end when
    /// `None`.
    pub fn move_items(&self, items: &[I], before: Option<&I>) -> snapshot::Result<bool> {
        if !self.handlers().can_reorder(items) || before.is_some_and(|b| items.contains(b)) {
            return Ok(false);
        }
        let mut snapshot = self.coordinator.latest().into_snapshot();
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
        self.coordinator.with_current(|content| {
            items
                .iter()
                .filter(|id| content.snapshot.contains_item(id))
                .cloned()
                .collect()
        })
    }

    fn default_option(&self) -> ApplyOption {
        ApplyOption::Animated(self.coordinator.config().default_animation)
    }
}
