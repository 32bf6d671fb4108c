//! Diff engine.
//!
//! Reconciles two snapshots into the ordered list of structural changes a
//! view needs to replay to go from the first to the second.
//!
//! Identifiers are the only diff key. Item content is never compared, so an
//! item whose payload changed shows up in a diff only if the new snapshot
//! marks it with `reload_items` or `reconfigure_items`.
//!
//! Survivors that keep their relative order stay put; only the elements
//! outside a longest increasing subsequence of old positions are reported as
//! moves. A single reorder therefore costs one move, not one per shifted
//! element.
//!
//! - [`diff_snapshots`] compares sectioned [`Snapshot`](crate::snapshot::Snapshot)s
//!   and produces a [`Diff`].
//! - [`diff_trees`] compares [`TreeSnapshot`](crate::snapshot::TreeSnapshot)s
//!   and produces a [`TreeDiff`].

mod flat;
mod lcs;
mod tree;

use std::collections::{HashMap, HashSet};
use std::fmt;

pub use flat::diff_snapshots;
pub use lcs::longest_increasing_subsequence;
pub use tree::{OutlineMirror, TreeChange, TreeDiff, diff_trees};

use crate::identity::{Identifier, IndexPath};

/// One structural change between two sectioned snapshots.
///
/// Deleted positions and `from` positions refer to the old snapshot. Every
/// other position refers to the new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<S, I> {
    /// A section and all its items were removed.
    SectionDeleted { id: S, index: usize },
    /// An item was removed.
    ItemDeleted { id: I, at: IndexPath },
    /// A section was added, along with all its items.
    SectionInserted { id: S, index: usize },
    /// A section changed position, carrying its items along.
    SectionMoved { id: S, from: usize, to: usize },
    /// An item was added.
    ItemInserted { id: I, at: IndexPath },
    /// An item changed position, possibly across sections.
    ItemMoved { id: I, from: IndexPath, to: IndexPath },
    /// A surviving section was marked for reload. Its items are reconciled
    /// individually.
    SectionReloaded { id: S, index: usize },
    /// A surviving item was marked for reload; its cell must be replaced.
    ItemReloaded { id: I, at: IndexPath },
    /// A surviving item was marked for reconfiguration; its existing cell
    /// must be configured again.
    ItemReconfigured { id: I, at: IndexPath },
}

impl<S, I> Change<S, I> {
    /// Whether this change alters the structure (as opposed to a reload).
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Change::SectionReloaded { .. }
                | Change::ItemReloaded { .. }
                | Change::ItemReconfigured { .. }
        )
    }
}

/// Per-kind change counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffSummary {
    pub sections_inserted: usize,
    pub sections_deleted: usize,
    pub sections_moved: usize,
    pub sections_reloaded: usize,
    pub items_inserted: usize,
    pub items_deleted: usize,
    pub items_moved: usize,
    pub items_reloaded: usize,
    pub items_reconfigured: usize,
}

impl DiffSummary {
    /// Total number of changes.
    pub fn total(&self) -> usize {
        self.sections_inserted
            + self.sections_deleted
            + self.sections_moved
            + self.sections_reloaded
            + self.items_inserted
            + self.items_deleted
            + self.items_moved
            + self.items_reloaded
            + self.items_reconfigured
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sections +{} -{} ~{} | items +{} -{} ~{} reload {} reconfigure {}",
            self.sections_inserted,
            self.sections_deleted,
            self.sections_moved,
            self.items_inserted,
            self.items_deleted,
            self.items_moved,
            self.items_reloaded,
            self.items_reconfigured
        )
    }
}

/// The ordered changes between two sectioned snapshots.
///
/// Changes come in replay order: section deletions (descending), item
/// deletions (descending), section insertions (ascending), section moves,
/// item insertions (ascending), item moves, then reloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<S, I> {
    changes: Vec<Change<S, I>>,
}

impl<S, I> Default for Diff<S, I> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<S, I> Diff<S, I> {
    pub(crate) fn from_changes(changes: Vec<Change<S, I>>) -> Self {
        Self { changes }
    }

    /// The changes in replay order.
    pub fn changes(&self) -> &[Change<S, I>] {
        &self.changes
    }

    /// Consumes the diff, returning the changes.
    pub fn into_changes(self) -> Vec<Change<S, I>> {
        self.changes
    }

    /// Iterates over the changes.
    pub fn iter(&self) -> std::slice::Iter<'_, Change<S, I>> {
        self.changes.iter()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether there is nothing to replay.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Whether any change alters the structure.
    pub fn has_structural_changes(&self) -> bool {
        self.changes.iter().any(Change::is_structural)
    }

    /// Counts changes per kind.
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for change in &self.changes {
            match change {
                Change::SectionDeleted { .. } => summary.sections_deleted += 1,
                Change::ItemDeleted { .. } => summary.items_deleted += 1,
                Change::SectionInserted { .. } => summary.sections_inserted += 1,
                Change::SectionMoved { .. } => summary.sections_moved += 1,
                Change::ItemInserted { .. } => summary.items_inserted += 1,
                Change::ItemMoved { .. } => summary.items_moved += 1,
                Change::SectionReloaded { .. } => summary.sections_reloaded += 1,
                Change::ItemReloaded { .. } => summary.items_reloaded += 1,
                Change::ItemReconfigured { .. } => summary.items_reconfigured += 1,
            }
        }
        summary
    }
}

impl<'a, S, I> IntoIterator for &'a Diff<S, I> {
    type Item = &'a Change<S, I>;
    type IntoIter = std::slice::Iter<'a, Change<S, I>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl<S: Identifier, I: Identifier> Diff<S, I> {
    /// Replays the changes on a plain `(section, items)` mirror of the old
    /// snapshot, with batch-update semantics.
    ///
    /// Removals (deletions and move sources) are resolved against old
    /// positions, then insertions and move targets are placed at their new
    /// positions while the untouched elements fill the remaining slots in
    /// order. Inserted sections are filled by `populate`.
    ///
    /// A mirror of the old snapshot ends up equal to the new one.
    pub fn apply_to<F>(&self, mirror: &mut Vec<(S, Vec<I>)>, populate: F)
    where
        F: Fn(&S) -> Vec<I>,
    {
        let mut deleted_sections = HashSet::new();
        let mut moved_sections = HashMap::new();
        let mut inserted_sections = Vec::new();
        let mut removed_items = HashSet::new();
        let mut incoming_items: HashMap<usize, Vec<(usize, I)>> = HashMap::new();

        for change in &self.changes {
            match change {
                Change::SectionDeleted { index, .. } => {
                    deleted_sections.insert(*index);
                }
                Change::SectionInserted { id, index } => {
                    inserted_sections.push((*index, id.clone()));
                }
                Change::SectionMoved { from, to, .. } => {
                    moved_sections.insert(*from, *to);
                }
                Change::ItemDeleted { at, .. } => {
                    removed_items.insert(*at);
                }
                Change::ItemInserted { id, at } => {
                    incoming_items
                        .entry(at.section)
                        .or_default()
                        .push((at.item, id.clone()));
                }
                Change::ItemMoved { id, from, to } => {
                    removed_items.insert(*from);
                    incoming_items
                        .entry(to.section)
                        .or_default()
                        .push((to.item, id.clone()));
                }
                Change::SectionReloaded { .. }
                | Change::ItemReloaded { .. }
                | Change::ItemReconfigured { .. } => {}
            }
        }

        let mut staying = Vec::new();
        let mut placed = Vec::new();
        for (old_index, (id, items)) in std::mem::take(mirror).into_iter().enumerate() {
            if deleted_sections.contains(&old_index) {
                continue;
            }
            let items: Vec<I> = items
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !removed_items.contains(&IndexPath::new(old_index, *i)))
                .map(|(_, item)| item)
                .collect();
            match moved_sections.get(&old_index) {
                Some(&to) => placed.push((to, (id, items))),
                None => staying.push((id, items)),
            }
        }
        for (index, id) in inserted_sections {
            let items = populate(&id);
            placed.push((index, (id, items)));
        }

        let mut sections = fill_slots(placed, staying);
        for (section_index, (_, items)) in sections.iter_mut().enumerate() {
            if let Some(incoming) = incoming_items.remove(&section_index) {
                let staying = std::mem::take(items);
                *items = fill_slots(incoming, staying);
            }
        }
        *mirror = sections;
    }
}

/// Lays out `placed` elements at their target positions and fills the gaps
/// with `rest` in order.
///
/// Out-of-range or colliding targets are appended after the gaps are filled.
pub(crate) fn fill_slots<T>(placed: Vec<(usize, T)>, rest: Vec<T>) -> Vec<T> {
    let len = placed.len() + rest.len();
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();
    let mut overflow = Vec::new();
    for (index, value) in placed {
        match slots.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(value),
            _ => overflow.push(value),
        }
    }
    let mut rest = rest.into_iter().chain(overflow);
    slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| rest.next()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Snapshot, TreeSnapshot};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    /// Records the `operation` of every `ordo::perf` span.
    #[derive(Clone, Default)]
    struct PerfRecorder(Arc<Mutex<Vec<String>>>);

    impl Visit for PerfRecorder {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "operation" {
                self.0.lock().push(value.to_string());
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: tracing::Subscriber> Layer<S> for PerfRecorder {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            if attrs.metadata().target() == ordo_core::logging::targets::PERF {
                attrs.record(&mut self.clone());
            }
        }
    }

    #[test]
    fn test_diffs_are_timed() {
        let recorder = PerfRecorder::default();
        let subscriber = Registry::default().with(recorder.clone());
        tracing::subscriber::with_default(subscriber, || {
            let old = Snapshot::<u8, u32>::from_sections([(0, vec![1, 2])]).unwrap();
            let new = Snapshot::from_sections([(0, vec![2, 1])]).unwrap();
            diff_snapshots(&old, &new);
            diff_trees(&TreeSnapshot::<u32>::new(), &TreeSnapshot::new());
        });
        assert_eq!(*recorder.0.lock(), vec!["diff_snapshots", "diff_trees"]);
    }

    #[test]
    fn test_fill_slots() {
        let out = fill_slots(vec![(0, 'z'), (3, 'w')], vec!['x', 'y']);
        assert_eq!(out, vec!['z', 'x', 'y', 'w']);
    }

    #[test]
    fn test_fill_slots_overflow() {
        let out = fill_slots(vec![(9, 'q')], vec!['a']);
        assert_eq!(out, vec!['a', 'q']);
    }

    #[test]
    fn test_summary_counts() {
        let diff: Diff<&str, u32> = Diff::from_changes(vec![
            Change::ItemDeleted {
                id: 2,
                at: IndexPath::new(0, 1),
            },
            Change::ItemReloaded {
                id: 3,
                at: IndexPath::new(0, 1),
            },
        ]);
        let summary = diff.summary();
        assert_eq!(summary.items_deleted, 1);
        assert_eq!(summary.items_reloaded, 1);
        assert_eq!(summary.total(), 2);
        assert!(diff.has_structural_changes());
    }

    #[test]
    fn test_apply_to_mixed_batch() {
        // {A:[1,2,3], B:[4]} -> {B:[4,2], C:[9], A:[3,1]}
        let diff: Diff<&str, u32> = Diff::from_changes(vec![
            Change::SectionInserted { id: "C", index: 1 },
            Change::SectionMoved {
                id: "B",
                from: 1,
                to: 0,
            },
            Change::ItemMoved {
                id: 2,
                from: IndexPath::new(0, 1),
                to: IndexPath::new(0, 1),
            },
            Change::ItemMoved {
                id: 1,
                from: IndexPath::new(0, 0),
                to: IndexPath::new(2, 1),
            },
        ]);
        let mut mirror = vec![("A", vec![1, 2, 3]), ("B", vec![4])];
        diff.apply_to(&mut mirror, |_| vec![9]);
        assert_eq!(
            mirror,
            vec![("B", vec![4, 2]), ("C", vec![9]), ("A", vec![3, 1])]
        );
    }
}
