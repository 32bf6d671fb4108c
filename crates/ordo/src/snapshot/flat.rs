//! Sectioned snapshot for collection and table views.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ordo_core::logging::targets;
use ordo_core::{TreeFormatOptions, TreeFormatter};

use super::error::{Result, SnapshotError};
use crate::identity::{Identifier, IndexPath};

#[derive(Clone, PartialEq, Eq)]
struct Section<S, I> {
    id: S,
    items: Vec<I>,
}

#[derive(Clone)]
struct ItemLocation<S> {
    section: S,
    index: usize,
}

#[derive(Clone)]
struct SnapshotStorage<S, I> {
    sections: Vec<Section<S, I>>,
    section_positions: HashMap<S, usize>,
    item_locations: HashMap<I, ItemLocation<S>>,
    reloaded_items: HashSet<I>,
    reconfigured_items: HashSet<I>,
    reloaded_sections: HashSet<S>,
}

impl<S, I> Default for SnapshotStorage<S, I> {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            section_positions: HashMap::new(),
            item_locations: HashMap::new(),
            reloaded_items: HashSet::new(),
            reconfigured_items: HashSet::new(),
            reloaded_sections: HashSet::new(),
        }
    }
}

impl<S: Identifier, I: Identifier> SnapshotStorage<S, I> {
    fn reindex_sections_from(&mut self, start: usize) {
        for (pos, section) in self.sections.iter().enumerate().skip(start) {
            self.section_positions.insert(section.id.clone(), pos);
        }
    }

    fn reindex_items(&mut self, section_pos: usize, from: usize) {
        let Self {
            sections,
            item_locations,
            ..
        } = self;
        let section = &sections[section_pos];
        for (index, item) in section.items.iter().enumerate().skip(from) {
            item_locations.insert(
                item.clone(),
                ItemLocation {
                    section: section.id.clone(),
                    index,
                },
            );
        }
    }

    fn position_of_item(&self, id: &I) -> Option<(usize, usize)> {
        let location = self.item_locations.get(id)?;
        let section_pos = *self.section_positions.get(&location.section)?;
        Some((section_pos, location.index))
    }

    fn insert_sections_at(&mut self, pos: usize, ids: Vec<S>) {
        let new_sections = ids.into_iter().map(|id| Section {
            id,
            items: Vec::new(),
        });
        self.sections.splice(pos..pos, new_sections);
        self.reindex_sections_from(pos);
    }

    fn insert_items_at(&mut self, section_pos: usize, index: usize, ids: Vec<I>) {
        self.sections[section_pos].items.splice(index..index, ids);
        self.reindex_items(section_pos, index);
    }

    fn remove_item(&mut self, id: &I) -> Option<(usize, usize)> {
        let (section_pos, index) = self.position_of_item(id)?;
        self.sections[section_pos].items.remove(index);
        self.item_locations.remove(id);
        self.reindex_items(section_pos, index);
        Some((section_pos, index))
    }

    fn forget_item(&mut self, id: &I) {
        self.item_locations.remove(id);
        self.reloaded_items.remove(id);
        self.reconfigured_items.remove(id);
    }

    fn is_consistent(&self) -> bool {
        if self.section_positions.len() != self.sections.len() {
            return false;
        }
        let mut item_count = 0;
        for (pos, section) in self.sections.iter().enumerate() {
            if self.section_positions.get(&section.id) != Some(&pos) {
                return false;
            }
            for (index, item) in section.items.iter().enumerate() {
                item_count += 1;
                match self.item_locations.get(item) {
                    Some(loc) if loc.section == section.id && loc.index == index => {}
                    _ => return false,
                }
            }
        }
        item_count == self.item_locations.len()
    }
}

/// An ordered, sectioned set of item identifiers.
///
/// A snapshot describes what a collection or table view should display at one
/// point in time: an ordered list of unique section identifiers, each with an
/// ordered list of item identifiers that are unique across the whole
/// snapshot. Item content is never inspected; to have a changed item redrawn,
/// mark it with [`reload_items`](Self::reload_items) or
/// [`reconfigure_items`](Self::reconfigure_items).
///
/// Snapshots are values with copy-on-write storage: cloning is O(1) and the
/// first edit of a shared clone copies the storage.
///
/// All lookups by identifier are O(1) through reverse indices kept in sync by
/// every edit.
///
/// # Example
///
/// ```
/// use ordo::snapshot::Snapshot;
///
/// let mut snapshot = Snapshot::<&str, u32>::new();
/// snapshot.append_sections(["Main"])?;
/// snapshot.append_items([1, 2, 3], Some(&"Main"))?;
///
/// assert_eq!(snapshot.number_of_items_in_section(&"Main"), Some(3));
/// assert_eq!(snapshot.index_of_item(&2), Some(1));
///
/// snapshot.delete_items(&[2]);
/// assert_eq!(snapshot.item_identifiers(), vec![1, 3]);
/// # Ok::<(), ordo::snapshot::SnapshotError>(())
/// ```
pub struct Snapshot<S, I> {
    storage: Arc<SnapshotStorage<S, I>>,
}

impl<S, I> Clone for Snapshot<S, I> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S, I> Default for Snapshot<S, I> {
    fn default() -> Self {
        Self {
            storage: Arc::new(SnapshotStorage::default()),
        }
    }
}

impl<S: Identifier, I: Identifier> Snapshot<S, I> {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from `(section, items)` pairs in display order.
    pub fn from_sections<It>(sections: It) -> Result<Self>
    where
        It: IntoIterator<Item = (S, Vec<I>)>,
    {
        let mut snapshot = Self::new();
        for (section, items) in sections {
            snapshot.append_sections([section.clone()])?;
            snapshot.append_items(items, Some(&section))?;
        }
        Ok(snapshot)
    }

    fn storage_mut(&mut self) -> &mut SnapshotStorage<S, I> {
        Arc::make_mut(&mut self.storage)
    }

    fn debug_check(&self) {
        debug_assert!(
            self.storage.is_consistent(),
            "snapshot reverse index out of sync"
        );
    }

    fn check_new_sections(&self, ids: &[S]) -> Result<()> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if self.storage.section_positions.contains_key(id) || !seen.insert(id) {
                tracing::error!(target: targets::SNAPSHOT, section = ?id, "duplicate section identifier");
                return Err(SnapshotError::duplicate_section(id));
            }
        }
        Ok(())
    }

    fn check_new_items(&self, ids: &[I]) -> Result<()> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if self.storage.item_locations.contains_key(id) || !seen.insert(id) {
                tracing::error!(target: targets::SNAPSHOT, item = ?id, "duplicate item identifier");
                return Err(SnapshotError::duplicate_item(id));
            }
        }
        Ok(())
    }

    fn require_section(&self, id: &S) -> Result<usize> {
        self.storage
            .section_positions
            .get(id)
            .copied()
            .ok_or_else(|| SnapshotError::section_not_found(id))
    }

    fn require_item(&self, id: &I) -> Result<(usize, usize)> {
        self.storage
            .position_of_item(id)
            .ok_or_else(|| SnapshotError::item_not_found(id))
    }

    // -------------------------------------------------------------------------
    // Sections
    // -------------------------------------------------------------------------

    /// Appends sections at the end.
    ///
    /// Fails without changing the snapshot if any identifier is already
    /// present or repeated.
    pub fn append_sections<It>(&mut self, ids: It) -> Result<()>
    where
        It: IntoIterator<Item = S>,
    {
        let ids: Vec<S> = ids.into_iter().collect();
        self.check_new_sections(&ids)?;
        let end = self.storage.sections.len();
        self.storage_mut().insert_sections_at(end, ids);
        self.debug_check();
        Ok(())
    }

    /// Inserts sections immediately before `before`.
    pub fn insert_sections_before<It>(&mut self, ids: It, before: &S) -> Result<()>
    where
        It: IntoIterator<Item = S>,
    {
        let ids: Vec<S> = ids.into_iter().collect();
        let pos = self.require_section(before)?;
        self.check_new_sections(&ids)?;
        self.storage_mut().insert_sections_at(pos, ids);
        self.debug_check();
        Ok(())
    }

    /// Inserts sections immediately after `after`.
    pub fn insert_sections_after<It>(&mut self, ids: It, after: &S) -> Result<()>
    where
        It: IntoIterator<Item = S>,
    {
        let ids: Vec<S> = ids.into_iter().collect();
        let pos = self.require_section(after)?;
        self.check_new_sections(&ids)?;
        self.storage_mut().insert_sections_at(pos + 1, ids);
        self.debug_check();
        Ok(())
    }

    /// Deletes sections together with their items.
    ///
    /// Identifiers that are not present are ignored.
    pub fn delete_sections(&mut self, ids: &[S]) {
        let doomed: HashSet<&S> = ids
            .iter()
            .filter(|id| self.storage.section_positions.contains_key(*id))
            .collect();
        if doomed.is_empty() {
            return;
        }
        let storage = self.storage_mut();
        let mut removed = Vec::new();
        storage.sections.retain(|section| {
            if doomed.contains(&section.id) {
                removed.push(section.clone());
                false
            } else {
                true
            }
        });
        for section in removed {
            for item in &section.items {
                storage.forget_item(item);
            }
            storage.section_positions.remove(&section.id);
            storage.reloaded_sections.remove(&section.id);
        }
        storage.reindex_sections_from(0);
        self.debug_check();
    }

    /// Moves `id` so it sits immediately before `before`.
    ///
    /// Moving a section relative to itself is a no-op.
    pub fn move_section_before(&mut self, id: &S, before: &S) -> Result<()> {
        self.move_section(id, before, false)
    }

    /// Moves `id` so it sits immediately after `after`.
    pub fn move_section_after(&mut self, id: &S, after: &S) -> Result<()> {
        self.move_section(id, after, true)
    }

    fn move_section(&mut self, id: &S, anchor: &S, after: bool) -> Result<()> {
        let from = self.require_section(id)?;
        self.require_section(anchor)?;
        if id == anchor {
            return Ok(());
        }
        let storage = self.storage_mut();
        let section = storage.sections.remove(from);
        let anchor_pos = storage
            .sections
            .iter()
            .position(|s| &s.id == anchor)
            .ok_or_else(|| SnapshotError::section_not_found(anchor))?;
        let to = if after { anchor_pos + 1 } else { anchor_pos };
        storage.sections.insert(to, section);
        storage.reindex_sections_from(from.min(to));
        self.debug_check();
        Ok(())
    }

    /// Marks sections whose content must be fully reloaded.
    pub fn reload_sections(&mut self, ids: &[S]) -> Result<()> {
        for id in ids {
            self.require_section(id)?;
        }
        let storage = self.storage_mut();
        storage.reloaded_sections.extend(ids.iter().cloned());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Appends items to the end of `section`, or of the last section when
    /// `section` is `None`.
    pub fn append_items<It>(&mut self, ids: It, section: Option<&S>) -> Result<()>
    where
        It: IntoIterator<Item = I>,
    {
        let ids: Vec<I> = ids.into_iter().collect();
        let section_pos = match section {
            Some(section) => self.require_section(section)?,
            None => self
                .storage
                .sections
                .len()
                .checked_sub(1)
                .ok_or(SnapshotError::NoSections)?,
        };
        self.check_new_items(&ids)?;
        let end = self.storage.sections[section_pos].items.len();
        self.storage_mut().insert_items_at(section_pos, end, ids);
        self.debug_check();
        Ok(())
    }

    /// Inserts items immediately before `before`, in its section.
    pub fn insert_items_before<It>(&mut self, ids: It, before: &I) -> Result<()>
    where
        It: IntoIterator<Item = I>,
    {
        let ids: Vec<I> = ids.into_iter().collect();
        let (section_pos, index) = self.require_item(before)?;
        self.check_new_items(&ids)?;
        self.storage_mut().insert_items_at(section_pos, index, ids);
        self.debug_check();
        Ok(())
    }

    /// Inserts items immediately after `after`, in its section.
    pub fn insert_items_after<It>(&mut self, ids: It, after: &I) -> Result<()>
    where
        It: IntoIterator<Item = I>,
    {
        let ids: Vec<I> = ids.into_iter().collect();
        let (section_pos, index) = self.require_item(after)?;
        self.check_new_items(&ids)?;
        self.storage_mut().insert_items_at(section_pos, index + 1, ids);
        self.debug_check();
        Ok(())
    }

    /// Deletes items. Identifiers that are not present are ignored.
    ///
    /// Sections left empty are kept.
    pub fn delete_items(&mut self, ids: &[I]) {
        let mut touched: HashMap<usize, HashSet<&I>> = HashMap::new();
        for id in ids {
            if let Some((section_pos, _)) = self.storage.position_of_item(id) {
                touched.entry(section_pos).or_default().insert(id);
            }
        }
        if touched.is_empty() {
            return;
        }
        let storage = self.storage_mut();
        for (section_pos, doomed) in touched {
            storage.sections[section_pos]
                .items
                .retain(|item| !doomed.contains(item));
            for id in doomed {
                storage.forget_item(id);
            }
            storage.reindex_items(section_pos, 0);
        }
        self.debug_check();
    }

    /// Removes every section and item.
    pub fn delete_all_items(&mut self) {
        *self.storage_mut() = SnapshotStorage::default();
    }

    /// Moves `id` so it sits immediately before `before`, possibly in another
    /// section.
    ///
    /// Moving an item relative to itself is a no-op.
    pub fn move_item_before(&mut self, id: &I, before: &I) -> Result<()> {
        self.move_item(id, before, false)
    }

    /// Moves `id` so it sits immediately after `after`, possibly in another
    /// section.
    pub fn move_item_after(&mut self, id: &I, after: &I) -> Result<()> {
        self.move_item(id, after, true)
    }

    fn move_item(&mut self, id: &I, anchor: &I, after: bool) -> Result<()> {
        self.require_item(id)?;
        self.require_item(anchor)?;
        if id == anchor {
            return Ok(());
        }
        let storage = self.storage_mut();
        storage.remove_item(id);
        let (section_pos, index) = storage
            .position_of_item(anchor)
            .ok_or_else(|| SnapshotError::item_not_found(anchor))?;
        let to = if after { index + 1 } else { index };
        storage.insert_items_at(section_pos, to, vec![id.clone()]);
        self.debug_check();
        Ok(())
    }

    /// Marks items whose cells must be replaced on the next apply.
    pub fn reload_items(&mut self, ids: &[I]) -> Result<()> {
        for id in ids {
            self.require_item(id)?;
        }
        self.storage_mut().reloaded_items.extend(ids.iter().cloned());
        Ok(())
    }

    /// Marks items whose existing cells must be reconfigured on the next
    /// apply.
    pub fn reconfigure_items(&mut self, ids: &[I]) -> Result<()> {
        for id in ids {
            self.require_item(id)?;
        }
        self.storage_mut()
            .reconfigured_items
            .extend(ids.iter().cloned());
        Ok(())
    }

    /// Clears reload, reconfigure and section reload marks.
    pub fn clear_reload_marks(&mut self) {
        let storage = &self.storage;
        if storage.reloaded_items.is_empty()
            && storage.reconfigured_items.is_empty()
            && storage.reloaded_sections.is_empty()
        {
            return;
        }
        let storage = self.storage_mut();
        storage.reloaded_items.clear();
        storage.reconfigured_items.clear();
        storage.reloaded_sections.clear();
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Number of sections.
    pub fn number_of_sections(&self) -> usize {
        self.storage.sections.len()
    }

    /// Number of items across all sections.
    pub fn number_of_items(&self) -> usize {
        self.storage.item_locations.len()
    }

    /// Number of items in `section`, or `None` if it is absent.
    pub fn number_of_items_in_section(&self, section: &S) -> Option<usize> {
        let pos = *self.storage.section_positions.get(section)?;
        Some(self.storage.sections[pos].items.len())
    }

    /// Whether the snapshot has no sections.
    pub fn is_empty(&self) -> bool {
        self.storage.sections.is_empty()
    }

    /// Section identifiers in display order.
    pub fn section_identifiers(&self) -> Vec<S> {
        self.storage.sections.iter().map(|s| s.id.clone()).collect()
    }

    /// All item identifiers in display order.
    pub fn item_identifiers(&self) -> Vec<I> {
        self.storage
            .sections
            .iter()
            .flat_map(|s| s.items.iter().cloned())
            .collect()
    }

    /// Items of `section` in display order.
    pub fn item_identifiers_in_section(&self, section: &S) -> Option<&[I]> {
        let pos = *self.storage.section_positions.get(section)?;
        Some(&self.storage.sections[pos].items)
    }

    /// Iterates `(section, items)` pairs in display order.
    pub fn sections(&self) -> impl Iterator<Item = (&S, &[I])> + '_ {
        self.storage
            .sections
            .iter()
            .map(|s| (&s.id, s.items.as_slice()))
    }

    /// The section that contains `item`.
    pub fn section_identifier_for_item(&self, item: &I) -> Option<&S> {
        self.storage.item_locations.get(item).map(|loc| &loc.section)
    }

    /// Position of `item` inside its section.
    pub fn index_of_item(&self, item: &I) -> Option<usize> {
        self.storage.item_locations.get(item).map(|loc| loc.index)
    }

    /// Position of `section`.
    pub fn index_of_section(&self, section: &S) -> Option<usize> {
        self.storage.section_positions.get(section).copied()
    }

    /// Index path of `item`.
    pub fn index_path_of_item(&self, item: &I) -> Option<IndexPath> {
        self.storage
            .position_of_item(item)
            .map(|(section, index)| IndexPath::new(section, index))
    }

    /// The item at `path`.
    pub fn item_at(&self, path: IndexPath) -> Option<&I> {
        self.storage
            .sections
            .get(path.section)?
            .items
            .get(path.item)
    }

    /// The section at `index`.
    pub fn section_at(&self, index: usize) -> Option<&S> {
        self.storage.sections.get(index).map(|s| &s.id)
    }

    /// Whether `item` is present.
    pub fn contains_item(&self, item: &I) -> bool {
        self.storage.item_locations.contains_key(item)
    }

    /// Whether `section` is present.
    pub fn contains_section(&self, section: &S) -> bool {
        self.storage.section_positions.contains_key(section)
    }

    /// Items marked with [`reload_items`](Self::reload_items).
    pub fn reloaded_item_identifiers(&self) -> Vec<I> {
        self.storage.reloaded_items.iter().cloned().collect()
    }

    /// Items marked with [`reconfigure_items`](Self::reconfigure_items).
    pub fn reconfigured_item_identifiers(&self) -> Vec<I> {
        self.storage.reconfigured_items.iter().cloned().collect()
    }

    /// Sections marked with [`reload_sections`](Self::reload_sections).
    pub fn reloaded_section_identifiers(&self) -> Vec<S> {
        self.storage.reloaded_sections.iter().cloned().collect()
    }

    pub(crate) fn is_reload_marked(&self, item: &I) -> bool {
        self.storage.reloaded_items.contains(item)
    }

    pub(crate) fn is_reconfigure_marked(&self, item: &I) -> bool {
        self.storage.reconfigured_items.contains(item)
    }

    pub(crate) fn is_section_reload_marked(&self, section: &S) -> bool {
        self.storage.reloaded_sections.contains(section)
    }

    /// Owned `(section, items)` pairs, the shape used by simple view mirrors.
    pub fn to_vec(&self) -> Vec<(S, Vec<I>)> {
        self.storage
            .sections
            .iter()
            .map(|s| (s.id.clone(), s.items.clone()))
            .collect()
    }

    /// Verifies the reverse indices against the section lists.
    pub fn is_consistent(&self) -> bool {
        self.storage.is_consistent()
    }

    /// Renders the snapshot as a text tree of sections and items.
    pub fn debug_tree(&self) -> String {
        self.debug_tree_with(TreeFormatOptions::default())
    }

    /// Renders the snapshot with custom tree options.
    pub fn debug_tree_with(&self, options: TreeFormatOptions) -> String {
        #[derive(Clone)]
        enum Node<S> {
            Section(usize, S),
            Item(String),
        }

        let roots: Vec<Node<S>> = self
            .storage
            .sections
            .iter()
            .enumerate()
            .map(|(pos, s)| Node::Section(pos, s.id.clone()))
            .collect();
        TreeFormatter::with_options(options).format_forest(
            &format!(
                "Snapshot ({} sections, {} items):",
                self.number_of_sections(),
                self.number_of_items()
            ),
            &roots,
            |node| match node {
                Node::Section(_, id) => format!("{id:?}"),
                Node::Item(label) => label.clone(),
            },
            |node| match node {
                Node::Section(pos, _) => self.storage.sections[*pos]
                    .items
                    .iter()
                    .map(|item| {
                        let mark = if self.is_reload_marked(item) {
                            " (reload)"
                        } else if self.is_reconfigure_marked(item) {
                            " (reconfigure)"
                        } else {
                            ""
                        };
                        Node::Item(format!("{item:?}{mark}"))
                    })
                    .collect(),
                Node::Item(_) => Vec::new(),
            },
        )
    }
}

impl<S: PartialEq, I: PartialEq> PartialEq for Snapshot<S, I> {
    /// Structural equality: same section order and same item order in every
    /// section. Reload marks are ignored.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage) || self.storage.sections == other.storage.sections
    }
}

impl<S: Eq, I: Eq> Eq for Snapshot<S, I> {}

impl<S: fmt::Debug, I: fmt::Debug> fmt::Debug for Snapshot<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.storage.sections.iter().map(|s| (&s.id, &s.items)))
            .finish()
    }
}

static_assertions::assert_impl_all!(Snapshot<String, u64>: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;

    fn main_snapshot() -> Snapshot<&'static str, u32> {
        Snapshot::from_sections([("Main", vec![1, 2, 3])]).unwrap()
    }

    #[test]
    fn test_append_and_query() {
        let snapshot = main_snapshot();
        assert_eq!(snapshot.number_of_sections(), 1);
        assert_eq!(snapshot.number_of_items_in_section(&"Main"), Some(3));
        assert_eq!(snapshot.index_of_item(&2), Some(1));
        assert_eq!(snapshot.section_identifier_for_item(&3), Some(&"Main"));
        assert_eq!(snapshot.index_path_of_item(&3), Some(IndexPath::new(0, 2)));
        assert_eq!(snapshot.item_at(IndexPath::new(0, 0)), Some(&1));
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_duplicate_section_rejected() {
        let mut snapshot = main_snapshot();
        let err = snapshot.append_sections(["Main"]).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateSection(_)));

        let err = snapshot.append_sections(["A", "A"]).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateSection(_)));
        assert_eq!(snapshot.number_of_sections(), 1);
    }

    #[test]
    fn test_duplicate_item_rejected_across_sections() {
        let mut snapshot = main_snapshot();
        snapshot.append_sections(["Other"]).unwrap();
        let err = snapshot.append_items([2], Some(&"Other")).unwrap_err();
        assert_eq!(err, SnapshotError::DuplicateItem("2".into()));
        assert_eq!(snapshot.number_of_items_in_section(&"Other"), Some(0));
    }

    #[test]
    fn test_append_to_missing_section() {
        let mut snapshot = main_snapshot();
        let err = snapshot.append_items([9], Some(&"Nope")).unwrap_err();
        assert!(matches!(err, SnapshotError::SectionNotFound(_)));

        let mut empty = Snapshot::<&str, u32>::new();
        assert_eq!(empty.append_items([1], None), Err(SnapshotError::NoSections));
    }

    #[test]
    fn test_append_defaults_to_last_section() {
        let mut snapshot = main_snapshot();
        snapshot.append_sections(["Tail"]).unwrap();
        snapshot.append_items([4], None).unwrap();
        assert_eq!(snapshot.section_identifier_for_item(&4), Some(&"Tail"));
    }

    #[test]
    fn test_insert_items_relative() {
        let mut snapshot = main_snapshot();
        snapshot.insert_items_before([10], &2).unwrap();
        snapshot.insert_items_after([20], &3).unwrap();
        assert_eq!(snapshot.item_identifiers(), vec![1, 10, 2, 3, 20]);
        assert_eq!(snapshot.index_of_item(&3), Some(3));
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_delete_items_keeps_empty_section() {
        let mut snapshot = main_snapshot();
        snapshot.delete_items(&[1, 2, 3]);
        assert_eq!(snapshot.number_of_sections(), 1);
        assert_eq!(snapshot.number_of_items(), 0);
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_delete_absent_item_is_noop() {
        let mut snapshot = main_snapshot();
        snapshot.delete_items(&[42]);
        assert_eq!(snapshot, main_snapshot());
    }

    #[test]
    fn test_delete_section_removes_items() {
        let mut snapshot =
            Snapshot::from_sections([("A", vec![1, 2]), ("B", vec![3]), ("C", vec![4])]).unwrap();
        snapshot.delete_sections(&["B"]);
        assert_eq!(snapshot.section_identifiers(), vec!["A", "C"]);
        assert!(!snapshot.contains_item(&3));
        assert_eq!(snapshot.index_path_of_item(&4), Some(IndexPath::new(1, 0)));
        snapshot.append_items([3], Some(&"A")).unwrap();
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_move_item_within_and_across_sections() {
        let mut snapshot =
            Snapshot::from_sections([("A", vec![1, 2, 3]), ("B", vec![4, 5])]).unwrap();
        snapshot.move_item_after(&1, &3).unwrap();
        assert_eq!(snapshot.item_identifiers_in_section(&"A"), Some(&[2, 3, 1][..]));

        snapshot.move_item_before(&2, &5).unwrap();
        assert_eq!(snapshot.item_identifiers_in_section(&"A"), Some(&[3, 1][..]));
        assert_eq!(snapshot.item_identifiers_in_section(&"B"), Some(&[4, 2, 5][..]));
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_move_item_onto_itself_is_noop() {
        let mut snapshot = main_snapshot();
        snapshot.move_item_before(&2, &2).unwrap();
        snapshot.move_item_before(&1, &2).unwrap();
        assert_eq!(snapshot, main_snapshot());
    }

    #[test]
    fn test_move_missing_item_fails() {
        let mut snapshot = main_snapshot();
        assert!(matches!(
            snapshot.move_item_after(&9, &1),
            Err(SnapshotError::ItemNotFound(_))
        ));
        assert!(matches!(
            snapshot.move_item_after(&1, &9),
            Err(SnapshotError::ItemNotFound(_))
        ));
    }

    #[test]
    fn test_move_section() {
        let mut snapshot =
            Snapshot::from_sections([("A", vec![1]), ("B", vec![2]), ("C", vec![3])]).unwrap();
        snapshot.move_section_before(&"C", &"A").unwrap();
        assert_eq!(snapshot.section_identifiers(), vec!["C", "A", "B"]);
        snapshot.move_section_after(&"C", &"B").unwrap();
        assert_eq!(snapshot.section_identifiers(), vec!["A", "B", "C"]);
        assert_eq!(snapshot.index_path_of_item(&3), Some(IndexPath::new(2, 0)));
    }

    #[test]
    fn test_insert_sections_relative() {
        let mut snapshot = Snapshot::<&str, u32>::from_sections([("A", vec![]), ("C", vec![])]).unwrap();
        snapshot.insert_sections_after(["B"], &"A").unwrap();
        snapshot.insert_sections_before(["Z"], &"A").unwrap();
        assert_eq!(snapshot.section_identifiers(), vec!["Z", "A", "B", "C"]);
        assert_eq!(snapshot.index_of_section(&"C"), Some(3));
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a = Snapshot::<&str, u32>::from_sections([("A", vec![1, 2])]).unwrap();
        let b = Snapshot::<&str, u32>::from_sections([("A", vec![2, 1])]).unwrap();
        let mut c = a.clone();
        c.reload_items(&[1]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_reload_marks() {
        let mut snapshot = main_snapshot();
        assert!(matches!(
            snapshot.reload_items(&[7]),
            Err(SnapshotError::ItemNotFound(_))
        ));
        snapshot.reload_items(&[1]).unwrap();
        snapshot.reconfigure_items(&[2]).unwrap();
        assert_eq!(snapshot.reloaded_item_identifiers(), vec![1]);
        assert_eq!(snapshot.reconfigured_item_identifiers(), vec![2]);

        snapshot.delete_items(&[1]);
        assert!(snapshot.reloaded_item_identifiers().is_empty());

        snapshot.clear_reload_marks();
        assert!(snapshot.reconfigured_item_identifiers().is_empty());
    }

    #[test]
    fn test_copy_on_write() {
        let original = main_snapshot();
        let mut copy = original.clone();
        copy.append_items([4], None).unwrap();
        assert_eq!(original.number_of_items(), 3);
        assert_eq!(copy.number_of_items(), 4);
    }

    #[test]
    fn test_debug_tree() {
        let mut snapshot = main_snapshot();
        snapshot.reload_items(&[2]).unwrap();
        let text = snapshot.debug_tree_with(TreeFormatOptions::ascii());
        assert!(text.starts_with("Snapshot (1 sections, 3 items):"));
        assert!(text.contains("+-- \"Main\"") || text.contains("`-- \"Main\""));
        assert!(text.contains("2 (reload)"));
    }
}
