//! Hierarchical snapshot for outline views.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ordo_core::logging::targets;
use ordo_core::{TreeFormatOptions, TreeFormatter};

use super::error::{Result, SnapshotError};
use crate::identity::Identifier;

#[derive(Clone, PartialEq, Eq)]
struct TreeNode<I> {
    parent: Option<I>,
    children: Vec<I>,
    expanded: bool,
}

impl<I> TreeNode<I> {
    fn new(parent: Option<I>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            expanded: false,
        }
    }
}

#[derive(Clone)]
struct TreeStorage<I> {
    roots: Vec<I>,
    nodes: HashMap<I, TreeNode<I>>,
    groups: HashSet<I>,
    reloaded: HashSet<I>,
    reconfigured: HashSet<I>,
}

impl<I> Default for TreeStorage<I> {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            nodes: HashMap::new(),
            groups: HashSet::new(),
            reloaded: HashSet::new(),
            reconfigured: HashSet::new(),
        }
    }
}

impl<I: Identifier> TreeStorage<I> {
    fn children_of(&self, parent: Option<&I>) -> &[I] {
        match parent {
            None => &self.roots,
            Some(id) => self
                .nodes
                .get(id)
                .map(|node| node.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    fn siblings_mut(&mut self, parent: Option<&I>) -> Option<&mut Vec<I>> {
        match parent {
            None => Some(&mut self.roots),
            Some(id) => self.nodes.get_mut(id).map(|node| &mut node.children),
        }
    }

    /// Unlinks `id` from its sibling list, keeping its subtree intact.
    fn detach(&mut self, id: &I) -> Option<(Option<I>, usize)> {
        let parent = self.nodes.get(id)?.parent.clone();
        let siblings = self.siblings_mut(parent.as_ref())?;
        let index = siblings.iter().position(|s| s == id)?;
        siblings.remove(index);
        Some((parent, index))
    }

    fn attach(&mut self, id: &I, parent: Option<I>, index: usize) {
        if let Some(siblings) = self.siblings_mut(parent.as_ref()) {
            let index = index.min(siblings.len());
            siblings.insert(index, id.clone());
        }
        if parent.is_some() {
            self.groups.remove(id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent;
        }
    }

    fn remove_subtree(&mut self, id: &I) {
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
            self.groups.remove(&current);
            self.reloaded.remove(&current);
            self.reconfigured.remove(&current);
        }
    }

    /// Whether `ancestor` is `of` or lies on the path from `of` to its root.
    fn is_self_or_ancestor(&self, ancestor: &I, of: &I) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|node| node.parent.as_ref());
        }
        false
    }

    fn collect_preorder(&self, from: &[I], visible_only: bool, out: &mut Vec<I>) {
        let mut stack: Vec<&I> = from.iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id.clone());
            if let Some(node) = self.nodes.get(id) {
                if !visible_only || node.expanded {
                    stack.extend(node.children.iter().rev());
                }
            }
        }
    }
}

/// An ordered forest of item identifiers with per-item expansion state.
///
/// A tree snapshot is the outline-view counterpart of
/// [`Snapshot`](super::Snapshot). Items are unique across the whole forest,
/// every item has at most one parent, and no item is its own ancestor. New
/// items start collapsed.
///
/// Root items may be flagged as group items, which outline views render as
/// non-reorderable headers.
///
/// Like flat snapshots, tree snapshots are copy-on-write values.
///
/// # Example
///
/// ```
/// use ordo::snapshot::TreeSnapshot;
///
/// let mut tree = TreeSnapshot::<&str>::new();
/// tree.append(["Fruit"], None)?;
/// tree.append(["Apple", "Pear"], Some(&"Fruit"))?;
/// tree.expand(&["Fruit"])?;
///
/// assert_eq!(tree.level(&"Pear"), Some(1));
/// assert_eq!(tree.visible_items(), vec!["Fruit", "Apple", "Pear"]);
/// # Ok::<(), ordo::snapshot::SnapshotError>(())
/// ```
pub struct TreeSnapshot<I> {
    storage: Arc<TreeStorage<I>>,
}

impl<I> Clone for TreeSnapshot<I> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<I> Default for TreeSnapshot<I> {
    fn default() -> Self {
        Self {
            storage: Arc::new(TreeStorage::default()),
        }
    }
}

impl<I: Identifier> TreeSnapshot<I> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    fn storage_mut(&mut self) -> &mut TreeStorage<I> {
        Arc::make_mut(&mut self.storage)
    }

    fn require(&self, id: &I) -> Result<&TreeNode<I>> {
        self.storage
            .nodes
            .get(id)
            .ok_or_else(|| SnapshotError::item_not_found(id))
    }

    fn check_new_items(&self, ids: &[I]) -> Result<()> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if self.storage.nodes.contains_key(id) || !seen.insert(id) {
                tracing::error!(target: targets::SNAPSHOT, item = ?id, "duplicate item identifier");
                return Err(SnapshotError::duplicate_item(id));
            }
        }
        Ok(())
    }

    fn insert_new(&mut self, ids: Vec<I>, parent: Option<I>, index: usize) {
        let storage = self.storage_mut();
        for (offset, id) in ids.into_iter().enumerate() {
            storage
                .nodes
                .insert(id.clone(), TreeNode::new(parent.clone()));
            storage.attach(&id, parent.clone(), index + offset);
        }
    }

    // -------------------------------------------------------------------------
    // Structure edits
    // -------------------------------------------------------------------------

    /// Appends items as the last children of `to`, or as roots when `to` is
    /// `None`.
    pub fn append<It>(&mut self, ids: It, to: Option<&I>) -> Result<()>
    where
        It: IntoIterator<Item = I>,
    {
        let ids: Vec<I> = ids.into_iter().collect();
        if let Some(parent) = to {
            self.require(parent)?;
        }
        self.check_new_items(&ids)?;
        let end = self.storage.children_of(to).len();
        self.insert_new(ids, to.cloned(), end);
        Ok(())
    }

    /// Inserts items as siblings immediately before `before`.
    pub fn insert_before<It>(&mut self, ids: It, before: &I) -> Result<()>
    where
        It: IntoIterator<Item = I>,
    {
        self.insert_relative(ids.into_iter().collect(), before, false)
    }

    /// Inserts items as siblings immediately after `after`.
    pub fn insert_after<It>(&mut self, ids: It, after: &I) -> Result<()>
    where
        It: IntoIterator<Item = I>,
    {
        self.insert_relative(ids.into_iter().collect(), after, true)
    }

    fn insert_relative(&mut self, ids: Vec<I>, anchor: &I, after: bool) -> Result<()> {
        let parent = self.require(anchor)?.parent.clone();
        self.check_new_items(&ids)?;
        let index = self
            .index_in_parent(anchor)
            .ok_or_else(|| SnapshotError::item_not_found(anchor))?;
        let index = if after { index + 1 } else { index };
        self.insert_new(ids, parent, index);
        Ok(())
    }

    /// Deletes items together with their descendants. Absent identifiers are
    /// ignored.
    pub fn delete(&mut self, ids: &[I]) {
        if !ids.iter().any(|id| self.contains(id)) {
            return;
        }
        let storage = self.storage_mut();
        for id in ids {
            if storage.detach(id).is_some() {
                storage.remove_subtree(id);
            }
        }
    }

    /// Removes every item.
    pub fn delete_all(&mut self) {
        *self.storage_mut() = TreeStorage::default();
    }

    /// Re-parents `id` under `of` (or to the root level) at `to_index`.
    ///
    /// `to_index` counts siblings after `id` has been detached and is clamped
    /// to the child count. Fails with [`SnapshotError::CyclicMove`] when `of`
    /// is `id` itself or one of its descendants; the tree is unchanged.
    pub fn move_item(&mut self, id: &I, to_index: usize, of: Option<&I>) -> Result<()> {
        self.require(id)?;
        if let Some(parent) = of {
            self.require(parent)?;
            if self.storage.is_self_or_ancestor(id, parent) {
                tracing::error!(target: targets::SNAPSHOT, item = ?id, target = ?parent, "rejected cyclic move");
                return Err(SnapshotError::cyclic_move(id, parent));
            }
        }
        let storage = self.storage_mut();
        storage.detach(id);
        storage.attach(id, of.cloned(), to_index);
        Ok(())
    }

    /// Moves `id` so it becomes the sibling immediately before `before`.
    pub fn move_item_before(&mut self, id: &I, before: &I) -> Result<()> {
        self.move_relative(id, before, false)
    }

    /// Moves `id` so it becomes the sibling immediately after `after`.
    pub fn move_item_after(&mut self, id: &I, after: &I) -> Result<()> {
        self.move_relative(id, after, true)
    }

    fn move_relative(&mut self, id: &I, anchor: &I, after: bool) -> Result<()> {
        self.require(id)?;
        let parent = self.require(anchor)?.parent.clone();
        if id == anchor {
            return Ok(());
        }
        if let Some(parent) = &parent {
            if self.storage.is_self_or_ancestor(id, parent) {
                return Err(SnapshotError::cyclic_move(id, parent));
            }
        }
        let storage = self.storage_mut();
        storage.detach(id);
        let index = storage
            .children_of(parent.as_ref())
            .iter()
            .position(|s| s == anchor)
            .ok_or_else(|| SnapshotError::item_not_found(anchor))?;
        storage.attach(id, parent, if after { index + 1 } else { index });
        Ok(())
    }

    /// Replaces every descendant of `of` with the roots of `with`.
    ///
    /// Items of `with` may reuse identifiers of the subtree being replaced but
    /// not identifiers found elsewhere in this tree.
    pub fn replace_children(&mut self, of: &I, with: &TreeSnapshot<I>) -> Result<()> {
        self.require(of)?;
        let replaced: HashSet<I> = self.descendants(of).into_iter().collect();
        for id in with.items() {
            if self.contains(&id) && !replaced.contains(&id) {
                return Err(SnapshotError::duplicate_item(&id));
            }
        }

        let storage = self.storage_mut();
        let old_children = storage
            .nodes
            .get_mut(of)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for child in &old_children {
            storage.remove_subtree(child);
        }
        for (id, node) in &with.storage.nodes {
            let mut node = node.clone();
            if node.parent.is_none() {
                node.parent = Some(of.clone());
            }
            storage.nodes.insert(id.clone(), node);
        }
        if let Some(node) = storage.nodes.get_mut(of) {
            node.children = with.storage.roots.clone();
        }
        storage.reloaded.extend(with.storage.reloaded.iter().cloned());
        storage
            .reconfigured
            .extend(with.storage.reconfigured.iter().cloned());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Expansion and groups
    // -------------------------------------------------------------------------

    /// Marks items as expanded.
    pub fn expand(&mut self, ids: &[I]) -> Result<()> {
        self.set_expanded(ids, true)
    }

    /// Marks items as collapsed.
    pub fn collapse(&mut self, ids: &[I]) -> Result<()> {
        self.set_expanded(ids, false)
    }

    fn set_expanded(&mut self, ids: &[I], expanded: bool) -> Result<()> {
        for id in ids {
            self.require(id)?;
        }
        if ids
            .iter()
            .all(|id| self.storage.nodes.get(id).map(|n| n.expanded) == Some(expanded))
        {
            return Ok(());
        }
        let storage = self.storage_mut();
        for id in ids {
            if let Some(node) = storage.nodes.get_mut(id) {
                node.expanded = expanded;
            }
        }
        Ok(())
    }

    /// Replaces the set of group items. Every id must be a root item.
    pub fn set_group_items(&mut self, ids: &[I]) -> Result<()> {
        for id in ids {
            if self.require(id)?.parent.is_some() {
                return Err(SnapshotError::not_a_root_item(id));
            }
        }
        self.storage_mut().groups = ids.iter().cloned().collect();
        Ok(())
    }

    /// Whether `id` is a group item.
    pub fn is_group_item(&self, id: &I) -> bool {
        self.storage.groups.contains(id)
    }

    /// Whether `id` may be reordered by the user. Group items may not.
    pub fn is_reorderable(&self, id: &I) -> bool {
        self.contains(id) && !self.is_group_item(id)
    }

    // -------------------------------------------------------------------------
    // Reload marks
    // -------------------------------------------------------------------------

    /// Marks items whose cells must be replaced on the next apply.
    pub fn reload_items(&mut self, ids: &[I]) -> Result<()> {
        for id in ids {
            self.require(id)?;
        }
        self.storage_mut().reloaded.extend(ids.iter().cloned());
        Ok(())
    }

    /// Marks items whose existing cells must be reconfigured on the next
    /// apply.
    pub fn reconfigure_items(&mut self, ids: &[I]) -> Result<()> {
        for id in ids {
            self.require(id)?;
        }
        self.storage_mut().reconfigured.extend(ids.iter().cloned());
        Ok(())
    }

    /// Clears reload and reconfigure marks.
    pub fn clear_reload_marks(&mut self) {
        if self.storage.reloaded.is_empty() && self.storage.reconfigured.is_empty() {
            return;
        }
        let storage = self.storage_mut();
        storage.reloaded.clear();
        storage.reconfigured.clear();
    }

    pub(crate) fn is_reload_marked(&self, id: &I) -> bool {
        self.storage.reloaded.contains(id)
    }

    pub(crate) fn is_reconfigure_marked(&self, id: &I) -> bool {
        self.storage.reconfigured.contains(id)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Number of items in the forest.
    pub fn len(&self) -> usize {
        self.storage.nodes.len()
    }

    /// Whether the forest is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.nodes.is_empty()
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &I) -> bool {
        self.storage.nodes.contains_key(id)
    }

    /// Root items in order.
    pub fn root_items(&self) -> &[I] {
        &self.storage.roots
    }

    /// Children of `of`, or the roots when `of` is `None`. Empty for absent
    /// items.
    pub fn children(&self, of: Option<&I>) -> &[I] {
        self.storage.children_of(of)
    }

    /// The parent of `id`. `None` for roots and absent items.
    pub fn parent(&self, id: &I) -> Option<&I> {
        self.storage.nodes.get(id)?.parent.as_ref()
    }

    /// Position of `id` among its siblings.
    pub fn index_in_parent(&self, id: &I) -> Option<usize> {
        let parent = self.storage.nodes.get(id)?.parent.as_ref();
        self.storage
            .children_of(parent)
            .iter()
            .position(|s| s == id)
    }

    /// Depth of `id`; roots are at level 0.
    pub fn level(&self, id: &I) -> Option<usize> {
        let mut node = self.storage.nodes.get(id)?;
        let mut level = 0;
        while let Some(parent) = &node.parent {
            level += 1;
            node = self.storage.nodes.get(parent)?;
        }
        Some(level)
    }

    /// Whether `id` is expanded. `false` for absent items.
    pub fn is_expanded(&self, id: &I) -> bool {
        self.storage.nodes.get(id).is_some_and(|node| node.expanded)
    }

    /// Whether every ancestor of `id` is expanded.
    pub fn is_visible(&self, id: &I) -> bool {
        let Some(mut node) = self.storage.nodes.get(id) else {
            return false;
        };
        while let Some(parent) = &node.parent {
            match self.storage.nodes.get(parent) {
                Some(p) if p.expanded => node = p,
                _ => return false,
            }
        }
        true
    }

    /// Every item in pre-order.
    pub fn items(&self) -> Vec<I> {
        let mut out = Vec::with_capacity(self.len());
        self.storage
            .collect_preorder(&self.storage.roots, false, &mut out);
        out
    }

    /// Items an outline view displays: pre-order, skipping the descendants of
    /// collapsed items.
    pub fn visible_items(&self) -> Vec<I> {
        let mut out = Vec::new();
        self.storage
            .collect_preorder(&self.storage.roots, true, &mut out);
        out
    }

    /// Descendants of `id` in pre-order, excluding `id`.
    pub fn descendants(&self, id: &I) -> Vec<I> {
        let mut out = Vec::new();
        self.storage
            .collect_preorder(self.storage.children_of(Some(id)), false, &mut out);
        out
    }

    /// Extracts the subtree at `of`.
    ///
    /// With `including_parent` the result has `of` as its single root;
    /// otherwise the children of `of` become the roots. Expansion state and
    /// reload marks are kept.
    pub fn snapshot(&self, of: &I, including_parent: bool) -> Result<TreeSnapshot<I>> {
        self.require(of)?;
        let roots: Vec<I> = if including_parent {
            vec![of.clone()]
        } else {
            self.storage.children_of(Some(of)).to_vec()
        };

        let mut members = Vec::new();
        self.storage.collect_preorder(&roots, false, &mut members);

        let mut storage = TreeStorage {
            roots: roots.clone(),
            ..TreeStorage::default()
        };
        for id in &members {
            if let Some(node) = self.storage.nodes.get(id) {
                let mut node = node.clone();
                if roots.contains(id) {
                    node.parent = None;
                }
                storage.nodes.insert(id.clone(), node);
            }
            if self.storage.reloaded.contains(id) {
                storage.reloaded.insert(id.clone());
            }
            if self.storage.reconfigured.contains(id) {
                storage.reconfigured.insert(id.clone());
            }
        }
        if including_parent && self.is_group_item(of) {
            storage.groups.insert(of.clone());
        }
        Ok(TreeSnapshot {
            storage: Arc::new(storage),
        })
    }

    /// Renders the forest, marking expanded and group items.
    pub fn debug_tree(&self) -> String {
        self.debug_tree_with(TreeFormatOptions::default())
    }

    /// Renders the forest with custom tree options.
    pub fn debug_tree_with(&self, options: TreeFormatOptions) -> String {
        TreeFormatter::with_options(options).format_forest(
            &format!("TreeSnapshot ({} items):", self.len()),
            &self.storage.roots,
            |id| {
                let mut label = format!("{id:?}");
                if self.is_group_item(id) {
                    label.push_str(" [group]");
                }
                if self.is_expanded(id) {
                    label.push_str(" (expanded)");
                }
                label
            },
            |id| self.storage.children_of(Some(id)).to_vec(),
        )
    }
}

impl<I: Identifier> PartialEq for TreeSnapshot<I> {
    /// Same forest shape, same expansion state and same group items.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
            || (self.storage.roots == other.storage.roots
                && self.storage.nodes == other.storage.nodes
                && self.storage.groups == other.storage.groups)
    }
}

impl<I: Identifier> Eq for TreeSnapshot<I> {}

impl<I: Identifier> fmt::Debug for TreeSnapshot<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeSnapshot")
            .field("roots", &self.storage.roots)
            .field("len", &self.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(TreeSnapshot<String>: Send, Sync, Clone);
