use std::collections::{HashMap, HashSet};

use ordo_core::PerfSpan;
use ordo_core::logging::targets;

use super::fill_slots;
use super::lcs::longest_increasing_subsequence;
use crate::identity::Identifier;
use crate::snapshot::TreeSnapshot;

/// One change between two tree snapshots.
///
/// Positions are `(parent, index)` pairs where `None` is the root level.
/// Deleted positions and `from` positions refer to the old tree; every other
/// position refers to the new tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange<I> {
    /// An item and its subtree were removed.
    Deleted {
        id: I,
        parent: Option<I>,
        index: usize,
    },
    /// An item was added together with its subtree.
    Inserted {
        id: I,
        parent: Option<I>,
        index: usize,
    },
    /// An item changed position, carrying its subtree along.
    Moved {
        id: I,
        from_parent: Option<I>,
        from: usize,
        to_parent: Option<I>,
        to: usize,
    },
    /// A surviving item was marked for reload.
    Reloaded {
        id: I,
        parent: Option<I>,
        index: usize,
    },
    /// A surviving item was marked for reconfiguration.
    Reconfigured {
        id: I,
        parent: Option<I>,
        index: usize,
    },
    /// An item is expanded in the new tree but was not before.
    Expanded { id: I },
    /// A surviving item was collapsed.
    Collapsed { id: I },
}

impl<I> TreeChange<I> {
    /// The item the change is about.
    pub fn id(&self) -> &I {
        match self {
            TreeChange::Deleted { id, .. }
            | TreeChange::Inserted { id, .. }
            | TreeChange::Moved { id, .. }
            | TreeChange::Reloaded { id, .. }
            | TreeChange::Reconfigured { id, .. }
            | TreeChange::Expanded { id }
            | TreeChange::Collapsed { id } => id,
        }
    }

    /// Whether the change alters the forest shape.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TreeChange::Deleted { .. } | TreeChange::Inserted { .. } | TreeChange::Moved { .. }
        )
    }
}

/// The ordered changes between two tree snapshots.
///
/// Replay order: deletions (reverse pre-order of the old tree), insertions
/// (pre-order of the new tree), moves, reloads, then expansion changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeDiff<I> {
    changes: Vec<TreeChange<I>>,
}

impl<I> Default for TreeDiff<I> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<I> TreeDiff<I> {
    /// The changes in replay order.
    pub fn changes(&self) -> &[TreeChange<I>] {
        &self.changes
    }

    /// Consumes the diff, returning the changes.
    pub fn into_changes(self) -> Vec<TreeChange<I>> {
        self.changes
    }

    /// Iterates over the changes.
    pub fn iter(&self) -> std::slice::Iter<'_, TreeChange<I>> {
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

    /// Whether any change alters the forest shape.
    pub fn has_structural_changes(&self) -> bool {
        self.changes.iter().any(TreeChange::is_structural)
    }

    /// Number of changes matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&TreeChange<I>) -> bool) -> usize {
        self.changes.iter().filter(|c| predicate(c)).count()
    }
}

impl<I: Identifier> TreeDiff<I> {
    /// Replays the changes on an [`OutlineMirror`] of the old tree.
    ///
    /// `populate` returns the children of an inserted item in the new tree;
    /// it is called recursively for the whole inserted subtree.
    pub fn apply_to<F>(&self, mirror: &mut OutlineMirror<I>, populate: F)
    where
        F: Fn(&I) -> Vec<I>,
    {
        let mut incoming: HashMap<Option<I>, Vec<(usize, I)>> = HashMap::new();

        for change in &self.changes {
            match change {
                TreeChange::Deleted { id, .. } => {
                    mirror.detach(id);
                    mirror.remove_subtree(id);
                }
                TreeChange::Moved {
                    id, to_parent, to, ..
                } => {
                    mirror.detach(id);
                    incoming
                        .entry(to_parent.clone())
                        .or_default()
                        .push((*to, id.clone()));
                }
                TreeChange::Inserted { id, parent, index } => {
                    mirror.add_subtree(id, &populate);
                    incoming
                        .entry(parent.clone())
                        .or_default()
                        .push((*index, id.clone()));
                }
                _ => {}
            }
        }

        for (parent, placed) in incoming {
            for (_, id) in &placed {
                mirror.parents.insert(id.clone(), parent.clone());
            }
            let siblings = mirror.siblings_mut(parent.as_ref());
            let staying = std::mem::take(siblings);
            *siblings = fill_slots(placed, staying);
        }

        for change in &self.changes {
            match change {
                TreeChange::Expanded { id } => {
                    mirror.expanded.insert(id.clone());
                }
                TreeChange::Collapsed { id } => {
                    mirror.expanded.remove(id);
                }
                _ => {}
            }
        }
    }
}

/// A plain parent/children model of what an outline view displays.
///
/// Used to check that replaying a [`TreeDiff`] reproduces the new tree, and
/// by simple outline views that keep their own row model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineMirror<I: Identifier> {
    roots: Vec<I>,
    children: HashMap<I, Vec<I>>,
    parents: HashMap<I, Option<I>>,
    expanded: HashSet<I>,
}

impl<I: Identifier> Default for OutlineMirror<I> {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            children: HashMap::new(),
            parents: HashMap::new(),
            expanded: HashSet::new(),
        }
    }
}

impl<I: Identifier> OutlineMirror<I> {
    /// Copies the shape and expansion state of `tree`.
    pub fn from_tree(tree: &TreeSnapshot<I>) -> Self {
        let mut mirror = Self {
            roots: tree.root_items().to_vec(),
            ..Self::default()
        };
        for id in tree.items() {
            mirror
                .children
                .insert(id.clone(), tree.children(Some(&id)).to_vec());
            mirror.parents.insert(id.clone(), tree.parent(&id).cloned());
            if tree.is_expanded(&id) {
                mirror.expanded.insert(id);
            }
        }
        mirror
    }

    /// Root items in order.
    pub fn roots(&self) -> &[I] {
        &self.roots
    }

    /// Children of `of`, or the roots for `None`.
    pub fn children(&self, of: Option<&I>) -> &[I] {
        match of {
            None => &self.roots,
            Some(id) => self.children.get(id).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Whether `id` is expanded.
    pub fn is_expanded(&self, id: &I) -> bool {
        self.expanded.contains(id)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Whether the mirror is empty.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Whether the mirror shows the same forest and expansion state as
    /// `tree`.
    pub fn matches(&self, tree: &TreeSnapshot<I>) -> bool {
        self.len() == tree.len()
            && self.roots == tree.root_items()
            && tree.items().iter().all(|id| {
                self.parents.get(id) == Some(&tree.parent(id).cloned())
                    && self.children(Some(id)) == tree.children(Some(id))
                    && self.is_expanded(id) == tree.is_expanded(id)
            })
    }

    fn siblings_mut(&mut self, parent: Option<&I>) -> &mut Vec<I> {
        match parent {
            None => &mut self.roots,
            Some(id) => self.children.entry(id.clone()).or_default(),
        }
    }

    fn detach(&mut self, id: &I) {
        if let Some(parent) = self.parents.get(id).cloned() {
            self.siblings_mut(parent.as_ref()).retain(|s| s != id);
        }
    }

    fn remove_subtree(&mut self, id: &I) {
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(children) = self.children.remove(&current) {
                stack.extend(children);
            }
            self.parents.remove(&current);
            self.expanded.remove(&current);
        }
    }

    fn add_subtree<F>(&mut self, id: &I, populate: &F)
    where
        F: Fn(&I) -> Vec<I>,
    {
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            let children = populate(&current);
            for child in &children {
                self.parents.insert(child.clone(), Some(current.clone()));
            }
            stack.extend(children.iter().cloned());
            self.children.insert(current, children);
        }
    }
}

struct TreePair<'a, I> {
    old: &'a TreeSnapshot<I>,
    new: &'a TreeSnapshot<I>,
    /// Items present in both trees that must still be deleted and
    /// re-inserted because an ancestor on either side is.
    replaced: HashSet<I>,
}

impl<I: Identifier> TreePair<'_, I> {
    /// Whether `id` (an old item) disappears: it or an old ancestor is absent
    /// from the new tree or replaced.
    fn is_gone(&self, id: &I) -> bool {
        let mut current = Some(id);
        while let Some(item) = current {
            if !self.new.contains(item) || self.replaced.contains(item) {
                return true;
            }
            current = self.old.parent(item);
        }
        false
    }

    /// Whether `id` (a new item) appears: it or a new ancestor is absent
    /// from the old tree or replaced.
    fn is_inserted(&self, id: &I) -> bool {
        let mut current = Some(id);
        while let Some(item) = current {
            if !self.old.contains(item) || self.replaced.contains(item) {
                return true;
            }
            current = self.new.parent(item);
        }
        false
    }

    /// Grows `replaced` to its least fixpoint.
    fn resolve_replacements(&mut self, common: &[I]) {
        loop {
            let mut changed = false;
            for id in common {
                if self.replaced.contains(id) {
                    continue;
                }
                let old_parent_gone = self.old.parent(id).is_some_and(|p| self.is_gone(p));
                let new_parent_inserted = self.new.parent(id).is_some_and(|p| self.is_inserted(p));
                if old_parent_gone || new_parent_inserted {
                    self.replaced.insert(id.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn is_survivor(&self, id: &I) -> bool {
        self.old.contains(id) && self.new.contains(id) && !self.replaced.contains(id)
    }
}

/// Computes the changes that turn tree `old` into tree `new`.
///
/// Each parent scope is reconciled like a section. Survivors that changed
/// parent always move; within a parent only the items outside a longest
/// increasing subsequence of old positions move.
///
/// An item moved under a newly inserted parent, or out of a deleted parent,
/// cannot be moved: it is deleted and re-inserted with the subtree that
/// covers it. Changes under a deleted or inserted item are covered by that
/// change and not reported.
pub fn diff_trees<I: Identifier>(old: &TreeSnapshot<I>, new: &TreeSnapshot<I>) -> TreeDiff<I> {
    let _span = PerfSpan::new("diff_trees");
    let old_items = old.items();
    let new_items = new.items();

    let mut pair = TreePair {
        old,
        new,
        replaced: HashSet::new(),
    };
    let common: Vec<I> = old_items
        .iter()
        .filter(|id| new.contains(id))
        .cloned()
        .collect();
    pair.resolve_replacements(&common);

    let mut changes = Vec::new();

    for id in old_items.iter().rev() {
        if pair.is_gone(id) && !old.parent(id).is_some_and(|p| pair.is_gone(p)) {
            changes.push(TreeChange::Deleted {
                id: id.clone(),
                parent: old.parent(id).cloned(),
                index: old.index_in_parent(id).unwrap_or(0),
            });
        }
    }

    for id in &new_items {
        if pair.is_inserted(id) && !new.parent(id).is_some_and(|p| pair.is_inserted(p)) {
            changes.push(TreeChange::Inserted {
                id: id.clone(),
                parent: new.parent(id).cloned(),
                index: new.index_in_parent(id).unwrap_or(0),
            });
        }
    }

    // Survivors that kept their parent, per scope, in new order.
    let mut scopes: HashMap<Option<&I>, Vec<(&I, usize)>> = HashMap::new();
    let mut moved: HashSet<&I> = HashSet::new();
    for id in new_items.iter().filter(|id| pair.is_survivor(id)) {
        let parent = new.parent(id);
        if old.parent(id) == parent {
            let from = old.index_in_parent(id).unwrap_or(0);
            scopes.entry(parent).or_default().push((id, from));
        } else {
            moved.insert(id);
        }
    }
    for survivors in scopes.values() {
        let order: Vec<usize> = survivors.iter().map(|(_, from)| *from).collect();
        let keep = longest_increasing_subsequence(&order);
        for (&(id, _), kept) in survivors.iter().zip(keep) {
            if !kept {
                moved.insert(id);
            }
        }
    }

    let mut reloads = Vec::new();
    for id in new_items.iter().filter(|id| pair.is_survivor(id)) {
        let parent = new.parent(id).cloned();
        let index = new.index_in_parent(id).unwrap_or(0);
        if moved.contains(id) {
            changes.push(TreeChange::Moved {
                id: id.clone(),
                from_parent: old.parent(id).cloned(),
                from: old.index_in_parent(id).unwrap_or(0),
                to_parent: parent.clone(),
                to: index,
            });
        }
        if new.is_reload_marked(id) {
            reloads.push(TreeChange::Reloaded {
                id: id.clone(),
                parent,
                index,
            });
        } else if new.is_reconfigure_marked(id) {
            reloads.push(TreeChange::Reconfigured {
                id: id.clone(),
                parent,
                index,
            });
        }
    }
    changes.extend(reloads);

    for id in &new_items {
        let survivor = pair.is_survivor(id);
        if new.is_expanded(id) && !(survivor && old.is_expanded(id)) {
            changes.push(TreeChange::Expanded { id: id.clone() });
        } else if survivor && old.is_expanded(id) && !new.is_expanded(id) {
            changes.push(TreeChange::Collapsed { id: id.clone() });
        }
    }

    tracing::trace!(
        target: targets::DIFF,
        changes = changes.len(),
        replaced = pair.replaced.len(),
        "diffed trees"
    );
    TreeDiff { changes }
}
