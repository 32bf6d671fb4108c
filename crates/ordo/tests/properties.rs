//! Snapshot, diff and data source properties.

mod common;

use common::{MirrorView, drain, model, source};
use ordo::diff::OutlineMirror;
use ordo::{
    ApplyOption, Change, IndexPath, Snapshot, SnapshotError, TreeSnapshot, diff_snapshots,
    diff_trees,
};
use ordo_core::MainQueue;

/// Deterministic xorshift so generated cases are reproducible.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

/// A random snapshot over sections `A..=E` and items `0..30`.
fn random_snapshot(rng: &mut Rng) -> Snapshot<&'static str, u32> {
    let mut names = vec!["A", "B", "C", "D", "E"];
    let mut sections: Vec<(&'static str, Vec<u32>)> = Vec::new();
    for _ in 0..=rng.below(4) {
        let name = names.remove(rng.below(names.len()));
        sections.push((name, Vec::new()));
    }
    for item in 0..30 {
        if rng.below(3) > 0 {
            let section = rng.below(sections.len());
            let items = &mut sections[section].1;
            let at = rng.below(items.len() + 1);
            items.insert(at, item);
        }
    }
    let mut snapshot = Snapshot::from_sections(sections).unwrap();
    let items = snapshot.item_identifiers();
    let marked: Vec<u32> = items.into_iter().filter(|_| rng.below(8) == 0).collect();
    snapshot.reload_items(&marked).unwrap();
    snapshot
}

/// A random forest over items `0..25`, with some items expanded.
fn random_tree(rng: &mut Rng) -> TreeSnapshot<u32> {
    let mut order: Vec<u32> = (0..25).collect();
    for i in (1..order.len()).rev() {
        order.swap(i, rng.below(i + 1));
    }
    let mut tree = TreeSnapshot::new();
    let mut added: Vec<u32> = Vec::new();
    for item in order {
        if rng.below(4) == 0 {
            continue;
        }
        let parent = match rng.below(added.len() + 2) {
            0 => None,
            n => added.get(n - 1).copied(),
        };
        tree.append([item], parent.as_ref()).unwrap();
        added.push(item);
    }
    let expanded: Vec<u32> = added.iter().copied().filter(|_| rng.below(2) == 0).collect();
    tree.expand(&expanded).unwrap();
    let marked: Vec<u32> = added.into_iter().filter(|_| rng.below(8) == 0).collect();
    tree.reload_items(&marked).unwrap();
    tree
}

#[test]
fn test_uniqueness_enforced() {
    let mut snapshot = model(vec![("A", vec![1, 2]), ("B", vec![3])]);
    let before = snapshot.clone();

    assert_eq!(
        snapshot.append_items([3], Some(&"A")),
        Err(SnapshotError::DuplicateItem("3".to_string()))
    );
    assert_eq!(
        snapshot.append_items([4, 4], None),
        Err(SnapshotError::DuplicateItem("4".to_string()))
    );
    assert!(matches!(
        snapshot.append_sections(["B"]),
        Err(SnapshotError::DuplicateSection(_))
    ));
    assert_eq!(snapshot, before);
    assert!(snapshot.is_consistent());

    let mut rng = Rng(0x5eed);
    for _ in 0..50 {
        let snapshot = random_snapshot(&mut rng);
        let items = snapshot.item_identifiers();
        let mut unique = items.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(items.len(), unique.len());
    }
}

#[test]
fn test_round_trip() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::default());
    let mut rng = Rng(7);
    for _ in 0..20 {
        let target = random_snapshot(&mut rng);
        source.apply(target.clone(), ApplyOption::animated(), None);
        drain(&source, &queue);
        assert_eq!(source.snapshot(), target);
        assert_eq!(source.with_view(|view| view.sections.clone()), target.to_vec());
    }
}

#[test]
fn test_self_diff_is_empty() {
    let mut rng = Rng(99);
    for _ in 0..50 {
        let mut snapshot = random_snapshot(&mut rng);
        snapshot.clear_reload_marks();
        assert!(diff_snapshots(&snapshot, &snapshot).is_empty());
    }

    let mut tree = TreeSnapshot::new();
    tree.append([1, 2], None).unwrap();
    tree.append([3, 4], Some(&1)).unwrap();
    tree.expand(&[1]).unwrap();
    assert!(diff_trees(&tree, &tree).is_empty());
}

#[test]
fn test_diff_replays_to_target() {
    let mut rng = Rng(0xdecaf);
    for _ in 0..200 {
        let old = random_snapshot(&mut rng);
        let new = random_snapshot(&mut rng);
        let diff = diff_snapshots(&old, &new);

        let mut mirror = old.to_vec();
        diff.apply_to(&mut mirror, |section| {
            new.item_identifiers_in_section(section)
                .map(<[u32]>::to_vec)
                .unwrap_or_default()
        });
        assert_eq!(mirror, new.to_vec(), "diff: {:?}", diff.summary());
    }
}

#[test]
fn test_tree_diff_replays_to_target() {
    let mut rng = Rng(0x7e3e);
    for _ in 0..200 {
        let old = random_tree(&mut rng);
        let new = random_tree(&mut rng);
        let diff = diff_trees(&old, &new);

        let mut mirror = OutlineMirror::from_tree(&old);
        diff.apply_to(&mut mirror, |id| new.children(Some(id)).to_vec());
        assert!(
            mirror.matches(&new),
            "old:\n{}new:\n{}diff: {:?}",
            old.debug_tree(),
            new.debug_tree(),
            diff.changes()
        );
    }

    // Moving a subtree under its former descendant.
    let mut old = TreeSnapshot::new();
    old.append([1], None).unwrap();
    old.append([2], Some(&1)).unwrap();
    old.append([3], Some(&2)).unwrap();
    let mut new = TreeSnapshot::new();
    new.append([3], None).unwrap();
    new.append([1], Some(&3)).unwrap();
    new.append([2], Some(&1)).unwrap();
    let mut mirror = OutlineMirror::from_tree(&old);
    diff_trees(&old, &new).apply_to(&mut mirror, |id| new.children(Some(id)).to_vec());
    assert!(mirror.matches(&new));
}

#[test]
fn test_rotation_is_moves_only() {
    let old = model(vec![("A", vec![1, 2, 3])]);
    let new = model(vec![("A", vec![3, 1, 2])]);
    let diff = diff_snapshots(&old, &new);

    let summary = diff.summary();
    assert_eq!(summary.items_moved, 1);
    assert_eq!(summary.total(), 1);
    assert_eq!(
        diff.changes(),
        &[Change::ItemMoved {
            id: 3,
            from: IndexPath::new(0, 2),
            to: IndexPath::new(0, 0),
        }]
    );
}

#[test]
fn test_tree_cycle_rejected() {
    let mut tree = TreeSnapshot::new();
    tree.append(["P"], None).unwrap();
    tree.append(["C"], Some(&"P")).unwrap();
    tree.append(["G"], Some(&"C")).unwrap();
    let before = tree.clone();

    assert!(matches!(
        tree.move_item(&"P", 0, Some(&"G")),
        Err(SnapshotError::CyclicMove { .. })
    ));
    assert!(matches!(
        tree.move_item(&"P", 0, Some(&"P")),
        Err(SnapshotError::CyclicMove { .. })
    ));
    assert_eq!(tree, before);
}

#[test]
fn test_payload_change_needs_reload() {
    // Identifiers are the only diff key: the same ids with new content
    // produce no changes until the item is marked.
    let old = model(vec![("A", vec![1, 2])]);
    let same_ids = model(vec![("A", vec![1, 2])]);
    assert!(diff_snapshots(&old, &same_ids).is_empty());

    let mut marked = same_ids.clone();
    marked.reload_items(&[2]).unwrap();
    assert_eq!(
        diff_snapshots(&old, &marked).changes(),
        &[Change::ItemReloaded {
            id: 2,
            at: IndexPath::new(0, 1),
        }]
    );
}

#[test]
fn test_main_section_scenario() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::default());
    assert_eq!(source.number_of_sections(), 0);

    let mut snapshot = Snapshot::new();
    snapshot.append_sections(["Main"]).unwrap();
    snapshot.append_items([1, 2, 3], None).unwrap();
    source.apply(snapshot, ApplyOption::animated(), None);
    drain(&source, &queue);

    let current = source.snapshot();
    assert_eq!(source.number_of_sections(), 1);
    assert_eq!(current.number_of_items_in_section(&"Main"), Some(3));
    assert_eq!(current.index_of_item(&2), Some(1));
    assert_eq!(source.index_path(&2), Some(IndexPath::new(0, 1)));
    assert_eq!(source.cell_for_item(IndexPath::new(0, 2)).as_deref(), Some("[0, 2]:3"));
}

#[test]
fn test_delete_scenario() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::default());
    source.apply(model(vec![("Main", vec![1, 2, 3])]), ApplyOption::WithoutAnimation, None);
    drain(&source, &queue);

    let mut next = source.snapshot();
    next.delete_items(&[2]);
    source.apply(next, ApplyOption::animated(), None);
    drain(&source, &queue);

    assert_eq!(source.snapshot(), model(vec![("Main", vec![1, 3])]));
    let last = source.with_view(|view| view.diffs.last().cloned()).unwrap();
    assert_eq!(
        last.changes(),
        &[Change::ItemDeleted {
            id: 2,
            at: IndexPath::new(0, 1),
        }]
    );
}
