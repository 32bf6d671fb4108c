use std::collections::HashMap;

use ordo_core::PerfSpan;
use ordo_core::logging::targets;

use super::lcs::longest_increasing_subsequence;
use super::{Change, Diff};
use crate::identity::{Identifier, IndexPath};
use crate::snapshot::Snapshot;

/// Computes the changes that turn `old` into `new`.
///
/// Items are matched by identifier only. An item that survives keeps its
/// identity even when it changes section, except when its old section was
/// deleted (it is inserted) or its new section is new (it is deleted, and
/// the inserted section brings it back).
///
/// Reload and reconfigure marks are read from `new` and only apply to items
/// that survive. A marked item that also moved is reported as a move
/// followed by a reload at its new position.
pub fn diff_snapshots<S, I>(old: &Snapshot<S, I>, new: &Snapshot<S, I>) -> Diff<S, I>
where
    S: Identifier,
    I: Identifier,
{
    let _span = PerfSpan::new("diff_snapshots");
    let mut section_deletes = Vec::new();
    let mut section_inserts = Vec::new();
    let mut section_moves = Vec::new();
    let mut section_reloads = Vec::new();
    let mut item_deletes = Vec::new();
    let mut item_inserts = Vec::new();
    let mut item_moves = Vec::new();
    let mut item_reloads = Vec::new();

    // Sections
    for (index, (id, _)) in old.sections().enumerate() {
        if !new.contains_section(id) {
            section_deletes.push(Change::SectionDeleted {
                id: id.clone(),
                index,
            });
        }
    }

    let mut common_sections = Vec::new();
    for (index, (id, _)) in new.sections().enumerate() {
        match old.index_of_section(id) {
            Some(from) => common_sections.push((id, from, index)),
            None => section_inserts.push(Change::SectionInserted {
                id: id.clone(),
                index,
            }),
        }
    }

    let old_order: Vec<usize> = common_sections.iter().map(|(_, from, _)| *from).collect();
    let keep = longest_increasing_subsequence(&old_order);
    for (&(id, from, to), kept) in common_sections.iter().zip(keep) {
        if !kept {
            section_moves.push(Change::SectionMoved {
                id: id.clone(),
                from,
                to,
            });
        }
        if new.is_section_reload_marked(id) {
            section_reloads.push(Change::SectionReloaded {
                id: id.clone(),
                index: to,
            });
        }
    }

    // Items
    for (section_index, (section, items)) in old.sections().enumerate() {
        if !new.contains_section(section) {
            continue;
        }
        for (item_index, id) in items.iter().enumerate() {
            if !new.contains_item(id) {
                item_deletes.push(Change::ItemDeleted {
                    id: id.clone(),
                    at: IndexPath::new(section_index, item_index),
                });
            }
        }
    }

    // Survivors that stayed in their section, grouped by section in new order,
    // as (id, old path, new path).
    let mut same_section: HashMap<usize, Vec<(&I, IndexPath, IndexPath)>> = HashMap::new();

    for (section_index, (section, items)) in new.sections().enumerate() {
        let section_is_new = !old.contains_section(section);
        for (item_index, id) in items.iter().enumerate() {
            let to = IndexPath::new(section_index, item_index);
            let Some(from) = old.index_path_of_item(id) else {
                if !section_is_new {
                    item_inserts.push(Change::ItemInserted { id: id.clone(), at: to });
                }
                continue;
            };
            let old_section = old.section_identifier_for_item(id);
            let old_section_survives = old_section.is_some_and(|s| new.contains_section(s));

            match (old_section_survives, section_is_new) {
                (true, true) => item_deletes.push(Change::ItemDeleted {
                    id: id.clone(),
                    at: from,
                }),
                (false, false) => {
                    item_inserts.push(Change::ItemInserted { id: id.clone(), at: to })
                }
                (false, true) => {}
                (true, false) => {
                    if old_section == Some(section) {
                        same_section
                            .entry(section_index)
                            .or_default()
                            .push((id, from, to));
                    } else {
                        item_moves.push(Change::ItemMoved {
                            id: id.clone(),
                            from,
                            to,
                        });
                    }
                    push_reload(new, id, to, &mut item_reloads);
                }
            }
        }
    }

    let mut scopes: Vec<_> = same_section.into_iter().collect();
    scopes.sort_by_key(|(section_index, _)| *section_index);
    for (_, survivors) in scopes {
        let old_order: Vec<usize> = survivors.iter().map(|(_, from, _)| from.item).collect();
        let keep = longest_increasing_subsequence(&old_order);
        for ((id, from, to), kept) in survivors.into_iter().zip(keep) {
            if !kept {
                item_moves.push(Change::ItemMoved {
                    id: id.clone(),
                    from,
                    to,
                });
            }
        }
    }

    section_deletes.reverse();
    item_deletes.sort_by(|a, b| position(b).cmp(&position(a)));
    item_inserts.sort_by_key(position);
    item_moves.sort_by_key(position);
    item_reloads.sort_by_key(position);

    let mut changes = section_deletes;
    changes.extend(item_deletes);
    changes.extend(section_inserts);
    changes.extend(section_moves);
    changes.extend(item_inserts);
    changes.extend(item_moves);
    changes.extend(section_reloads);
    changes.extend(item_reloads);

    let diff = Diff::from_changes(changes);
    tracing::trace!(target: targets::DIFF, summary = %diff.summary(), "diffed snapshots");
    diff
}

fn push_reload<S: Identifier, I: Identifier>(
    new: &Snapshot<S, I>,
    id: &I,
    at: IndexPath,
    out: &mut Vec<Change<S, I>>,
) {
    if new.is_reload_marked(id) {
        out.push(Change::ItemReloaded { id: id.clone(), at });
    } else if new.is_reconfigure_marked(id) {
        out.push(Change::ItemReconfigured { id: id.clone(), at });
    }
}

/// Sort key for item changes: the path the change is addressed by.
fn position<S, I>(change: &Change<S, I>) -> IndexPath {
    match change {
        Change::ItemDeleted { at, .. }
        | Change::ItemInserted { at, .. }
        | Change::ItemReloaded { at, .. }
        | Change::ItemReconfigured { at, .. } => *at,
        Change::ItemMoved { to, .. } => *to,
        Change::SectionDeleted { index, .. }
        | Change::SectionInserted { index, .. }
        | Change::SectionReloaded { index, .. } => IndexPath::new(*index, 0),
        Change::SectionMoved { to, .. } => IndexPath::new(*to, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(sections: &[(&'static str, &[u32])]) -> Snapshot<&'static str, u32> {
        Snapshot::from_sections(sections.iter().map(|(s, items)| (*s, items.to_vec()))).unwrap()
    }

    fn check_round_trip(old: &Snapshot<&'static str, u32>, new: &Snapshot<&'static str, u32>) {
        let diff = diff_snapshots(old, new);
        let mut mirror = old.to_vec();
        diff.apply_to(&mut mirror, |section| {
            new.item_identifiers_in_section(section)
                .map(<[u32]>::to_vec)
                .unwrap_or_default()
        });
        assert_eq!(mirror, new.to_vec(), "diff: {:?}", diff.changes());
    }

    #[test]
    fn test_identical_is_empty() {
        let s = snap(&[("A", &[1, 2]), ("B", &[3])]);
        assert!(diff_snapshots(&s, &s).is_empty());
    }

    #[test]
    fn test_single_delete() {
        let old = snap(&[("Main", &[1, 2, 3])]);
        let new = snap(&[("Main", &[1, 3])]);
        let diff = diff_snapshots(&old, &new);
        assert_eq!(
            diff.changes(),
            &[Change::ItemDeleted {
                id: 2,
                at: IndexPath::new(0, 1)
            }]
        );
    }

    #[test]
    fn test_rotation_is_one_move() {
        let old = snap(&[("A", &[1, 2, 3])]);
        let new = snap(&[("A", &[3, 1, 2])]);
        let diff = diff_snapshots(&old, &new);
        assert_eq!(
            diff.changes(),
            &[Change::ItemMoved {
                id: 3,
                from: IndexPath::new(0, 2),
                to: IndexPath::new(0, 0)
            }]
        );
    }

    #[test]
    fn test_change_ordering() {
        let old = snap(&[("A", &[1, 2, 3]), ("B", &[4, 5])]);
        let new = snap(&[("C", &[6]), ("A", &[1, 7, 3, 2])]);
        let diff = diff_snapshots(&old, &new);
        let kinds: Vec<&str> = diff
            .iter()
            .map(|c| match c {
                Change::SectionDeleted { .. } => "section-",
                Change::ItemDeleted { .. } => "item-",
                Change::SectionInserted { .. } => "section+",
                Change::SectionMoved { .. } => "section~",
                Change::ItemInserted { .. } => "item+",
                Change::ItemMoved { .. } => "item~",
                _ => "reload",
            })
            .collect();
        assert_eq!(kinds, vec!["section-", "section+", "item+", "item~"]);
        check_round_trip(&old, &new);
    }

    #[test]
    fn test_item_deletes_descending() {
        let old = snap(&[("A", &[1, 2, 3]), ("B", &[4, 5])]);
        let new = snap(&[("A", &[2]), ("B", &[4])]);
        let diff = diff_snapshots(&old, &new);
        let paths: Vec<IndexPath> = diff.iter().map(position).collect();
        assert_eq!(
            paths,
            vec![
                IndexPath::new(1, 1),
                IndexPath::new(0, 2),
                IndexPath::new(0, 0)
            ]
        );
    }

    #[test]
    fn test_cross_section_move() {
        let old = snap(&[("A", &[1, 2]), ("B", &[3])]);
        let new = snap(&[("A", &[1]), ("B", &[2, 3])]);
        let diff = diff_snapshots(&old, &new);
        assert_eq!(
            diff.changes(),
            &[Change::ItemMoved {
                id: 2,
                from: IndexPath::new(0, 1),
                to: IndexPath::new(1, 0)
            }]
        );
    }

    #[test]
    fn test_items_covered_by_section_changes() {
        let old = snap(&[("A", &[1, 2]), ("B", &[3])]);
        let new = snap(&[("B", &[3, 1]), ("C", &[2])]);
        let diff = diff_snapshots(&old, &new);
        let summary = diff.summary();
        assert_eq!(summary.sections_deleted, 1);
        assert_eq!(summary.sections_inserted, 1);
        // 1 leaves a deleted section for a surviving one: inserted.
        assert_eq!(summary.items_inserted, 1);
        assert_eq!(summary.items_deleted, 0);
        check_round_trip(&old, &new);
    }

    #[test]
    fn test_item_into_new_section_is_deleted() {
        let old = snap(&[("A", &[1, 2])]);
        let new = snap(&[("A", &[1]), ("B", &[2])]);
        let diff = diff_snapshots(&old, &new);
        assert_eq!(diff.summary().items_deleted, 1);
        assert_eq!(diff.summary().sections_inserted, 1);
        check_round_trip(&old, &new);
    }

    #[test]
    fn test_section_move() {
        let old = snap(&[("A", &[1]), ("B", &[2]), ("C", &[3])]);
        let new = snap(&[("C", &[3]), ("A", &[1]), ("B", &[2])]);
        let diff = diff_snapshots(&old, &new);
        assert_eq!(
            diff.changes(),
            &[Change::SectionMoved {
                id: "C",
                from: 2,
                to: 0
            }]
        );
        check_round_trip(&old, &new);
    }

    #[test]
    fn test_reload_only_when_marked() {
        let old = snap(&[("A", &[1, 2])]);
        let unmarked = snap(&[("A", &[1, 2])]);
        assert!(diff_snapshots(&old, &unmarked).is_empty());

        let mut marked = unmarked.clone();
        marked.reload_items(&[2]).unwrap();
        marked.reconfigure_items(&[1]).unwrap();
        assert_eq!(
            diff_snapshots(&old, &marked).changes(),
            &[
                Change::ItemReconfigured {
                    id: 1,
                    at: IndexPath::new(0, 0)
                },
                Change::ItemReloaded {
                    id: 2,
                    at: IndexPath::new(0, 1)
                },
            ]
        );
    }

    #[test]
    fn test_moved_and_reloaded() {
        let old = snap(&[("A", &[1, 2, 3])]);
        let mut new = snap(&[("A", &[3, 1, 2])]);
        new.reload_items(&[3]).unwrap();
        assert_eq!(
            diff_snapshots(&old, &new).changes(),
            &[
                Change::ItemMoved {
                    id: 3,
                    from: IndexPath::new(0, 2),
                    to: IndexPath::new(0, 0)
                },
                Change::ItemReloaded {
                    id: 3,
                    at: IndexPath::new(0, 0)
                },
            ]
        );
    }

    #[test]
    fn test_section_reload() {
        let old = snap(&[("A", &[1])]);
        let mut new = old.clone();
        new.reload_sections(&["A"]).unwrap();
        assert_eq!(
            diff_snapshots(&old, &new).changes(),
            &[Change::SectionReloaded { id: "A", index: 0 }]
        );
    }

    #[test]
    fn test_round_trips() {
        let cases: &[(&[(&str, &[u32])], &[(&str, &[u32])])] = &[
            (&[], &[("A", &[1, 2])]),
            (&[("A", &[1, 2])], &[]),
            (&[("A", &[1, 2, 3, 4, 5])], &[("A", &[5, 4, 3, 2, 1])]),
            (
                &[("A", &[1, 2]), ("B", &[3, 4]), ("C", &[5])],
                &[("C", &[4, 5]), ("B", &[1]), ("D", &[2, 6])],
            ),
            (
                &[("A", &[1, 2, 3]), ("B", &[4, 5, 6])],
                &[("B", &[6, 1, 4]), ("A", &[5, 3, 7, 2])],
            ),
        ];
        for (old, new) in cases {
            check_round_trip(&snap(old), &snap(new));
        }
    }
}
