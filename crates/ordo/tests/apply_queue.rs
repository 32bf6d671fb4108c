//! Apply queue behavior through a collection data source.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use common::{MirrorView, Source, drain, init_tracing, model, source};
use ordo::apply::{ApplyState, DataSourceConfig};
use ordo::{ApplyOption, CollectionDataSource, Completion};
use ordo_core::{MainQueue, ThreadPoolConfig};

fn recorder(log: &Arc<Mutex<Vec<u32>>>, n: u32) -> Option<Completion> {
    let log = Arc::clone(log);
    Some(Box::new(move || log.lock().push(n)))
}

#[test]
fn test_queued_applies_complete_in_order() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::holding());
    let log = Arc::new(Mutex::new(Vec::new()));

    source.apply(model(vec![("A", vec![1])]), ApplyOption::animated(), recorder(&log, 1));
    drain(&source, &queue);

    // S1 is displayed; S2 and S3 arrive back to back.
    let s2 = model(vec![("A", vec![1, 2])]);
    let s3 = model(vec![("A", vec![3, 1]), ("B", vec![2])]);
    source.apply(s2.clone(), ApplyOption::animated(), recorder(&log, 2));
    source.apply(s3.clone(), ApplyOption::animated(), recorder(&log, 3));
    assert_eq!(source.state(), ApplyState::Applying);

    drain(&source, &queue);
    assert_eq!(*log.lock(), vec![1, 2, 3]);
    assert_eq!(source.snapshot(), s3);
    assert_eq!(source.with_view(|view| view.sections.clone()), s3.to_vec());

    // The last apply was diffed against S2, not against S1.
    let diffs = source.with_view(|view| view.diffs.clone());
    assert_eq!(diffs.len(), 3);
    let mut mirror = s2.to_vec();
    diffs[2].apply_to(&mut mirror, |section| {
        s3.item_identifiers_in_section(section)
            .map(<[u32]>::to_vec)
            .unwrap_or_default()
    });
    assert_eq!(mirror, s3.to_vec());
}

#[test]
fn test_reads_see_previous_snapshot_while_in_flight() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::holding());
    source.apply(model(vec![("A", vec![1, 2])]), ApplyOption::animated(), None);
    drain(&source, &queue);

    source.apply(model(vec![("A", vec![2])]), ApplyOption::animated(), None);
    queue.process_all();
    assert_eq!(source.state(), ApplyState::Applying);
    assert_eq!(source.number_of_items(0), 2);

    drain(&source, &queue);
    assert_eq!(source.number_of_items(0), 1);
}

#[test]
fn test_completion_waits_for_view() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::holding());
    let log = Arc::new(Mutex::new(Vec::new()));
    source.apply(model(vec![("A", vec![1])]), ApplyOption::animated(), recorder(&log, 1));

    queue.process_all();
    assert!(log.lock().is_empty());

    for ticket in source.with_view(MirrorView::release) {
        ticket.finish();
    }
    assert!(log.lock().is_empty());
    queue.process_all();
    assert_eq!(*log.lock(), vec![1]);
}

#[test]
fn test_dropped_ticket_still_completes_once() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::holding());
    let log = Arc::new(Mutex::new(Vec::new()));
    source.apply(model(vec![("A", vec![1])]), ApplyOption::animated(), recorder(&log, 1));
    source.apply(model(vec![("A", vec![1, 2])]), ApplyOption::animated(), recorder(&log, 2));

    drop(source.with_view(MirrorView::release));
    queue.process_all();
    drop(source.with_view(MirrorView::release));
    queue.process_all();

    assert_eq!(*log.lock(), vec![1, 2]);
    assert!(source.is_idle());
}

#[test]
fn test_reload_paths() {
    let queue = MainQueue::new();
    init_tracing();
    let source: Source = CollectionDataSource::with_config(
        MirrorView::default(),
        Arc::new(queue.handle()),
        DataSourceConfig::default().with_reload_threshold(3),
        |_, item: &u32| Some(item.to_string()),
    );

    source.apply(model(vec![("A", vec![1, 2])]), ApplyOption::UsingReloadData, None);
    drain(&source, &queue);
    source.apply(model(vec![("A", vec![2, 1, 3])]), ApplyOption::WithoutAnimation, None);
    drain(&source, &queue);
    source.apply(model(vec![("A", vec![4, 5, 6, 7, 8])]), ApplyOption::animated(), None);
    drain(&source, &queue);

    let (reloads, batches, sections) =
        source.with_view(|view| (view.reloads, view.diffs.len(), view.sections.clone()));
    assert_eq!(reloads, 2);
    assert_eq!(batches, 1);
    assert_eq!(sections, vec![("A", vec![4, 5, 6, 7, 8])]);
}

#[test]
fn test_background_diffing() {
    let queue = MainQueue::new();
    init_tracing();
    let config = DataSourceConfig::default()
        .with_background_diffing(true)
        .with_pool(ThreadPoolConfig::with_threads(2).with_thread_name("ordo-test-diff"));
    let source: Source = CollectionDataSource::with_config(
        MirrorView::default(),
        Arc::new(queue.handle()),
        config,
        |_, item: &u32| Some(item.to_string()),
    );
    let log = Arc::new(Mutex::new(Vec::new()));

    let targets = [
        model(vec![("A", vec![1, 2, 3])]),
        model(vec![("A", vec![3, 2]), ("B", vec![1])]),
        model(vec![("B", vec![1, 4])]),
    ];
    for (n, target) in (1..).zip(targets.iter()) {
        source.apply(target.clone(), ApplyOption::animated(), recorder(&log, n));
    }

    assert!(queue.process_until(|| source.is_idle(), Duration::from_secs(5)));
    assert_eq!(*log.lock(), vec![1, 2, 3]);
    assert_eq!(source.snapshot(), targets[2]);
    assert_eq!(source.with_view(|view| view.sections.clone()), targets[2].to_vec());
}

#[test]
fn test_applied_signal_order() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::holding());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    source.applied().connect(move |id| sink.lock().push(*id));

    let first = source.apply(model(vec![("A", vec![1])]), ApplyOption::animated(), None);
    let second = source.apply(model(vec![("A", vec![2])]), ApplyOption::animated(), None);
    drain(&source, &queue);
    assert_eq!(*seen.lock(), vec![first, second]);
}

#[test]
fn test_delete_keeps_in_flight_apply() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::holding());
    source.handlers().set_can_delete(|_| true);
    source.apply(model(vec![("A", vec![1, 2, 3])]), ApplyOption::animated(), None);
    drain(&source, &queue);

    source.apply(model(vec![("A", vec![1, 2, 3, 4])]), ApplyOption::animated(), None);
    assert_eq!(source.state(), ApplyState::Applying);
    assert!(source.delete_items(&[2]));
    assert_eq!(source.snapshot(), model(vec![("A", vec![1, 2, 3])]));

    drain(&source, &queue);
    let expected = model(vec![("A", vec![1, 3, 4])]);
    assert_eq!(source.snapshot(), expected);
    assert_eq!(source.with_view(|view| view.sections.clone()), expected.to_vec());
}

#[test]
fn test_move_and_delete_of_queued_items() {
    let queue = MainQueue::new();
    let source = source(&queue, MirrorView::holding());
    source.handlers().set_can_delete(|_| true);
    source.handlers().set_can_reorder(|_| true);
    source.apply(model(vec![("A", vec![1])]), ApplyOption::animated(), None);

    // Items 2 and 3 exist only in queued applies.
    source.apply(model(vec![("A", vec![1, 2])]), ApplyOption::animated(), None);
    source.apply(model(vec![("A", vec![1, 2]), ("B", vec![3])]), ApplyOption::animated(), None);
    assert!(source.move_items(&[3], Some(&1)).unwrap());
    assert!(source.delete_items(&[2]));

    drain(&source, &queue);
    assert_eq!(source.snapshot(), model(vec![("A", vec![3, 1]), ("B", vec![])]));
}
