//! Cross-thread delivery through the UI executor.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ordo_core::executor::{MainQueue, UiExecutor};
use ordo_core::{Signal, ThreadPool, ThreadPoolConfig};
use parking_lot::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_queued_slot_runs_on_ui_thread() {
    init_tracing();
    let queue = MainQueue::new();
    let ui = thread::current().id();
    let signal = Arc::new(Signal::<u32>::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    signal.connect_queued(Arc::new(queue.handle()), move |value| {
        sink.lock().push((*value, thread::current().id()));
    });

    let emitter = signal.clone();
    thread::spawn(move || {
        for value in 0..3 {
            emitter.emit(value);
        }
    })
    .join()
    .unwrap();

    assert!(seen.lock().is_empty());
    assert_eq!(queue.process_all(), 3);
    assert_eq!(*seen.lock(), vec![(0, ui), (1, ui), (2, ui)]);
}

#[test]
fn test_pool_results_arrive_through_queue() {
    init_tracing();
    let queue = MainQueue::new();
    let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2).with_thread_name("event-loop-test"))
        .unwrap();
    let results = Arc::new(Mutex::new(Vec::new()));

    for n in 1..=4u64 {
        let sink = results.clone();
        pool.spawn_with_callback(
            move || n * n,
            Arc::new(queue.handle()),
            move |square| sink.lock().push(square),
        );
    }

    let done = queue.process_until(|| results.lock().len() == 4, Duration::from_secs(5));
    assert!(done);
    let mut squares = results.lock().clone();
    squares.sort_unstable();
    assert_eq!(squares, vec![1, 4, 9, 16]);
}

#[test]
fn test_cancelled_task_is_skipped() {
    let queue = MainQueue::new();
    let handle = queue.handle();
    let hits = Arc::new(Mutex::new(Vec::new()));

    let first = hits.clone();
    let id = handle.post(Box::new(move || first.lock().push("first"))).unwrap();
    let second = hits.clone();
    handle.post(Box::new(move || second.lock().push("second"))).unwrap();

    assert!(handle.cancel(id));
    queue.process_all();
    assert_eq!(*hits.lock(), vec!["second"]);
}

#[test]
fn test_process_until_times_out() {
    let queue = MainQueue::new();
    assert!(!queue.process_until(|| false, Duration::from_millis(20)));
}
