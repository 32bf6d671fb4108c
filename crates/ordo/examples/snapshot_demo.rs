//! Drives a collection view and an outline view from snapshots and prints
//! what each view is asked to do.
//!
//! Run with: RUST_LOG=ordo=debug cargo run -p ordo --example snapshot_demo

use std::sync::Arc;

use ordo::apply::{ApplyBatch, ApplyTicket};
use ordo::prelude::*;
use tracing_subscriber::EnvFilter;

/// Prints batch updates instead of animating them.
struct PrintingGrid;

impl CollectionView<&'static str, &'static str> for PrintingGrid {
    fn perform_batch_updates(
        &mut self,
        batch: ApplyBatch<Snapshot<&'static str, &'static str>>,
        ticket: ApplyTicket,
    ) {
        println!("grid: {} change(s)", batch.diff.len());
        for change in batch.diff.iter() {
            println!("  {change:?}");
        }
        ticket.finish();
    }

    fn reload_data(&mut self, snapshot: &Snapshot<&'static str, &'static str>, ticket: ApplyTicket) {
        println!("grid: reload with {} item(s)", snapshot.number_of_items());
        ticket.finish();
    }
}

/// Prints the visible tree after every update.
struct PrintingOutline;

impl OutlineView<&'static str> for PrintingOutline {
    fn perform_batch_updates(&mut self, batch: ApplyBatch<TreeSnapshot<&'static str>>, ticket: ApplyTicket) {
        println!("outline: {} change(s)", batch.diff.len());
        print!("{}", batch.snapshot.debug_tree());
        ticket.finish();
    }

    fn reload_data(&mut self, tree: &TreeSnapshot<&'static str>, ticket: ApplyTicket) {
        println!("outline: reload");
        print!("{}", tree.debug_tree());
        ticket.finish();
    }
}

fn main() -> Result<(), SnapshotError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let queue = MainQueue::new();
    let executor: Arc<dyn UiExecutor> = Arc::new(queue.handle());

    let grid = CollectionDataSource::new(PrintingGrid, executor.clone(), |at, fruit: &&str| {
        Some(format!("{at} {fruit}"))
    });

    let mut snapshot = Snapshot::new();
    snapshot.append_sections(["Fruit", "Vegetables"])?;
    snapshot.append_items(["apple", "banana", "cherry"], Some(&"Fruit"))?;
    snapshot.append_items(["carrot", "leek"], Some(&"Vegetables"))?;
    grid.apply_snapshot(snapshot);
    queue.process_all();

    let mut next = grid.snapshot();
    next.delete_items(&["banana"]);
    next.move_item_before(&"cherry", &"apple")?;
    next.append_items(["kale"], Some(&"Vegetables"))?;
    grid.apply(
        next,
        ApplyOption::animated(),
        Some(Box::new(|| println!("grid: settled"))),
    );
    queue.process_all();
    println!("grid: cell at [0, 0] is {:?}", grid.cell_for_item(IndexPath::new(0, 0)));

    let outline = OutlineDataSource::new(PrintingOutline, executor, |level, item: &&str| {
        Some(format!("{}{item}", "  ".repeat(level)))
    });
    outline.handlers().expanded.connect(|item| println!("outline: expanded {item}"));

    let mut tree = TreeSnapshot::new();
    tree.append(["Documents", "Pictures"], None)?;
    tree.append(["notes.txt", "todo.txt"], Some(&"Documents"))?;
    tree.append(["cat.png"], Some(&"Pictures"))?;
    outline.apply_snapshot(tree);
    queue.process_all();

    outline.item_did_expand(&"Documents")?;
    queue.process_all();
    println!("outline: visible rows {:?}", outline.visible_items());

    Ok(())
}
