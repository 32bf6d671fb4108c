//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ordo::apply::{ApplyBatch, ApplyTicket};
use ordo::view::CollectionView;
use ordo::{CollectionDataSource, Diff, IndexPath, Snapshot};
use ordo_core::MainQueue;
use tracing_subscriber::EnvFilter;

pub type Model = Snapshot<&'static str, u32>;
pub type Source = CollectionDataSource<&'static str, u32, String, MirrorView>;

/// Installs a test-writer subscriber filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn model(sections: Vec<(&'static str, Vec<u32>)>) -> Model {
    Snapshot::from_sections(sections).expect("valid fixture")
}

/// A collection view that keeps a plain mirror of its sections by replaying
/// every diff it receives.
///
/// With `hold` set, tickets are kept until [`release`](Self::release) so
/// applies stay in flight.
#[derive(Default)]
pub struct MirrorView {
    pub sections: Vec<(&'static str, Vec<u32>)>,
    pub diffs: Vec<Diff<&'static str, u32>>,
    pub reloads: usize,
    pub hold: bool,
    held: Vec<ApplyTicket>,
}

impl MirrorView {
    pub fn holding() -> Self {
        Self {
            hold: true,
            ..Self::default()
        }
    }

    pub fn release(&mut self) -> Vec<ApplyTicket> {
        std::mem::take(&mut self.held)
    }

    fn settle(&mut self, ticket: ApplyTicket) {
        if self.hold {
            self.held.push(ticket);
        } else {
            ticket.finish();
        }
    }
}

impl CollectionView<&'static str, u32> for MirrorView {
    fn perform_batch_updates(&mut self, batch: ApplyBatch<Model>, ticket: ApplyTicket) {
        let target = batch.snapshot.clone();
        batch.diff.apply_to(&mut self.sections, |section| {
            target
                .item_identifiers_in_section(section)
                .map(<[u32]>::to_vec)
                .unwrap_or_default()
        });
        self.diffs.push(batch.diff);
        self.settle(ticket);
    }

    fn reload_data(&mut self, snapshot: &Model, ticket: ApplyTicket) {
        self.sections = snapshot.to_vec();
        self.reloads += 1;
        self.settle(ticket);
    }
}

pub fn source(queue: &MainQueue, view: MirrorView) -> Source {
    init_tracing();
    CollectionDataSource::new(view, Arc::new(queue.handle()), |at: IndexPath, item: &u32| {
        Some(format!("{at}:{item}"))
    })
}

/// Finishes held tickets and runs posted work until nothing is in flight.
pub fn drain(source: &Source, queue: &MainQueue) {
    loop {
        queue.process_all();
        let tickets = source.with_view(MirrorView::release);
        if tickets.is_empty() && source.is_idle() {
            break;
        }
        for ticket in tickets {
            ticket.finish();
        }
    }
    queue.process_all();
}
