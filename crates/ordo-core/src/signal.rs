//! Signal/slot mechanism used for data source handler callbacks.
//!
//! A [`Signal<Args>`] fans a notification (an item was selected, a row was
//! dragged, a branch was expanded) out to every connected slot. Slots are
//! either invoked directly on the emitting call stack or queued onto a
//! [`UiExecutor`] so they run on the UI thread after the current event.
//!
//! # Example
//!
//! ```
//! use ordo_core::Signal;
//!
//! let selected = Signal::<Vec<u32>>::new();
//! let id = selected.connect(|items| {
//!     println!("selected {items:?}");
//! });
//!
//! selected.emit(vec![1, 2]);
//! selected.disconnect(id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::executor::UiExecutor;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    pub struct ConnectionId;
}

/// Specifies how a connected slot is invoked when the signal is emitted.
#[derive(Clone)]
pub enum ConnectionType {
    /// Invoke the slot immediately on the emitting call stack.
    Direct,
    /// Post the invocation onto the given executor.
    Queued(Arc<dyn UiExecutor>),
}

impl std::fmt::Debug for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("Direct"),
            Self::Queued(_) => f.write_str("Queued"),
        }
    }
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

struct Connection<Args> {
    slot: Slot<Args>,
    connection_type: ConnectionType,
}

/// A type-safe signal that can have multiple connected slots.
///
/// Slots run in connection order. The connection table is not locked while
/// slots run, so a slot may connect or disconnect other slots.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    blocked: AtomicBool,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot that is invoked directly.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connect_with_type(slot, ConnectionType::Direct)
    }

    /// Connect a slot that is always posted to `executor`.
    pub fn connect_queued<F>(&self, executor: Arc<dyn UiExecutor>, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connect_with_type(slot, ConnectionType::Queued(executor))
    }

    /// Connect a slot with a specific connection type.
    pub fn connect_with_type<F>(&self, slot: F, connection_type: ConnectionType) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Connection {
            slot: Arc::new(slot),
            connection_type,
        })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Whether any slot is connected.
    pub fn is_connected(&self) -> bool {
        self.connection_count() > 0
    }

    /// Block signal emission temporarily.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots.
    ///
    /// Does nothing while the signal is blocked.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let snapshot: Vec<(Slot<Args>, ConnectionType)> = self
            .connections
            .lock()
            .values()
            .map(|conn| (conn.slot.clone(), conn.connection_type.clone()))
            .collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = snapshot.len(), "emitting signal");

        for (slot, connection_type) in snapshot {
            match connection_type {
                ConnectionType::Direct => slot(&args),
                ConnectionType::Queued(executor) => {
                    let args = args.clone();
                    if let Err(err) = executor.post(Box::new(move || slot(&args))) {
                        tracing::warn!(target: targets::SIGNAL, %err, "dropping queued slot invocation");
                    }
                }
            }
        }
    }
}

static_assertions::assert_impl_all!(Signal<Vec<u64>>: Send, Sync);
