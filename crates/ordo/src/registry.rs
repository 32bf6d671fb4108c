//! Typed cell registry.
//!
//! A [`CellRegistry`] maps a payload type to the registration that builds and
//! configures cells for it. Lookups are resolved by [`TypeId`] when a cell is
//! dequeued, and configured cells handed back through
//! [`enqueue_reusable`](CellRegistry::enqueue_reusable) are recycled per type.
//!
//! # Example
//!
//! ```
//! use ordo::registry::CellRegistry;
//! use ordo::IndexPath;
//!
//! let mut registry = CellRegistry::<String>::new();
//! registry.register::<u32, _, _>(String::new, |cell, item, at| {
//!     *cell = format!("{at}: {item}");
//! });
//!
//! let cell = registry.dequeue(&7u32, IndexPath::new(0, 2)).unwrap();
//! assert_eq!(cell, "[0, 2]: 7");
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::identity::IndexPath;

/// Errors from cell lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No registration exists for the payload type.
    #[error("no cell registered for {type_name}")]
    CellNotRegistered {
        /// Name of the payload type.
        type_name: &'static str,
    },
}

type Make<C> = Box<dyn Fn() -> C + Send + Sync>;
type Configure<C> = Box<dyn Fn(&mut C, &dyn Any, IndexPath) + Send + Sync>;

struct Registration<C> {
    type_name: &'static str,
    make: Make<C>,
    configure: Configure<C>,
}

/// Cell registrations keyed by payload type.
pub struct CellRegistry<C> {
    registrations: HashMap<TypeId, Registration<C>>,
    reusable: Mutex<HashMap<TypeId, Vec<C>>>,
}

impl<C: Send + 'static> Default for CellRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + 'static> CellRegistry<C> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            reusable: Mutex::new(HashMap::new()),
        }
    }

    /// Registers how cells for payload `T` are created and configured.
    ///
    /// A second registration for the same type replaces the first.
    pub fn register<T, M, F>(&mut self, make: M, configure: F)
    where
        T: 'static,
        M: Fn() -> C + Send + Sync + 'static,
        F: Fn(&mut C, &T, IndexPath) + Send + Sync + 'static,
    {
        let configure: Configure<C> = Box::new(move |cell, payload, at| {
            if let Some(payload) = payload.downcast_ref::<T>() {
                configure(cell, payload, at);
            }
        });
        self.registrations.insert(
            TypeId::of::<T>(),
            Registration {
                type_name: type_name::<T>(),
                make: Box::new(make),
                configure,
            },
        );
    }

    /// Whether payload `T` has a registration.
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<T>())
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// A configured cell for `payload`, recycled when one is available.
    pub fn dequeue<T: 'static>(&self, payload: &T, at: IndexPath) -> Result<C, RegistryError> {
        self.dequeue_any(payload, at).map_err(|_| RegistryError::CellNotRegistered {
            type_name: type_name::<T>(),
        })
    }

    /// Like [`dequeue`](Self::dequeue) for a type-erased payload.
    pub fn dequeue_any(&self, payload: &dyn Any, at: IndexPath) -> Result<C, RegistryError> {
        let key = payload.type_id();
        let registration =
            self.registrations
                .get(&key)
                .ok_or(RegistryError::CellNotRegistered {
                    type_name: "<unknown>",
                })?;
        let recycled = self.reusable.lock().get_mut(&key).and_then(Vec::pop);
        let mut cell = recycled.unwrap_or_else(|| (registration.make)());
        (registration.configure)(&mut cell, payload, at);
        Ok(cell)
    }

    /// Returns a cell that displayed payload `T` for reuse.
    pub fn enqueue_reusable<T: 'static>(&self, cell: C) {
        let key = TypeId::of::<T>();
        if self.registrations.contains_key(&key) {
            self.reusable.lock().entry(key).or_default().push(cell);
        }
    }

    /// Number of cells waiting for reuse for payload `T`.
    pub fn reusable_count<T: 'static>(&self) -> usize {
        self.reusable.lock().get(&TypeId::of::<T>()).map_or(0, Vec::len)
    }

    /// Names of the registered payload types.
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.registrations.values().map(|r| r.type_name).collect();
        names.sort_unstable();
        names
    }

    /// A cell provider for data sources whose items are the payload.
    ///
    /// Items without a registration yield `None`.
    pub fn provider<I: 'static>(self: Arc<Self>) -> impl Fn(IndexPath, &I) -> Option<C> + Send + Sync {
        move |at, item| match self.dequeue(item, at) {
            Ok(cell) => Some(cell),
            Err(err) => {
                tracing::warn!(target: ordo_core::logging::targets::DATA_SOURCE, %err, "no cell for item");
                None
            }
        }
    }
}

static_assertions::assert_impl_all!(CellRegistry<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Label {
        text: String,
        configured: usize,
    }

    fn registry() -> CellRegistry<Label> {
        let mut registry = CellRegistry::new();
        registry.register::<u32, _, _>(Label::default, |cell, item, _| {
            cell.text = format!("number {item}");
            cell.configured += 1;
        });
        registry.register::<&'static str, _, _>(Label::default, |cell, item, _| {
            cell.text = format!("text {item}");
            cell.configured += 1;
        });
        registry
    }

    #[test]
    fn test_dequeue_by_type() {
        let registry = registry();
        let at = IndexPath::new(0, 0);
        assert_eq!(registry.dequeue(&3u32, at).unwrap().text, "number 3");
        assert_eq!(registry.dequeue(&"a", at).unwrap().text, "text a");
    }

    #[test]
    fn test_unregistered_type() {
        let registry = registry();
        let err = registry.dequeue(&1.5f64, IndexPath::new(0, 0)).unwrap_err();
        assert_eq!(err, RegistryError::CellNotRegistered { type_name: "f64" });
    }

    #[test]
    fn test_reuse() {
        let registry = registry();
        let at = IndexPath::new(0, 0);
        let cell = registry.dequeue(&1u32, at).unwrap();
        registry.enqueue_reusable::<u32>(cell);
        assert_eq!(registry.reusable_count::<u32>(), 1);

        let cell = registry.dequeue(&2u32, at).unwrap();
        assert_eq!(cell.configured, 2);
        assert_eq!(cell.text, "number 2");
        assert_eq!(registry.reusable_count::<u32>(), 0);
    }

    #[test]
    fn test_provider() {
        let provider = Arc::new(registry()).provider::<u32>();
        let cell = provider(IndexPath::new(1, 4), &9);
        assert_eq!(cell.map(|c| c.text), Some("number 9".to_string()));
    }
}
