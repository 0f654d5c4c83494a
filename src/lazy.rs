//! Lazy Facades
//!
//! A facade maps keys to either a plain value or a resolver thunk. The first read of a thunk key
//! runs the thunk, stores the result in place of the thunk and returns it; every later read is a
//! plain value read. Each key is guarded by a re-entrant lock, so a concurrent first read from
//! another thread waits for the single evaluation, while a read of the same key from inside its own
//! thunk fails with [`ReflectError::ReentrantResolution`] instead of deadlocking.

use crate::error::ReflectError;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

mod loader;

pub use loader::{lazified, LazyRequire, ModuleLoader};

/// Zero-argument resolver for a lazy key.
pub type Thunk<V> = Arc<dyn Fn() -> Result<V, ReflectError> + Send + Sync>;

/// Initial content of a facade key.
pub enum Entry<V> {
    Value(V),
    Thunk(Thunk<V>),
}

/// Wrap a resolver as a lazy entry.
pub fn lazy<V, F>(resolver: F) -> Entry<V>
where
    F: Fn() -> Result<V, ReflectError> + Send + Sync + 'static,
{
    Entry::Thunk(Arc::new(resolver))
}

enum Slot<V> {
    Unresolved(Thunk<V>),
    Resolving,
    Resolved(V),
}

/// Puts the thunk back into its slot unless disarmed.
struct Pending<'a, V> {
    state: &'a RefCell<Slot<V>>,
    thunk: Option<Thunk<V>>,
}

impl<V> Pending<'_, V> {
    fn disarm(mut self) {
        self.thunk = None;
    }
}

impl<V> Drop for Pending<'_, V> {
    fn drop(&mut self) {
        if let Some(thunk) = self.thunk.take() {
            *self.state.borrow_mut() = Slot::Unresolved(thunk);
        }
    }
}

/// How a key currently behaves, mirroring accessor vs. data properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Still backed by its resolver.
    Accessor,
    /// Holds a plain value.
    Data,
}

/// Mapping with per-key, at-most-once resolution.
pub struct LazyFacade<V> {
    order: Vec<String>,
    slots: BTreeMap<String, ReentrantMutex<RefCell<Slot<V>>>>,
}

/// Build a facade from `(key, entry)` pairs. A repeated key keeps its first position and its last
/// entry.
pub fn lazify<K, V, I>(entries: I) -> LazyFacade<V>
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Entry<V>)>,
{
    let mut facade = LazyFacade {
        order: Vec::new(),
        slots: BTreeMap::new(),
    };
    for (key, entry) in entries {
        let key = key.into();
        let slot = match entry {
            Entry::Value(value) => Slot::Resolved(value),
            Entry::Thunk(thunk) => Slot::Unresolved(thunk),
        };
        if facade
            .slots
            .insert(key.clone(), ReentrantMutex::new(RefCell::new(slot)))
            .is_none()
        {
            facade.order.push(key);
        }
    }
    facade
}

impl<V: Clone> LazyFacade<V> {
    /// Read a key, resolving it on first access.
    pub fn get(&self, key: &str) -> Result<V, ReflectError> {
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| ReflectError::UnknownKey(key.to_string()))?;
        let guard = slot.lock();

        let thunk = {
            let mut state = guard.borrow_mut();
            match std::mem::replace(&mut *state, Slot::Resolving) {
                Slot::Resolved(value) => {
                    let out = value.clone();
                    *state = Slot::Resolved(value);
                    return Ok(out);
                }
                Slot::Resolving => {
                    return Err(ReflectError::ReentrantResolution(key.to_string()));
                }
                Slot::Unresolved(thunk) => thunk,
            }
        };

        trace!(key, "Resolving lazy property");
        // On error or panic the key stays an accessor; the next read runs the resolver again.
        let pending = Pending {
            state: &*guard,
            thunk: Some(Arc::clone(&thunk)),
        };
        let value = thunk()?;
        pending.disarm();
        *guard.borrow_mut() = Slot::Resolved(value.clone());
        Ok(value)
    }

    /// Value of an already resolved key, without forcing resolution.
    pub fn peek(&self, key: &str) -> Option<V> {
        let guard = self.slots.get(key)?.try_lock()?;
        let state = guard.try_borrow().ok()?;
        match &*state {
            Slot::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<V> LazyFacade<V> {
    /// Keys in insertion order. Enumeration never resolves anything.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `key` is still an accessor or already a plain value. `None` for unknown keys.
    ///
    /// A key whose resolver is running reports [`PropertyKind::Accessor`].
    pub fn property_kind(&self, key: &str) -> Option<PropertyKind> {
        let slot = self.slots.get(key)?;
        let Some(guard) = slot.try_lock() else {
            return Some(PropertyKind::Accessor);
        };
        let kind = match guard.try_borrow().as_deref() {
            Ok(Slot::Resolved(_)) => PropertyKind::Data,
            _ => PropertyKind::Accessor,
        };
        Some(kind)
    }

    pub fn is_resolved(&self, key: &str) -> bool {
        self.property_kind(key) == Some(PropertyKind::Data)
    }
}

impl<V> fmt::Debug for LazyFacade<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in &self.order {
            map.entry(key, &self.property_kind(key));
        }
        map.finish()
    }
}
