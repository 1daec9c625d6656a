//! Process-wide cache invalidation registry.
//!
//! Repositories register weak handles to their caches at construction so
//! external code can bust caches across every live repository after broad
//! mutations performed outside this layer (e.g. a bulk import).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, Weak};

use once_cell::sync::Lazy;

use crate::infrastructure::cache::TtlCache;

/// Anything that can drop all of its entries at once.
pub trait Invalidate: Send + Sync {
    fn invalidate(&self);
}

impl<V: Send> Invalidate for TtlCache<V> {
    fn invalidate(&self) {
        self.clear();
    }
}

type Handles = Vec<Weak<dyn Invalidate>>;

static REGISTRY: Lazy<Mutex<HashMap<String, Handles>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn lock() -> std::sync::MutexGuard<'static, HashMap<String, Handles>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register a cache under a collection name. Dead handles are pruned on the
/// next invalidation touching that collection.
pub(crate) fn register(collection: &str, handle: Weak<dyn Invalidate>) {
    lock()
        .entry(collection.to_string())
        .or_default()
        .push(handle);
}

/// Clear every registered cache for one collection.
pub fn invalidate_collection(collection: &str) {
    let mut registry = lock();
    if let Some(handles) = registry.get_mut(collection) {
        handles.retain(|weak| {
            weak.upgrade()
                .map(|cache| cache.invalidate())
                .is_some()
        });
        if handles.is_empty() {
            registry.remove(collection);
        }
    }
}

/// Clear every registered cache across all collections.
pub fn invalidate_all() {
    let mut registry = lock();
    for handles in registry.values_mut() {
        handles.retain(|weak| {
            weak.upgrade()
                .map(|cache| cache.invalidate())
                .is_some()
        });
    }
    registry.retain(|_, handles| !handles.is_empty());
}
