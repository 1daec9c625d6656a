//! In-memory TTL cache with lazy eviction.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default entry lifetime: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Expiring key/value store.
///
/// Entries are evicted lazily when their key is next read; there is no
/// background sweep. All operations are synchronous and atomic under an
/// internal mutex, so no partially-invalidated state is observable between
/// two sequential calls. The cache alone guarantees nothing about
/// read-after-write consistency; the repository invalidates explicitly after
/// every mutation.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value under the default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value with an explicit TTL.
    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key.into(), entry);
    }

    /// Drop a single key.
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, counting expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> TtlCache<V> {
    /// Return the cached value, evicting it first when expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if Instant::now() <= entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_insert_and_get() {
        let cache: TtlCache<String> = TtlCache::default();
        cache.insert("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.get("absent"), None);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(20));
        cache.insert("k", 1);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("k"), None);
        // lazy eviction removed the entry on read
        assert!(cache.is_empty());
    }

    #[test]
    fn test_per_entry_ttl_overrides_default() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(600));
        cache.insert_with_ttl("short", 1, Duration::from_millis(20));
        cache.insert("long", 2);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache: TtlCache<u32> = TtlCache::default();
        cache.insert("a", 1);
        cache.insert("b", 2);

        cache.remove("a");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces_existing_entry() {
        let cache: TtlCache<u32> = TtlCache::default();
        cache.insert("k", 1);
        cache.insert("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
