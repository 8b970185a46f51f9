//! TTL-bounded map shared by the manager caches.
//!
//! Entries expire lazily: an expired entry is invisible to reads and is
//! dropped on the next sweep. The managers treat these maps as acceleration
//! indexes over annotation state, so losing an entry is always safe.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

pub(crate) struct TtlCache<V> {
    default_ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Insert with the cache's default TTL
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, Some(self.default_ttl));
    }

    /// Insert with an explicit TTL; `None` never expires
    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.lock().insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Drop every expired entry
    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries.lock().retain(|_, entry| !entry.is_expired(now));
    }

    /// Snapshot of the live entries
    pub fn items(&self) -> Vec<(String, V)> {
        let now = Instant::now();
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(k, entry)| (k.clone(), entry.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);

        cache.remove("a");
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_expiry_hides_and_sweep_drops() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("gone", 1, Some(Duration::ZERO));
        cache.insert("kept", 2);

        assert_eq!(cache.get("gone"), None);
        assert_eq!(cache.get("kept"), Some(2));

        cache.sweep();
        assert_eq!(cache.items(), vec![("kept".to_string(), 2)]);
    }

    #[test]
    fn test_no_ttl_entries_survive() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::ZERO);
        cache.insert_with_ttl("forever", 1, None);
        cache.sweep();
        assert_eq!(cache.get("forever"), Some(1));
    }
}
