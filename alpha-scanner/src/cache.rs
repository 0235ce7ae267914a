//! Time-to-live memoization for loaded worksheets

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

struct Entry<V> {
    value: Arc<V>,
    stored_at: DateTime<Utc>,
}

/// Keyed cache whose entries expire a fixed duration after they were stored
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key` as of `now`. Expired entries are evicted.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<Arc<V>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if now - entry.stored_at < self.ttl => Some(Arc::clone(&entry.value)),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: &str, value: V, now: DateTime<Utc>) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: Arc::clone(&value),
                stored_at: now,
            },
        );
        value
    }

    /// Drop every entry; returns how many were held
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }
}
