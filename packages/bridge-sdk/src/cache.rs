//! Bounded key-value cache with TTL and max-size eviction
//!
//! Backs the optional invocation-delay cache. Uses tokio's clock so paused-time
//! tests can expire entries deterministically.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

/// Bounded cache with TTL and capacity limits.
///
/// - **Max capacity:** when full, expired entries are dropped first, then the
///   oldest remaining entry.
/// - **TTL:** expired entries are never returned.
pub struct BoundedCache<K, V> {
    map: HashMap<K, (V, Instant)>,
    max_size: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            max_size,
            ttl,
        }
    }

    /// The value for `key` if present and not expired
    pub fn get(&self, key: &K) -> Option<V> {
        self.map
            .get(key)
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(value, _)| value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        let now = Instant::now();
        let ttl = self.ttl;

        self.map.retain(|_, (_, at)| now.duration_since(*at) < ttl);

        while self.map.len() >= self.max_size && !self.map.contains_key(&key) {
            let oldest = self
                .map
                .iter()
                .min_by_key(|(_, (_, at))| *at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    self.map.remove(&k);
                }
                None => break,
            }
        }

        self.map.insert(key, (value, now));
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
