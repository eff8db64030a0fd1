use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    inserted: Instant,
}

/// Bounded cache with insertion-order eviction and a wall-clock TTL.
/// Expired entries are treated as absent and purged lazily on lookup.
pub struct TtlCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
}

impl TtlCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.insert_at(key, value, Instant::now());
    }

    /// Timestamp-injecting lookup; `get` delegates here.
    pub fn get_at(&mut self, key: &str, now: Instant) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) => now.duration_since(entry.inserted) >= self.ttl,
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Timestamp-injecting insert; `insert` delegates here.
    pub fn insert_at(&mut self, key: String, value: String, now: Instant) {
        if self.entries.contains_key(&key) {
            // Re-insert keeps the original position in eviction order.
            self.entries.insert(
                key,
                Entry {
                    value,
                    inserted: now,
                },
            );
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                inserted: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_before_ttl() {
        let mut cache = TtlCache::new(10, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("a".into(), "result".into(), t0);
        assert_eq!(
            cache.get_at("a", t0 + Duration::from_secs(59)),
            Some("result".to_string())
        );
    }

    #[test]
    fn test_absent_after_ttl() {
        let mut cache = TtlCache::new(10, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("a".into(), "result".into(), t0);
        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(60)), None);
        // The expired entry was purged, not just hidden.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_oldest_inserted_at_capacity() {
        let mut cache = TtlCache::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("first".into(), "1".into(), t0);
        cache.insert_at("second".into(), "2".into(), t0);
        cache.insert_at("third".into(), "3".into(), t0);

        assert_eq!(cache.get_at("first", t0), None);
        assert_eq!(cache.get_at("second", t0), Some("2".to_string()));
        assert_eq!(cache.get_at("third", t0), Some("3".to_string()));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_replace_keeps_eviction_position() {
        let mut cache = TtlCache::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("a".into(), "1".into(), t0);
        cache.insert_at("b".into(), "2".into(), t0);
        cache.insert_at("a".into(), "1b".into(), t0);
        cache.insert_at("c".into(), "3".into(), t0);

        // "a" was oldest despite the overwrite, so it went first.
        assert_eq!(cache.get_at("a", t0), None);
        assert_eq!(cache.get_at("b", t0), Some("2".to_string()));
        assert_eq!(cache.get_at("c", t0), Some("3".to_string()));
    }
}
