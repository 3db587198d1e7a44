//! Bounded FIFO memo of committed query → result list.
//!
//! Eviction is by insertion order, not recency: a hit does not refresh an
//! entry's position. Values are shared `Arc`s, so a hit hands back the very
//! list that was stored.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::index::ResultList;

/// `lowercase(trim(query)) + "_" + premium`.
///
/// The premium flag is part of the key because what a user may see depends on
/// quota state, not because the matches differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(query: &str, is_premium: bool) -> Self {
        Self(format!("{}_{}", query.trim().to_lowercase(), is_premium))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub struct ResultCache {
    capacity: usize,
    entries: HashMap<CacheKey, Arc<ResultList>>,
    order: VecDeque<CacheKey>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ResultList>> {
        self.entries.get(key).cloned()
    }

    /// Store a result. Returns the key evicted to make room, if any.
    /// Overwriting an existing key keeps its original insertion slot.
    pub fn put(&mut self, key: CacheKey, value: Arc<ResultList>) -> Option<CacheKey> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.order.pop_front().map(|oldest| {
                self.entries.remove(&oldest);
                oldest
            })
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> Arc<ResultList> {
        Arc::new(ResultList::default())
    }

    #[test]
    fn test_key_normalizes_query() {
        assert_eq!(CacheKey::new("  Diabetes ", false).as_str(), "diabetes_false");
        assert_eq!(CacheKey::new("diabetes", true).as_str(), "diabetes_true");
        assert_ne!(CacheKey::new("diabetes", true), CacheKey::new("diabetes", false));
    }

    #[test]
    fn test_hit_returns_same_allocation() {
        let mut cache = ResultCache::new(4);
        let value = list();
        cache.put(CacheKey::new("flu", false), Arc::clone(&value));

        let hit = cache.get(&CacheKey::new("FLU", false)).unwrap();
        assert!(Arc::ptr_eq(&hit, &value));
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut cache = ResultCache::new(3);
        for q in ["a1", "b2", "c3"] {
            assert_eq!(cache.put(CacheKey::new(q, false), list()), None);
        }

        // A hit does not refresh the oldest entry
        assert!(cache.get(&CacheKey::new("a1", false)).is_some());

        let evicted = cache.put(CacheKey::new("d4", false), list());
        assert_eq!(evicted, Some(CacheKey::new("a1", false)));
        assert!(!cache.contains(&CacheKey::new("a1", false)));
        assert!(cache.contains(&CacheKey::new("b2", false)));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_overwrite_keeps_slot() {
        let mut cache = ResultCache::new(2);
        cache.put(CacheKey::new("a1", false), list());
        cache.put(CacheKey::new("b2", false), list());
        assert_eq!(cache.put(CacheKey::new("a1", false), list()), None);

        let evicted = cache.put(CacheKey::new("c3", false), list());
        assert_eq!(evicted, Some(CacheKey::new("a1", false)));
    }

    #[test]
    fn test_default_capacity_bound() {
        let mut cache = ResultCache::new(crate::config::DEFAULT_CACHE_CAPACITY);
        for i in 0..=100 {
            cache.put(CacheKey::new(&format!("query {i}"), false), list());
        }
        assert_eq!(cache.len(), 100);
        assert!(!cache.contains(&CacheKey::new("query 0", false)));
        assert!(cache.contains(&CacheKey::new("query 1", false)));
        assert!(cache.contains(&CacheKey::new("query 100", false)));
    }

    #[test]
    fn test_clear() {
        let mut cache = ResultCache::new(2);
        cache.put(CacheKey::new("a1", false), list());
        cache.clear();
        assert!(cache.is_empty());
    }
}
