//! Bounded, expiring memo table for normalized ingredient names.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;

struct CachedKey {
    value: String,
    inserted_at: Instant,
}

/// Concurrent memo table with a size bound and a time-to-live.
///
/// Entries are pure function results, so two tasks racing to insert the
/// same key write identical values and no coordination is needed beyond
/// the per-shard locking `DashMap` already does.
pub struct NormalizationCache {
    entries: DashMap<String, CachedKey>,
    capacity: usize,
    ttl: Duration,
}

impl NormalizationCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: String, value: String) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict();
        }
        self.entries.insert(
            key,
            CachedKey {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop expired entries, then the oldest tenth if still full.
    fn evict(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        if self.entries.len() < self.capacity {
            return;
        }

        let mut by_age: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().inserted_at))
            .collect();
        by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

        let to_drop = (self.capacity / 10).max(1);
        for (key, _) in by_age.into_iter().take(to_drop) {
            self.entries.remove(&key);
        }
    }
}

impl Default for NormalizationCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_insert() {
        let cache = NormalizationCache::new(10, Duration::from_secs(60));
        cache.insert("fresh basil".to_string(), "basil".to_string());
        assert_eq!(cache.get("fresh basil"), Some("basil".to_string()));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = NormalizationCache::new(20, Duration::from_secs(60));
        for i in 0..100 {
            cache.insert(format!("key {i}"), format!("value {i}"));
        }
        assert!(cache.len() <= 20);
        // The newest entry always survives eviction
        assert_eq!(cache.get("key 99"), Some("value 99".to_string()));
    }

    #[test]
    fn test_expired_entries_are_misses() {
        let cache = NormalizationCache::new(10, Duration::ZERO);
        cache.insert("eggs".to_string(), "egg".to_string());
        assert_eq!(cache.get("eggs"), None);
        assert!(cache.is_empty());
    }
}
