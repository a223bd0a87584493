//! TTL cache for aggregated views.
//!
//! The cache is an ordinary value owned by whoever drives the aggregation
//! (normally a `DashboardSession`); nothing here is global.

use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct CachedValue<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    items: HashMap<K, CachedValue<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            items: HashMap::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_at(key, Instant::now())
    }

    /// Lookup as of `now`. An expired entry is evicted and counts as a miss.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<&V> {
        let expired = match self.items.get(key) {
            Some(cached) => now.saturating_duration_since(cached.inserted_at) >= self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };

        if expired {
            self.items.remove(key);
            self.evictions += 1;
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.items.get(key).map(|cached| &cached.value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        self.items.insert(
            key,
            CachedValue {
                value,
                inserted_at: now,
            },
        );
    }

    pub fn evict_expired(&mut self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.items.len();
        self.items
            .retain(|_, cached| now.saturating_duration_since(cached.inserted_at) < ttl);

        let removed = before - self.items.len();
        if removed > 0 {
            debug!("Evicted {} expired cache entries", removed);
        }
        self.evictions += removed as u64;
        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.items.len(),
        }
    }
}

/// Cache of finished reports keyed by the view that produced them.
pub type AggregationCache = TtlCache<crate::schema::ViewRequest, crate::AggregationReport>;
