//! Bounded response cache keyed by query signature

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{Post, PaginationMode};
use crate::infrastructure::source::PageResponse;

/// Query signature of a server page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub mode: PaginationMode,
    pub fingerprint: u64,
    pub page_index: usize,
}

/// A cached page. Entries carry no generation: staleness is decided by the
/// coordinator before a response is ever inserted.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub items: Vec<Post>,
    pub total_count: Option<usize>,
    inserted_at: Instant,
    last_used: u64,
}

impl CacheEntry {
    pub fn to_response(&self) -> PageResponse {
        PageResponse {
            items: self.items.clone(),
            total_count: self.total_count,
        }
    }
}

/// LRU cache with a time-to-live
#[derive(Debug)]
pub struct ResponseCache {
    entries: HashMap<CacheKey, CacheEntry>,
    capacity: usize,
    ttl: Duration,
    tick: u64,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(1024)),
            capacity,
            ttl,
            tick: 0,
        }
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

    /// Look up a live entry, marking it as recently used
    pub fn get(&mut self, key: &CacheKey) -> Option<&CacheEntry> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() >= self.ttl);
        if expired {
            self.entries.remove(key);
            return None;
        }

        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry)
    }

    pub fn insert(&mut self, key: CacheKey, response: &PageResponse) {
        if self.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.tick += 1;
        self.entries.insert(
            key,
            CacheEntry {
                items: response.items.clone(),
                total_count: response.total_count,
                inserted_at: Instant::now(),
                last_used: self.tick,
            },
        );
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn sweep_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}
