//! Research result cache keyed by normalized title

use std::collections::HashMap;

use tracing::debug;

use super::response::ResearchResponse;

/// Cache key: lower-cased, trimmed title
pub fn cache_key(title: &str) -> String {
    title.trim().to_lowercase()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ResearchResponse,
    /// Insert time (Unix milliseconds)
    timestamp: i64,
}

/// In-process result cache; lives as long as the process
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
    ttl_ms: i64,
}

impl ResponseCache {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ms,
        }
    }

    /// Fresh entry for `key`; expired entries are dropped on the way
    pub fn get(&mut self, key: &str, now: i64) -> Option<ResearchResponse> {
        let fresh = match self.entries.get(key) {
            Some(entry) => now - entry.timestamp < self.ttl_ms,
            None => return None,
        };
        if !fresh {
            debug!(%key, "ResponseCache::get: entry expired");
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.result.clone())
    }

    /// Store `result`, sweeping out every expired entry first
    pub fn insert(&mut self, key: String, result: ResearchResponse, now: i64) {
        debug!(%key, "ResponseCache::insert: called");
        let ttl_ms = self.ttl_ms;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.timestamp < ttl_ms);
        let swept = before - self.entries.len();
        if swept > 0 {
            debug!(swept, "ResponseCache::insert: dropped expired entries");
        }
        self.entries.insert(key, CacheEntry { result, timestamp: now });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
