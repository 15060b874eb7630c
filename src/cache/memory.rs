//! In-process cache backed by moka.
//!
//! Each entry carries its own TTL (moka `Expiry`), so callers can mix
//! lifetimes in one cache. Wildcard deletes use moka invalidation closures;
//! exact keys are invalidated directly.

use super::{CacheBackend, CacheError, CacheKey};
use crate::storage::Timestamp;
use moka::Expiry;
use moka::sync::Cache;
use std::time::{Duration, Instant};

const DEFAULT_CAPACITY: u64 = 100_000;

#[derive(Debug, Clone)]
struct Entry {
    value: Timestamp,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded in-memory cache. Cheap to clone; clones share entries.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .support_invalidation_closures()
            .build();
        Self { inner }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Timestamp>, CacheError> {
        Ok(self.inner.get(key).map(|entry| entry.value))
    }

    fn set(&self, key: &str, value: Timestamp, ttl: Duration) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), Entry { value, ttl });
        Ok(())
    }

    fn delete_many(&self, patterns: &[CacheKey]) -> Result<(), CacheError> {
        let mut prefixes = Vec::new();
        for pattern in patterns {
            match pattern.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => self.inner.invalidate(pattern.as_str()),
            }
        }
        if !prefixes.is_empty() {
            self.inner
                .invalidate_entries_if(move |key, _| prefixes.iter().any(|p| key.starts_with(p.as_str())))
                .map_err(|e| CacheError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}
