//! Modified-time resolution with caching for remote storage.
//!
//! Thumbnail pipelines decide whether to regenerate a thumbnail by comparing
//! the modified times of the source image and the existing thumbnail. On
//! local disks that lookup is a cheap `stat`; on remote storage (object
//! stores, network shares) it is a round-trip per image. The
//! [`FreshnessResolver`] hides that difference:
//!
//! ```text
//!            ┌──────────── not remote ────────────┐
//! resolve ───┤                                    ├──► storage.modified_time
//!            └─ remote ─► cache.get ─ miss ─► storage.modified_time ─► cache.set
//!                                    └─ hit ─► cached value
//! ```
//!
//! Whether a class of image is remote comes from [`FreshnessConfig`], never
//! from the storage object itself.
//!
//! # Outcomes
//!
//! A lookup resolves to one of three [`Freshness`] states instead of an
//! overloaded number:
//!
//! - `Fresh(ts)`: a real modified time, from storage or cache.
//! - `Stale`: storage was unavailable or missing a capability. Treat the
//!   image as changed and rebuild.
//! - `Unknown`: storage does not track modified times, or a cache-only peek
//!   found nothing. The caller picks the policy, usually "assume unchanged".
//!
//! Only storage failures are absorbed. Cache failures and
//! [`StorageError::Other`] propagate as [`FreshnessError`].
//!
//! # Invalidation
//!
//! When a source image changes, [`invalidate`] removes its cache entry and the
//! entries of every thumbnail whose name starts with the source name, using
//! one wildcard pattern per image class.
//!
//! # Concurrency
//!
//! No locking or request coalescing: concurrent misses for one key each query
//! storage and each write the cache, last write wins. An invalidation racing a
//! write can leave a stale entry behind until its TTL expires.

use crate::cache::{CacheBackend, CacheError, ImageClass, invalidation_patterns, make_cache_key};
use crate::config::FreshnessConfig;
use crate::storage::{Storage, StorageError, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FreshnessError {
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("storage error: {0}")]
    Storage(StorageError),
}

/// Best-known modification state of a stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "modified", rename_all = "lowercase")]
pub enum Freshness {
    Fresh(Timestamp),
    Stale,
    Unknown,
}

impl Freshness {
    pub fn modified(self) -> Option<Timestamp> {
        match self {
            Freshness::Fresh(ts) => Some(ts),
            Freshness::Stale | Freshness::Unknown => None,
        }
    }

    /// Legacy single-value form: seconds since the epoch for `Fresh`, `0`
    /// for `Stale`, `None` for `Unknown`.
    pub fn as_legacy_seconds(self) -> Option<i64> {
        match self {
            Freshness::Fresh(ts) => Some(ts.timestamp()),
            Freshness::Stale => Some(0),
            Freshness::Unknown => None,
        }
    }

    /// Whether an artifact built at `built` is out of date relative to a
    /// source in this state. `Stale` always needs a rebuild; `Unknown` never
    /// forces one.
    pub fn needs_rebuild(self, built: Freshness) -> bool {
        match (self, built) {
            (Freshness::Stale, _) | (_, Freshness::Stale) => true,
            (Freshness::Fresh(source), Freshness::Fresh(built)) => source > built,
            (Freshness::Unknown, _) | (_, Freshness::Unknown) => false,
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Fresh(ts) => write!(f, "{}", ts.to_rfc3339()),
            Freshness::Stale => f.write_str("stale"),
            Freshness::Unknown => f.write_str("unknown"),
        }
    }
}

/// Resolves modified times, consulting the cache for remote storage.
pub struct FreshnessResolver<C> {
    config: FreshnessConfig,
    cache: C,
}

impl<C: CacheBackend> FreshnessResolver<C> {
    pub fn new(config: FreshnessConfig, cache: C) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &FreshnessConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Resolve the modified time of `name` on `storage`.
    ///
    /// With `force_cache_result` set and remote storage, only the cache is
    /// consulted: a miss yields [`Freshness::Unknown`] and storage is never
    /// queried. The flag has no effect on local storage.
    pub fn resolve_modified_time(
        &self,
        storage: &dyn Storage,
        name: &str,
        class: ImageClass,
        force_cache_result: bool,
    ) -> Result<Freshness, FreshnessError> {
        resolve_modified_time(
            &self.config,
            &self.cache,
            storage,
            name,
            class,
            force_cache_result,
        )
    }

    /// Drop every cache entry derived from `source_name`.
    pub fn invalidate(&self, source_name: &str) -> Result<(), FreshnessError> {
        invalidate(&self.cache, source_name)
    }
}

/// Resolve a modified time without building a [`FreshnessResolver`].
pub fn resolve_modified_time(
    config: &FreshnessConfig,
    cache: &dyn CacheBackend,
    storage: &dyn Storage,
    name: &str,
    class: ImageClass,
    force_cache_result: bool,
) -> Result<Freshness, FreshnessError> {
    if !config.is_remote(class) {
        return query_storage(storage, name);
    }

    let key = make_cache_key(name, class);
    let cached = cache.get(&key)?;

    if force_cache_result {
        tracing::debug!(%key, hit = cached.is_some(), "cache-only lookup");
        return Ok(cached.map_or(Freshness::Unknown, Freshness::Fresh));
    }

    if let Some(ts) = cached {
        tracing::debug!(%key, "cache hit");
        return Ok(Freshness::Fresh(ts));
    }

    tracing::debug!(%key, "cache miss, querying storage");
    let resolved = query_storage(storage, name)?;
    if let Freshness::Fresh(ts) = resolved {
        cache.set(&key, ts, config.cache_ttl())?;
    }
    Ok(resolved)
}

/// Ask storage directly, folding degraded failures into [`Freshness`].
fn query_storage(storage: &dyn Storage, name: &str) -> Result<Freshness, FreshnessError> {
    match storage.modified_time(name) {
        Ok(ts) => Ok(Freshness::Fresh(ts)),
        Err(StorageError::NotSupported) => {
            tracing::debug!(storage = storage.identifier(), name, "modified time not supported");
            Ok(Freshness::Unknown)
        }
        Err(e) if e.is_degraded() => {
            tracing::debug!(storage = storage.identifier(), name, error = %e, "treating as stale");
            Ok(Freshness::Stale)
        }
        Err(e) => Err(FreshnessError::Storage(e)),
    }
}

/// Remove the cache entries of `source_name` and of every thumbnail named
/// after it. Does nothing for an empty name.
pub fn invalidate(cache: &dyn CacheBackend, source_name: &str) -> Result<(), FreshnessError> {
    let patterns = invalidation_patterns(source_name);
    if patterns.is_empty() {
        return Ok(());
    }
    tracing::debug!(source = source_name, ?patterns, "invalidating cached modified times");
    cache.delete_many(&patterns)?;
    Ok(())
}
