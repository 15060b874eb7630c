//! Cache services for modified-time lookups.
//!
//! The freshness resolver talks to a cache through the [`CacheBackend`]
//! trait, which models a generic key-value service with three operations:
//! `get`, `set` with a time-to-live, and `delete_many` over key patterns.
//!
//! ## Key patterns
//!
//! `delete_many` accepts exact keys and patterns ending in `*`, which match
//! every key starting with the text before the `*`. [`matches_pattern`] is
//! the shared implementation used by the bundled backends.
//!
//! ## Backends
//!
//! | Backend | Storage | Lifetime |
//! |---|---|---|
//! | [`MemoryCache`] | moka in-process cache, per-entry TTL | process |
//! | [`FileCache`] | versioned JSON manifest on disk | across runs |

mod file;
pub mod keys;
mod memory;

pub use file::FileCache;
pub use keys::{CacheKey, ImageClass, invalidation_patterns, make_cache_key};
pub use memory::MemoryCache;

use crate::storage::Timestamp;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// A key-value cache holding modified times.
///
/// Implementations must be shareable across threads; concurrent writers to
/// the same key are allowed and the last write wins.
pub trait CacheBackend: Send + Sync {
    /// Cached value for `key`, or `None` on a miss or expired entry.
    fn get(&self, key: &str) -> Result<Option<Timestamp>, CacheError>;

    /// Store `value` under `key`, replacing any previous value. The entry
    /// expires after `ttl`.
    fn set(&self, key: &str, value: Timestamp, ttl: Duration) -> Result<(), CacheError>;

    /// Remove every entry matching any of `patterns`.
    fn delete_many(&self, patterns: &[CacheKey]) -> Result<(), CacheError>;
}

impl<C: CacheBackend + ?Sized> CacheBackend for Box<C> {
    fn get(&self, key: &str) -> Result<Option<Timestamp>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Timestamp, ttl: Duration) -> Result<(), CacheError> {
        (**self).set(key, value, ttl)
    }

    fn delete_many(&self, patterns: &[CacheKey]) -> Result<(), CacheError> {
        (**self).delete_many(patterns)
    }
}

/// Whether `key` matches `pattern`.
///
/// A pattern ending in `*` matches keys that start with the rest of the
/// pattern; any other pattern must equal the key.
pub fn matches_pattern(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_matches_only_itself() {
        assert!(matches_pattern("easy:source:a.jpg", "easy:source:a.jpg"));
        assert!(!matches_pattern("easy:source:a.jpg", "easy:source:a.jpg.bak"));
    }

    #[test]
    fn wildcard_pattern_matches_prefix() {
        assert!(matches_pattern("easy:thumbnail:a.jpg*", "easy:thumbnail:a.jpg"));
        assert!(matches_pattern(
            "easy:thumbnail:a.jpg*",
            "easy:thumbnail:a.jpg.100x100_q85.jpg"
        ));
        assert!(!matches_pattern("easy:thumbnail:a.jpg*", "easy:source:a.jpg"));
    }

    #[test]
    fn bare_wildcard_matches_everything() {
        assert!(matches_pattern("*", "anything"));
        assert!(matches_pattern("*", ""));
    }
}
