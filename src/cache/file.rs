//! Persistent cache backed by a JSON manifest.
//!
//! The in-process [`MemoryCache`](super::MemoryCache) forgets everything when
//! the process exits. Command-line runs are short-lived, so the CLI uses this
//! backend instead: modified times looked up from remote storage in one run
//! are reused by the next until their TTL runs out.
//!
//! # Storage
//!
//! The manifest is a JSON file at `<dir>/.thumbkit-cache.json`:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "easy:source:photos/dawn.jpg": {
//!       "value": "2024-05-01T10:00:00Z",
//!       "expires_at": "2024-05-01T11:00:00Z"
//!     }
//!   }
//! }
//! ```
//!
//! Every mutation rewrites the file and only takes effect once the write
//! succeeds. Expired entries read as misses and are dropped the next time the
//! manifest is written.
//!
//! # Robustness
//!
//! A missing, unparsable, or version-mismatched manifest loads as an empty
//! cache rather than an error: losing cached modified times only costs extra
//! storage round-trips.

use super::{CacheBackend, CacheError, CacheKey, matches_pattern};
use crate::storage::Timestamp;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Name of the cache manifest file within the cache directory.
const MANIFEST_FILENAME: &str = ".thumbkit-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached modified time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: Timestamp,
    pub expires_at: Timestamp,
}

impl CacheEntry {
    fn is_live(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// On-disk manifest mapping cache keys to entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CacheManifest {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

impl CacheManifest {
    fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    fn save(&mut self, path: &Path) -> Result<(), CacheError> {
        let now = Utc::now();
        self.entries.retain(|_, entry| entry.is_live(now));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Cache that survives process restarts.
pub struct FileCache {
    path: PathBuf,
    manifest: Mutex<CacheManifest>,
}

impl FileCache {
    /// Open the cache stored in `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(dir)?;
        let path = manifest_path(dir);
        let manifest = CacheManifest::load(&path);
        Ok(Self {
            path,
            manifest: Mutex::new(manifest),
        })
    }

    /// Number of live entries.
    pub fn len(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .entries
            .values()
            .filter(|e| e.is_live(now))
            .count())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Write `next` to disk, then make it the live manifest. A failed write
    /// leaves the live manifest untouched, so memory and disk never diverge.
    fn commit(
        &self,
        manifest: &mut MutexGuard<'_, CacheManifest>,
        mut next: CacheManifest,
    ) -> Result<(), CacheError> {
        next.save(&self.path)?;
        **manifest = next;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheManifest>, CacheError> {
        self.manifest
            .lock()
            .map_err(|_| CacheError::Backend("cache manifest lock poisoned".into()))
    }
}

impl CacheBackend for FileCache {
    fn get(&self, key: &str) -> Result<Option<Timestamp>, CacheError> {
        let now = Utc::now();
        let manifest = self.lock()?;
        Ok(manifest
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value))
    }

    fn set(&self, key: &str, value: Timestamp, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| CacheError::Backend(format!("TTL out of range: {:?}", ttl)))?;
        let mut manifest = self.lock()?;
        let mut next = manifest.clone();
        next.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        self.commit(&mut manifest, next)
    }

    fn delete_many(&self, patterns: &[CacheKey]) -> Result<(), CacheError> {
        let mut manifest = self.lock()?;
        let mut next = manifest.clone();
        next.entries
            .retain(|key, _| !patterns.iter().any(|p| matches_pattern(p, key)));
        tracing::debug!(
            removed = manifest.entries.len() - next.entries.len(),
            "deleted cache entries"
        );
        self.commit(&mut manifest, next)
    }
}

/// Resolve the cache manifest path for a cache directory.
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILENAME)
}
