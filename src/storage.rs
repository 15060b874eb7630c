//! Storage backends that report when an image was last modified.
//!
//! The [`Storage`] trait is the only thing the freshness resolver needs from
//! a storage system. Backends report failures through [`StorageError`], whose
//! first three variants are the "degraded" outcomes the resolver absorbs:
//!
//! | Variant | Meaning | Resolver outcome |
//! |---|---|---|
//! | `IoUnavailable` | the file or the backend could not be reached | `Freshness::Stale` |
//! | `CapabilityMissing` | the backend is missing something it needs to answer | `Freshness::Stale` |
//! | `NotSupported` | the backend has no notion of modified time | `Freshness::Unknown` |
//! | `Other` | anything else | propagated to the caller |
//!
//! [`FileSystemStorage`] is the local implementation. Remote backends (S3,
//! GCS, ...) live outside this crate and implement the same trait.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// A point in time reported by a storage backend.
pub type Timestamp = DateTime<Utc>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    IoUnavailable(#[from] io::Error),
    #[error("storage capability missing: {0}")]
    CapabilityMissing(String),
    #[error("operation not supported by this storage")]
    NotSupported,
    #[error("storage error: {0}")]
    Other(String),
}

impl StorageError {
    /// Whether the resolver turns this error into a value instead of
    /// propagating it.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, StorageError::Other(_))
    }
}

/// A storage system holding source images or generated thumbnails.
pub trait Storage: Sync {
    /// Stable identifier for this storage, e.g. `"filesystem:/srv/media"`.
    fn identifier(&self) -> &str;

    /// Last-modified time of the stored file `name`.
    ///
    /// Storages that cannot report modified times keep the default, which
    /// returns [`StorageError::NotSupported`].
    fn modified_time(&self, _name: &str) -> Result<Timestamp, StorageError> {
        Err(StorageError::NotSupported)
    }
}

/// Hex SHA-256 of a storage's identifier.
///
/// Two handles to the same storage always hash the same, so the hash can be
/// used to namespace records per storage.
pub fn storage_hash(storage: &dyn Storage) -> String {
    let digest = Sha256::digest(storage.identifier().as_bytes());
    format!("{:x}", digest)
}

/// Storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
    identifier: String,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let identifier = format!("filesystem:{}", root.display());
        Self { root, identifier }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `name` below the root, refusing names that would escape it.
    pub fn path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(name);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(StorageError::Other(format!(
                "name escapes storage root: {}",
                name
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for FileSystemStorage {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn modified_time(&self, name: &str) -> Result<Timestamp, StorageError> {
        let path = self.path(name)?;
        let metadata = std::fs::metadata(&path)?;
        match metadata.modified() {
            Ok(modified) => Ok(DateTime::<Utc>::from(modified)),
            Err(e) if e.kind() == io::ErrorKind::Unsupported => Err(StorageError::NotSupported),
            Err(e) => Err(StorageError::IoUnavailable(e)),
        }
    }
}
