//! Shared test utilities for the thumbkit test suite.
//!
//! Provides recording doubles for the storage and cache collaborators, and
//! builders for small encoded images with hand-made metadata.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let cache = RecordingCache::new();
//! let storage = ScriptedStorage::returning(ts(100));
//! // ... resolve ...
//! assert_eq!(storage.query_count(), 1);
//! assert_eq!(cache.set_count(), 1);
//! ```

use crate::cache::{CacheBackend, CacheError, CacheKey, matches_pattern};
use crate::storage::{Storage, StorageError, Timestamp};
use chrono::{TimeZone, Utc};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Timestamp `secs` seconds after the epoch.
pub fn ts(secs: i64) -> Timestamp {
    Utc.timestamp_opt(secs, 0).unwrap()
}

// =========================================================================
// Storage double
// =========================================================================

#[derive(Debug, Clone)]
enum Script {
    Return(Timestamp),
    IoUnavailable,
    CapabilityMissing,
    NotSupported,
    Other(String),
}

/// Storage that answers every lookup the same way and counts queries.
pub struct ScriptedStorage {
    script: Script,
    queries: AtomicUsize,
}

impl ScriptedStorage {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn returning(value: Timestamp) -> Self {
        Self::with_script(Script::Return(value))
    }

    pub fn io_unavailable() -> Self {
        Self::with_script(Script::IoUnavailable)
    }

    pub fn capability_missing() -> Self {
        Self::with_script(Script::CapabilityMissing)
    }

    pub fn not_supported() -> Self {
        Self::with_script(Script::NotSupported)
    }

    pub fn other(message: &str) -> Self {
        Self::with_script(Script::Other(message.to_string()))
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Storage for ScriptedStorage {
    fn identifier(&self) -> &str {
        "scripted"
    }

    fn modified_time(&self, _name: &str) -> Result<Timestamp, StorageError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Return(ts) => Ok(*ts),
            Script::IoUnavailable => Err(StorageError::IoUnavailable(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such object",
            ))),
            Script::CapabilityMissing => {
                Err(StorageError::CapabilityMissing("no stat support".into()))
            }
            Script::NotSupported => Err(StorageError::NotSupported),
            Script::Other(msg) => Err(StorageError::Other(msg.clone())),
        }
    }
}

// =========================================================================
// Cache double
// =========================================================================

/// A call made against [`RecordingCache`].
#[derive(Debug, Clone, PartialEq)]
pub enum CacheCall {
    Get(String),
    Set {
        key: String,
        value: Timestamp,
        ttl_secs: u64,
    },
    DeleteMany(Vec<CacheKey>),
}

/// In-memory cache that records every call. Uses Mutex (not RefCell) so it
/// satisfies the `Send + Sync` bound on [`CacheBackend`].
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, Timestamp>>,
    calls: Mutex<Vec<CacheCall>>,
    failing: bool,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: Timestamp) -> Self {
        let cache = Self::new();
        cache
            .entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value);
        cache
    }

    /// A cache whose every operation fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CacheCall::Set { .. }))
            .count()
    }

    fn record(&self, call: CacheCall) -> Result<(), CacheError> {
        self.calls.lock().unwrap().push(call);
        if self.failing {
            return Err(CacheError::Backend("cache offline".into()));
        }
        Ok(())
    }
}

impl CacheBackend for RecordingCache {
    fn get(&self, key: &str) -> Result<Option<Timestamp>, CacheError> {
        self.record(CacheCall::Get(key.to_string()))?;
        Ok(self.entries.lock().unwrap().get(key).copied())
    }

    fn set(&self, key: &str, value: Timestamp, ttl: Duration) -> Result<(), CacheError> {
        self.record(CacheCall::Set {
            key: key.to_string(),
            value,
            ttl_secs: ttl.as_secs(),
        })?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn delete_many(&self, patterns: &[CacheKey]) -> Result<(), CacheError> {
        self.record(CacheCall::DeleteMany(patterns.to_vec()))?;
        self.entries
            .lock()
            .unwrap()
            .retain(|key, _| !patterns.iter().any(|p| matches_pattern(p, key)));
        Ok(())
    }
}

// =========================================================================
// Image fixtures
// =========================================================================

/// 3x2 RGB image with a distinct colour in each corner:
/// red top-left, green top-right, blue bottom-left, yellow bottom-right.
pub fn labelled_rgb() -> DynamicImage {
    let mut img = RgbImage::from_pixel(3, 2, Rgb([128, 128, 128]));
    img.put_pixel(0, 0, Rgb([255, 0, 0]));
    img.put_pixel(2, 0, Rgb([0, 255, 0]));
    img.put_pixel(0, 1, Rgb([0, 0, 255]));
    img.put_pixel(2, 1, Rgb([255, 255, 0]));
    DynamicImage::ImageRgb8(img)
}

/// RGB image whose channels vary with position.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 8 % 256) as u8,
            (y * 8 % 256) as u8,
            ((x + y) * 4 % 256) as u8,
        ])
    })
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    encode(image, ImageFormat::Png)
}

pub fn encode_jpeg(image: &DynamicImage) -> Vec<u8> {
    encode(image, ImageFormat::Jpeg)
}

/// Minimal little-endian TIFF holding a single Orientation (0x0112) entry.
pub fn exif_tiff(orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes()); // IFD0 offset
    tiff.extend_from_slice(&1u16.to_le_bytes()); // entry count
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
    tiff
}

/// Insert an APP1 EXIF segment carrying `orientation` right after SOI.
pub fn jpeg_with_exif(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend(exif_tiff(orientation));
    let segment_len = (payload.len() + 2) as u16;

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend(payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// PNG header plus `extra` chunks and IEND, with a 1x1 IHDR. No pixel data;
/// CRCs are zeroed since the probe does not check them.
pub fn png_with_chunks(color_type: u8, bit_depth: u8, extra: &[(&str, &[u8])]) -> Vec<u8> {
    fn chunk(out: &mut Vec<u8>, kind: &[u8], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        out.extend_from_slice(&[0, 0, 0, 0]);
    }

    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&1u32.to_be_bytes());
    ihdr.extend_from_slice(&[bit_depth, color_type, 0, 0, 0]);
    chunk(&mut out, b"IHDR", &ihdr);
    for (kind, data) in extra {
        chunk(&mut out, kind.as_bytes(), data);
    }
    chunk(&mut out, b"IEND", &[]);
    out
}
