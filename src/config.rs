//! Configuration module.
//!
//! Handles loading, validating, and merging `thumbkit.toml`. User files are
//! sparse: each key overrides the stock default of the same name and
//! everything else keeps its default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! source_is_remote = false     # Cache modified times of source images
//! thumbnail_is_remote = false  # Cache modified times of thumbnails
//!
//! [cache]
//! ttl_seconds = 3600           # Lifetime of a cached modified time
//! backend = "file"             # "file" (persists across runs) or "memory"
//! dir = ".thumbkit-cache"      # Directory for the file backend
//!
//! [processing]
//! max_processes = 4            # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The freshness resolver never reads this file itself. Callers build a
//! [`FreshnessConfig`] from the loaded [`ThumbkitConfig`] (or by hand) and
//! pass it in.

use crate::cache::ImageClass;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings the freshness resolver needs, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessConfig {
    pub source_storage_is_remote: bool,
    pub thumbnail_storage_is_remote: bool,
    pub cache_ttl_seconds: u64,
}

impl FreshnessConfig {
    /// Whether lookups for `class` go through the cache.
    pub fn is_remote(&self, class: ImageClass) -> bool {
        match class {
            ImageClass::Source => self.source_storage_is_remote,
            ImageClass::Thumbnail => self.thumbnail_storage_is_remote,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            source_storage_is_remote: false,
            thumbnail_storage_is_remote: false,
            cache_ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Upper bound on `cache.ttl_seconds` (ten years).
pub const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 3600;

/// Configuration loaded from `thumbkit.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbkitConfig {
    /// Which storages are remote.
    pub storage: StorageConfig,
    /// Modified-time cache settings.
    pub cache: CacheConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ThumbkitConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::Validation(
                "cache.ttl_seconds must be greater than 0".into(),
            ));
        }
        if self.cache.ttl_seconds > MAX_TTL_SECONDS {
            return Err(ConfigError::Validation(format!(
                "cache.ttl_seconds must be at most {}",
                MAX_TTL_SECONDS
            )));
        }
        if self.cache.backend == CacheBackendKind::File && self.cache.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cache.dir must not be empty for the file backend".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn freshness(&self) -> FreshnessConfig {
        FreshnessConfig {
            source_storage_is_remote: self.storage.source_is_remote,
            thumbnail_storage_is_remote: self.storage.thumbnail_is_remote,
            cache_ttl_seconds: self.cache.ttl_seconds,
        }
    }
}

/// Storage locality flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub source_is_remote: bool,
    pub thumbnail_is_remote: bool,
}

/// Which cache backend the CLI uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    #[default]
    File,
}

/// Modified-time cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Seconds a cached modified time stays valid.
    pub ttl_seconds: u64,
    pub backend: CacheBackendKind,
    /// Directory holding the file backend's manifest.
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            backend: CacheBackendKind::default(),
            dir: ".thumbkit-cache".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ThumbkitConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {}", e)))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ThumbkitConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ThumbkitConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file is
/// missing.
pub fn load_config(path: &Path) -> Result<ThumbkitConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `thumbkit.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# thumbkit configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Modified-time lookups on remote storage are slow, so they are cached.
# These flags say which storages count as remote.
source_is_remote = false
thumbnail_is_remote = false

# ---------------------------------------------------------------------------
# Modified-time cache
# ---------------------------------------------------------------------------
[cache]
# Seconds a cached modified time stays valid (1 to 315360000).
ttl_seconds = 3600

# "file" keeps cached values between runs, "memory" forgets them on exit.
backend = "file"

# Directory for the file backend.
dir = ".thumbkit-cache"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `inspect`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
