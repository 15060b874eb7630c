//! Cache key construction.
//!
//! Keys have the form `easy:<class>:<name>`:
//!
//! ```text
//! easy:source:photos/dawn.jpg
//! easy:thumbnail:photos/dawn.jpg.400x500_q85.jpg
//! ```
//!
//! The `:` delimiter is not escaped. Names that themselves contain `:` still
//! produce deterministic keys, but such a name could collide with a name of a
//! different class; this is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed namespace token at the start of every key.
const KEY_NAMESPACE: &str = "easy";

const KEY_DELIMITER: &str = ":";

/// A fully built cache key or key pattern.
pub type CacheKey = String;

/// Which kind of stored image a lookup refers to.
///
/// Source images and generated thumbnails may live on different storages,
/// so each class has its own remote flag and its own key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageClass {
    Source,
    Thumbnail,
}

impl ImageClass {
    pub fn tag(self) -> &'static str {
        match self {
            ImageClass::Source => "source",
            ImageClass::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for ImageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Build the cache key for `(name, class)`.
pub fn make_cache_key(name: &str, class: ImageClass) -> CacheKey {
    [KEY_NAMESPACE, class.tag(), name].join(KEY_DELIMITER)
}

/// Key patterns covering every cache entry derived from `source_name`.
///
/// One wildcard pattern per image class, so both the source's own entry and
/// the entries of thumbnails named after it are matched. Returns no patterns
/// for an empty name.
pub fn invalidation_patterns(source_name: &str) -> Vec<CacheKey> {
    if source_name.is_empty() {
        return Vec::new();
    }
    let wildcard = format!("{}*", source_name);
    vec![
        make_cache_key(&wildcard, ImageClass::Source),
        make_cache_key(&wildcard, ImageClass::Thumbnail),
    ]
}
