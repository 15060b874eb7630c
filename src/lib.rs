//! # thumbkit
//!
//! Building blocks for thumbnail pipelines: deciding *whether* a thumbnail
//! needs regenerating, and inspecting the image it would be generated from.
//!
//! # Architecture
//!
//! ```text
//!                ┌──────────────┐   miss   ┌───────────┐
//! name, class ──►│ freshness    ├─────────►│ storage   │  modified_time
//!                │  resolver    │◄─────────┤ (trait)   │
//!                └──────┬───────┘          └───────────┘
//!                  get / set / delete_many
//!                ┌──────▼───────┐
//!                │ cache        │  memory (moka) or file (JSON manifest)
//!                │  (trait)     │
//!                └──────────────┘
//!
//! bytes ──► imaging ──► entropy, transparency, upright pixels
//! ```
//!
//! The freshness side and the imaging side share nothing but the error
//! conventions; a pipeline typically calls the resolver to decide what to
//! rebuild and the imaging helpers while rebuilding it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`freshness`] | Resolves modified times, caching them for remote storage; invalidation |
//! | [`cache`] | Cache backend trait, key scheme, in-memory and file backends |
//! | [`storage`] | Storage trait, filesystem implementation, storage identity hash |
//! | [`imaging`] | Histogram entropy, transparency detection, EXIF orientation |
//! | [`inspect`] | Parallel batch inspection of image files and directories |
//! | [`config`] | `thumbkit.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Three-State Freshness
//!
//! A lookup yields [`freshness::Freshness`]: `Fresh(ts)`, `Stale` (storage
//! failed, so rebuild) or `Unknown` (storage cannot tell, so the caller
//! decides). Callers match on it instead of comparing against magic numbers.
//! Degraded results are never written to the cache, so an outage does not
//! outlive itself.
//!
//! ## Locality Is Configuration
//!
//! Whether source or thumbnail storage is remote comes from
//! [`config::FreshnessConfig`], injected at construction. Storage objects
//! only answer `modified_time`; they never decide caching policy.
//!
//! ## Pattern Invalidation
//!
//! Thumbnails are named after their source, so one trailing-`*` pattern per
//! image class removes a source's entry and all of its thumbnails' entries in
//! a single `delete_many`. Both bundled backends implement the wildcard.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding uses the `image` crate and EXIF parsing uses `kamadak-exif`, both
//! pure Rust. PNG palette transparency is read from the chunk stream
//! directly, since decoders expand palettes on load.

pub mod cache;
pub mod config;
pub mod freshness;
pub mod imaging;
pub mod inspect;
pub mod output;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
