//! Pixel-level image introspection.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Entropy** | per-channel histogram + Shannon entropy |
//! | **Transparency** | colour mode, or PNG `IHDR`/`tRNS` probe for palette images |
//! | **EXIF orientation** | `kamadak-exif` reader + `image` flips/rotations |
//!
//! Everything here is stateless. Functions that take raw bytes degrade
//! instead of failing where a thumbnail pipeline would rather carry on:
//! undecodable input has zero entropy, unreadable EXIF means "no rotation".

mod entropy;
mod orientation;
mod transparency;

pub use entropy::{entropy_of_bytes, histogram, histogram_entropy, image_entropy};
pub use orientation::{
    Orientation, apply_orientation, exif_orientation, load_oriented, read_orientation,
};
pub use transparency::{
    ColorMode, ImageDescriptor, describe_bytes, is_image_transparent, is_transparent, probe_png,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Invalid PNG: {0}")]
    InvalidPng(String),
    #[error("Unknown colour mode: {0}")]
    UnknownMode(String),
}
