//! Batch image inspection for the `inspect` command.
//!
//! Walks the given files and directories, then reports entropy, colour mode,
//! transparency and EXIF orientation for every supported image. Images are
//! inspected in parallel using [rayon](https://docs.rs/rayon); results come
//! back in input order.

use crate::imaging::{
    ColorMode, ImagingError, Orientation, describe_bytes, image_entropy,
    is_transparent, read_orientation,
};
use image::GenericImageView;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions whose decoders are compiled in.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// What `inspect` reports for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub path: PathBuf,
    /// Upright dimensions, after applying EXIF orientation.
    pub width: u32,
    pub height: u32,
    pub mode: ColorMode,
    pub transparent: bool,
    pub entropy: f64,
    pub orientation: Option<Orientation>,
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Expand `inputs` into a sorted list of image files. Directories are walked
/// recursively; files are kept as given, whatever their extension.
pub fn collect_images(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(e) => Some(e),
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping unreadable entry");
                        None
                    }
                })
                .filter(|e| e.file_type().is_file() && is_supported_image(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

pub fn inspect_file(path: &Path) -> Result<ImageReport, ImagingError> {
    let bytes = std::fs::read(path)?;
    let descriptor = describe_bytes(&bytes)?;
    let orientation = read_orientation(&bytes);
    // Entropy does not depend on pixel order, so only the size is reoriented.
    let image = image::load_from_memory(&bytes)?;
    let (width, height) = match orientation {
        Some(o) if o.swaps_dimensions() => (image.height(), image.width()),
        _ => image.dimensions(),
    };

    Ok(ImageReport {
        path: path.to_path_buf(),
        width,
        height,
        mode: descriptor.mode,
        transparent: is_transparent(&descriptor),
        entropy: image_entropy(&image),
        orientation,
    })
}

/// Inspect every file in parallel. One failure does not stop the others.
pub fn inspect_all(files: &[PathBuf]) -> Vec<(PathBuf, Result<ImageReport, ImagingError>)> {
    files
        .par_iter()
        .map(|path| (path.clone(), inspect_file(path)))
        .collect()
}
