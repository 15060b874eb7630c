//! EXIF orientation correction.
//!
//! Cameras store pixels in sensor order and record how to display them in
//! EXIF tag `0x0112`. Thumbnails must be generated from upright pixels, so
//! the tag is applied before any resizing.
//!
//! | Tag | Transform |
//! |---|---|
//! | 1 | none |
//! | 2 | flip horizontal |
//! | 3 | rotate 180° |
//! | 4 | flip vertical |
//! | 5 | rotate 90° clockwise, then flip horizontal (transpose) |
//! | 6 | rotate 90° clockwise |
//! | 7 | rotate 90° counter-clockwise, then flip horizontal (transverse) |
//! | 8 | rotate 90° counter-clockwise |

use super::ImagingError;
use image::DynamicImage;
use std::io::Cursor;

/// EXIF orientation tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    Rotate90Cw = 6,
    Transverse = 7,
    Rotate90Ccw = 8,
}

impl Orientation {
    /// Map a raw tag value; values outside 1–8 are ignored.
    pub fn from_exif(value: u32) -> Option<Self> {
        match value {
            1 => Some(Orientation::Normal),
            2 => Some(Orientation::FlipHorizontal),
            3 => Some(Orientation::Rotate180),
            4 => Some(Orientation::FlipVertical),
            5 => Some(Orientation::Transpose),
            6 => Some(Orientation::Rotate90Cw),
            7 => Some(Orientation::Transverse),
            8 => Some(Orientation::Rotate90Ccw),
            _ => None,
        }
    }

    pub fn exif_value(self) -> u32 {
        self as u32
    }

    /// Whether applying this orientation swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90Cw
                | Orientation::Transverse
                | Orientation::Rotate90Ccw
        )
    }
}

/// Orientation recorded in the EXIF data of an encoded image.
///
/// Returns `None` when there is no EXIF block, no orientation tag, an
/// out-of-range value, or the metadata cannot be parsed.
pub fn read_orientation(bytes: &[u8]) -> Option<Orientation> {
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::trace!(error = %e, "no readable EXIF data");
            return None;
        }
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .and_then(Orientation::from_exif)
}

/// Rotate and/or flip `image` so it displays upright.
pub fn apply_orientation(image: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => image,
        Orientation::FlipHorizontal => image.fliph(),
        Orientation::Rotate180 => image.rotate180(),
        Orientation::FlipVertical => image.flipv(),
        Orientation::Transpose => image.rotate90().fliph(),
        Orientation::Rotate90Cw => image.rotate90(),
        Orientation::Transverse => image.rotate270().fliph(),
        Orientation::Rotate90Ccw => image.rotate270(),
    }
}

/// Apply the orientation recorded in `encoded` (the file `image` was decoded
/// from). Missing or unreadable metadata leaves the image untouched.
pub fn exif_orientation(image: DynamicImage, encoded: &[u8]) -> DynamicImage {
    match read_orientation(encoded) {
        Some(orientation) => apply_orientation(image, orientation),
        None => image,
    }
}

/// Decode `bytes` and return the upright image.
pub fn load_oriented(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    let image = image::load_from_memory(bytes)?;
    Ok(exif_orientation(image, bytes))
}
