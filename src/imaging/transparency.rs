//! Transparency detection.
//!
//! An image counts as transparent when its colour mode carries alpha (`RGBA`,
//! `LA`), or when it is palette-indexed (`P`) and declares a transparency
//! entry. Decoders usually expand palettes to RGB(A) on load, so palette
//! images are best classified from the file header: [`probe_png`] reads the
//! PNG `IHDR` colour type and looks for a `tRNS` chunk without decoding any
//! pixels.

use super::ImagingError;
use image::{ColorType, DynamicImage};
use std::fmt;
use std::str::FromStr;

/// Pixel layout of an image, named after the conventional mode strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// `"1"`, one bit per pixel.
    Bilevel,
    L,
    La,
    /// Palette-indexed.
    P,
    Rgb,
    Rgba,
    Cmyk,
    /// 32-bit signed integer samples.
    I,
    /// 32-bit float samples.
    F,
}

impl ColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Bilevel => "1",
            ColorMode::L => "L",
            ColorMode::La => "LA",
            ColorMode::P => "P",
            ColorMode::Rgb => "RGB",
            ColorMode::Rgba => "RGBA",
            ColorMode::Cmyk => "CMYK",
            ColorMode::I => "I",
            ColorMode::F => "F",
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorMode::La | ColorMode::Rgba)
    }
}

impl FromStr for ColorMode {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "1" => ColorMode::Bilevel,
            "L" => ColorMode::L,
            "LA" => ColorMode::La,
            "P" => ColorMode::P,
            "RGB" => ColorMode::Rgb,
            "RGBA" => ColorMode::Rgba,
            "CMYK" => ColorMode::Cmyk,
            "I" => ColorMode::I,
            "F" => ColorMode::F,
            other => return Err(ImagingError::UnknownMode(other.to_string())),
        })
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What transparency detection needs to know about an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub mode: ColorMode,
    /// A transparency entry (e.g. a PNG `tRNS` chunk) is present.
    pub has_transparency_entry: bool,
}

impl ImageDescriptor {
    pub fn new(mode: ColorMode, has_transparency_entry: bool) -> Self {
        Self {
            mode,
            has_transparency_entry,
        }
    }

    /// Describe an already-decoded image. Decoded images never report a
    /// palette mode.
    pub fn from_image(image: &DynamicImage) -> Self {
        let mode = match image.color() {
            ColorType::L8 | ColorType::L16 => ColorMode::L,
            ColorType::La8 | ColorType::La16 => ColorMode::La,
            color if color.has_alpha() => ColorMode::Rgba,
            _ => ColorMode::Rgb,
        };
        Self::new(mode, false)
    }
}

pub fn is_transparent(descriptor: &ImageDescriptor) -> bool {
    descriptor.mode.has_alpha()
        || (descriptor.mode == ColorMode::P && descriptor.has_transparency_entry)
}

pub fn is_image_transparent(image: &DynamicImage) -> bool {
    is_transparent(&ImageDescriptor::from_image(image))
}

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Read the colour mode and transparency entry of a PNG from its chunks.
///
/// Chunk layout: length (u32 BE), type (4 bytes), data, CRC (4 bytes).
/// `IHDR` must come first; `tRNS`, when present, precedes the first `IDAT`,
/// so scanning stops there.
pub fn probe_png(bytes: &[u8]) -> Result<ImageDescriptor, ImagingError> {
    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err(ImagingError::InvalidPng("missing signature".into()));
    }

    let mut pos = PNG_SIGNATURE.len();
    let mut mode = None;
    let mut has_trns = false;

    while pos + 8 <= bytes.len() {
        let length =
            u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
                as usize;
        let chunk_type = &bytes[pos + 4..pos + 8];
        let data_start = pos + 8;
        let data_end = data_start + length;
        if data_end + 4 > bytes.len() {
            return Err(ImagingError::InvalidPng("truncated chunk".into()));
        }

        match chunk_type {
            b"IHDR" => {
                if length < 13 {
                    return Err(ImagingError::InvalidPng("short IHDR".into()));
                }
                let bit_depth = bytes[data_start + 8];
                let color_type = bytes[data_start + 9];
                mode = Some(png_mode(color_type, bit_depth)?);
            }
            b"tRNS" => has_trns = true,
            b"IDAT" | b"IEND" => break,
            _ => {}
        }
        if mode.is_none() {
            return Err(ImagingError::InvalidPng("IHDR is not the first chunk".into()));
        }

        pos = data_end + 4;
    }

    let mode = mode.ok_or_else(|| ImagingError::InvalidPng("missing IHDR".into()))?;
    Ok(ImageDescriptor::new(mode, has_trns))
}

fn png_mode(color_type: u8, bit_depth: u8) -> Result<ColorMode, ImagingError> {
    match color_type {
        0 if bit_depth == 1 => Ok(ColorMode::Bilevel),
        0 => Ok(ColorMode::L),
        2 => Ok(ColorMode::Rgb),
        3 => Ok(ColorMode::P),
        4 => Ok(ColorMode::La),
        6 => Ok(ColorMode::Rgba),
        other => Err(ImagingError::InvalidPng(format!(
            "unknown colour type {}",
            other
        ))),
    }
}

/// Describe an encoded image: PNGs are probed from their header, anything
/// else is decoded.
pub fn describe_bytes(bytes: &[u8]) -> Result<ImageDescriptor, ImagingError> {
    if bytes.starts_with(PNG_SIGNATURE) {
        return probe_png(bytes);
    }
    let image = image::load_from_memory(bytes)?;
    Ok(ImageDescriptor::from_image(&image))
}
