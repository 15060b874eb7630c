//! Histogram entropy, used by smart cropping to find busy regions.

use image::{ColorType, DynamicImage};

const BINS_PER_CHANNEL: usize = 256;

/// Intensity histogram of `image`: one 256-bin block per channel, in channel
/// order (L; L,A; R,G,B; R,G,B,A). Deeper images are reduced to 8 bits.
pub fn histogram(image: &DynamicImage) -> Vec<u64> {
    let (channels, samples) = match image.color() {
        ColorType::L8 | ColorType::L16 => (1, image.to_luma8().into_raw()),
        ColorType::La8 | ColorType::La16 => (2, image.to_luma_alpha8().into_raw()),
        color if color.has_alpha() => (4, image.to_rgba8().into_raw()),
        _ => (3, image.to_rgb8().into_raw()),
    };

    let mut bins = vec![0u64; channels * BINS_PER_CHANNEL];
    for (i, &value) in samples.iter().enumerate() {
        bins[(i % channels) * BINS_PER_CHANNEL + value as usize] += 1;
    }
    bins
}

/// Shannon entropy, in bits, of a histogram normalised to a probability
/// distribution. Empty bins are skipped; an empty or all-zero histogram has
/// zero entropy.
pub fn histogram_entropy(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    -counts
        .iter()
        .filter(|&&c| c != 0)
        .map(|&c| {
            let p = c as f64 / total;
            p * p.log2()
        })
        .sum::<f64>()
}

pub fn image_entropy(image: &DynamicImage) -> f64 {
    histogram_entropy(&histogram(image))
}

/// Entropy of an encoded image, or `0.0` if it cannot be decoded.
pub fn entropy_of_bytes(bytes: &[u8]) -> f64 {
    match image::load_from_memory(bytes) {
        Ok(image) => image_entropy(&image),
        Err(e) => {
            tracing::debug!(error = %e, "undecodable image, entropy 0");
            0.0
        }
    }
}
