//! Two-level bitmaps from a luminance threshold.
//!
//! The threshold is the image's mean luminance. Binarization runs at full
//! resolution and the binary image is resized afterwards with
//! nearest-neighbour sampling, so thin features are not averaged away first.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

use crate::quantize::CodeGrid;

/// Codes written for bright and dark pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Levels {
    pub on: u8,
    pub off: u8,
}

impl Default for Levels {
    fn default() -> Self {
        Self { on: 9, off: 0 }
    }
}

/// Mean luminance, or 0 for an empty image.
pub fn mean_luma(gray: &GrayImage) -> f64 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    sum as f64 / count as f64
}

/// Pixels strictly brighter than `threshold` become 255, the rest 0.
pub fn binarize(gray: &GrayImage, threshold: f64) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Luma([if v as f64 > threshold { 255 } else { 0 }])
    })
}

/// Threshold an image at its mean luminance, then resize to `width` x `height`.
pub fn threshold_bitmap(
    image: &DynamicImage,
    width: u32,
    height: u32,
    levels: Levels,
) -> CodeGrid {
    let gray = image.to_luma8();
    let threshold = mean_luma(&gray);
    tracing::debug!(threshold, "computed mean luminance");

    let binary = binarize(&gray, threshold);
    let resized = imageops::resize(&binary, width, height, FilterType::Nearest);
    let codes = resized.pixels().map(|p| if p[0] > 0 { levels.on } else { levels.off }).collect();

    CodeGrid { width, height, codes }
}
