//! Rounded-rectangle opacity masks.
//!
//! A mask is a single-channel image the size of the frame it gates. Pixels
//! whose centre lies inside the rounded rectangle are fully opaque (255),
//! all others are fully transparent (0). Edges are hard, so gating a frame
//! twice with the same mask is the same as gating it once.

use image::{GrayImage, Luma};
use std::collections::HashMap;
use std::sync::Arc;

/// Opacity value inside the rounded region.
pub const OPAQUE: u8 = 255;
/// Opacity value outside the rounded region.
pub const CLEAR: u8 = 0;

/// Largest usable radius for a `width` x `height` rectangle.
pub fn max_radius(width: u32, height: u32) -> f64 {
    width.min(height) as f64 / 2.0
}

/// Generate a rounded-rectangle mask.
///
/// # Arguments
///
/// * `width`, `height` - Mask dimensions
/// * `radius` - Corner radius in pixels. `0` yields a fully opaque mask;
///   anything at or above `min(width, height) / 2` is clamped to that value,
///   giving a stadium (or circle, for squares).
///
/// # Returns
///
/// A `width` x `height` mask holding only [`OPAQUE`] and [`CLEAR`].
pub fn rounded_rect(width: u32, height: u32, radius: u32) -> GrayImage {
    let mut mask = GrayImage::from_pixel(width, height, Luma([OPAQUE]));
    let r = (radius as f64).min(max_radius(width, height));
    if r <= 0.0 {
        return mask;
    }

    let r_sq = r * r;
    // Only the corner bands can be clear. Work in the top-left quadrant and
    // mirror, which keeps the result exactly symmetric.
    let band = r.ceil() as u32;
    for y in 0..band.min(height) {
        let cy = y as f64 + 0.5;
        for x in 0..band.min(width) {
            let cx = x as f64 + 0.5;
            if cx >= r || cy >= r {
                continue;
            }
            let dx = r - cx;
            let dy = r - cy;
            if dx * dx + dy * dy <= r_sq {
                continue;
            }
            let mx = width - 1 - x;
            let my = height - 1 - y;
            for (px, py) in [(x, y), (mx, y), (x, my), (mx, my)] {
                mask.put_pixel(px, py, Luma([CLEAR]));
            }
        }
    }

    mask
}

/// Masks keyed by `(width, height, radius)`.
///
/// Animations almost always have one frame size, so the cache usually holds
/// a single entry no matter how many frames are processed.
#[derive(Debug, Default)]
pub struct MaskCache {
    masks: HashMap<(u32, u32, u32), Arc<GrayImage>>,
}

impl MaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the mask for the given size and radius, generating it on first use.
    pub fn get(&mut self, width: u32, height: u32, radius: u32) -> Arc<GrayImage> {
        self.masks
            .entry((width, height, radius))
            .or_insert_with(|| {
                tracing::debug!(width, height, radius, "generating corner mask");
                Arc::new(rounded_rect(width, height, radius))
            })
            .clone()
    }

    /// Number of distinct masks generated so far.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}
