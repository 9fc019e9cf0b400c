//! Per-frame border and corner compositing.
//!
//! A [`Compositor`] is built once from validated settings and then applied to
//! every frame of an animation. Applying it:
//!
//! 1. with a border: allocates a `(W + 2B) x (H + 2B)` canvas filled with the
//!    border color and pastes the frame at `(B, B)` with source-over blending,
//!    so transparent source pixels let the border color show through;
//! 2. gates the canvas opacity with a rounded-rectangle mask of the canvas
//!    size, leaving color channels alone.

use image::{GrayImage, Rgba, RgbaImage};
use thiserror::Error;

use crate::mask;

/// Error raised when compositor settings are incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositeError {
    #[error("invalid compositor configuration: {0}")]
    InvalidConfiguration(String),
    #[error("mask is {mask_w}x{mask_h} but canvas is {canvas_w}x{canvas_h}")]
    MaskSize { mask_w: u32, mask_h: u32, canvas_w: u32, canvas_h: u32 },
}

/// Border and corner settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compositor {
    border: u32,
    color: Rgba<u8>,
    radius: u32,
}

impl Compositor {
    /// Build a compositor.
    ///
    /// # Arguments
    ///
    /// * `border` - Border thickness in pixels (0 for none)
    /// * `color` - Border color channels as `[r, g, b, a]`. Required, with all
    ///   four channels, whenever `border > 0`; ignored otherwise.
    /// * `radius` - Corner radius in pixels
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when a border is requested without a complete
    /// color. No default is substituted.
    pub fn new(border: u32, color: Option<&[u8]>, radius: u32) -> Result<Self, CompositeError> {
        let color = match (border, color) {
            (0, _) => Rgba([0, 0, 0, 0]),
            (_, Some(&[r, g, b, a])) => Rgba([r, g, b, a]),
            (_, Some(channels)) => {
                return Err(CompositeError::InvalidConfiguration(format!(
                    "border color needs 4 channels (r, g, b, a), got {}",
                    channels.len()
                )))
            }
            (_, None) => {
                return Err(CompositeError::InvalidConfiguration(format!(
                    "border of {}px requested without a border color",
                    border
                )))
            }
        };
        Ok(Self { border, color, radius })
    }

    /// Corner rounding only.
    pub fn corners(radius: u32) -> Self {
        Self { border: 0, color: Rgba([0, 0, 0, 0]), radius }
    }

    pub fn border(&self) -> u32 {
        self.border
    }

    pub fn color(&self) -> Rgba<u8> {
        self.color
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Dimensions of the output canvas for a frame of the given size.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width + 2 * self.border, height + 2 * self.border)
    }

    /// Composite one frame, generating the mask on the fly.
    pub fn apply(&self, frame: &RgbaImage) -> RgbaImage {
        let (w, h) = self.output_size(frame.width(), frame.height());
        let mask = mask::rounded_rect(w, h, self.radius);
        let mut canvas = self.place(frame);
        gate_alpha(&mut canvas, &mask);
        canvas
    }

    /// Composite one frame with a mask prepared by the caller.
    ///
    /// The mask must match [`Compositor::output_size`] for this frame.
    pub fn apply_with_mask(
        &self,
        frame: &RgbaImage,
        mask: &GrayImage,
    ) -> Result<RgbaImage, CompositeError> {
        let (w, h) = self.output_size(frame.width(), frame.height());
        if mask.dimensions() != (w, h) {
            return Err(CompositeError::MaskSize {
                mask_w: mask.width(),
                mask_h: mask.height(),
                canvas_w: w,
                canvas_h: h,
            });
        }
        let mut canvas = self.place(frame);
        gate_alpha(&mut canvas, mask);
        Ok(canvas)
    }

    /// Steps before masking: copy, or border fill plus paste.
    fn place(&self, frame: &RgbaImage) -> RgbaImage {
        if self.border == 0 {
            return frame.clone();
        }
        let (w, h) = self.output_size(frame.width(), frame.height());
        let mut canvas = RgbaImage::from_pixel(w, h, self.color);
        paste_over(&mut canvas, frame, self.border, self.border);
        canvas
    }
}

/// Paste `src` onto `canvas` at `(x, y)` using straight-alpha source-over.
pub fn paste_over(canvas: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    for (sx, sy, pixel) in src.enumerate_pixels() {
        let (dx, dy) = (x + sx, y + sy);
        if dx >= canvas.width() || dy >= canvas.height() {
            continue;
        }
        match pixel[3] {
            0 => {}
            255 => canvas.put_pixel(dx, dy, *pixel),
            _ => {
                let dst = *canvas.get_pixel(dx, dy);
                canvas.put_pixel(dx, dy, over(pixel, &dst));
            }
        }
    }
}

/// Porter-Duff source-over for straight (non-premultiplied) RGBA.
fn over(src: &Rgba<u8>, dst: &Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| -> u8 {
        let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Multiply canvas opacity by mask opacity; color channels are untouched.
fn gate_alpha(canvas: &mut RgbaImage, mask: &GrayImage) {
    for (pixel, m) in canvas.pixels_mut().zip(mask.pixels()) {
        pixel[3] = match m[0] {
            mask::OPAQUE => pixel[3],
            mask::CLEAR => 0,
            m => ((pixel[3] as u16 * m as u16 + 127) / 255) as u8,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn test_border_requires_color() {
        let err = Compositor::new(5, None, 0).unwrap_err();
        assert!(matches!(err, CompositeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_border_color_missing_channel() {
        let err = Compositor::new(5, Some(&[0, 0, 0]), 0).unwrap_err();
        assert!(matches!(err, CompositeError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("4 channels"));
    }

    #[test]
    fn test_no_border_ignores_color() {
        let c = Compositor::new(0, None, 4).unwrap();
        assert_eq!(c, Compositor::corners(4));
    }

    #[test]
    fn test_border_enlarges_canvas() {
        let c = Compositor::new(3, Some(&[10, 20, 30, 255]), 0).unwrap();
        let out = c.apply(&solid(4, 2, [200, 0, 0, 255]));
        assert_eq!(out.dimensions(), (10, 8));
        assert_eq!(*out.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*out.get_pixel(3, 3), Rgba([200, 0, 0, 255]));
        assert_eq!(*out.get_pixel(6, 4), Rgba([200, 0, 0, 255]));
        assert_eq!(*out.get_pixel(7, 4), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_transparent_source_shows_border_color() {
        let c = Compositor::new(2, Some(&[0, 0, 255, 255]), 0).unwrap();
        let out = c.apply(&solid(3, 3, [255, 255, 255, 0]));
        assert!(out.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn test_half_transparent_source_blends() {
        let c = Compositor::new(1, Some(&[0, 0, 0, 255]), 0).unwrap();
        let out = c.apply(&solid(1, 1, [255, 255, 255, 128]));
        let p = out.get_pixel(1, 1);
        assert_eq!(p[3], 255);
        assert_eq!(p[0], 128);
    }

    #[test]
    fn test_corners_become_transparent() {
        let c = Compositor::new(20, Some(&[0, 0, 0, 255]), 40).unwrap();
        let out = c.apply(&solid(60, 50, [9, 9, 9, 255]));
        assert_eq!(out.dimensions(), (100, 90));
        for (x, y) in [(0, 0), (99, 0), (0, 89), (99, 89), (5, 5), (94, 84)] {
            assert_eq!(out.get_pixel(x, y)[3], 0, "({}, {}) should be clear", x, y);
        }
        assert_eq!(out.get_pixel(50, 45)[3], 255);
    }

    #[test]
    fn test_gate_keeps_color_channels() {
        let out = Compositor::corners(10).apply(&solid(20, 20, [1, 2, 3, 255]));
        let p = out.get_pixel(0, 0);
        assert_eq!((p[0], p[1], p[2], p[3]), (1, 2, 3, 0));
    }

    #[test]
    fn test_corner_gating_is_idempotent() {
        let mut frame = solid(31, 23, [40, 80, 120, 255]);
        frame.put_pixel(15, 11, Rgba([0, 0, 0, 90]));
        let c = Compositor::corners(7);
        let once = c.apply(&frame);
        let twice = c.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_with_mask_checks_size() {
        let c = Compositor::new(2, Some(&[0, 0, 0, 255]), 3).unwrap();
        let frame = solid(10, 10, [0, 0, 0, 255]);
        let wrong = mask::rounded_rect(10, 10, 3);
        assert!(matches!(c.apply_with_mask(&frame, &wrong), Err(CompositeError::MaskSize { .. })));

        let right = mask::rounded_rect(14, 14, 3);
        assert_eq!(c.apply_with_mask(&frame, &right).unwrap(), c.apply(&frame));
    }
}
