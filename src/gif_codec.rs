//! GIF container decoding and encoding
//!
//! Decoding composites every GIF frame onto a running canvas (honouring the
//! source's own disposal methods), so each decoded frame is a complete
//! picture of the logical screen. Encoding writes full-canvas frames with
//! "restore to background" disposal and palette index 0 reserved as the
//! transparent color.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Read, Write};

use color_quant::NeuQuant;
use gif::{DisposalMethod, Repeat};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::pipeline::{AnimatedFrame, DecodeError, EncodeError};

/// Palette index reserved for fully transparent pixels.
pub const TRANSPARENT_INDEX: u8 = 0;

/// Pixels less opaque than this are written as transparent (GIF is 1-bit).
pub const ALPHA_THRESHOLD: u8 = 128;

/// NeuQuant sampling factor: 1 is slowest and best, 30 fastest.
const SAMPLE_FACTOR: i32 = 10;

/// Colors available to each frame once the transparent slot is taken.
const MAX_COLORS: usize = 255;

/// A decoded GIF: full-canvas frames and the NETSCAPE loop count.
#[derive(Debug, Clone)]
pub struct DecodedGif {
    pub frames: Vec<AnimatedFrame>,
    pub loop_count: u16,
}

/// Decode every frame of a GIF stream.
///
/// Delays are converted from centiseconds to milliseconds. A missing
/// NETSCAPE extension reads as loop count 0 (loop forever).
pub fn decode_gif<R: Read>(reader: R) -> Result<DecodedGif, DecodeError> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(reader)?;

    let width = decoder.width() as u32;
    let height = decoder.height() as u32;
    let mut canvas = RgbaImage::new(width, height);
    let mut frames = Vec::new();

    while let Some(frame) = decoder.read_next_frame()? {
        let index = frames.len();
        let (left, top) = (frame.left as u32, frame.top as u32);
        let (fw, fh) = (frame.width as u32, frame.height as u32);

        let patch = RgbaImage::from_raw(fw, fh, frame.buffer.to_vec()).ok_or(
            DecodeError::FrameBuffer { index, width: fw, height: fh, len: frame.buffer.len() },
        )?;

        let saved = (frame.dispose == DisposalMethod::Previous).then(|| canvas.clone());

        for (x, y, pixel) in patch.enumerate_pixels() {
            let (cx, cy) = (left + x, top + y);
            if cx < width && cy < height && pixel[3] > 0 {
                canvas.put_pixel(cx, cy, *pixel);
            }
        }

        let duration_ms = frame.delay as u32 * 10;
        tracing::debug!(index, duration_ms, dispose = ?frame.dispose, "decoded GIF frame");
        frames.push(AnimatedFrame { image: canvas.clone(), duration_ms });

        match frame.dispose {
            DisposalMethod::Background => {
                for y in top..(top + fh).min(height) {
                    for x in left..(left + fw).min(width) {
                        canvas.put_pixel(x, y, Rgba([0, 0, 0, 0]));
                    }
                }
            }
            DisposalMethod::Previous => {
                if let Some(saved) = saved {
                    canvas = saved;
                }
            }
            _ => {}
        }
    }

    let loop_count = match decoder.repeat() {
        Repeat::Infinite => 0,
        Repeat::Finite(n) => n,
    };

    Ok(DecodedGif { frames, loop_count })
}

/// Encode frames as an animated GIF and return the underlying writer.
///
/// All frames must share one size. Every frame gets its own palette with
/// [`TRANSPARENT_INDEX`] reserved, and "restore to background" disposal so
/// viewers never blend a frame with the one before it.
///
/// # Errors
///
/// `EncodeError::Frame` names the first frame whose size or duration cannot
/// be written.
pub fn encode_gif<W: Write>(
    writer: W,
    frames: &[AnimatedFrame],
    loop_count: u16,
) -> Result<W, EncodeError> {
    let first = frames.first().ok_or(EncodeError::Empty)?;
    let (width, height) = first.image.dimensions();
    let (w16, h16) = gif_dimensions(0, width, height)?;

    let mut delays = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        if frame.image.dimensions() != (width, height) {
            return Err(EncodeError::Frame {
                index,
                reason: format!(
                    "frame is {}x{} but the animation is {}x{}",
                    frame.image.width(),
                    frame.image.height(),
                    width,
                    height
                ),
            });
        }
        delays.push(delay_centiseconds(index, frame.duration_ms)?);
    }

    // Palette building dominates encoding time and is independent per frame
    let indexed: Vec<(Vec<u8>, Vec<u8>)> =
        frames.par_iter().map(|frame| index_frame(&frame.image)).collect();

    let mut encoder = gif::Encoder::new(writer, w16, h16, &[]).map_err(EncodeError::Header)?;
    let repeat = if loop_count == 0 { Repeat::Infinite } else { Repeat::Finite(loop_count) };
    encoder.set_repeat(repeat).map_err(EncodeError::Header)?;

    for (index, ((palette, indices), delay)) in indexed.into_iter().zip(delays).enumerate() {
        let frame = gif::Frame {
            width: w16,
            height: h16,
            delay,
            dispose: DisposalMethod::Background,
            transparent: Some(TRANSPARENT_INDEX),
            palette: Some(palette),
            buffer: Cow::Owned(indices),
            ..Default::default()
        };
        encoder.write_frame(&frame).map_err(|source| EncodeError::Gif { index, source })?;
    }

    encoder.into_inner().map_err(EncodeError::Io)
}

fn gif_dimensions(index: usize, width: u32, height: u32) -> Result<(u16, u16), EncodeError> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(EncodeError::Frame {
            index,
            reason: format!("{}x{} exceeds the GIF maximum of 65535x65535", width, height),
        }),
    }
}

/// GIF delays are centiseconds; round to the nearest one.
fn delay_centiseconds(index: usize, duration_ms: u32) -> Result<u16, EncodeError> {
    u16::try_from(duration_ms.saturating_add(5) / 10).map_err(|_| EncodeError::Frame {
        index,
        reason: format!("duration of {}ms is too long for a GIF frame", duration_ms),
    })
}

/// Build a local palette and index buffer for one frame.
///
/// Returns `(palette, indices)`: the palette is RGB triples with slot 0 the
/// transparent color; opaque pixels map to slots 1..=255. Frames with at
/// most 255 distinct opaque colors keep them exactly; larger sets go
/// through NeuQuant.
pub(crate) fn index_frame(image: &RgbaImage) -> (Vec<u8>, Vec<u8>) {
    if let Some(exact) = exact_palette(image) {
        return exact;
    }

    let opaque: Vec<u8> = image
        .pixels()
        .filter(|p| p[3] >= ALPHA_THRESHOLD)
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect();

    let quantizer = NeuQuant::new(SAMPLE_FACTOR, MAX_COLORS, &opaque);
    let mut palette = vec![0, 0, 0];
    palette.extend(quantizer.color_map_rgb());

    let indices = image
        .pixels()
        .map(|p| {
            if p[3] < ALPHA_THRESHOLD {
                TRANSPARENT_INDEX
            } else {
                // index_of is < MAX_COLORS, so the shifted slot fits a u8
                (quantizer.index_of(&[p[0], p[1], p[2], 255]) + 1) as u8
            }
        })
        .collect();

    (palette, indices)
}

/// Lossless palette in first-seen order, or `None` past [`MAX_COLORS`].
fn exact_palette(image: &RgbaImage) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut slots: HashMap<[u8; 3], u8> = HashMap::new();
    let mut palette = vec![0, 0, 0];
    let mut indices = Vec::with_capacity((image.width() * image.height()) as usize);

    for p in image.pixels() {
        if p[3] < ALPHA_THRESHOLD {
            indices.push(TRANSPARENT_INDEX);
            continue;
        }
        let rgb = [p[0], p[1], p[2]];
        let index = match slots.get(&rgb) {
            Some(&index) => index,
            None => {
                if slots.len() >= MAX_COLORS {
                    return None;
                }
                let index = (slots.len() + 1) as u8;
                slots.insert(rgb, index);
                palette.extend_from_slice(&rgb);
                index
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}
