//! Animation pipeline: decode, transform every frame, encode.
//!
//! The three stages are separate types so they can only run in order:
//!
//! ```ignore
//! let report = Decoded::open(input)?
//!     .transform(&compositor)?
//!     .encode(output)?;
//! ```
//!
//! The whole frame sequence is held in memory between stages. Frames are
//! composited in parallel on the current rayon pool; output order always
//! follows input order.

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::compositor::{CompositeError, Compositor};
use crate::gif_codec;
use crate::mask::MaskCache;
use crate::output;

/// One frame and how long it is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedFrame {
    pub image: RgbaImage,
    /// Display time in milliseconds
    pub duration_ms: u32,
}

/// A decoded frame sequence plus its global loop count.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub frames: Vec<AnimatedFrame>,
    /// Times to play the sequence; 0 means forever
    pub loop_count: u16,
}

impl Animation {
    pub fn durations(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.duration_ms).collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Input could not be turned into a frame sequence.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unrecognized image container: {0}")]
    UnknownFormat(#[source] image::ImageError),
    #[error("invalid GIF data: {0}")]
    Gif(#[from] gif::DecodingError),
    #[error("invalid image data: {0}")]
    Image(#[from] image::ImageError),
    #[error("frame {index} is {width}x{height} but carries {len} bytes of pixels")]
    FrameBuffer { index: usize, width: u32, height: u32, len: usize },
    #[error("input contains no frames")]
    Empty,
}

/// Output could not be written.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot write output: {0}")]
    Io(#[from] io::Error),
    #[error("frame {index}: {reason}")]
    Frame { index: usize, reason: String },
    #[error("frame {index}: {source}")]
    Gif {
        index: usize,
        #[source]
        source: gif::EncodingError,
    },
    #[error("cannot start GIF stream: {0}")]
    Header(#[source] gif::EncodingError),
    #[error("frame 0: {0}")]
    Image(#[from] image::ImageError),
    #[error("cannot tell the output format of '{}' from its extension", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("no frames to encode")]
    Empty,
}

/// Any failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Composite(#[from] CompositeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub output: PathBuf,
    pub frames: usize,
    pub width: u32,
    pub height: u32,
    pub loop_count: u16,
    pub durations: Vec<u32>,
}

/// Container family of an output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Gif,
    Still(ImageFormat),
}

impl OutputKind {
    pub fn from_path(path: &Path) -> Result<Self, EncodeError> {
        match ImageFormat::from_path(path) {
            Ok(ImageFormat::Gif) => Ok(OutputKind::Gif),
            Ok(format) => Ok(OutputKind::Still(format)),
            Err(_) => Err(EncodeError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Stage one: the materialized input.
#[derive(Debug, Clone)]
pub struct Decoded {
    animation: Animation,
}

/// Stage two: composited frames awaiting encoding.
#[derive(Debug, Clone)]
pub struct Transformed {
    animation: Animation,
}

impl Decoded {
    /// Read and decode a file.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        let bytes = std::fs::read(path)
            .map_err(|source| DecodeError::Io { path: path.to_path_buf(), source })?;
        Self::from_bytes(&bytes)
    }

    /// Decode an in-memory file.
    ///
    /// GIFs keep their frame timing and loop count. Any other format the
    /// `image` crate reads becomes one frame with duration 0 and loop count 0.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let format = image::guess_format(bytes).map_err(DecodeError::UnknownFormat)?;
        let animation = match format {
            ImageFormat::Gif => {
                let decoded = gif_codec::decode_gif(Cursor::new(bytes))?;
                Animation { frames: decoded.frames, loop_count: decoded.loop_count }
            }
            other => {
                let image = image::load_from_memory_with_format(bytes, other)?.to_rgba8();
                Animation { frames: vec![AnimatedFrame { image, duration_ms: 0 }], loop_count: 0 }
            }
        };
        Self::from_animation(animation)
    }

    /// Wrap an already decoded sequence. Empty sequences are rejected.
    pub fn from_animation(animation: Animation) -> Result<Self, DecodeError> {
        if animation.is_empty() {
            return Err(DecodeError::Empty);
        }
        tracing::info!(frames = animation.len(), loop_count = animation.loop_count, "decoded input");
        Ok(Self { animation })
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    /// Composite every frame.
    ///
    /// One mask is generated per distinct output size before any frame is
    /// touched; workers then only read it.
    #[tracing::instrument(skip_all, fields(frames = self.animation.len()))]
    pub fn transform(self, compositor: &Compositor) -> Result<Transformed, CompositeError> {
        let radius = compositor.radius();
        let mut masks = MaskCache::new();
        let Animation { frames, loop_count } = self.animation;
        let jobs: Vec<_> = frames
            .into_iter()
            .map(|frame| {
                let (w, h) = compositor.output_size(frame.image.width(), frame.image.height());
                let mask = masks.get(w, h, radius);
                (frame, mask)
            })
            .collect();
        tracing::debug!(masks = masks.len(), "prepared corner masks");

        let frames = jobs
            .into_par_iter()
            .enumerate()
            .map(|(index, (frame, mask))| {
                let image = compositor.apply_with_mask(&frame.image, &mask)?;
                let (width, height) = image.dimensions();
                tracing::trace!(index, width, height, "composited frame");
                Ok(AnimatedFrame { image, duration_ms: frame.duration_ms })
            })
            .collect::<Result<Vec<_>, CompositeError>>()?;

        Ok(Transformed { animation: Animation { frames, loop_count } })
    }
}

impl Transformed {
    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn into_animation(self) -> Animation {
        self.animation
    }

    /// Write the frames to `path`.
    ///
    /// A `.gif` path gets an animated GIF with the original timing and loop
    /// count. Other extensions pick a still format, which only works for a
    /// single frame. Nothing is left at `path` if encoding fails.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn encode(self, path: &Path) -> Result<PipelineReport, EncodeError> {
        let kind = OutputKind::from_path(path)?;
        let animation = &self.animation;
        let first = animation.frames.first().ok_or(EncodeError::Empty)?;
        let (width, height) = first.image.dimensions();

        match kind {
            OutputKind::Gif => output::write_atomic(path, |w| {
                gif_codec::encode_gif(w, &animation.frames, animation.loop_count).map(|_| ())
            })?,
            OutputKind::Still(format) => {
                if animation.len() > 1 {
                    return Err(EncodeError::Frame {
                        index: 1,
                        reason: format!("{:?} output holds a single frame; use a .gif path", format),
                    });
                }
                output::write_atomic(path, |w| {
                    DynamicImage::ImageRgba8(first.image.clone())
                        .write_to(w, format)
                        .map_err(EncodeError::from)
                })?
            }
        }

        tracing::info!(frames = animation.len(), width, height, "encoded output");
        Ok(PipelineReport {
            output: path.to_path_buf(),
            frames: animation.len(),
            width,
            height,
            loop_count: animation.loop_count,
            durations: animation.durations(),
        })
    }
}

/// Run all three stages on files.
pub fn run(
    input: &Path,
    output: &Path,
    compositor: &Compositor,
) -> Result<PipelineReport, PipelineError> {
    let report = Decoded::open(input)?.transform(compositor)?.encode(output)?;
    Ok(report)
}

/// Read a single image; for animations this is the first frame.
pub fn read_image(path: &Path) -> Result<DynamicImage, DecodeError> {
    let bytes = std::fs::read(path)
        .map_err(|source| DecodeError::Io { path: path.to_path_buf(), source })?;
    let format = image::guess_format(&bytes).map_err(DecodeError::UnknownFormat)?;
    Ok(image::load_from_memory_with_format(&bytes, format)?)
}
