//! Fixed-palette quantization to small integer codes.
//!
//! Every pixel is replaced by the code of the palette entry nearest to it in
//! RGB space (Euclidean distance). Ties go to the entry declared first. The
//! resulting code grid can be printed as a C array for embedding.

use image::imageops::{self, FilterType};
use image::RgbImage;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt::Write as _;
use thiserror::Error;

/// Palette construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    #[error("palette has no entries")]
    Empty,
    #[error("palette code {0} is declared more than once")]
    DuplicateCode(u8),
}

/// One palette slot: the code written out and the color it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub code: u8,
    pub rgb: [u8; 3],
}

impl PaletteEntry {
    pub fn new(code: u8, rgb: [u8; 3]) -> Self {
        Self { code, rgb }
    }
}

/// An ordered, non-empty palette with unique codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Build a palette. Declaration order is kept and decides ties.
    pub fn new(entries: Vec<PaletteEntry>) -> Result<Self, PaletteError> {
        if entries.is_empty() {
            return Err(PaletteError::Empty);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.code) {
                return Err(PaletteError::DuplicateCode(entry.code));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// Code of the entry nearest to `rgb`.
    pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
        let mut best = self.entries[0].code;
        let mut best_dist = u32::MAX;
        for entry in &self.entries {
            let d = distance_sq(rgb, entry.rgb);
            // Strict comparison keeps the earliest entry on ties
            if d < best_dist {
                best = entry.code;
                best_dist = d;
                if d == 0 {
                    break;
                }
            }
        }
        best
    }
}

impl Default for Palette {
    /// White, black, red and blue on codes 0, 5, 8 and 12.
    fn default() -> Self {
        Self {
            entries: vec![
                PaletteEntry::new(0, [255, 255, 255]),
                PaletteEntry::new(5, [0, 0, 0]),
                PaletteEntry::new(8, [255, 0, 0]),
                PaletteEntry::new(12, [0, 0, 255]),
            ],
        }
    }
}

/// Squared Euclidean distance; ordering is the same as the true distance.
fn distance_sq(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x.abs_diff(y) as u32;
            d * d
        })
        .sum()
}

/// A row-major grid of palette codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGrid {
    pub width: u32,
    pub height: u32,
    pub codes: Vec<u8>,
}

impl CodeGrid {
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.codes[(y * self.width + x) as usize]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        // max(1) keeps chunks() valid for zero-width grids, which have no codes
        self.codes.chunks(self.width.max(1) as usize)
    }

    /// Render as a C two-dimensional array definition.
    ///
    /// ```
    /// use picframe::quantize::{ArrayStyle, CodeGrid};
    ///
    /// let grid = CodeGrid { width: 2, height: 1, codes: vec![0, 12] };
    /// assert_eq!(
    ///     grid.to_c_array("int", "image", ArrayStyle::Aligned),
    ///     "int image[1][2] = {\n  {  0, 12 },\n};\n"
    /// );
    /// ```
    pub fn to_c_array(&self, element_type: &str, name: &str, style: ArrayStyle) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}[{}][{}] = {{", element_type, name, self.height, self.width);
        for row in self.rows() {
            let line = match style {
                ArrayStyle::Aligned => {
                    let cells: Vec<String> = row.iter().map(|c| format!("{:2}", c)).collect();
                    format!("  {{ {} }},", cells.join(", "))
                }
                ArrayStyle::Compact => {
                    let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
                    format!("  {{{}}},", cells.join(","))
                }
            };
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("};\n");
        out
    }
}

/// Layout of emitted C array rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ArrayStyle {
    /// `{  0,  5, 12 }` with two-wide cells
    #[default]
    Aligned,
    /// `{0,5,12}`
    Compact,
}

/// Quantize an image to palette codes.
///
/// When `size` is given the image is first resized to it with
/// nearest-neighbour sampling; quantization always runs on the resized image.
pub fn quantize(image: &RgbImage, palette: &Palette, size: Option<(u32, u32)>) -> CodeGrid {
    let resized;
    let source = match size {
        Some((w, h)) if (w, h) != image.dimensions() => {
            resized = imageops::resize(image, w, h, FilterType::Nearest);
            &resized
        }
        _ => image,
    };

    let codes: Vec<u8> =
        source.as_raw().par_chunks(3).map(|p| palette.nearest([p[0], p[1], p[2]])).collect();

    CodeGrid { width: source.width(), height: source.height(), codes }
}
