//! Color parsing for border colors and palette entries
//!
//! Colors can be written in three ways:
//! - Hex: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`
//! - CSS: `rgb()`, `rgba()`, `hsl()`, `hwb()`, `oklch()` and named colors
//! - Channel lists in `picframe.toml`: `[r, g, b, a]` or `[r, g, b]`
//!
//! A CSS or hex color always resolves to all four channels (CSS defines an
//! omitted alpha as opaque). A channel list is taken literally, so a list
//! with a missing channel stays incomplete and is rejected where a full
//! color is required.

use image::Rgba;
use lightningcss::traits::Parse;
use lightningcss::values::color::CssColor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3, 4, 6, or 8 hex chars after #)
    #[error("invalid color length {0}, expected 3, 4, 6, or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// CSS parsing error from lightningcss
    #[error("CSS parse error: {0}")]
    CssParse(String),
    /// Channel list has the wrong number of entries
    #[error("expected {expected} color channels, found {found}")]
    ChannelCount { expected: usize, found: usize },
}

/// A color as written in configuration: a CSS string or a raw channel list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Css(String),
    Channels(Vec<u8>),
}

impl ColorSpec {
    /// Channels in `r, g, b[, a]` order.
    ///
    /// CSS strings always yield four channels. Channel lists are returned
    /// as written, even when incomplete.
    pub fn channels(&self) -> Result<Vec<u8>, ColorError> {
        match self {
            ColorSpec::Css(s) => Ok(parse_color(s)?.0.to_vec()),
            ColorSpec::Channels(c) => Ok(c.clone()),
        }
    }

    /// Resolve to an RGB triple for palette use. Alpha is ignored.
    pub fn rgb(&self) -> Result<[u8; 3], ColorError> {
        match self {
            ColorSpec::Css(s) => {
                let Rgba([r, g, b, _]) = parse_color(s)?;
                Ok([r, g, b])
            }
            ColorSpec::Channels(c) => match c.as_slice() {
                [r, g, b] => Ok([*r, *g, *b]),
                _ => Err(ColorError::ChannelCount { expected: 3, found: c.len() }),
            },
        }
    }
}

impl std::fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorSpec::Css(s) => write!(f, "{}", s),
            ColorSpec::Channels(c) => write!(f, "{:?}", c),
        }
    }
}

/// Parse a CSS color string into an RGBA color.
///
/// # Examples
///
/// ```
/// use picframe::color::parse_color;
///
/// let red = parse_color("#F00").unwrap();
/// assert_eq!(red, image::Rgba([255, 0, 0, 255]));
///
/// let black = parse_color("black").unwrap();
/// assert_eq!(black, image::Rgba([0, 0, 0, 255]));
/// ```
///
/// # Errors
///
/// Returns `ColorError` if the input is invalid or unparseable.
pub fn parse_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ColorError::Empty);
    }

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex);
    }

    let css_color = CssColor::parse_string(s).map_err(|e| ColorError::CssParse(e.to_string()))?;
    css_color_to_rgba(css_color)
}

/// Parse the digits of a hex color (the part after `#`)
fn parse_hex_color(hex: &str) -> Result<Rgba<u8>, ColorError> {
    if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(c));
    }

    let digits: Vec<u8> = hex.bytes().map(hex_value).collect();
    match digits.as_slice() {
        // Short forms double each digit
        [r, g, b] => Ok(Rgba([r * 17, g * 17, b * 17, 255])),
        [r, g, b, a] => Ok(Rgba([r * 17, g * 17, b * 17, a * 17])),
        [r1, r2, g1, g2, b1, b2] => Ok(Rgba([r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, 255])),
        [r1, r2, g1, g2, b1, b2, a1, a2] => {
            Ok(Rgba([r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, a1 * 16 + a2]))
        }
        _ => Err(ColorError::InvalidLength(digits.len())),
    }
}

/// Value of an ASCII hex digit. Callers have already checked the byte.
fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Convert a lightningcss CssColor to RGBA
fn css_color_to_rgba(color: CssColor) -> Result<Rgba<u8>, ColorError> {
    use lightningcss::values::color::FloatColor;

    let rgb_color = color
        .to_rgb()
        .map_err(|_| ColorError::CssParse("cannot convert color to RGB".to_string()))?;

    match rgb_color {
        CssColor::RGBA(rgba) => Ok(Rgba([rgba.red, rgba.green, rgba.blue, rgba.alpha])),
        CssColor::Float(float_color) => match float_color.as_ref() {
            // Components with 'none' values stay as floats
            FloatColor::RGB(rgb) => {
                let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                Ok(Rgba([to_u8(rgb.r), to_u8(rgb.g), to_u8(rgb.b), to_u8(rgb.alpha)]))
            }
            _ => Err(ColorError::CssParse("unexpected float color format".to_string())),
        },
        _ => Err(ColorError::CssParse("color conversion did not produce RGB".to_string())),
    }
}
