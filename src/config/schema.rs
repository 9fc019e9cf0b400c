//! Configuration schema types for `picframe.toml`
//!
//! Every section is optional; missing values fall back to the defaults the
//! commands use without a config file. Transform sizes are read as signed
//! integers so that negative values are reported instead of rejected by the
//! TOML parser with a less helpful message.

use serde::{Deserialize, Serialize};

use crate::color::ColorSpec;
use crate::compositor::{CompositeError, Compositor};
use crate::quantize::{ArrayStyle, Palette, PaletteEntry, PaletteError};
use crate::threshold::Levels;

/// Largest border or radius accepted, matching the GIF size limit.
pub const MAX_EXTENT: i64 = u16::MAX as i64;

/// `[border]`: border plus rounded corners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderConfig {
    /// Border thickness in pixels
    #[serde(default = "default_border_size")]
    pub size: i64,
    /// Border color; channel lists must name r, g, b and a
    #[serde(default = "default_border_color")]
    pub color: ColorSpec,
    /// Corner radius in pixels
    #[serde(default = "default_border_radius")]
    pub radius: i64,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            size: default_border_size(),
            color: default_border_color(),
            radius: default_border_radius(),
        }
    }
}

fn default_border_size() -> i64 {
    20
}

fn default_border_color() -> ColorSpec {
    ColorSpec::Channels(vec![0, 0, 0, 255])
}

fn default_border_radius() -> i64 {
    40
}

impl BorderConfig {
    /// Build the compositor for this section. Call after validation.
    pub fn compositor(&self) -> Result<Compositor, CompositeError> {
        let channels = self
            .color
            .channels()
            .map_err(|e| CompositeError::InvalidConfiguration(e.to_string()))?;
        Compositor::new(to_u32(self.size), Some(&channels), to_u32(self.radius))
    }
}

/// `[round]`: rounded corners only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    #[serde(default = "default_round_radius")]
    pub radius: i64,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self { radius: default_round_radius() }
    }
}

fn default_round_radius() -> i64 {
    30
}

impl RoundConfig {
    pub fn compositor(&self) -> Compositor {
        Compositor::corners(to_u32(self.radius))
    }
}

/// One `[[quantize.palette]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntryConfig {
    pub code: i64,
    pub color: ColorSpec,
}

/// `[quantize]`: fixed-palette quantization to a C array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizeConfig {
    #[serde(default = "default_quantize_width")]
    pub width: i64,
    #[serde(default = "default_quantize_height")]
    pub height: i64,
    /// Resize to `width` x `height` before quantizing
    #[serde(default = "default_true")]
    pub resize: bool,
    #[serde(default = "default_quantize_type")]
    pub element_type: String,
    #[serde(default = "default_quantize_name")]
    pub name: String,
    #[serde(default)]
    pub style: ArrayStyle,
    /// Palette in tie-break order
    #[serde(default = "default_palette")]
    pub palette: Vec<PaletteEntryConfig>,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            width: default_quantize_width(),
            height: default_quantize_height(),
            resize: true,
            element_type: default_quantize_type(),
            name: default_quantize_name(),
            style: ArrayStyle::Aligned,
            palette: default_palette(),
        }
    }
}

fn default_quantize_width() -> i64 {
    100
}

fn default_quantize_height() -> i64 {
    12
}

fn default_true() -> bool {
    true
}

fn default_quantize_type() -> String {
    "int".to_string()
}

fn default_quantize_name() -> String {
    "image".to_string()
}

fn default_palette() -> Vec<PaletteEntryConfig> {
    Palette::default()
        .entries()
        .iter()
        .map(|e| PaletteEntryConfig {
            code: e.code as i64,
            color: ColorSpec::Channels(e.rgb.to_vec()),
        })
        .collect()
}

impl QuantizeConfig {
    /// Resolve the palette. Call after validation.
    pub fn palette(&self) -> Result<Palette, PaletteError> {
        let entries = self
            .palette
            .iter()
            .filter_map(|e| {
                let rgb = e.color.rgb().ok()?;
                Some(PaletteEntry::new(u8::try_from(e.code).ok()?, rgb))
            })
            .collect();
        Palette::new(entries)
    }

    /// Target size when resizing is enabled.
    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.resize.then(|| (to_u32(self.width), to_u32(self.height)))
    }
}

/// `[threshold]`: mean-threshold bitmaps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_threshold_size")]
    pub width: i64,
    #[serde(default = "default_threshold_size")]
    pub height: i64,
    /// Code for pixels brighter than the mean
    #[serde(default = "default_on")]
    pub on: i64,
    /// Code for all other pixels
    #[serde(default)]
    pub off: i64,
    #[serde(default = "default_threshold_type")]
    pub element_type: String,
    #[serde(default = "default_threshold_name")]
    pub name: String,
    #[serde(default = "default_compact")]
    pub style: ArrayStyle,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            width: default_threshold_size(),
            height: default_threshold_size(),
            on: default_on(),
            off: 0,
            element_type: default_threshold_type(),
            name: default_threshold_name(),
            style: ArrayStyle::Compact,
        }
    }
}

fn default_threshold_size() -> i64 {
    20
}

fn default_on() -> i64 {
    9
}

fn default_threshold_type() -> String {
    "uint8_t".to_string()
}

fn default_threshold_name() -> String {
    "site_qr".to_string()
}

fn default_compact() -> ArrayStyle {
    ArrayStyle::Compact
}

impl ThresholdConfig {
    pub fn levels(&self) -> Levels {
        Levels { on: to_u8(self.on), off: to_u8(self.off) }
    }

    pub fn size(&self) -> (u32, u32) {
        (to_u32(self.width), to_u32(self.height))
    }
}

/// `[pipeline]`: execution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker threads for per-frame work (0 = available parallelism)
    #[serde(default)]
    pub jobs: usize,
}

/// Complete `picframe.toml` contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PicframeConfig {
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub round: RoundConfig,
    #[serde(default)]
    pub quantize: QuantizeConfig,
    #[serde(default)]
    pub threshold: ThresholdConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Validation error for config values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "border.radius")
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' {}", self.field, self.message)
    }
}

/// The part of the configuration a command reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Border,
    Round,
    Quantize,
    Threshold,
}

impl Section {
    pub const ALL: [Section; 4] =
        [Section::Border, Section::Round, Section::Quantize, Section::Threshold];
}

impl PicframeConfig {
    /// Validate every section and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        self.validate_sections(&Section::ALL)
    }

    /// Validate only the given sections.
    ///
    /// Commands check the section they use, so a broken `[threshold]` does
    /// not stop `round` from running.
    pub fn validate_sections(&self, sections: &[Section]) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ConfigValidationError { field: field.to_string(), message });
        };

        for section in sections {
            match section {
                Section::Border => self.check_border(&mut push),
                Section::Round => check_extent(&mut push, "round.radius", self.round.radius, 0),
                Section::Quantize => self.check_quantize(&mut push),
                Section::Threshold => self.check_threshold(&mut push),
            }
        }

        errors
    }

    fn check_border(&self, push: &mut impl FnMut(&str, String)) {
        check_extent(push, "border.size", self.border.size, 0);
        check_extent(push, "border.radius", self.border.radius, 0);
        // A channel list missing entries is the compositor's call, but an
        // unparseable CSS string is a config error
        if let ColorSpec::Css(s) = &self.border.color {
            if let Err(e) = crate::color::parse_color(s) {
                push("border.color", format!("is not a color: {}", e));
            }
        }
    }

    fn check_quantize(&self, push: &mut impl FnMut(&str, String)) {
        check_extent(push, "quantize.width", self.quantize.width, 1);
        check_extent(push, "quantize.height", self.quantize.height, 1);
        check_identifier(push, "quantize.name", &self.quantize.name);
        check_type_name(push, "quantize.element_type", &self.quantize.element_type);
        if self.quantize.palette.is_empty() {
            push("quantize.palette", "must contain at least one entry".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for (i, entry) in self.quantize.palette.iter().enumerate() {
            let field = format!("quantize.palette[{}]", i);
            if !(0..=255).contains(&entry.code) {
                push(&field, format!("code {} must be between 0 and 255", entry.code));
            } else if !seen.insert(entry.code) {
                push(&field, format!("code {} is declared more than once", entry.code));
            }
            if let Err(e) = entry.color.rgb() {
                push(&field, format!("color {} is invalid: {}", entry.color, e));
            }
        }
    }

    fn check_threshold(&self, push: &mut impl FnMut(&str, String)) {
        check_extent(push, "threshold.width", self.threshold.width, 1);
        check_extent(push, "threshold.height", self.threshold.height, 1);
        let levels = [("threshold.on", self.threshold.on), ("threshold.off", self.threshold.off)];
        for (field, value) in levels {
            if !(0..=255).contains(&value) {
                push(field, format!("must be between 0 and 255, got {}", value));
            }
        }
        check_identifier(push, "threshold.name", &self.threshold.name);
        check_type_name(push, "threshold.element_type", &self.threshold.element_type);
    }
}

fn check_extent(push: &mut impl FnMut(&str, String), field: &str, value: i64, min: i64) {
    if value < min || value > MAX_EXTENT {
        push(field, format!("must be between {} and {}, got {}", min, MAX_EXTENT, value));
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(push: &mut impl FnMut(&str, String), field: &str, value: &str) {
    if !is_identifier(value) {
        push(field, format!("'{}' is not a valid C identifier", value));
    }
}

/// Element types may be multi-word, such as `unsigned char`.
fn check_type_name(push: &mut impl FnMut(&str, String), field: &str, value: &str) {
    if value.split_whitespace().next().is_none() || !value.split_whitespace().all(is_identifier) {
        push(field, format!("'{}' is not a valid C type name", value));
    }
}

/// Validated values are in range; clamp anyway so unvalidated input cannot wrap.
fn to_u32(v: i64) -> u32 {
    v.clamp(0, MAX_EXTENT) as u32
}

fn to_u8(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}
