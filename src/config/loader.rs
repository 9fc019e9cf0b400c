//! Configuration loading and discovery for `picframe.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{PaletteEntryConfig, PicframeConfig, Section};
use crate::color::ColorSpec;
use crate::quantize::ArrayStyle;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file searched for.
pub const CONFIG_FILE: &str = "picframe.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse picframe.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub border_size: Option<i64>,
    pub border_color: Option<String>,
    pub border_radius: Option<i64>,
    pub round_radius: Option<i64>,
    pub quantize_width: Option<i64>,
    pub quantize_height: Option<i64>,
    /// Quantize at the source size
    pub no_resize: bool,
    /// `(code, color)` pairs replacing the configured palette
    pub palette: Vec<(i64, String)>,
    pub threshold_width: Option<i64>,
    pub threshold_height: Option<i64>,
    pub threshold_on: Option<i64>,
    pub threshold_off: Option<i64>,
    /// Array name for whichever command runs
    pub name: Option<String>,
    /// Array element type for whichever command runs
    pub element_type: Option<String>,
    pub style: Option<ArrayStyle>,
    pub jobs: Option<usize>,
}

/// Find picframe.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find picframe.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a picframe.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
///
/// # Returns
/// - `Ok(PicframeConfig)` on success
/// - `Err(ConfigError)` if the file cannot be read, parsed or validated
pub fn load_config(path: Option<&Path>) -> Result<PicframeConfig, ConfigError> {
    let config = read_config(path)?;
    check(&config, &Section::ALL)?;
    Ok(config)
}

/// Load configuration, apply CLI overrides, then validate `sections`.
///
/// Overrides are applied before validation so that a bad command-line value
/// is reported the same way as a bad file value. Sections the command does
/// not read are parsed but not validated.
pub fn load_config_with_overrides(
    path: Option<&Path>,
    overrides: &CliOverrides,
    sections: &[Section],
) -> Result<PicframeConfig, ConfigError> {
    let mut config = read_config(path)?;
    merge_cli_overrides(&mut config, overrides);
    check(&config, sections)?;
    Ok(config)
}

fn read_config(path: Option<&Path>) -> Result<PicframeConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "loading config");
            let contents = fs::read_to_string(&p)?;
            Ok(toml::from_str(&contents)?)
        }
        None => Ok(PicframeConfig::default()),
    }
}

fn check(config: &PicframeConfig, sections: &[Section]) -> Result<(), ConfigError> {
    let errors = config.validate_sections(sections);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut PicframeConfig, overrides: &CliOverrides) {
    if let Some(size) = overrides.border_size {
        config.border.size = size;
    }
    if let Some(ref color) = overrides.border_color {
        config.border.color = ColorSpec::Css(color.clone());
    }
    if let Some(radius) = overrides.border_radius {
        config.border.radius = radius;
    }
    if let Some(radius) = overrides.round_radius {
        config.round.radius = radius;
    }

    if let Some(width) = overrides.quantize_width {
        config.quantize.width = width;
    }
    if let Some(height) = overrides.quantize_height {
        config.quantize.height = height;
    }
    if overrides.no_resize {
        config.quantize.resize = false;
    }
    if !overrides.palette.is_empty() {
        config.quantize.palette = overrides
            .palette
            .iter()
            .map(|(code, color)| PaletteEntryConfig {
                code: *code,
                color: ColorSpec::Css(color.clone()),
            })
            .collect();
    }

    if let Some(width) = overrides.threshold_width {
        config.threshold.width = width;
    }
    if let Some(height) = overrides.threshold_height {
        config.threshold.height = height;
    }
    if let Some(on) = overrides.threshold_on {
        config.threshold.on = on;
    }
    if let Some(off) = overrides.threshold_off {
        config.threshold.off = off;
    }

    // Array naming applies to both emitters; only one runs per invocation
    if let Some(ref name) = overrides.name {
        config.quantize.name = name.clone();
        config.threshold.name = name.clone();
    }
    if let Some(ref element_type) = overrides.element_type {
        config.quantize.element_type = element_type.clone();
        config.threshold.element_type = element_type.clone();
    }
    if let Some(style) = overrides.style {
        config.quantize.style = style;
        config.threshold.style = style;
    }

    if let Some(jobs) = overrides.jobs {
        config.pipeline.jobs = jobs;
    }
}
