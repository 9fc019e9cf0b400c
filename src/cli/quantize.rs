//! Quantize and threshold command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::{load_config_with_overrides, CliOverrides, Section};
use crate::output;
use crate::pipeline::read_image;
use crate::quantize::quantize;
use crate::threshold::threshold_bitmap;

use super::{with_pool, EXIT_ERROR, EXIT_SUCCESS};

/// Execute the quantize command
pub fn run_quantize(
    config_path: Option<&Path>,
    input: &Path,
    output: Option<&Path>,
    overrides: &CliOverrides,
) -> ExitCode {
    let config = match load_config_with_overrides(config_path, overrides, &[Section::Quantize]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let section = &config.quantize;

    let palette = match section.palette() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let image = match read_image(input) {
        Ok(img) => img.to_rgb8(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let size = section.target_size();
    let grid = match with_pool(config.pipeline.jobs, || quantize(&image, &palette, size)) {
        Ok(grid) => grid,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    tracing::info!(width = grid.width, height = grid.height, "quantized image");

    emit(&grid.to_c_array(&section.element_type, &section.name, section.style), output)
}

/// Execute the threshold command
pub fn run_threshold(
    config_path: Option<&Path>,
    input: &Path,
    output: Option<&Path>,
    overrides: &CliOverrides,
) -> ExitCode {
    let config = match load_config_with_overrides(config_path, overrides, &[Section::Threshold]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let section = &config.threshold;

    let image = match read_image(input) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let (width, height) = section.size();
    let grid = threshold_bitmap(&image, width, height, section.levels());
    emit(&grid.to_c_array(&section.element_type, &section.name, section.style), output)
}

/// Print to stdout, or write the file atomically.
fn emit(text: &str, output: Option<&Path>) -> ExitCode {
    match output {
        Some(path) => match output::write_text(path, text) {
            Ok(()) => {
                eprintln!("Wrote {}", path.display());
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: cannot write '{}': {}", path.display(), e);
                ExitCode::from(EXIT_ERROR)
            }
        },
        None => {
            print!("{}", text);
            ExitCode::from(EXIT_SUCCESS)
        }
    }
}
