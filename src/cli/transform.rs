//! Border and round command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::compositor::Compositor;
use crate::config::{load_config_with_overrides, CliOverrides, PicframeConfig, Section};
use crate::pipeline::{self, PipelineReport};

use super::{with_pool, EXIT_ERROR, EXIT_SUCCESS};

/// Execute the border command
pub fn run_border(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    overrides: &CliOverrides,
    json: bool,
) -> ExitCode {
    let config = match load(config_path, overrides, Section::Border) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let compositor = match config.border.compositor() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    run_pipeline(input, output, &compositor, config.pipeline.jobs, json)
}

/// Execute the round command
pub fn run_round(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    overrides: &CliOverrides,
    json: bool,
) -> ExitCode {
    let config = match load(config_path, overrides, Section::Round) {
        Ok(config) => config,
        Err(code) => return code,
    };
    run_pipeline(input, output, &config.round.compositor(), config.pipeline.jobs, json)
}

fn load(
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    section: Section,
) -> Result<PicframeConfig, ExitCode> {
    load_config_with_overrides(config_path, overrides, &[section]).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

fn run_pipeline(
    input: &Path,
    output: &Path,
    compositor: &Compositor,
    jobs: usize,
    json: bool,
) -> ExitCode {
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        border = compositor.border(),
        radius = compositor.radius(),
        "starting run"
    );

    let result = match with_pool(jobs, || pipeline::run(input, output, compositor)) {
        Ok(result) => result,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match result {
        Ok(report) => {
            print_report(&report, json);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn print_report(report: &PipelineReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Warning: cannot serialize report: {}", e),
        }
        return;
    }
    let noun = if report.frames == 1 { "frame" } else { "frames" };
    println!(
        "Processed {} {} ({}x{}) -> {}",
        report.frames,
        noun,
        report.width,
        report.height,
        report.output.display()
    );
}
