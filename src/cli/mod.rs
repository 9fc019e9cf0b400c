//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod quantize;
mod transform;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::config::CliOverrides;
use crate::quantize::ArrayStyle;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Picframe - borders, rounded corners and palette quantization for images
#[derive(Parser)]
#[command(name = "picframe")]
#[command(about = "Picframe - add borders and rounded corners to GIFs, quantize images to C arrays")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: picframe.toml in this or a parent directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Worker threads for per-frame work (0 = one per core)
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG also works.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Surround every frame with a colored border and round the corners
    #[command(allow_negative_numbers = true)]
    Border {
        /// Input image (animated GIF or any still image)
        input: PathBuf,

        /// Output path; .gif keeps animation, other extensions write a still
        output: PathBuf,

        /// Border thickness in pixels (default: 20)
        border: Option<i64>,

        /// Corner radius in pixels (default: 40)
        radius: Option<i64>,

        /// Border color as hex or CSS (default: opaque black)
        #[arg(long)]
        color: Option<String>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Round the corners of every frame without adding a border
    #[command(allow_negative_numbers = true)]
    Round {
        /// Input image (animated GIF or any still image)
        input: PathBuf,

        /// Output path; .gif keeps animation, other extensions write a still
        output: PathBuf,

        /// Corner radius in pixels (default: 30)
        radius: Option<i64>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Map an image onto a fixed palette and print it as a C array
    #[command(allow_negative_numbers = true)]
    Quantize {
        /// Input image
        input: PathBuf,

        /// Write the array to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target width before quantizing (default: 100)
        #[arg(long)]
        width: Option<i64>,

        /// Target height before quantizing (default: 12)
        #[arg(long)]
        height: Option<i64>,

        /// Quantize at the source size
        #[arg(long)]
        no_resize: bool,

        /// Palette entry as CODE=COLOR; repeat to build the palette in tie-break order
        #[arg(long = "color", value_name = "CODE=COLOR", value_parser = parse_palette_entry)]
        entries: Vec<(i64, String)>,

        /// C array name (default: image)
        #[arg(long)]
        name: Option<String>,

        /// C element type (default: int)
        #[arg(long)]
        element_type: Option<String>,

        /// Row layout (default: aligned)
        #[arg(long, value_enum)]
        style: Option<ArrayStyle>,
    },
    /// Threshold an image at its mean brightness and print a two-level C array
    #[command(allow_negative_numbers = true)]
    Threshold {
        /// Input image
        input: PathBuf,

        /// Write the array to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output width (default: 20)
        #[arg(long)]
        width: Option<i64>,

        /// Output height (default: 20)
        #[arg(long)]
        height: Option<i64>,

        /// Code for bright pixels (default: 9)
        #[arg(long)]
        on: Option<i64>,

        /// Code for dark pixels (default: 0)
        #[arg(long)]
        off: Option<i64>,

        /// C array name (default: site_qr)
        #[arg(long)]
        name: Option<String>,

        /// C element type (default: uint8_t)
        #[arg(long)]
        element_type: Option<String>,

        /// Row layout (default: compact)
        #[arg(long, value_enum)]
        style: Option<ArrayStyle>,
    },
}

/// Parse a `CODE=COLOR` palette flag.
fn parse_palette_entry(s: &str) -> Result<(i64, String), String> {
    let (code, color) =
        s.split_once('=').ok_or_else(|| format!("expected CODE=COLOR, got '{}'", s))?;
    let code = code.trim().parse::<i64>().map_err(|e| format!("bad palette code '{}': {}", code, e))?;
    if color.trim().is_empty() {
        return Err(format!("palette entry '{}' has no color", s));
    }
    Ok((code, color.trim().to_string()))
}

/// Install the stderr log subscriber.
///
/// `-v` flags win over `RUST_LOG`; without either only warnings are shown.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run `f` on a rayon pool with `jobs` workers (0 = rayon's default).
pub(crate) fn with_pool<T, F>(jobs: usize, f: F) -> Result<T, String>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| format!("cannot start worker pool: {}", e))?;
    Ok(pool.install(f))
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let base = CliOverrides { jobs: cli.jobs, ..Default::default() };

    match cli.command {
        Commands::Border { input, output, border, radius, color, json } => {
            let overrides = CliOverrides {
                border_size: border,
                border_radius: radius,
                border_color: color,
                ..base
            };
            transform::run_border(config, &input, &output, &overrides, json)
        }
        Commands::Round { input, output, radius, json } => {
            let overrides = CliOverrides { round_radius: radius, ..base };
            transform::run_round(config, &input, &output, &overrides, json)
        }
        Commands::Quantize {
            input,
            output,
            width,
            height,
            no_resize,
            entries,
            name,
            element_type,
            style,
        } => {
            let overrides = CliOverrides {
                quantize_width: width,
                quantize_height: height,
                no_resize,
                palette: entries,
                name,
                element_type,
                style,
                ..base
            };
            quantize::run_quantize(config, &input, output.as_deref(), &overrides)
        }
        Commands::Threshold { input, output, width, height, on, off, name, element_type, style } => {
            let overrides = CliOverrides {
                threshold_width: width,
                threshold_height: height,
                threshold_on: on,
                threshold_off: off,
                name,
                element_type,
                style,
                ..base
            };
            quantize::run_threshold(config, &input, output.as_deref(), &overrides)
        }
    }
}
