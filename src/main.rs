//! Picframe - command-line tool for framing GIFs and quantizing images

use std::process::ExitCode;

use picframe::cli;

fn main() -> ExitCode {
    cli::run()
}
