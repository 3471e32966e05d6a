//! Binary entry point for the `sluice` command-line tool.
//!
//! 1. [`Cli::parse_env`] reads the command line (with `-1`..`-9` rewritten).
//! 2. The display level and the `tracing` subscriber are set up.
//! 3. [`ops::run`] processes every input and reports how many failed.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use sluice::cli::args::Cli;
use sluice::cli::constants::{set_display_level, COMPRESSOR_NAME};
use sluice::cli::ops;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "SLUICE_LOG";

fn init_tracing(display_level: u32) {
    let fallback = if display_level >= 4 { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    // Keep any subscriber that is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_env();
    set_display_level(cli.display_level());
    init_tracing(cli.display_level());

    sluice::displaylevel!(
        3,
        "*** {} v{} {}-bit ***\n",
        COMPRESSOR_NAME,
        sluice::version_string(),
        std::mem::size_of::<*const ()>() * 8
    );
    sluice::displaylevel!(4, "{}\n", sluice::build_info());

    match ops::run(&cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            sluice::displaylevel!(3, "{} file(s) failed\n", failed);
            ExitCode::FAILURE
        }
        Err(e) => {
            sluice::displaylevel!(1, "{}: {:#}\n", COMPRESSOR_NAME, e);
            ExitCode::FAILURE
        }
    }
}
