//! Command-line argument parsing for the `sluice` binary.
//!
//! Built on clap's derive API. The gzip-style level shortcuts `-1` .. `-9`
//! are rewritten to `--level=N` by [`normalize_args`] before clap sees them,
//! so `-9`, `-9k` and `--level 9` are equivalent.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::cli::constants::SLZ_EXTENSION;
use crate::config::{LEVEL_MAX, LEVEL_MIN};

/// Compress or decompress files in the sluice container format.
#[derive(Debug, Clone, Parser)]
#[command(name = "sluice", version, about)]
pub struct Cli {
    /// Decompress
    #[arg(short = 'd', long, conflicts_with_all = ["test", "list"])]
    pub decompress: bool,

    /// Test the integrity of compressed files
    #[arg(short = 't', long, conflicts_with = "list")]
    pub test: bool,

    /// List header and trailer information of compressed files
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Write to standard output, keep input files
    #[arg(short = 'c', long = "stdout")]
    pub to_stdout: bool,

    /// Keep (don't delete) input files
    #[arg(short = 'k', long)]
    pub keep: bool,

    /// Overwrite existing output files, compress files that already have the suffix
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Compression level (also -1 .. -9)
    #[arg(long, value_name = "N",
          value_parser = clap::value_parser!(u8).range(i64::from(LEVEL_MIN)..=i64::from(LEVEL_MAX)))]
    pub level: Option<u8>,

    /// Operate recursively on directories
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Suffix of compressed files
    #[arg(short = 'S', long, value_name = "SUF", default_value = SLZ_EXTENSION)]
    pub suffix: String,

    /// Don't save (compress) or restore (decompress) the original name and mtime
    #[arg(short = 'n', long, conflicts_with = "name")]
    pub no_name: bool,

    /// Decompress to the original name stored in the header
    #[arg(short = 'N', long)]
    pub name: bool,

    /// Files processed in parallel (0 = one per core)
    #[arg(short = 'T', long = "threads", value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// More messages (repeatable)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Fewer messages (repeatable)
    #[arg(short = 'q', long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Input files; none or `-` reads standard input
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

/// What the invocation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    Compress,
    Decompress,
    Test,
    List,
}

impl Cli {
    /// Parse the process arguments.
    pub fn parse_env() -> Cli {
        Cli::parse_from(normalize_args(std::env::args_os()))
    }

    /// Parse an explicit argument list (first item is the program name).
    pub fn try_parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Cli::try_parse_from(normalize_args(args.into_iter().map(Into::into)))
    }

    pub fn op_mode(&self) -> OpMode {
        if self.list {
            OpMode::List
        } else if self.test {
            OpMode::Test
        } else if self.decompress {
            OpMode::Decompress
        } else {
            OpMode::Compress
        }
    }

    /// 0 = silent .. 4 = debug; starts at 2.
    pub fn display_level(&self) -> u32 {
        (2 + i32::from(self.verbose) - i32::from(self.quiet)).clamp(0, 4) as u32
    }
}

/// Rewrite `-N[flags]` into `--level=N [-flags]` up to a bare `--`.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = Vec::new();
    let mut options_done = false;
    for arg in args {
        if options_done {
            out.push(arg);
            continue;
        }
        if arg == "--" {
            options_done = true;
            out.push(arg);
            continue;
        }
        let rewritten = arg.to_str().and_then(|s| {
            let rest = s.strip_prefix('-')?;
            let digit = rest.chars().next().filter(char::is_ascii_digit)?;
            Some((digit, &rest[1..]))
        });
        match rewritten {
            Some((digit, flags)) => {
                out.push(OsString::from(format!("--level={digit}")));
                if !flags.is_empty() {
                    out.push(OsString::from(format!("-{flags}")));
                }
            }
            None => out.push(arg),
        }
    }
    out
}
