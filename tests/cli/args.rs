// Command-line surface as seen by a caller of the library.

use clap::error::ErrorKind;
use sluice::cli::args::{normalize_args, Cli, OpMode};
use std::ffi::OsString;
use std::path::PathBuf;

fn os(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

#[test]
fn version_and_help_are_clap_exits() {
    let v = Cli::try_parse_args(["sluice", "--version"]).unwrap_err();
    assert_eq!(v.kind(), ErrorKind::DisplayVersion);
    assert!(v.to_string().contains(sluice::version_string()));
    let h = Cli::try_parse_args(["sluice", "--help"]).unwrap_err();
    assert_eq!(h.kind(), ErrorKind::DisplayHelp);
}

#[test]
fn level_shortcuts_combine_with_flags() {
    assert_eq!(
        normalize_args(os(&["sluice", "-7dc", "file"])),
        os(&["sluice", "--level=7", "-dc", "file"])
    );
    assert_eq!(normalize_args(os(&["sluice", "-0"])), os(&["sluice", "--level=0"]));
    // Only a leading digit counts.
    assert_eq!(normalize_args(os(&["sluice", "-k9"])), os(&["sluice", "-k9"]));
}

#[test]
fn decompress_to_stdout_from_combined_flags() {
    let cli = Cli::try_parse_args(["sluice", "-dc", "a.slz", "b.slz"]).unwrap();
    assert_eq!(cli.op_mode(), OpMode::Decompress);
    assert!(cli.to_stdout);
    assert_eq!(cli.files, vec![PathBuf::from("a.slz"), PathBuf::from("b.slz")]);
}

#[test]
fn long_options() {
    let cli = Cli::try_parse_args([
        "sluice", "--keep", "--force", "--suffix", ".sz", "--threads", "0", "--recursive", "dir",
    ])
    .unwrap();
    assert!(cli.keep && cli.force && cli.recursive);
    assert_eq!(cli.suffix, ".sz");
    assert_eq!(cli.jobs, 0);
}

#[test]
fn list_excludes_test_and_decompress() {
    assert!(Cli::try_parse_args(["sluice", "-l", "-t", "x"]).is_err());
    assert!(Cli::try_parse_args(["sluice", "-l", "-d", "x"]).is_err());
    assert_eq!(Cli::try_parse_args(["sluice", "-l", "x"]).unwrap().op_mode(), OpMode::List);
}
