//! E2E: the `sluice` binary
//!
//! Runs the built executable through `std::process::Command` and checks exit
//! codes, the files it leaves behind, and stdin/stdout piping.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use filetime::FileTime;
use tempfile::TempDir;

fn sluice_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sluice"))
}

fn sluice(dir: &Path, args: &[&str]) -> Output {
    Command::new(sluice_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("SLUICE_CLEVEL")
        .env_remove("SLUICE_LOG")
        .output()
        .expect("failed to run sluice")
}

fn sluice_piped(dir: &Path, args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(sluice_bin())
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn sluice");
    let mut pipe = child.stdin.take().unwrap();
    let input = stdin.to_vec();
    // The child may exit before reading everything; that shows in its status.
    let writer = std::thread::spawn(move || {
        let _ = pipe.write_all(&input);
    });
    let out = child.wait_with_output().expect("failed to wait for sluice");
    writer.join().unwrap();
    out
}

/// A TempDir holding `input.txt` with ~8 KB of text.
fn make_temp_input() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.txt");
    fs::write(&input, "Hello, sluice!\n".repeat(550)).unwrap();
    (dir, input)
}

// ── 1. Compress / decompress round trip ──────────────────────────────────────

#[test]
fn test_cli_compress_decompress_roundtrip() {
    let (dir, input) = make_temp_input();
    let original = fs::read(&input).unwrap();

    let out = sluice(dir.path(), &["input.txt"]);
    assert!(out.status.success(), "compress should exit 0: {out:?}");
    assert!(!input.exists(), "source is removed without -k");
    let packed = dir.path().join("input.txt.slz");
    assert!(packed.exists());
    assert!(fs::metadata(&packed).unwrap().len() < original.len() as u64);

    let out = sluice(dir.path(), &["-d", "input.txt.slz"]);
    assert!(out.status.success(), "decompress should exit 0: {out:?}");
    assert_eq!(fs::read(&input).unwrap(), original);
    assert!(!packed.exists());
}

// ── 2. --version / --help ────────────────────────────────────────────────────

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    let out = sluice(dir.path(), &["--version"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("sluice"), "got {stdout:?}");
    assert!(stdout.contains(sluice::version_string()));
}

#[test]
fn test_cli_help_lists_options() {
    let dir = TempDir::new().unwrap();
    let out = sluice(dir.path(), &["--help"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    for flag in ["--decompress", "--test", "--list", "--keep", "--stdout", "--threads"] {
        assert!(stdout.contains(flag), "help is missing {flag}");
    }
}

#[test]
fn test_cli_rejects_unknown_option() {
    let dir = TempDir::new().unwrap();
    let out = sluice(dir.path(), &["--no-such-flag"]);
    assert!(!out.status.success());
}

// ── 3. stdin / stdout ────────────────────────────────────────────────────────

#[test]
fn test_cli_pipe_roundtrip() {
    let dir = TempDir::new().unwrap();
    let data = b"piped through standard streams\n".repeat(1000);

    let packed = sluice_piped(dir.path(), &["-c"], &data);
    assert!(packed.status.success(), "{packed:?}");
    assert!(packed.stdout.len() < data.len());

    let plain = sluice_piped(dir.path(), &["-d", "-c"], &packed.stdout);
    assert!(plain.status.success(), "{plain:?}");
    assert_eq!(plain.stdout, data);

    let tested = sluice_piped(dir.path(), &["-t"], &packed.stdout);
    assert!(tested.status.success());
}

#[test]
fn test_cli_stdout_keeps_source() {
    let (dir, input) = make_temp_input();
    let out = sluice(dir.path(), &["-c", "input.txt"]);
    assert!(out.status.success());
    assert!(input.exists());
    assert!(!dir.path().join("input.txt.slz").exists());

    let plain = sluice_piped(dir.path(), &["-dc"], &out.stdout);
    assert_eq!(plain.stdout, fs::read(&input).unwrap());
}

// ── 4. keep / force ──────────────────────────────────────────────────────────

#[test]
fn test_cli_keep_and_force() {
    let (dir, input) = make_temp_input();
    assert!(sluice(dir.path(), &["-k", "input.txt"]).status.success());
    assert!(input.exists());

    // Output exists: refused without -f, accepted with it.
    let out = sluice(dir.path(), &["-k", "input.txt"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("already exists"));
    assert!(sluice(dir.path(), &["-k", "-f", "input.txt"]).status.success());
}

// ── 5. Test mode ─────────────────────────────────────────────────────────────

#[test]
fn test_cli_test_mode_detects_damage() {
    let (dir, _) = make_temp_input();
    assert!(sluice(dir.path(), &["input.txt"]).status.success());
    let packed = dir.path().join("input.txt.slz");
    assert!(sluice(dir.path(), &["-t", "input.txt.slz"]).status.success());

    let mut bytes = fs::read(&packed).unwrap();
    let n = bytes.len();
    bytes[n - 5] ^= 0x20;
    fs::write(&packed, &bytes).unwrap();
    let out = sluice(dir.path(), &["-t", "input.txt.slz"]);
    assert!(!out.status.success());
    assert!(packed.exists());
}

// ── 6. List mode ─────────────────────────────────────────────────────────────

#[test]
fn test_cli_list_mode() {
    let (dir, _) = make_temp_input();
    assert!(sluice(dir.path(), &["input.txt"]).status.success());
    let out = sluice(dir.path(), &["-l", "input.txt.slz"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("uncompressed"));
    assert!(stdout.contains("input.txt"));
    assert!(stdout.contains(&(15 * 550).to_string()));
}

// ── 7. Metadata ──────────────────────────────────────────────────────────────

#[test]
fn test_cli_restores_mtime() {
    let (dir, input) = make_temp_input();
    filetime::set_file_mtime(&input, FileTime::from_unix_time(1_234_567_890, 0)).unwrap();
    assert!(sluice(dir.path(), &["input.txt"]).status.success());
    assert!(sluice(dir.path(), &["-d", "input.txt.slz"]).status.success());
    let restored = FileTime::from_last_modification_time(&fs::metadata(&input).unwrap());
    assert_eq!(restored.unix_seconds(), 1_234_567_890);
}

// ── 8. Levels and bad input ──────────────────────────────────────────────────

#[test]
fn test_cli_numeric_levels() {
    let (dir, input) = make_temp_input();
    let original = fs::read(&input).unwrap();
    for level in ["-1", "-5", "-9"] {
        assert!(sluice(dir.path(), &[level, "-f", "-k", "input.txt"]).status.success());
        fs::remove_file(&input).unwrap();
        assert!(sluice(dir.path(), &["-d", "-k", "input.txt.slz"]).status.success());
        assert_eq!(fs::read(&input).unwrap(), original);
    }
    assert!(!sluice(dir.path(), &["--level", "12", "input.txt"]).status.success());
}

#[test]
fn test_cli_decompress_garbage_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("junk.slz"), b"definitely not compressed").unwrap();
    let out = sluice(dir.path(), &["-d", "junk.slz"]);
    assert!(!out.status.success());
    assert!(!dir.path().join("junk").exists());
}
