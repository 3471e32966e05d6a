// File operations driven through `ops::run`.

use std::fs;
use std::path::Path;

use filetime::FileTime;
use sluice::cli::args::Cli;
use sluice::cli::ops::run;
use sluice::container::inspect;
use tempfile::TempDir;

fn cli(args: &[&str]) -> Cli {
    let mut full = vec!["sluice", "-qq"];
    full.extend_from_slice(args);
    Cli::try_parse_args(full).unwrap()
}

fn s(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn mtime(p: &Path) -> i64 {
    FileTime::from_last_modification_time(&fs::metadata(p).unwrap()).unix_seconds()
}

#[test]
fn stored_name_and_mtime_come_back() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("orig.txt");
    fs::write(&src, b"remember my name ".repeat(50)).unwrap();
    filetime::set_file_mtime(&src, FileTime::from_unix_time(1_500_000_000, 0)).unwrap();

    assert_eq!(run(&cli(&[s(&src)])).unwrap(), 0);
    let renamed = dir.path().join("renamed.slz");
    fs::rename(dir.path().join("orig.txt.slz"), &renamed).unwrap();

    let info = inspect(fs::File::open(&renamed).unwrap()).unwrap();
    assert_eq!(info.meta.name.as_deref(), Some("orig.txt"));
    assert_eq!(info.meta.mtime, 1_500_000_000);

    assert_eq!(run(&cli(&["-d", "-k", "-N", s(&renamed)])).unwrap(), 0);
    assert_eq!(mtime(&src), 1_500_000_000);
    assert_eq!(fs::read(&src).unwrap(), b"remember my name ".repeat(50));

    // Without -N the name comes from the file name.
    assert_eq!(run(&cli(&["-d", s(&renamed)])).unwrap(), 0);
    assert!(dir.path().join("renamed").exists());
    assert!(!renamed.exists());
}

#[test]
fn no_name_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("anon.txt");
    fs::write(&src, b"anonymous").unwrap();
    filetime::set_file_mtime(&src, FileTime::from_unix_time(1_400_000_000, 0)).unwrap();

    assert_eq!(run(&cli(&["-n", "-k", s(&src)])).unwrap(), 0);
    let packed = dir.path().join("anon.txt.slz");
    let info = inspect(fs::File::open(&packed).unwrap()).unwrap();
    assert_eq!(info.meta.name, None);
    assert_eq!(info.meta.mtime, 0);
}

#[test]
fn recursive_compression_walks_subdirectories() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a/b");
    fs::create_dir_all(&nested).unwrap();
    fs::write(dir.path().join("top"), b"top level").unwrap();
    fs::write(nested.join("deep"), b"deep down").unwrap();

    // Without -r the directory is skipped and nothing fails.
    assert_eq!(run(&cli(&[s(dir.path())])).unwrap(), 0);
    assert!(dir.path().join("top").exists());

    assert_eq!(run(&cli(&["-r", s(dir.path())])).unwrap(), 0);
    assert!(dir.path().join("top.slz").exists());
    assert!(nested.join("deep.slz").exists());
    assert!(!nested.join("deep").exists());

    assert_eq!(run(&cli(&["-d", "-r", s(dir.path())])).unwrap(), 0);
    assert_eq!(fs::read(nested.join("deep")).unwrap(), b"deep down");
}

#[test]
fn custom_suffix_and_already_suffixed_inputs() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("data.bin");
    fs::write(&src, b"suffix test").unwrap();

    assert_eq!(run(&cli(&["-S", ".sz", "-k", s(&src)])).unwrap(), 0);
    let packed = dir.path().join("data.bin.sz");
    assert!(packed.exists());

    // Compressing a file that already carries the suffix needs -f.
    assert_eq!(run(&cli(&["-S", ".sz", "-k", s(&packed)])).unwrap(), 1);
    assert_eq!(run(&cli(&["-S", ".sz", "-k", "-f", s(&packed)])).unwrap(), 0);
    assert!(dir.path().join("data.bin.sz.sz").exists());

    fs::remove_file(&src).unwrap();
    assert_eq!(run(&cli(&["-d", "-S", ".sz", s(&packed)])).unwrap(), 0);
    assert_eq!(fs::read(&src).unwrap(), b"suffix test");
}

#[test]
fn test_mode_flags_damage_and_keeps_files() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("victim");
    fs::write(&src, b"0123456789abcdef".repeat(64)).unwrap();
    assert_eq!(run(&cli(&[s(&src)])).unwrap(), 0);
    let packed = dir.path().join("victim.slz");

    assert_eq!(run(&cli(&["-t", s(&packed)])).unwrap(), 0);
    let mut bytes = fs::read(&packed).unwrap();
    let crc_pos = bytes.len() - 8;
    bytes[crc_pos] ^= 0x01;
    fs::write(&packed, &bytes).unwrap();

    assert_eq!(run(&cli(&["-t", s(&packed)])).unwrap(), 1);
    assert!(packed.exists());
    // A failed decompression leaves no partial output behind.
    assert_eq!(run(&cli(&["-d", s(&packed)])).unwrap(), 1);
    assert!(!src.exists());
    assert!(packed.exists());
}

#[test]
fn list_counts_failures() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("listed");
    fs::write(&src, b"list me").unwrap();
    assert_eq!(run(&cli(&["-k", s(&src)])).unwrap(), 0);
    let packed = dir.path().join("listed.slz");

    assert_eq!(run(&cli(&["-l", s(&packed)])).unwrap(), 0);
    assert_eq!(run(&cli(&["-l", s(&packed), s(&src)])).unwrap(), 1);
}

#[test]
fn every_level_round_trips() {
    let dir = TempDir::new().unwrap();
    let data = b"levels levels levels, with a little variety 0123".repeat(200);
    for level in 0..=9 {
        let src = dir.path().join(format!("l{level}"));
        fs::write(&src, &data).unwrap();
        let flag = format!("-{level}");
        assert_eq!(run(&cli(&[flag.as_str(), s(&src)])).unwrap(), 0);
        let packed = dir.path().join(format!("l{level}.slz"));
        assert_eq!(run(&cli(&["-d", s(&packed)])).unwrap(), 0);
        assert_eq!(fs::read(&src).unwrap(), data);
    }
}
