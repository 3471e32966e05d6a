//! Input expansion, output naming and timestamp handling for the CLI.
//!
//! Directories are only entered with `-r`, using [`walkdir`] without following
//! symlinks, so cyclic links cannot loop. Symlink entries found inside a
//! walked directory are skipped; a symlink named on the command line is taken
//! as given.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use filetime::FileTime;
use walkdir::WalkDir;

use crate::displaylevel;

/// Flatten `inputs` into the list of files to process.
///
/// Without `recursive`, directories are reported and dropped.
pub fn expand_inputs(inputs: &[PathBuf], recursive: bool) -> io::Result<Vec<PathBuf>> {
    let mut result = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            result.push(input.clone());
            continue;
        }
        if !recursive {
            displaylevel!(1, "sluice: {}: is a directory -- ignored\n", input.display());
            continue;
        }
        for entry in WalkDir::new(input) {
            let entry = entry.map_err(|e| {
                e.io_error()
                    .map(|io| io::Error::new(io.kind(), io.to_string()))
                    .unwrap_or_else(|| io::Error::other(e.to_string()))
            })?;
            if entry.file_type().is_file() {
                result.push(entry.into_path());
            }
        }
    }
    Ok(result)
}

/// `src` with `suffix` appended.
pub fn compressed_name(src: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(src.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// `src` without `suffix`, or `None` if it does not end with it (or nothing
/// would be left).
pub fn decompressed_name(src: &Path, suffix: &str) -> Option<PathBuf> {
    let file_name = src.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(suffix)?;
    if stem.is_empty() {
        return None;
    }
    Some(src.with_file_name(stem))
}

pub fn has_suffix(src: &Path, suffix: &str) -> bool {
    src.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix))
}

/// File name without directory, as stored in a container header.
pub fn stored_name(src: &Path) -> Option<String> {
    src.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Modification time in whole seconds since the epoch; 0 when unknown or out
/// of range.
pub fn mtime_secs(meta: &fs::Metadata) -> u32 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| u32::try_from(d.as_secs()).ok())
        .unwrap_or(0)
}

/// Set the modification time of `path`; `secs == 0` means unknown and is
/// skipped.
pub fn restore_mtime(path: &Path, secs: u32) -> io::Result<()> {
    if secs == 0 {
        return Ok(());
    }
    filetime::set_file_mtime(path, FileTime::from_unix_time(i64::from(secs), 0))
}
