//! In-memory compression and decompression in a single call.
//!
//! Thin clients of [`CompressorStream`] and [`DecompressorStream`]: each
//! function allocates its output up front and drives one `step` to the end of
//! the stream.
//!
//! ```
//! let packed = sluice::oneshot::compress(b"hello hello hello", sluice::Level::DEFAULT).unwrap();
//! let plain = sluice::oneshot::decompress(&packed, 17).unwrap();
//! assert_eq!(plain, b"hello hello hello");
//! ```

use tracing::debug;

use crate::error::{CorruptKind, Error, Result};
use crate::stream::{
    CompressorStream, DecompressorStream, Flush, Level, StepStatus, StreamConfig,
};

/// Largest compressed size of `input_len` bytes.
#[inline]
pub fn compress_bound(input_len: usize) -> usize {
    CompressorStream::bound(input_len)
}

/// Compress `input` as a `Wrapped` stream at `effort`.
///
/// Only fails with [`Error::OutOfMemory`].
pub fn compress(input: &[u8], effort: Level) -> Result<Vec<u8>> {
    compress_with(input, &StreamConfig::default().with_level(effort), None)
}

/// Compress `input` with an explicit configuration and optional dictionary.
pub fn compress_with(
    input: &[u8],
    config: &StreamConfig,
    dictionary: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut stream = CompressorStream::new(*config)?;
    if let Some(dict) = dictionary {
        stream.set_dictionary(dict)?;
    }
    let mut out = alloc_zeroed(compress_bound(input.len()))?;
    let r = stream.step(input, &mut out, Flush::Finish)?;
    if r.status != StepStatus::StreamEnd || r.consumed != input.len() {
        // The bound covers every input; reaching here is a bug.
        debug!(status = ?r.status, "one-shot compression did not finish");
        return Err(Error::Protocol);
    }
    out.truncate(r.produced);
    Ok(out)
}

/// Decompress a complete `Wrapped` stream whose output fits in
/// `expected_output_cap` bytes.
///
/// A too-small cap fails with [`Error::OutputTooSmall`] carrying a size worth
/// retrying with. Input cut short is `Corrupt(Truncated)`, and bytes after the
/// end of the stream are `Corrupt(TrailingData)`.
pub fn decompress(input: &[u8], expected_output_cap: usize) -> Result<Vec<u8>> {
    decompress_with(input, expected_output_cap, &StreamConfig::default(), None)
}

/// Decompress with an explicit configuration and optional dictionary.
///
/// A stream that names a dictionary other than `dictionary` fails with
/// [`Error::DictionaryMismatch`].
pub fn decompress_with(
    input: &[u8],
    expected_output_cap: usize,
    config: &StreamConfig,
    dictionary: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut stream = DecompressorStream::new(*config)?;
    if let Some(dict) = dictionary {
        stream.set_dictionary(dict)?;
    }
    // A zero-length output is never filled, so ask for at least one byte.
    let mut out = alloc_zeroed(expected_output_cap.max(1))?;
    let r = stream.step(input, &mut out)?;
    match r.status {
        StepStatus::StreamEnd if r.produced <= expected_output_cap => {
            if r.consumed < input.len() {
                return Err(Error::Corrupt(CorruptKind::TrailingData));
            }
            out.truncate(r.produced);
            Ok(out)
        }
        StepStatus::StreamEnd | StepStatus::NeedMoreOutput => {
            let seen = r.produced + stream.pending_output();
            Err(Error::OutputTooSmall {
                minimum_required_so_far: seen.max(expected_output_cap + 1),
            })
        }
        StepStatus::NeedMoreInput | StepStatus::Ok => Err(Error::Corrupt(CorruptKind::Truncated)),
        StepStatus::Corrupt(kind) => Err(Error::Corrupt(kind)),
        StepStatus::NeedDictionary { .. } => Err(Error::DictionaryMismatch),
    }
}

fn alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}
