//! Drive a stream between `io::Read` and `io::Write` (or plain closures).

use std::io::{self, Read, Write};

use crate::config::IO_BUFFER_SIZE;
use crate::error::{CorruptKind, Error, Result};
use crate::stream::{
    CompressorStream, DecompressorStream, Flush, StepStatus, StreamConfig, TotalCounters,
};

/// Compress everything `reader` yields into `writer` as one stream.
pub fn compress_copy<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    config: &StreamConfig,
) -> Result<TotalCounters> {
    let mut stream = CompressorStream::new(*config)?;
    let mut in_buf = vec![0u8; IO_BUFFER_SIZE];
    let mut out_buf = vec![0u8; IO_BUFFER_SIZE];

    loop {
        let n = read_some(reader, &mut in_buf)?;
        let mode = if n == 0 { Flush::Finish } else { Flush::NoFlush };
        let mut pos = 0;
        loop {
            let r = stream.step(&in_buf[pos..n], &mut out_buf, mode)?;
            pos += r.consumed;
            writer.write_all(&out_buf[..r.produced])?;
            match r.status {
                StepStatus::StreamEnd => {
                    writer.flush()?;
                    return stream.end();
                }
                StepStatus::NeedMoreOutput => continue,
                _ if pos < n => continue,
                _ => break,
            }
        }
    }
}

/// Decompress one stream from `reader` into `writer`.
pub fn decompress_copy<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    config: &StreamConfig,
) -> Result<TotalCounters> {
    let mut stream = DecompressorStream::new(*config)?;
    let totals = decompress_with_callbacks(
        &mut stream,
        |buf| reader.read(buf),
        |out| writer.write_all(out),
    )?;
    writer.flush()?;
    Ok(totals)
}

/// Decode with `stream`, pulling compressed bytes from `pull` (0 = end of
/// input) and pushing decoded bytes to `push`.
///
/// Stops at the end of the stream. Bytes pulled past it fail with
/// `Corrupt(TrailingData)`; running out of input before it is
/// `Corrupt(Truncated)`. Output pushed before a failure stays pushed.
pub fn decompress_with_callbacks<P, Q>(
    stream: &mut DecompressorStream,
    mut pull: P,
    mut push: Q,
) -> Result<TotalCounters>
where
    P: FnMut(&mut [u8]) -> io::Result<usize>,
    Q: FnMut(&[u8]) -> io::Result<()>,
{
    let mut in_buf = vec![0u8; IO_BUFFER_SIZE];
    let mut out_buf = vec![0u8; IO_BUFFER_SIZE];
    let (mut pos, mut len) = (0usize, 0usize);
    let mut eof = false;

    loop {
        if pos == len && !eof {
            len = loop {
                match pull(&mut in_buf) {
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    other => break other?,
                }
            };
            pos = 0;
            eof = len == 0;
        }
        let r = stream.step(&in_buf[pos..len], &mut out_buf)?;
        pos += r.consumed;
        if r.produced > 0 {
            push(&out_buf[..r.produced])?;
        }
        match r.status {
            StepStatus::StreamEnd => {
                if pos < len {
                    return Err(Error::Corrupt(CorruptKind::TrailingData));
                }
                return Ok(TotalCounters {
                    total_in: stream.total_in(),
                    total_out: stream.total_out(),
                    checksum: stream.checksum(),
                });
            }
            StepStatus::NeedMoreOutput | StepStatus::Ok => {}
            StepStatus::NeedMoreInput => {
                if eof {
                    return Err(Error::Corrupt(CorruptKind::Truncated));
                }
            }
            StepStatus::Corrupt(kind) => return Err(Error::Corrupt(kind)),
            StepStatus::NeedDictionary { .. } => return Err(Error::DictionaryMismatch),
        }
    }
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
