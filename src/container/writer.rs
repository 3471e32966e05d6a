//! Container encoder over any `io::Write`.

use std::io::{self, Write};

use tracing::debug;

use super::header::{encode_trailer, ContainerMeta};
use crate::checksum::ChecksumKind;
use crate::config::{self, IO_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::stream::{
    BlockChecksum, CompressorStream, Flush, Framing, Level, StepStatus, Strategy, StreamConfig,
};

/// Compression parameters for the container payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub level: Level,
    pub strategy: Strategy,
    pub window_log: u8,
    pub block_checksum: BlockChecksum,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            level: config::default_level(),
            strategy: Strategy::Default,
            window_log: config::WINDOW_LOG_DEFAULT,
            block_checksum: BlockChecksum::Disabled,
        }
    }
}

impl WriteOptions {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    fn stream_config(&self) -> StreamConfig {
        StreamConfig::default()
            .with_level(self.level)
            .with_strategy(self.strategy)
            .with_window_log(self.window_log)
            .with_block_checksum(self.block_checksum)
            .with_framing(Framing::Raw)
            .with_checksum(ChecksumKind::Crc32)
    }
}

/// What `close` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSummary {
    pub uncompressed: u64,
    /// Header, payload and trailer.
    pub compressed: u64,
    pub crc32: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterPhase {
    WritingHeader,
    Writing,
    WritingTrailer,
    Closed,
}

/// Streams bytes into a container.
///
/// The header is written by [`open`](Self::open). [`close`](Self::close)
/// finishes the payload and writes the trailer; it is idempotent, and
/// `write` after it fails with [`Error::Closed`]. Dropping an unclosed writer
/// closes it, ignoring errors.
pub struct ContainerWriter<W: Write> {
    inner: Option<W>,
    stream: CompressorStream,
    buf: Vec<u8>,
    phase: WriterPhase,
    meta: ContainerMeta,
    header_len: u64,
    /// First error hit while writing; every later call reports it.
    errored: Option<Error>,
    closed_with: Option<Result<ContainerSummary>>,
}

impl<W: Write> ContainerWriter<W> {
    /// Write the header for `meta` and return a writer ready for payload.
    pub fn open(inner: W, meta: ContainerMeta, options: WriteOptions) -> Result<Self> {
        let stream = CompressorStream::new(options.stream_config())?;
        let header = meta.encode()?;
        let mut w = ContainerWriter {
            inner: Some(inner),
            stream,
            buf: vec![0u8; IO_BUFFER_SIZE],
            phase: WriterPhase::WritingHeader,
            meta,
            header_len: header.len() as u64,
            errored: None,
            closed_with: None,
        };
        w.write_inner(&header)?;
        w.phase = WriterPhase::Writing;
        Ok(w)
    }

    /// Compress `data` into the container. Returns `data.len()`.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.check_open()?;
        if data.is_empty() {
            return Ok(0);
        }
        self.pump(data, Flush::NoFlush)?;
        Ok(data.len())
    }

    /// Push everything written so far to the sink, ending with a sync marker
    /// (`SyncFlush`) or a full marker (`FullFlush`).
    pub fn flush_with(&mut self, mode: Flush) -> Result<()> {
        if !matches!(mode, Flush::SyncFlush | Flush::FullFlush) {
            return Err(Error::ParameterInvalid);
        }
        self.check_open()?;
        self.pump(&[], mode)?;
        self.flush_inner()?;
        Ok(())
    }

    /// Finish the payload and write the trailer. Later calls return the same
    /// result.
    pub fn close(&mut self) -> Result<ContainerSummary> {
        if let Some(result) = self.closed_with {
            return result;
        }
        let result = self.close_inner();
        self.phase = WriterPhase::Closed;
        self.closed_with = Some(result);
        result
    }

    fn close_inner(&mut self) -> Result<ContainerSummary> {
        if let Some(err) = self.errored {
            return Err(err);
        }
        self.phase = WriterPhase::WritingTrailer;
        self.pump(&[], Flush::Finish)?;
        let crc = self.stream.checksum().value();
        let uncompressed = self.stream.total_in();
        self.write_inner(&encode_trailer(crc, uncompressed))?;
        self.flush_inner()?;
        let summary = ContainerSummary {
            uncompressed,
            compressed: self.header_len
                + self.stream.total_out()
                + super::header::TRAILER_SIZE as u64,
            crc32: crc,
        };
        debug!(
            uncompressed = summary.uncompressed,
            compressed = summary.compressed,
            name = ?self.meta.name,
            "container closed"
        );
        Ok(summary)
    }

    /// Close and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        self.inner.take().ok_or(Error::Closed)
    }

    pub fn meta(&self) -> &ContainerMeta {
        &self.meta
    }

    /// Uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.stream.total_in()
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    fn check_open(&self) -> Result<()> {
        if self.phase == WriterPhase::Closed {
            return Err(Error::Closed);
        }
        match self.errored {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&mut self, err: Error) -> Error {
        self.errored.get_or_insert(err);
        err
    }

    /// Drive the compressor over `data` until it is consumed (and, for a
    /// flush or finish, until the stream has emitted everything).
    fn pump(&mut self, data: &[u8], mode: Flush) -> Result<()> {
        let mut pos = 0;
        loop {
            let r = match self.stream.step(&data[pos..], &mut self.buf, mode) {
                Ok(r) => r,
                Err(e) => return Err(self.record(e)),
            };
            pos += r.consumed;
            if r.produced > 0 {
                let written = match self.inner.as_mut() {
                    Some(inner) => inner.write_all(&self.buf[..r.produced]),
                    None => Ok(()),
                };
                if let Err(e) = written {
                    return Err(self.record(e.into()));
                }
            }
            match r.status {
                StepStatus::NeedMoreOutput => continue,
                StepStatus::NeedMoreInput if pos < data.len() => continue,
                StepStatus::NeedMoreInput | StepStatus::Ok | StepStatus::StreamEnd => {
                    return Ok(())
                }
                StepStatus::NeedDictionary { .. } | StepStatus::Corrupt(_) => {
                    return Err(self.record(Error::Protocol))
                }
            }
        }
    }

    fn write_inner(&mut self, bytes: &[u8]) -> Result<()> {
        let written = match self.inner.as_mut() {
            Some(inner) => inner.write_all(bytes),
            None => return Err(Error::Closed),
        };
        written.map_err(|e| self.record(e.into()))
    }

    fn flush_inner(&mut self) -> Result<()> {
        let flushed = match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        };
        flushed.map_err(|e| self.record(e.into()))
    }
}

impl<W: Write> Write for ContainerWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ContainerWriter::write(self, buf).map_err(io::Error::from)
    }

    /// Sync-flushes the payload so a reader can decode everything written so far.
    fn flush(&mut self) -> io::Result<()> {
        self.flush_with(Flush::SyncFlush).map_err(io::Error::from)
    }
}

impl<W: Write> Drop for ContainerWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() && self.phase != WriterPhase::Closed && self.errored.is_none() {
            let _ = self.close();
        }
    }
}

impl<W: Write> core::fmt::Debug for ContainerWriter<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContainerWriter")
            .field("phase", &self.phase)
            .field("meta", &self.meta)
            .field("stream", &self.stream)
            .finish()
    }
}
