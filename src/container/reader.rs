//! Container decoder over any `io::Read`.

use std::io::{self, Read};

use tracing::{debug, warn};

use super::header::{parse_trailer, ContainerMeta, TRAILER_SIZE};
use crate::checksum::ChecksumKind;
use crate::config::{IO_BUFFER_SIZE, WINDOW_LOG_MAX};
use crate::error::{CorruptKind, Error, Result};
use crate::stream::{DecompressorStream, Framing, StepStatus, StreamConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderPhase {
    ParsingHeader,
    Reading,
    ParsingTrailer,
    Eof,
    Closed,
}

/// Streams decoded bytes out of a container.
///
/// Concatenated members are decoded back to back as one logical stream. The
/// metadata reported by [`meta`](Self::meta) is that of the first member.
/// Each trailer is checked when it is reached, but a mismatch only surfaces
/// from [`close`](Self::close) as [`Error::TrailerMismatch`]; plain `read`
/// calls (and the `io::Read` impl) keep returning data.
pub struct ContainerReader<R: Read> {
    inner: R,
    in_buf: Vec<u8>,
    in_pos: usize,
    in_len: usize,
    stream: DecompressorStream,
    phase: ReaderPhase,
    meta: ContainerMeta,
    pushed: Option<u8>,
    /// Some member's trailer disagreed with what was decoded.
    mismatch: bool,
    /// First fatal error; every later `read` reports it.
    errored: Option<Error>,
    closed_with: Option<Result<()>>,
    members: u32,
    /// Uncompressed bytes of completed members.
    done_out: u64,
}

impl<R: Read> ContainerReader<R> {
    /// Parse the first container header from `inner`.
    ///
    /// Fails with `Corrupt(Truncated)` if the source ends inside the header,
    /// including when it is empty.
    pub fn open(inner: R) -> Result<Self> {
        let config = StreamConfig::default()
            .with_framing(Framing::Raw)
            .with_checksum(ChecksumKind::Crc32)
            .with_window_log(WINDOW_LOG_MAX);
        let mut r = ContainerReader {
            inner,
            in_buf: vec![0u8; IO_BUFFER_SIZE],
            in_pos: 0,
            in_len: 0,
            stream: DecompressorStream::new(config)?,
            phase: ReaderPhase::ParsingHeader,
            meta: ContainerMeta::default(),
            pushed: None,
            mismatch: false,
            errored: None,
            closed_with: None,
            members: 0,
            done_out: 0,
        };
        match r.next_header()? {
            Some(meta) => {
                debug!(name = ?meta.name, mtime = meta.mtime, "container opened");
                r.meta = meta;
                r.phase = ReaderPhase::Reading;
                Ok(r)
            }
            None => Err(Error::Corrupt(CorruptKind::Truncated)),
        }
    }

    /// Fill `buf` with decoded bytes. Returns 0 once every member has been
    /// read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.phase == ReaderPhase::Closed {
            return Err(Error::Closed);
        }
        if let Some(err) = self.errored {
            return Err(err);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let mut written = 0;
        if let Some(byte) = self.pushed.take() {
            buf[0] = byte;
            written = 1;
            if buf.len() == 1 {
                return Ok(1);
            }
        }

        loop {
            match self.phase {
                ReaderPhase::Reading => {
                    let step = self
                        .stream
                        .step(&self.in_buf[self.in_pos..self.in_len], &mut buf[written..]);
                    let r = match step {
                        Ok(r) => r,
                        Err(e) => return self.fail(e, written),
                    };
                    self.in_pos += r.consumed;
                    written += r.produced;
                    match r.status {
                        StepStatus::StreamEnd => self.phase = ReaderPhase::ParsingTrailer,
                        StepStatus::NeedMoreOutput => return Ok(written),
                        StepStatus::NeedMoreInput | StepStatus::Ok => {
                            if written > 0 {
                                return Ok(written);
                            }
                            if !self.fill()? {
                                return self.fail(Error::Corrupt(CorruptKind::Truncated), written);
                            }
                        }
                        StepStatus::Corrupt(kind) => {
                            return self.fail(Error::Corrupt(kind), written)
                        }
                        StepStatus::NeedDictionary { .. } => {
                            return self.fail(Error::Protocol, written)
                        }
                    }
                }

                ReaderPhase::ParsingTrailer => {
                    while self.in_len - self.in_pos < TRAILER_SIZE {
                        if !self.fill()? {
                            return self.fail(Error::Corrupt(CorruptKind::Truncated), written);
                        }
                    }
                    let (crc, size) =
                        parse_trailer(&self.in_buf[self.in_pos..self.in_pos + TRAILER_SIZE]);
                    self.in_pos += TRAILER_SIZE;
                    self.check_trailer(crc, size);
                    self.stream.reset();
                    self.phase = ReaderPhase::ParsingHeader;
                }

                ReaderPhase::ParsingHeader => match self.next_header() {
                    Ok(Some(meta)) => {
                        debug!(member = self.members, name = ?meta.name, "next container member");
                        self.phase = ReaderPhase::Reading;
                    }
                    Ok(None) => self.phase = ReaderPhase::Eof,
                    Err(e) => return self.fail(e, written),
                },

                ReaderPhase::Eof | ReaderPhase::Closed => return Ok(written),
            }
        }
    }

    /// Un-read one byte: the next `read` returns it first.
    ///
    /// Only one byte may be pending; a second call before it is read fails
    /// with [`Error::BufferFull`].
    pub fn push_back(&mut self, byte: u8) -> Result<()> {
        if self.phase == ReaderPhase::Closed {
            return Err(Error::Closed);
        }
        if self.pushed.is_some() {
            return Err(Error::BufferFull);
        }
        self.pushed = Some(byte);
        Ok(())
    }

    /// Decode whatever is left, then report whether every trailer matched.
    /// Later calls return the same result.
    pub fn close(&mut self) -> Result<()> {
        if let Some(result) = self.closed_with {
            return result;
        }
        let result = self.close_inner();
        self.phase = ReaderPhase::Closed;
        self.closed_with = Some(result);
        result
    }

    fn close_inner(&mut self) -> Result<()> {
        let mut scratch = vec![0u8; IO_BUFFER_SIZE];
        while self.read(&mut scratch)? > 0 {}
        if self.mismatch {
            return Err(Error::TrailerMismatch);
        }
        Ok(())
    }

    /// Metadata from the first member's header.
    pub fn meta(&self) -> &ContainerMeta {
        &self.meta
    }

    /// Members whose trailer has been reached.
    pub fn members(&self) -> u32 {
        self.members
    }

    /// Decoded bytes so far, across members.
    pub fn total_out(&self) -> u64 {
        self.done_out + self.stream.total_out()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn check_trailer(&mut self, crc: u32, size: u32) {
        let got_crc = self.stream.checksum().value();
        let got_size = self.stream.total_out() as u32;
        if crc != got_crc || size != got_size {
            warn!(
                member = self.members,
                expected_crc = crc,
                got_crc,
                expected_size = size,
                got_size,
                "container trailer mismatch"
            );
            self.mismatch = true;
        }
        self.members += 1;
        self.done_out += self.stream.total_out();
    }

    /// Parse the next member header. `Ok(None)` means the source is done:
    /// clean EOF after a member, or bytes that are not a container (logged
    /// and skipped).
    fn next_header(&mut self) -> Result<Option<ContainerMeta>> {
        loop {
            let avail = &self.in_buf[self.in_pos..self.in_len];
            if avail.is_empty() && self.members > 0 {
                if !self.fill()? {
                    return Ok(None);
                }
                continue;
            }
            match ContainerMeta::parse(avail) {
                Ok(Some((meta, len))) => {
                    self.in_pos += len;
                    return Ok(Some(meta));
                }
                Ok(None) => {
                    if !self.fill()? {
                        return Err(Error::Corrupt(CorruptKind::Truncated));
                    }
                }
                Err(Error::Corrupt(CorruptKind::BadMagic)) if self.members > 0 => {
                    warn!(members = self.members, "ignoring trailing data after container");
                    self.in_pos = self.in_len;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read more source bytes behind the unconsumed ones. `Ok(false)` at EOF.
    fn fill(&mut self) -> Result<bool> {
        if self.in_pos > 0 {
            self.in_buf.copy_within(self.in_pos..self.in_len, 0);
            self.in_len -= self.in_pos;
            self.in_pos = 0;
        }
        if self.in_len == self.in_buf.len() {
            // A header with long fields can outgrow the buffer.
            self.in_buf.resize(self.in_buf.len() * 2, 0);
        }
        loop {
            match self.inner.read(&mut self.in_buf[self.in_len..]) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.in_len += n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Record a fatal error. Bytes already placed in the caller's buffer are
    /// still handed out; the error comes back on the next call.
    fn fail(&mut self, err: Error, written: usize) -> Result<usize> {
        self.errored = Some(err);
        if written > 0 {
            Ok(written)
        } else {
            Err(err)
        }
    }
}

impl<R: Read> Read for ContainerReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        ContainerReader::read(self, buf).map_err(io::Error::from)
    }
}

impl<R: Read> core::fmt::Debug for ContainerReader<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContainerReader")
            .field("phase", &self.phase)
            .field("meta", &self.meta)
            .field("members", &self.members)
            .field("mismatch", &self.mismatch)
            .field("stream", &self.stream)
            .finish()
    }
}
