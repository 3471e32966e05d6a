//! Streaming decompressor.
//!
//! A stage machine that accumulates each structural unit (header, block
//! header, block body, marker magic, trailer) into `tmp` until it is complete,
//! then acts on it. Decoded blocks go to `out_buf` and are drained into the
//! caller's output, so a step can stop at any byte of input or output and
//! resume on the next call.

use tracing::{debug, warn};

use super::format::{
    header_size, is_marker_prefix, parse_block_header, read_le32, BlockKind, StreamHeader,
    BF_SIZE, BH_SIZE, MARKER_MAGIC, MARKER_SIZE, TRAILER_SIZE,
};
use super::types::{
    BlockChecksum, DecompressorState, Framing, StepResult, StepStatus, StreamConfig,
    SyncResult, TotalCounters,
};
use crate::checksum::{adler32, Checksum};
use crate::codec;
use crate::config::{BLOCK_SIZE, WINDOW_LOG_MAX};
use crate::error::{CorruptKind, Error, Result};
use crate::history::History;
use crate::xxhash::block_checksum;

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Accumulating the stream header (`Wrapped` only).
    Header,
    /// Header names a dictionary we do not hold.
    NeedDictionary(u32),
    /// Accumulating a 4-byte block header.
    BlockHeader,
    /// Accumulating a data block payload (plus its checksum).
    BlockBody,
    /// Accumulating the magic that follows a marker header.
    MarkerMagic,
    /// Decoded bytes are waiting in `out_buf`.
    Flush,
    /// Accumulating the checksum trailer (`Wrapped` only).
    Trailer,
    Done,
    Resyncing,
    Corrupted(CorruptKind),
    Failed,
}

/// Resumable decoder, the inverse of
/// [`CompressorStream`](crate::stream::CompressorStream).
///
/// `Clone` deep-copies the history and every internal buffer.
#[derive(Clone)]
pub struct DecompressorStream {
    config: StreamConfig,
    stage: Stage,
    history: History,

    // Parameters in effect: from the header when wrapped, else from config.
    window_log: u8,
    block_checksum: BlockChecksum,

    tmp: Vec<u8>,
    block_kind: BlockKind,
    block_len: usize,
    marker_full: bool,

    out_buf: Vec<u8>,
    out_pos: usize,

    checksum: Checksum,
    /// Cleared by a resync: the trailer no longer covers what we decoded.
    verify_trailer: bool,
    at_sync_point: bool,
    /// Bytes of a possible marker seen so far while resyncing.
    sync_match: Vec<u8>,
    /// Nothing consumed since construction or reset.
    fresh: bool,
    awaiting_output: bool,

    total_in: u64,
    total_out: u64,
}

impl DecompressorStream {
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let capacity = match config.framing {
            // The window is only known once the header is read; keep room for the largest.
            Framing::Wrapped => 1usize << WINDOW_LOG_MAX,
            Framing::Raw => config.window_size(),
        };
        Ok(DecompressorStream {
            stage: Self::initial_stage(&config),
            history: History::new(capacity),
            window_log: config.window_log,
            block_checksum: config.block_checksum,
            tmp: Vec::with_capacity(BH_SIZE),
            block_kind: BlockKind::End,
            block_len: 0,
            marker_full: false,
            out_buf: Vec::new(),
            out_pos: 0,
            checksum: Checksum::init(config.checksum),
            verify_trailer: true,
            at_sync_point: false,
            sync_match: Vec::with_capacity(MARKER_SIZE),
            fresh: true,
            awaiting_output: false,
            total_in: 0,
            total_out: 0,
            config,
        })
    }

    fn initial_stage(config: &StreamConfig) -> Stage {
        match config.framing {
            Framing::Wrapped => Stage::Header,
            Framing::Raw => Stage::BlockHeader,
        }
    }

    #[inline]
    fn window_size(&self) -> usize {
        1usize << self.window_log
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dictionary
    // ─────────────────────────────────────────────────────────────────────────

    /// Supply context bytes.
    ///
    /// Accepted before any input is consumed, or when the last step reported
    /// `NeedDictionary`; in that case the bytes must hash to the id from the
    /// header ([`Error::DictionaryMismatch`] otherwise, and the stream keeps
    /// waiting for the right one).
    pub fn set_dictionary(&mut self, data: &[u8]) -> Result<()> {
        match self.stage {
            Stage::NeedDictionary(id) => {
                let mut candidate = History::new(self.history.capacity());
                candidate.prime(data)?;
                let got = adler32::update(adler32::SEED, candidate.tail(self.window_size()));
                if got != id {
                    debug!(expected = id, got, "dictionary rejected");
                    return Err(Error::DictionaryMismatch);
                }
                self.history = candidate;
                self.stage = Stage::BlockHeader;
                debug!(dict_id = id, "decompressor dictionary loaded");
                Ok(())
            }
            Stage::Header | Stage::BlockHeader if self.fresh => {
                self.history.prime(data).map_err(|_| Error::InvalidState)?;
                debug!(retained = self.history.len(), "decompressor dictionary primed");
                Ok(())
            }
            _ => Err(Error::InvalidState),
        }
    }

    /// Bytes available as context at this point, oldest first. Priming a
    /// fresh `Raw` stream with them continues decoding where this one is.
    pub fn get_dictionary(&self) -> &[u8] {
        self.history.export()
    }

    fn dictionary_matches(&self, id: u32) -> bool {
        !self.history.is_empty()
            && adler32::update(adler32::SEED, self.history.tail(self.window_size())) == id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Step
    // ─────────────────────────────────────────────────────────────────────────

    /// Consume compressed bytes from `input`, produce decoded bytes into `output`.
    ///
    /// Structural or checksum failures are reported as
    /// `StepStatus::Corrupt` together with the bytes consumed and produced up
    /// to that point; the stream is terminal afterwards and further steps
    /// return [`Error::Protocol`].
    pub fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<StepResult> {
        match self.stage {
            Stage::Failed | Stage::Corrupted(_) => return Err(Error::Protocol),
            Stage::Resyncing => return Err(Error::InvalidState),
            Stage::Done => return Ok(StepResult::new(0, 0, StepStatus::StreamEnd)),
            Stage::NeedDictionary(id) => {
                return Ok(StepResult::new(0, 0, StepStatus::NeedDictionary { id }))
            }
            _ => {}
        }
        if output.is_empty() {
            if self.awaiting_output {
                debug!("decompressor protocol violation: no output space after NeedMoreOutput");
                self.stage = Stage::Failed;
                return Err(Error::Protocol);
            }
            self.awaiting_output = true;
            return Ok(StepResult::new(0, 0, StepStatus::NeedMoreOutput));
        }

        let mut consumed = 0usize;
        let mut produced = 0usize;
        let status = loop {
            match self.stage {
                Stage::Header => {
                    let want = match header_size(&self.tmp) {
                        Ok(Some(n)) => n,
                        Ok(None) => self.tmp.len() + 1,
                        Err(kind) => break self.corrupt(kind),
                    };
                    if self.tmp.len() < want {
                        if !self.fill(input, &mut consumed, want) {
                            break StepStatus::NeedMoreInput;
                        }
                        continue;
                    }
                    let header = match StreamHeader::parse(&self.tmp) {
                        Ok(h) => h,
                        Err(kind) => break self.corrupt(kind),
                    };
                    self.tmp.clear();
                    if let Some(status) = self.apply_header(header) {
                        break status;
                    }
                }

                Stage::BlockHeader => {
                    if !self.fill(input, &mut consumed, BH_SIZE) {
                        break StepStatus::NeedMoreInput;
                    }
                    let raw = [self.tmp[0], self.tmp[1], self.tmp[2], self.tmp[3]];
                    self.tmp.clear();
                    match parse_block_header(raw) {
                        Err(kind) => break self.corrupt(kind),
                        Ok((BlockKind::Marker, len)) => {
                            self.marker_full = len == 1;
                            self.stage = Stage::MarkerMagic;
                        }
                        Ok((BlockKind::End, _)) => {
                            if self.config.framing == Framing::Wrapped {
                                self.stage = Stage::Trailer;
                            } else {
                                break self.finish();
                            }
                        }
                        Ok((kind, len)) => {
                            self.block_kind = kind;
                            self.block_len = len;
                            self.at_sync_point = false;
                            self.stage = Stage::BlockBody;
                        }
                    }
                }

                Stage::BlockBody => {
                    let target = self.block_len
                        + if self.block_checksum == BlockChecksum::Enabled {
                            BF_SIZE
                        } else {
                            0
                        };
                    if !self.fill(input, &mut consumed, target) {
                        break StepStatus::NeedMoreInput;
                    }
                    if let Err(kind) = self.decode_body() {
                        break self.corrupt(kind);
                    }
                    self.stage = Stage::Flush;
                }

                Stage::Flush => {
                    produced += self.drain(&mut output[produced..]);
                    if self.out_pos < self.out_buf.len() {
                        break StepStatus::NeedMoreOutput;
                    }
                    self.stage = Stage::BlockHeader;
                }

                Stage::MarkerMagic => {
                    if !self.fill(input, &mut consumed, MARKER_MAGIC.len()) {
                        break StepStatus::NeedMoreInput;
                    }
                    if self.tmp[..] != MARKER_MAGIC {
                        break self.corrupt(CorruptKind::BlockHeader);
                    }
                    self.tmp.clear();
                    self.at_sync_point = true;
                    if self.marker_full {
                        self.history.forget();
                    }
                    self.stage = Stage::BlockHeader;
                }

                Stage::Trailer => {
                    if !self.fill(input, &mut consumed, TRAILER_SIZE) {
                        break StepStatus::NeedMoreInput;
                    }
                    let stored = read_le32(&self.tmp, 0);
                    self.tmp.clear();
                    if self.verify_trailer && stored != self.checksum.value() {
                        break self.corrupt(CorruptKind::StreamChecksum);
                    }
                    break self.finish();
                }

                Stage::NeedDictionary(id) => break StepStatus::NeedDictionary { id },
                Stage::Done => break StepStatus::StreamEnd,
                Stage::Corrupted(kind) => break StepStatus::Corrupt(kind),
                Stage::Resyncing | Stage::Failed => return Err(Error::Protocol),
            }
        };

        self.awaiting_output = status == StepStatus::NeedMoreOutput;
        self.total_out += produced as u64;
        Ok(StepResult::new(consumed, produced, status))
    }

    /// Take header parameters; returns a status if the step must stop here.
    fn apply_header(&mut self, header: StreamHeader) -> Option<StepStatus> {
        self.window_log = header.window_log;
        self.block_checksum = header.block_checksum;
        self.checksum = Checksum::init(header.checksum);
        match header.dict_id {
            Some(id) if !self.dictionary_matches(id) => {
                debug!(dict_id = id, "stream requires a dictionary");
                self.stage = Stage::NeedDictionary(id);
                Some(StepStatus::NeedDictionary { id })
            }
            _ => {
                self.stage = Stage::BlockHeader;
                None
            }
        }
    }

    /// Validate and decode the accumulated block body into `out_buf`.
    fn decode_body(&mut self) -> core::result::Result<(), CorruptKind> {
        let (payload, tail) = self.tmp.split_at(self.block_len);
        if self.block_checksum == BlockChecksum::Enabled
            && read_le32(tail, 0) != block_checksum(payload)
        {
            return Err(CorruptKind::BlockChecksum);
        }
        self.out_buf.clear();
        self.out_pos = 0;
        match self.block_kind {
            BlockKind::Stored => self.out_buf.extend_from_slice(payload),
            BlockKind::Compressed => codec::decode_block(
                payload,
                self.history.export(),
                1usize << self.window_log,
                BLOCK_SIZE,
                &mut self.out_buf,
            )?,
            BlockKind::Marker | BlockKind::End => return Err(CorruptKind::BlockHeader),
        }
        self.checksum.feed(&self.out_buf);
        self.history.record(&self.out_buf);
        self.tmp.clear();
        Ok(())
    }

    fn fill(&mut self, input: &[u8], consumed: &mut usize, target: usize) -> bool {
        let need = target.saturating_sub(self.tmp.len());
        let take = need.min(input.len() - *consumed);
        if take > 0 {
            self.tmp
                .extend_from_slice(&input[*consumed..*consumed + take]);
            *consumed += take;
            self.total_in += take as u64;
            self.fresh = false;
        }
        self.tmp.len() >= target
    }

    fn drain(&mut self, output: &mut [u8]) -> usize {
        let pending = &self.out_buf[self.out_pos..];
        let n = pending.len().min(output.len());
        output[..n].copy_from_slice(&pending[..n]);
        self.out_pos += n;
        n
    }

    fn finish(&mut self) -> StepStatus {
        self.stage = Stage::Done;
        debug!(
            total_in = self.total_in,
            total_out = self.total_out,
            "decompressor stream end"
        );
        StepStatus::StreamEnd
    }

    fn corrupt(&mut self, kind: CorruptKind) -> StepStatus {
        warn!(?kind, total_in = self.total_in, "corrupt compressed input");
        self.stage = Stage::Corrupted(kind);
        StepStatus::Corrupt(kind)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resynchronisation
    // ─────────────────────────────────────────────────────────────────────────

    /// Scan `input` for a sync marker and realign on the block after it.
    ///
    /// Enters `Resyncing` (discarding any partial block and undrained output)
    /// unless already there. A partial marker at the end of `input` is
    /// remembered across calls. On `Found(n)` the first `n` bytes of `input`
    /// (marker included) are consumed and `step` may resume with the rest;
    /// on `NotFound` all of `input` is consumed. Once resynced, the stream
    /// trailer is no longer verified.
    pub fn sync(&mut self, input: &[u8]) -> Result<SyncResult> {
        match self.stage {
            Stage::Failed => return Err(Error::Protocol),
            Stage::Header | Stage::NeedDictionary(_) | Stage::Done => {
                return Err(Error::InvalidState)
            }
            Stage::Resyncing => {}
            _ => {
                debug!(total_in = self.total_in, "decompressor resynchronising");
                self.stage = Stage::Resyncing;
                self.tmp.clear();
                self.out_buf.clear();
                self.out_pos = 0;
                self.sync_match.clear();
                self.verify_trailer = false;
                self.awaiting_output = false;
            }
        }

        for (i, &byte) in input.iter().enumerate() {
            self.sync_match.push(byte);
            while !is_marker_prefix(&self.sync_match) {
                self.sync_match.remove(0);
            }
            if self.sync_match.len() == MARKER_SIZE {
                let full = self.sync_match[0] == 1;
                self.sync_match.clear();
                self.total_in += (i + 1) as u64;
                self.fresh = false;
                if full {
                    self.history.forget();
                }
                self.at_sync_point = true;
                self.stage = Stage::BlockHeader;
                debug!(offset = i + 1, full, "sync marker found");
                return Ok(SyncResult::Found(i + 1));
            }
        }
        self.total_in += input.len() as u64;
        if !input.is_empty() {
            self.fresh = false;
        }
        Ok(SyncResult::NotFound)
    }

    /// `true` right after a sync marker, before the next block begins.
    pub fn is_sync_point(&self) -> bool {
        self.stage == Stage::BlockHeader && self.tmp.is_empty() && self.at_sync_point
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Release the stream. Fails with [`Error::DataLoss`] if decoded bytes
    /// were never delivered, or the stream stopped mid-way.
    pub fn end(self) -> Result<TotalCounters> {
        let untouched = self.fresh
            && matches!(self.stage, Stage::Header | Stage::BlockHeader);
        if self.stage == Stage::Done || untouched {
            return Ok(self.counters());
        }
        Err(Error::DataLoss)
    }

    /// Start over for a new stream: history and counters cleared.
    pub fn reset(&mut self) {
        self.history.reset();
        self.clear_stream_state();
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Start over for a new stream that continues the same history; counters
    /// are kept.
    pub fn reset_keep(&mut self) {
        self.history.rewind();
        self.clear_stream_state();
    }

    fn clear_stream_state(&mut self) {
        self.stage = Self::initial_stage(&self.config);
        self.window_log = self.config.window_log;
        self.block_checksum = self.config.block_checksum;
        self.tmp.clear();
        self.out_buf.clear();
        self.out_pos = 0;
        self.checksum = Checksum::init(self.config.checksum);
        self.verify_trailer = true;
        self.at_sync_point = false;
        self.sync_match.clear();
        self.fresh = true;
        self.awaiting_output = false;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> DecompressorState {
        match self.stage {
            Stage::Header | Stage::BlockHeader if self.fresh => DecompressorState::Init,
            Stage::Header | Stage::NeedDictionary(_) => DecompressorState::ReadingHeader,
            Stage::BlockHeader | Stage::BlockBody | Stage::MarkerMagic | Stage::Trailer => {
                DecompressorState::Ready
            }
            Stage::Flush => DecompressorState::Draining,
            Stage::Resyncing => DecompressorState::Resyncing,
            Stage::Done | Stage::Corrupted(_) | Stage::Failed => DecompressorState::Ended,
        }
    }

    /// The failure that ended the stream, if it was corruption.
    pub fn corruption(&self) -> Option<CorruptKind> {
        match self.stage {
            Stage::Corrupted(kind) => Some(kind),
            _ => None,
        }
    }

    /// `true` once the end of the stream has been decoded and delivered.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    #[inline]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Window log in effect (from the header for `Wrapped` streams).
    #[inline]
    pub fn window_log(&self) -> u8 {
        self.window_log
    }

    #[inline]
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    #[inline]
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Checksum over the bytes decoded since the last reset.
    #[inline]
    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// Decoded bytes waiting for output space.
    #[inline]
    pub fn pending_output(&self) -> usize {
        self.out_buf.len() - self.out_pos
    }

    fn counters(&self) -> TotalCounters {
        TotalCounters {
            total_in: self.total_in,
            total_out: self.total_out,
            checksum: self.checksum,
        }
    }
}

impl core::fmt::Debug for DecompressorStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DecompressorStream")
            .field("stage", &self.stage)
            .field("config", &self.config)
            .field("window_log", &self.window_log)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .field("pending_output", &self.pending_output())
            .field("history", &self.history)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
