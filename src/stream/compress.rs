//! Streaming compressor.
//!
//! Input is staged into fixed [`BLOCK_SIZE`] blocks; each full block is
//! encoded into an internal pending buffer which is then drained into the
//! caller's output across as many `step` calls as it takes. Because block
//! boundaries depend only on the byte count (and on explicit flushes), feeding
//! the same input in any chunking produces identical output.

use tracing::{debug, trace};

use super::format::{
    block_header, compress_bound, sync_marker, write_le32, BlockKind, StreamHeader,
};
use super::types::{
    BlockChecksum, CompressorState, Flush, Framing, Level, StepResult, StepStatus, Strategy,
    StreamConfig, TotalCounters,
};
use crate::checksum::{adler32, Checksum};
use crate::codec::{self, BlockEncoder, SearchParams};
use crate::config::BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::history::History;
use crate::xxhash::block_checksum;

/// Resumable encoder.
///
/// `Clone` deep-copies the history and every internal buffer; it is as
/// expensive as the stream is large.
#[derive(Clone)]
pub struct CompressorStream {
    config: StreamConfig,
    params: SearchParams,
    history: History,

    /// Input accepted but not yet encoded (always < BLOCK_SIZE between calls).
    staged: Vec<u8>,
    /// Encoded bytes not yet handed to the caller.
    out_buf: Vec<u8>,
    out_pos: usize,
    /// Match finder context; mirrors `history` plus whatever it has not
    /// trimmed yet.
    encoder: BlockEncoder,
    /// Scratch: encoded payload of the current block.
    payload: Vec<u8>,

    header_written: bool,
    dict_id: Option<u32>,
    pending_params: Option<(Level, Strategy)>,
    /// Marker emitted since the last input byte, if any.
    last_marker: Option<Flush>,
    /// No input consumed since construction or reset.
    fresh: bool,
    finish_requested: bool,
    /// End block (and trailer) queued; only draining remains.
    finishing: bool,
    ended: bool,
    failed: bool,
    /// The previous call reported `NeedMoreOutput`.
    awaiting_output: bool,

    total_in: u64,
    total_out: u64,
    checksum: Checksum,
}

impl CompressorStream {
    /// New stream in state `Ready`.
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(CompressorStream {
            params: codec::params_for(config.level, config.strategy),
            history: History::new(config.window_size()),
            staged: Vec::with_capacity(BLOCK_SIZE),
            out_buf: Vec::new(),
            out_pos: 0,
            encoder: BlockEncoder::new(),
            payload: Vec::new(),
            header_written: false,
            dict_id: None,
            pending_params: None,
            last_marker: None,
            fresh: true,
            finish_requested: false,
            finishing: false,
            ended: false,
            failed: false,
            awaiting_output: false,
            total_in: 0,
            total_out: 0,
            checksum: Checksum::init(config.checksum),
            config,
        })
    }

    /// Worst-case output size for compressing `input_len` bytes in one
    /// `Finish` step, whatever the configuration.
    pub fn bound(input_len: usize) -> usize {
        compress_bound(input_len)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Prime the history before any input is processed.
    ///
    /// With [`StreamConfig::dictionary_id`] set on a `Wrapped` stream, the
    /// header records the Adler-32 of the retained dictionary so the decoder
    /// can check it holds the same bytes. Otherwise both sides must agree on
    /// the dictionary out of band, and priming adds nothing to the output.
    pub fn set_dictionary(&mut self, data: &[u8]) -> Result<()> {
        if self.failed
            || self.ended
            || !self.fresh
            || (self.header_written && self.config.framing == Framing::Wrapped)
        {
            return Err(Error::InvalidState);
        }
        self.history.prime(data).map_err(|_| Error::InvalidState)?;
        self.encoder.load(self.history.export());
        if self.names_dictionary() {
            self.dict_id = Some(adler32::update(adler32::SEED, self.history.export()));
        }
        debug!(
            dict_len = data.len(),
            retained = self.history.len(),
            dict_id = ?self.dict_id,
            "compressor dictionary loaded"
        );
        Ok(())
    }

    /// Change the effort level from the next byte processed on.
    pub fn set_effort_level(&mut self, level: Level) -> Result<()> {
        let strategy = self
            .pending_params
            .map_or(self.config.strategy, |(_, strategy)| strategy);
        self.set_params(level, strategy)
    }

    /// Change level and strategy from the next byte processed on.
    ///
    /// Bytes already staged are cut into a block encoded with the old
    /// parameters at the start of the next `step`.
    pub fn set_params(&mut self, level: Level, strategy: Strategy) -> Result<()> {
        if self.failed || self.ended || self.finish_requested {
            return Err(Error::InvalidState);
        }
        if self.staged.is_empty() {
            self.pending_params = None;
            self.apply_params(level, strategy);
        } else {
            self.pending_params = Some((level, strategy));
        }
        Ok(())
    }

    fn apply_params(&mut self, level: Level, strategy: Strategy) {
        if level != self.config.level || strategy != self.config.strategy {
            debug!(
                from = self.config.level.get(),
                to = level.get(),
                ?strategy,
                "compressor parameters changed"
            );
        }
        self.config.level = level;
        self.config.strategy = strategy;
        self.params = codec::params_for(level, strategy);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Step
    // ─────────────────────────────────────────────────────────────────────────

    /// Consume from `input`, produce into `output`.
    ///
    /// Never reads past `input.len()` or writes past `output.len()`. With
    /// `Finish`, keep calling with fresh output space (and no new input) until
    /// the status is `StreamEnd`. Contract violations return
    /// [`Error::Protocol`] and leave the stream in `Failed`.
    pub fn step(&mut self, input: &[u8], output: &mut [u8], mode: Flush) -> Result<StepResult> {
        if self.failed {
            return Err(Error::Protocol);
        }
        if self.ended {
            if !input.is_empty() || mode != Flush::Finish {
                return self.fail("step after stream end");
            }
            return Ok(StepResult::new(0, 0, StepStatus::StreamEnd));
        }
        if self.finish_requested && mode != Flush::Finish {
            return self.fail("flush mode changed after finish");
        }
        if self.finishing && !input.is_empty() {
            return self.fail("input after finish");
        }
        if output.is_empty() {
            if self.awaiting_output {
                return self.fail("no output space after NeedMoreOutput");
            }
            self.awaiting_output = true;
            return Ok(StepResult::new(0, 0, StepStatus::NeedMoreOutput));
        }
        if mode == Flush::Finish {
            self.finish_requested = true;
        }

        let mut consumed = 0usize;
        let mut produced = 0usize;
        let status = loop {
            produced += self.drain(&mut output[produced..]);
            if self.out_pos < self.out_buf.len() {
                break StepStatus::NeedMoreOutput;
            }
            if self.finishing {
                self.ended = true;
                debug!(
                    total_in = self.total_in,
                    total_out = self.total_out + produced as u64,
                    "compressor stream end"
                );
                break StepStatus::StreamEnd;
            }
            if !self.header_written {
                self.write_header();
                continue;
            }
            if let Some((level, strategy)) = self.pending_params.take() {
                if !self.staged.is_empty() {
                    self.emit_block();
                }
                self.apply_params(level, strategy);
                continue;
            }

            let take = (BLOCK_SIZE - self.staged.len()).min(input.len() - consumed);
            if take > 0 {
                let chunk = &input[consumed..consumed + take];
                self.staged.extend_from_slice(chunk);
                self.checksum.feed(chunk);
                self.total_in += take as u64;
                consumed += take;
                self.fresh = false;
                self.last_marker = None;
            }
            if self.staged.len() == BLOCK_SIZE {
                self.emit_block();
                continue;
            }

            // Everything the caller gave us is staged.
            match mode {
                Flush::NoFlush => break StepStatus::NeedMoreInput,
                Flush::SyncFlush | Flush::FullFlush => {
                    let full = mode == Flush::FullFlush;
                    let needed = match self.last_marker {
                        None => true,
                        Some(Flush::SyncFlush) => full,
                        Some(_) => false,
                    };
                    if !needed {
                        break StepStatus::Ok;
                    }
                    if !self.staged.is_empty() {
                        self.emit_block();
                    }
                    self.out_buf.extend_from_slice(&sync_marker(full));
                    if full {
                        self.history.forget();
                        self.encoder.clear();
                    }
                    self.last_marker = Some(mode);
                    trace!(full, "sync marker queued");
                }
                Flush::Finish => {
                    if !self.staged.is_empty() {
                        self.emit_block();
                    }
                    self.out_buf
                        .extend_from_slice(&block_header(BlockKind::End, 0));
                    if self.config.framing == Framing::Wrapped {
                        write_le32(&mut self.out_buf, self.checksum.value());
                    }
                    self.finishing = true;
                }
            }
        };

        self.awaiting_output = status == StepStatus::NeedMoreOutput;
        self.total_out += produced as u64;
        Ok(StepResult::new(consumed, produced, status))
    }

    fn fail(&mut self, what: &'static str) -> Result<StepResult> {
        debug!(reason = what, "compressor protocol violation");
        self.failed = true;
        Err(Error::Protocol)
    }

    fn drain(&mut self, output: &mut [u8]) -> usize {
        let pending = &self.out_buf[self.out_pos..];
        let n = pending.len().min(output.len());
        output[..n].copy_from_slice(&pending[..n]);
        self.out_pos += n;
        if self.out_pos == self.out_buf.len() {
            self.out_buf.clear();
            self.out_pos = 0;
        }
        n
    }

    fn write_header(&mut self) {
        if self.config.framing == Framing::Wrapped {
            let header = StreamHeader {
                window_log: self.config.window_log,
                dict_id: self.dict_id,
                block_checksum: self.config.block_checksum,
                checksum: self.config.checksum,
            };
            header.write_to(&mut self.out_buf);
        }
        self.header_written = true;
    }

    /// Encode `staged` as one block into `out_buf` and move it into history.
    fn emit_block(&mut self) {
        let block_len = self.staged.len();
        let max_dist = self.config.window_size();
        let mut kind = BlockKind::Stored;
        if self.params.finds_matches() {
            self.payload.clear();
            self.encoder
                .encode(&self.staged, max_dist, &self.params, &mut self.payload);
            if self.payload.len() < block_len {
                kind = BlockKind::Compressed;
            }
        } else {
            self.encoder.skip(&self.staged, max_dist);
        }

        let body: &[u8] = match kind {
            BlockKind::Compressed => &self.payload,
            _ => &self.staged,
        };
        self.out_buf.extend_from_slice(&block_header(kind, body.len()));
        self.out_buf.extend_from_slice(body);
        if self.config.block_checksum == BlockChecksum::Enabled {
            write_le32(&mut self.out_buf, block_checksum(body));
        }
        trace!(?kind, block_len, encoded = body.len(), "block emitted");

        self.history.record(&self.staged);
        self.staged.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Release the stream and return its counters.
    ///
    /// Fails with [`Error::DataLoss`] unless the stream reached `StreamEnd`
    /// or never processed anything.
    pub fn end(self) -> Result<TotalCounters> {
        if self.ended || (self.fresh && !self.header_written && !self.failed) {
            return Ok(self.counters());
        }
        debug!(
            pending = self.pending_output(),
            staged = self.staged.len(),
            "compressor ended before stream end"
        );
        Err(Error::DataLoss)
    }

    /// Back to `Ready`: history, buffers and counters cleared, configuration
    /// (including later parameter changes) kept.
    pub fn reset(&mut self) {
        if let Some((level, strategy)) = self.pending_params.take() {
            self.apply_params(level, strategy);
        }
        self.history.reset();
        self.encoder.clear();
        self.clear_stream_state();
        self.total_in = 0;
        self.total_out = 0;
    }

    /// Back to `Ready` for a new stream that continues the same history.
    ///
    /// Counters are kept. The decoder must hold the same history; with
    /// [`StreamConfig::dictionary_id`] the next header names it.
    pub fn reset_keep(&mut self) {
        if let Some((level, strategy)) = self.pending_params.take() {
            self.apply_params(level, strategy);
        }
        self.clear_stream_state();
        self.history.rewind();
        if self.names_dictionary() && !self.history.is_empty() {
            self.dict_id = Some(adler32::update(adler32::SEED, self.history.export()));
        }
    }

    fn names_dictionary(&self) -> bool {
        self.config.framing == Framing::Wrapped && self.config.dictionary_id
    }

    fn clear_stream_state(&mut self) {
        self.staged.clear();
        self.out_buf.clear();
        self.out_pos = 0;
        self.header_written = false;
        self.dict_id = None;
        self.last_marker = None;
        self.fresh = true;
        self.finish_requested = false;
        self.finishing = false;
        self.ended = false;
        self.failed = false;
        self.awaiting_output = false;
        self.checksum = Checksum::init(self.config.checksum);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> CompressorState {
        if self.failed {
            CompressorState::Failed
        } else if self.ended {
            CompressorState::Ended
        } else if self.finish_requested {
            CompressorState::Finishing
        } else if self.pending_output() > 0 {
            CompressorState::Draining
        } else {
            CompressorState::Ready
        }
    }

    #[inline]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    #[inline]
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    #[inline]
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Checksum over the input consumed since the last reset.
    #[inline]
    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// Encoded bytes waiting for output space.
    #[inline]
    pub fn pending_output(&self) -> usize {
        self.out_buf.len() - self.out_pos
    }

    /// Input bytes accepted but not yet encoded.
    #[inline]
    pub fn buffered_input(&self) -> usize {
        self.staged.len()
    }

    /// Retained history, oldest first.
    pub fn get_dictionary(&self) -> &[u8] {
        self.history.export()
    }

    /// Id written to the header for the primed dictionary, if any.
    pub fn dictionary_id(&self) -> Option<u32> {
        self.dict_id
    }

    fn counters(&self) -> TotalCounters {
        TotalCounters {
            total_in: self.total_in,
            total_out: self.total_out,
            checksum: self.checksum,
        }
    }
}

impl core::fmt::Debug for CompressorStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompressorStream")
            .field("state", &self.state())
            .field("config", &self.config)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .field("staged", &self.staged.len())
            .field("pending_output", &self.pending_output())
            .field("history", &self.history)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
