//! Stream configuration, step results and public state enums.
//!
//! Covers:
//! - `Level`, `Strategy`, `Framing`, `BlockChecksum`: per-stream parameters
//! - `StreamConfig`: the configuration snapshot each stream owns
//! - `Flush`: the compression step mode
//! - `StepStatus` / `StepResult`: what a step call reports
//! - `TotalCounters`: what `end` hands back
//! - `CompressorState` / `DecompressorState`: coarse lifecycle states
//! - `SyncResult`: outcome of a resynchronisation scan

use crate::checksum::{Checksum, ChecksumKind};
use crate::config;
use crate::error::{CorruptKind, Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Effort level, `0..=9`. Level 0 stores blocks without searching for matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    pub const NONE: Level = Level(0);
    pub const FAST: Level = Level(1);
    pub const DEFAULT: Level = Level(config::LEVEL_DEFAULT);
    pub const BEST: Level = Level(config::LEVEL_MAX);

    /// Fails with [`Error::ParameterInvalid`] above [`config::LEVEL_MAX`].
    pub fn new(level: u8) -> Result<Level> {
        if level > config::LEVEL_MAX {
            return Err(Error::ParameterInvalid);
        }
        Ok(Level(level))
    }

    /// Nearest valid level.
    pub fn clamped(level: i32) -> Level {
        Level(level.clamp(i32::from(config::LEVEL_MIN), i32::from(config::LEVEL_MAX)) as u8)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::DEFAULT
    }
}

/// Match-finding strategy hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    #[default]
    Default,
    /// Only look for runs of the previous byte.
    Rle,
    /// Never search for matches; blocks end up stored.
    LiteralOnly,
}

/// Whether the stream carries its own header and trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Framing {
    /// Header (window, dictionary id, flags) up front and checksum trailer at the end.
    #[default]
    Wrapped,
    /// Blocks only. Used underneath the container, which adds its own framing.
    Raw,
}

/// Whether each data block is followed by an XXH32 of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockChecksum {
    #[default]
    Disabled,
    Enabled,
}

// ─────────────────────────────────────────────────────────────────────────────
// StreamConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration snapshot owned by a stream.
///
/// For a `Wrapped` decompressor, `window_log`, `checksum` and `block_checksum`
/// are taken from the stream header instead; the configured values apply to
/// `Raw` streams, whose sender and receiver must agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub level: Level,
    pub window_log: u8,
    pub strategy: Strategy,
    pub framing: Framing,
    pub checksum: ChecksumKind,
    pub block_checksum: BlockChecksum,
    /// `Wrapped` compressor only: name a primed dictionary in the header so
    /// the decoder can ask for it. Costs four header bytes.
    pub dictionary_id: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            level: config::default_level(),
            window_log: config::WINDOW_LOG_DEFAULT,
            strategy: Strategy::Default,
            framing: Framing::Wrapped,
            checksum: config::CHECKSUM_DEFAULT,
            block_checksum: BlockChecksum::Disabled,
            dictionary_id: false,
        }
    }
}

impl StreamConfig {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_window_log(mut self, window_log: u8) -> Self {
        self.window_log = window_log;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_checksum(mut self, checksum: ChecksumKind) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_block_checksum(mut self, block_checksum: BlockChecksum) -> Self {
        self.block_checksum = block_checksum;
        self
    }

    pub fn with_dictionary_id(mut self, dictionary_id: bool) -> Self {
        self.dictionary_id = dictionary_id;
        self
    }

    /// Fails with [`Error::ParameterInvalid`] when the window is out of range.
    pub fn validate(&self) -> Result<()> {
        if !(config::WINDOW_LOG_MIN..=config::WINDOW_LOG_MAX).contains(&self.window_log) {
            return Err(Error::ParameterInvalid);
        }
        if self.level.get() > config::LEVEL_MAX {
            return Err(Error::ParameterInvalid);
        }
        Ok(())
    }

    /// History window in bytes.
    #[inline]
    pub fn window_size(&self) -> usize {
        1usize << self.window_log
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Step API
// ─────────────────────────────────────────────────────────────────────────────

/// Compression step mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flush {
    /// Emit only complete blocks; keep the rest staged.
    #[default]
    NoFlush,
    /// Emit everything staged and a sync marker; history is kept.
    SyncFlush,
    /// Like `SyncFlush`, and later blocks do not reference earlier data.
    FullFlush,
    /// Emit everything and terminate the stream.
    Finish,
}

/// What a step call reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Progress was made; the requested flush completed.
    Ok,
    /// All input was consumed and the stream wants more.
    NeedMoreInput,
    /// The output buffer is full and data is still pending.
    NeedMoreOutput,
    /// The stream is complete and everything has been written out.
    StreamEnd,
    /// The stream header names a dictionary the decoder does not hold.
    NeedDictionary { id: u32 },
    /// Input failed validation; the decompressor is now terminal.
    Corrupt(CorruptKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Bytes read from the front of `input`.
    pub consumed: usize,
    /// Bytes written to the front of `output`.
    pub produced: usize,
    pub status: StepStatus,
}

impl StepResult {
    #[inline]
    pub(crate) fn new(consumed: usize, produced: usize, status: StepStatus) -> Self {
        StepResult {
            consumed,
            produced,
            status,
        }
    }
}

/// Final accounting returned by `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalCounters {
    pub total_in: u64,
    pub total_out: u64,
    /// Checksum over the uncompressed bytes.
    pub checksum: Checksum,
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle states
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressorState {
    /// Accepting input.
    Ready,
    /// Encoded bytes are waiting for output space.
    Draining,
    /// `Finish` was accepted; the tail is still being written out.
    Finishing,
    /// The stream has been terminated and fully written.
    Ended,
    /// A contract violation made the stream unusable.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecompressorState {
    /// Nothing consumed yet.
    Init,
    /// Parsing the stream header or waiting for a dictionary.
    ReadingHeader,
    /// Between or inside blocks.
    Ready,
    /// Decoded bytes are waiting for output space.
    Draining,
    /// Scanning for a sync marker.
    Resyncing,
    /// Terminal: finished, corrupt, or failed.
    Ended,
}

/// Outcome of [`DecompressorStream::sync`](crate::stream::DecompressorStream::sync).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncResult {
    /// A marker ends `offset` bytes into the scanned input; decoding resumes there.
    Found(usize),
    /// No marker in the scanned input; all of it was consumed.
    NotFound,
}
