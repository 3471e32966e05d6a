//! Error types shared by every layer of the engine.
//!
//! Every fallible public operation returns [`Result<T>`]. Malformed input never
//! panics; it surfaces as [`Error::Corrupt`] (or as a
//! [`StepStatus::Corrupt`](crate::stream::StepStatus::Corrupt) from a decoder
//! step). `error_name()` returns a stable identifier per variant, suitable for
//! logs and tests.

use core::fmt;
use std::io;

// ─────────────────────────────────────────────────────────────────────────────
// CorruptKind
// ─────────────────────────────────────────────────────────────────────────────

/// Structural or integrity failure detected while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorruptKind {
    /// Stream or container magic byte(s) did not match.
    BadMagic,
    /// Header checksum byte (stream) or CRC16 (container) did not match.
    HeaderChecksum,
    /// A reserved flag bit was set.
    ReservedBits,
    /// Window size in the stream header is outside the supported range.
    WindowInvalid,
    /// A container header field (extra, name, comment) is malformed or too long.
    HeaderField,
    /// Block header carries an impossible kind/length combination.
    BlockHeader,
    /// Block payload or its decoded form exceeds the block size limit.
    BlockTooLarge,
    /// Compressed payload contains an invalid sequence.
    Sequence,
    /// A match offset points before the available history or outside the window.
    OffsetOutOfRange,
    /// Per-block XXH32 checksum did not match.
    BlockChecksum,
    /// Stream trailer checksum did not match the decoded bytes.
    StreamChecksum,
    /// Input ended in the middle of a stream.
    Truncated,
    /// Bytes follow the end of a stream where none are allowed.
    TrailingData,
}

impl CorruptKind {
    pub fn error_name(&self) -> &'static str {
        match self {
            CorruptKind::BadMagic => "corrupt_bad_magic",
            CorruptKind::HeaderChecksum => "corrupt_header_checksum",
            CorruptKind::ReservedBits => "corrupt_reserved_bits",
            CorruptKind::WindowInvalid => "corrupt_window_invalid",
            CorruptKind::HeaderField => "corrupt_header_field",
            CorruptKind::BlockHeader => "corrupt_block_header",
            CorruptKind::BlockTooLarge => "corrupt_block_too_large",
            CorruptKind::Sequence => "corrupt_sequence",
            CorruptKind::OffsetOutOfRange => "corrupt_offset_out_of_range",
            CorruptKind::BlockChecksum => "corrupt_block_checksum",
            CorruptKind::StreamChecksum => "corrupt_stream_checksum",
            CorruptKind::Truncated => "corrupt_truncated",
            CorruptKind::TrailingData => "corrupt_trailing_data",
        }
    }
}

impl fmt::Display for CorruptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.error_name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

/// Library error.
///
/// `Protocol`, `Corrupt` and `OutOfMemory` are fatal to the stream that
/// reported them; the stream must be reset or re-created. The remaining
/// variants leave the object usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The caller violated the step contract.
    Protocol,
    /// Input failed structural or checksum validation.
    Corrupt(CorruptKind),
    /// End-to-end container checksum or size did not match at close.
    TrailerMismatch,
    /// Operation is not legal in the current state.
    InvalidState,
    /// History has already recorded stream bytes; priming is no longer possible.
    AlreadyStarted,
    /// A length argument disagrees with the byte count it describes.
    InvalidLength,
    /// The stream was ended while output was still pending.
    DataLoss,
    /// An allocation could not be satisfied.
    OutOfMemory,
    /// A push-back byte is already pending.
    BufferFull,
    /// The container has been closed.
    Closed,
    /// The output capacity given to a one-shot decode was too small.
    OutputTooSmall { minimum_required_so_far: usize },
    /// Dictionary supplied to a decoder does not match the id in the header.
    DictionaryMismatch,
    /// A configuration value is outside its valid range.
    ParameterInvalid,
    /// Failure reported by the underlying reader or writer.
    Io(io::ErrorKind),
}

impl Error {
    /// Stable identifier for this error.
    pub fn error_name(&self) -> &'static str {
        match self {
            Error::Protocol => "protocol_error",
            Error::Corrupt(kind) => kind.error_name(),
            Error::TrailerMismatch => "trailer_mismatch",
            Error::InvalidState => "invalid_state",
            Error::AlreadyStarted => "already_started",
            Error::InvalidLength => "invalid_length",
            Error::DataLoss => "data_loss",
            Error::OutOfMemory => "out_of_memory",
            Error::BufferFull => "buffer_full",
            Error::Closed => "closed",
            Error::OutputTooSmall { .. } => "output_too_small",
            Error::DictionaryMismatch => "dictionary_mismatch",
            Error::ParameterInvalid => "parameter_invalid",
            Error::Io(_) => "io_error",
        }
    }

    /// `true` when the object that produced this error can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Protocol | Error::Corrupt(_) | Error::OutOfMemory)
    }

    /// Recover a library error carried inside an `io::Error` produced by the
    /// `Read`/`Write` adapters.
    pub fn from_io_ref(err: &io::Error) -> Option<Error> {
        err.get_ref()
            .and_then(|inner| inner.downcast_ref::<Error>())
            .copied()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Corrupt(kind) => write!(f, "corrupt input ({kind})"),
            Error::OutputTooSmall {
                minimum_required_so_far,
            } => write!(
                f,
                "output_too_small (at least {minimum_required_so_far} bytes required)"
            ),
            Error::Io(kind) => write!(f, "io_error ({kind})"),
            other => f.write_str(other.error_name()),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::from_io_ref(&err).unwrap_or(Error::Io(err.kind()))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::Io(kind) => return io::Error::from(kind),
            Error::Corrupt(_) | Error::TrailerMismatch | Error::DictionaryMismatch => {
                io::ErrorKind::InvalidData
            }
            Error::InvalidLength | Error::ParameterInvalid => io::ErrorKind::InvalidInput,
            Error::OutOfMemory => io::ErrorKind::OutOfMemory,
            Error::OutputTooSmall { .. } => io::ErrorKind::WriteZero,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
