// config.rs: build-time defaults and the process-wide default effort level.
//
// Everything here is immutable after process start. The only runtime input is
// the SLUICE_CLEVEL environment variable, read once on first use.

use std::sync::OnceLock;

use crate::checksum::ChecksumKind;
use crate::stream::Level;

// Effort levels. Level 0 stores blocks verbatim; 9 searches hardest.
pub const LEVEL_MIN: u8 = 0;
pub const LEVEL_MAX: u8 = 9;
pub const LEVEL_DEFAULT: u8 = 6;

// History window, as log2 of its size in bytes.
pub const WINDOW_LOG_MIN: u8 = 10;
pub const WINDOW_LOG_MAX: u8 = 20;
pub const WINDOW_LOG_DEFAULT: u8 = 16;

/// Uncompressed size of one data block. Input is always cut at multiples of
/// this, which is what makes chunked feeding produce identical output.
pub const BLOCK_SIZE: usize = 64 * 1024;

// Checksum used by the `Wrapped` framing when nothing else is requested.
pub const CHECKSUM_DEFAULT: ChecksumKind = ChecksumKind::Adler32;

// Size of the scratch buffers used by the Read/Write adapters and pumps.
pub const IO_BUFFER_SIZE: usize = 64 * 1024;

/// Environment variable overriding the default effort level.
pub const CLEVEL_ENV: &str = "SLUICE_CLEVEL";

static DEFAULT_LEVEL: OnceLock<Level> = OnceLock::new();

/// Process-wide default effort level.
///
/// Reads `SLUICE_CLEVEL` the first time it is called; later changes to the
/// environment are ignored. Values that do not parse as `0..=9` fall back to
/// [`LEVEL_DEFAULT`].
pub fn default_level() -> Level {
    *DEFAULT_LEVEL.get_or_init(|| {
        std::env::var(CLEVEL_ENV)
            .ok()
            .and_then(|v| parse_level(&v))
            .unwrap_or(Level::DEFAULT)
    })
}

/// Parse a level as written on the command line or in the environment.
pub fn parse_level(text: &str) -> Option<Level> {
    text.trim().parse::<u8>().ok().and_then(|v| Level::new(v).ok())
}
