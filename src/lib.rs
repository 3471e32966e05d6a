//! sluice: a streaming lossless compression engine.
//!
//! The core is a pair of resumable streams, [`CompressorStream`] and
//! [`DecompressorStream`], driven step by step over caller-owned buffers.
//! Around them sit the checksum algebra ([`checksum`]), the sliding-window
//! [`history`], a self-describing [`container`] format, one-shot helpers
//! ([`oneshot`]) and `Read`/`Write` pumps ([`pump`]).

pub mod checksum;
pub mod cli;
pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod history;
pub mod oneshot;
pub mod pump;
pub mod stream;
pub mod xxhash;

// ── Version ──────────────────────────────────────────────────────────────────
pub const SLUICE_VERSION_MAJOR: u32 = 0;
pub const SLUICE_VERSION_MINOR: u32 = 4;
pub const SLUICE_VERSION_RELEASE: u32 = 0;
pub const SLUICE_VERSION_NUMBER: u32 =
    SLUICE_VERSION_MAJOR * 100 * 100 + SLUICE_VERSION_MINOR * 100 + SLUICE_VERSION_RELEASE;
pub const SLUICE_VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

/// Git commit injected at build time through `SLUICE_GIT_COMMIT`, or `""`.
#[cfg(sluice_git_commit)]
pub const SLUICE_GIT_COMMIT_STRING: &str = env!("SLUICE_GIT_COMMIT");
#[cfg(not(sluice_git_commit))]
pub const SLUICE_GIT_COMMIT_STRING: &str = "";

/// `major * 10000 + minor * 100 + release`.
pub fn version_number() -> u32 {
    SLUICE_VERSION_NUMBER
}

pub fn version_string() -> &'static str {
    SLUICE_VERSION_STRING
}

/// Build metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: &'static str,
    /// Target triple the crate was compiled for.
    pub target: &'static str,
    /// Empty when unknown.
    pub git_commit: &'static str,
    pub debug_assertions: bool,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: SLUICE_VERSION_STRING,
        target: env!("SLUICE_BUILD_TARGET"),
        git_commit: SLUICE_GIT_COMMIT_STRING,
        debug_assertions: cfg!(debug_assertions),
    }
}

impl core::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sluice v{} ({}", self.version, self.target)?;
        if !self.git_commit.is_empty() {
            write!(f, ", commit {}", self.git_commit)?;
        }
        if self.debug_assertions {
            f.write_str(", debug")?;
        }
        f.write_str(")")
    }
}

// ── Top-level re-exports ──────────────────────────────────────────────────────
pub use checksum::{Checksum, ChecksumKind};
pub use container::{ContainerMeta, ContainerReader, ContainerWriter};
pub use error::{CorruptKind, Error, Result};
pub use history::History;
pub use stream::{
    BlockChecksum, CompressorStream, DecompressorStream, Flush, Framing, Level, StepResult,
    StepStatus, Strategy, StreamConfig, SyncResult, TotalCounters,
};
