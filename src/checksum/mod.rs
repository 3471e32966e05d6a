//! Incremental, combinable checksums.
//!
//! A [`Checksum`] is a plain value: the running value plus the number of bytes
//! folded into it. `update` is order dependent and associative over
//! concatenation, and `combine` merges two independently computed checksums
//! into the checksum of the concatenated input without re-reading either side:
//!
//! ```
//! use sluice::checksum::{Checksum, ChecksumKind};
//!
//! let a = Checksum::of(ChecksumKind::Adler32, b"AAAAA");
//! let b = Checksum::of(ChecksumKind::Adler32, b"AAAAA");
//! let whole = Checksum::of(ChecksumKind::Adler32, b"AAAAAAAAAA");
//! assert_eq!(a.combine(b, 5).unwrap(), whole);
//! ```

pub mod adler32;
pub mod crc32;

use rayon::prelude::*;

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// ChecksumKind
// ─────────────────────────────────────────────────────────────────────────────

/// Checksum algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecksumKind {
    /// Adler-32 (seed 1). Default for wrapped streams and dictionary ids.
    #[default]
    Adler32,
    /// CRC-32/IEEE (seed 0). Used by the container trailer.
    Crc32,
}

impl ChecksumKind {
    /// Value of the empty-input checksum.
    pub const fn seed(self) -> u32 {
        match self {
            ChecksumKind::Adler32 => adler32::SEED,
            ChecksumKind::Crc32 => crc32::SEED,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ChecksumKind::Adler32 => "adler32",
            ChecksumKind::Crc32 => "crc32",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Checksum
// ─────────────────────────────────────────────────────────────────────────────

/// Running checksum over a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum {
    kind: ChecksumKind,
    value: u32,
    len: u64,
}

impl Checksum {
    /// Identity checksum for `kind`.
    pub const fn init(kind: ChecksumKind) -> Self {
        Checksum {
            kind,
            value: kind.seed(),
            len: 0,
        }
    }

    /// Checksum of `data` in one call.
    pub fn of(kind: ChecksumKind, data: &[u8]) -> Self {
        Checksum::init(kind).update(data)
    }

    /// Fold `data` in, returning the new value.
    #[must_use]
    pub fn update(mut self, data: &[u8]) -> Self {
        self.feed(data);
        self
    }

    /// Fold `data` in place.
    pub fn feed(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.value = match self.kind {
            ChecksumKind::Adler32 => adler32::update(self.value, data),
            ChecksumKind::Crc32 => crc32::update(self.value, data),
        };
        self.len += data.len() as u64;
    }

    /// Checksum of `self`'s bytes followed by `other`'s bytes.
    ///
    /// `len_b` must equal the byte count folded into `other`
    /// ([`Error::InvalidLength`] otherwise) and both sides must use the same
    /// algorithm ([`Error::ParameterInvalid`] otherwise).
    pub fn combine(self, other: Checksum, len_b: u64) -> Result<Checksum> {
        if self.kind != other.kind {
            return Err(Error::ParameterInvalid);
        }
        if len_b != other.len {
            return Err(Error::InvalidLength);
        }
        Ok(self.combine_unchecked(other))
    }

    fn combine_unchecked(self, other: Checksum) -> Checksum {
        let value = match self.kind {
            ChecksumKind::Adler32 => adler32::combine(self.value, other.value, other.len),
            ChecksumKind::Crc32 => crc32::combine(self.value, other.value, other.len),
        };
        Checksum {
            kind: self.kind,
            value,
            len: self.len + other.len,
        }
    }

    #[inline]
    pub fn kind(&self) -> ChecksumKind {
        self.kind
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Number of bytes folded in.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Checksum::init(ChecksumKind::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Free-function forms
// ─────────────────────────────────────────────────────────────────────────────

/// Identity checksum for `kind`.
pub fn init(kind: ChecksumKind) -> Checksum {
    Checksum::init(kind)
}

/// `update(update(cs, A), B) == update(cs, A ++ B)`.
pub fn update(cs: Checksum, data: &[u8]) -> Checksum {
    cs.update(data)
}

/// `combine(of(A), of(B), len(B)) == of(A ++ B)`.
pub fn combine(cs_a: Checksum, cs_b: Checksum, len_b: u64) -> Result<Checksum> {
    cs_a.combine(cs_b, len_b)
}

/// Checksum of `data` computed as independent segments of `segment_len` bytes
/// on the rayon pool and folded with `combine`. Equal to `Checksum::of`.
pub fn segmented(kind: ChecksumKind, data: &[u8], segment_len: usize) -> Checksum {
    if segment_len == 0 || data.len() <= segment_len {
        return Checksum::of(kind, data);
    }
    data.par_chunks(segment_len)
        .map(|segment| Checksum::of(kind, segment))
        .reduce(|| Checksum::init(kind), Checksum::combine_unchecked)
}
