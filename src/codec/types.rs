//! Shared constants and primitives of the sequence format.
//!
//! A compressed block payload is a series of sequences:
//!
//! ```text
//! token | [literal length varint] | literals | offset varint | [match length varint]
//! ```
//!
//! The token's high nibble is the literal count (15 means "15 + varint"), its
//! low nibble is `match_len - MIN_MATCH` with the same extension rule. The last
//! sequence may stop after its literals; its low nibble must then be 0.

/// Shortest match the format can express.
pub const MIN_MATCH: usize = 4;

pub const RUN_BITS: u32 = 4;
pub const RUN_MASK: usize = (1 << RUN_BITS) - 1;
pub const ML_MASK: usize = 15;

/// A LEB128 u32 never needs more than five bytes.
pub const VARINT_MAX_LEN: usize = 5;

/// Append `value` as LEB128.
#[inline]
pub fn put_varint(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Read a LEB128 value at `*pos`, advancing it.
///
/// Returns `None` on truncation or when the encoding exceeds 32 bits.
#[inline]
pub fn get_varint(src: &[u8], pos: &mut usize) -> Option<u32> {
    let mut value: u32 = 0;
    for i in 0..VARINT_MAX_LEN {
        let byte = *src.get(*pos)?;
        *pos += 1;
        let bits = u32::from(byte & 0x7F);
        if i == VARINT_MAX_LEN - 1 && bits > 0x0F {
            return None;
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Some(value);
        }
    }
    None
}

/// Match-search tuning derived from an effort level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Candidates examined per position; 0 disables matching.
    pub max_chain: u32,
    /// Try the next position before committing to a match.
    pub lazy: bool,
    /// Stop searching once a match this long is found.
    pub nice_len: usize,
    /// Only look for runs (offset 1).
    pub rle_only: bool,
}

impl SearchParams {
    pub const STORE: SearchParams = SearchParams {
        max_chain: 0,
        lazy: false,
        nice_len: 0,
        rle_only: false,
    };

    #[inline]
    pub fn finds_matches(&self) -> bool {
        self.rle_only || self.max_chain > 0
    }
}

//                 chain  lazy   nice
const LEVEL_TABLE: [(u32, bool, usize); 10] = [
    (0, false, 0),      // 0: store
    (1, false, 16),     // 1
    (2, false, 16),     // 2
    (4, false, 32),     // 3
    (8, true, 32),      // 4
    (16, true, 64),     // 5
    (32, true, 128),    // 6
    (64, true, 256),    // 7
    (128, true, 1024),  // 8
    (512, true, 4096),  // 9
];

/// Parameters for `level` (clamped to 0..=9).
pub fn search_params(level: u8) -> SearchParams {
    let (max_chain, lazy, nice_len) = LEVEL_TABLE[usize::from(level.min(9))];
    SearchParams {
        max_chain,
        lazy,
        nice_len,
        rle_only: false,
    }
}
