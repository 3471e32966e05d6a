//! CRC-32 (IEEE) on top of `crc32fast`, including concatenation.

use crc32fast::Hasher;

pub const SEED: u32 = 0;

/// Continue `crc` over `data`.
#[inline]
pub fn update(crc: u32, data: &[u8]) -> u32 {
    let mut hasher = Hasher::new_with_initial(crc);
    hasher.update(data);
    hasher.finalize()
}

/// CRC-32 of `A ++ B` given `crc(A)`, `crc(B)` and `len(B)`.
pub fn combine(crc1: u32, crc2: u32, len2: u64) -> u32 {
    // The left length never enters the computation; only the right one does.
    let mut left = Hasher::new_with_initial_len(crc1, 0);
    let right = Hasher::new_with_initial_len(crc2, len2);
    left.combine(&right);
    left.finalize()
}
