//! Byte layout of a stream: header, block headers, markers, trailer.
//!
//! ```text
//! stream  := [header] block* end [trailer]        (header/trailer: Wrapped only)
//! header  := 0x5C | FLG | [dict_id u32 LE] | HC
//! block   := bh(u32 LE) | payload | [xxh32 u32 LE]
//! marker  := bh(kind = marker, len 0|1) | "SYNC"
//! end     := bh(kind = end, len 0)
//! trailer := checksum u32 LE
//! ```
//!
//! FLG bits 0-4 hold the window log, bit 5 flags a dictionary id, bit 6 flags
//! per-block checksums and bit 7 selects CRC-32 over Adler-32. HC is the second
//! byte of XXH32 over `FLG..dict_id`. A block header keeps its kind in bits
//! 30-31 and its payload length in bits 0-29.

use super::types::BlockChecksum;
use crate::checksum::ChecksumKind;
use crate::config::{BLOCK_SIZE, WINDOW_LOG_MAX, WINDOW_LOG_MIN};
use crate::error::CorruptKind;
use crate::xxhash::header_checksum;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

pub const STREAM_MAGIC: u8 = 0x5C;

const FLG_WINDOW_MASK: u8 = 0x1F;
const FLG_DICT_ID: u8 = 0x20;
const FLG_BLOCK_CHECKSUM: u8 = 0x40;
const FLG_CRC32: u8 = 0x80;

/// Header without a dictionary id: magic, FLG, HC.
pub const MIN_HEADER_SIZE: usize = 3;
/// Header with a dictionary id.
pub const MAX_HEADER_SIZE: usize = 7;
/// Bytes needed before the full header length is known.
pub const HEADER_PEEK_SIZE: usize = 2;

/// Block header size.
pub const BH_SIZE: usize = 4;
/// Block checksum size, when enabled.
pub const BF_SIZE: usize = 4;
/// Trailer size (Wrapped only).
pub const TRAILER_SIZE: usize = 4;

pub const MARKER_MAGIC: [u8; 4] = *b"SYNC";
/// Block header plus magic.
pub const MARKER_SIZE: usize = BH_SIZE + MARKER_MAGIC.len();

const KIND_SHIFT: u32 = 30;
const LEN_MASK: u32 = (1 << KIND_SHIFT) - 1;

// ─────────────────────────────────────────────────────────────────────────────
// Byte-order helpers
// ─────────────────────────────────────────────────────────────────────────────

#[inline]
pub fn read_le32(src: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        src[offset],
        src[offset + 1],
        src[offset + 2],
        src[offset + 3],
    ])
}

#[inline]
pub fn write_le32(dst: &mut Vec<u8>, value: u32) {
    dst.extend_from_slice(&value.to_le_bytes());
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream header
// ─────────────────────────────────────────────────────────────────────────────

/// Decoded `Wrapped` stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub window_log: u8,
    pub dict_id: Option<u32>,
    pub block_checksum: BlockChecksum,
    pub checksum: ChecksumKind,
}

impl StreamHeader {
    pub fn encoded_len(&self) -> usize {
        if self.dict_id.is_some() {
            MAX_HEADER_SIZE
        } else {
            MIN_HEADER_SIZE
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let mut flg = self.window_log & FLG_WINDOW_MASK;
        if self.dict_id.is_some() {
            flg |= FLG_DICT_ID;
        }
        if self.block_checksum == BlockChecksum::Enabled {
            flg |= FLG_BLOCK_CHECKSUM;
        }
        if self.checksum == ChecksumKind::Crc32 {
            flg |= FLG_CRC32;
        }
        out.push(STREAM_MAGIC);
        let desc_start = out.len();
        out.push(flg);
        if let Some(id) = self.dict_id {
            write_le32(out, id);
        }
        let hc = header_checksum(&out[desc_start..]);
        out.push(hc);
    }

    /// Parse a complete header (exactly [`header_size`] bytes).
    pub fn parse(src: &[u8]) -> Result<StreamHeader, CorruptKind> {
        let size = match header_size(src)? {
            Some(size) if size == src.len() => size,
            _ => return Err(CorruptKind::Truncated),
        };
        let flg = src[1];
        let window_log = flg & FLG_WINDOW_MASK;
        if !(WINDOW_LOG_MIN..=WINDOW_LOG_MAX).contains(&window_log) {
            return Err(CorruptKind::WindowInvalid);
        }
        if header_checksum(&src[1..size - 1]) != src[size - 1] {
            return Err(CorruptKind::HeaderChecksum);
        }
        let dict_id = (flg & FLG_DICT_ID != 0).then(|| read_le32(src, 2));
        Ok(StreamHeader {
            window_log,
            dict_id,
            block_checksum: if flg & FLG_BLOCK_CHECKSUM != 0 {
                BlockChecksum::Enabled
            } else {
                BlockChecksum::Disabled
            },
            checksum: if flg & FLG_CRC32 != 0 {
                ChecksumKind::Crc32
            } else {
                ChecksumKind::Adler32
            },
        })
    }
}

/// Total header length given its first bytes, or `None` if fewer than
/// [`HEADER_PEEK_SIZE`] bytes are available.
pub fn header_size(prefix: &[u8]) -> Result<Option<usize>, CorruptKind> {
    match prefix.first() {
        None => return Ok(None),
        Some(&magic) if magic != STREAM_MAGIC => return Err(CorruptKind::BadMagic),
        Some(_) => {}
    }
    let Some(&flg) = prefix.get(1) else {
        return Ok(None);
    };
    Ok(Some(if flg & FLG_DICT_ID != 0 {
        MAX_HEADER_SIZE
    } else {
        MIN_HEADER_SIZE
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Block headers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Compressed,
    Stored,
    Marker,
    End,
}

impl BlockKind {
    fn code(self) -> u32 {
        match self {
            BlockKind::Compressed => 0,
            BlockKind::Stored => 1,
            BlockKind::Marker => 2,
            BlockKind::End => 3,
        }
    }

    fn from_code(code: u32) -> BlockKind {
        match code & 3 {
            0 => BlockKind::Compressed,
            1 => BlockKind::Stored,
            2 => BlockKind::Marker,
            _ => BlockKind::End,
        }
    }
}

pub fn block_header(kind: BlockKind, len: usize) -> [u8; BH_SIZE] {
    debug_assert!(len as u64 <= u64::from(LEN_MASK));
    ((kind.code() << KIND_SHIFT) | (len as u32 & LEN_MASK)).to_le_bytes()
}

/// Decode and validate a block header.
pub fn parse_block_header(raw: [u8; BH_SIZE]) -> Result<(BlockKind, usize), CorruptKind> {
    let word = u32::from_le_bytes(raw);
    let kind = BlockKind::from_code(word >> KIND_SHIFT);
    let len = (word & LEN_MASK) as usize;
    match kind {
        BlockKind::Compressed | BlockKind::Stored => {
            if len == 0 {
                return Err(CorruptKind::BlockHeader);
            }
            if len > BLOCK_SIZE {
                return Err(CorruptKind::BlockTooLarge);
            }
        }
        BlockKind::Marker if len > 1 => return Err(CorruptKind::BlockHeader),
        BlockKind::End if len != 0 => return Err(CorruptKind::BlockHeader),
        _ => {}
    }
    Ok((kind, len))
}

/// The 8-byte resynchronisation marker. `full` marks a point after which no
/// block references earlier data.
pub fn sync_marker(full: bool) -> [u8; MARKER_SIZE] {
    let bh = block_header(BlockKind::Marker, usize::from(full));
    let mut m = [0u8; MARKER_SIZE];
    m[..BH_SIZE].copy_from_slice(&bh);
    m[BH_SIZE..].copy_from_slice(&MARKER_MAGIC);
    m
}

/// `true` when `prefix` could be the start of a sync marker.
pub fn is_marker_prefix(prefix: &[u8]) -> bool {
    let sync = sync_marker(false);
    prefix.len() <= MARKER_SIZE
        && prefix.iter().enumerate().all(|(i, &b)| {
            if i == 0 {
                b == 0 || b == 1
            } else {
                b == sync[i]
            }
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Bound
// ─────────────────────────────────────────────────────────────────────────────

/// Worst-case encoded size of `input_len` bytes in one `Finish` step: every
/// block stored, block checksums on, the largest header, end block, trailer.
pub fn compress_bound(input_len: usize) -> usize {
    let blocks = input_len.div_ceil(BLOCK_SIZE).max(1);
    input_len
        .saturating_add(blocks.saturating_mul(BH_SIZE + BF_SIZE))
        .saturating_add(MAX_HEADER_SIZE + BH_SIZE + TRAILER_SIZE)
}
