//! XXH32 helpers used by the stream format (header check byte and optional
//! per-block checksums), backed by `xxhash-rust`.

/// One-shot XXH32.
///
/// `xxh32_oneshot(b"", 0)` == `0x02CC5D05`.
#[inline]
pub fn xxh32_oneshot(data: &[u8], seed: u32) -> u32 {
    xxhash_rust::xxh32::xxh32(data, seed)
}

/// Header check byte: second byte of XXH32 over the header descriptor.
#[inline]
pub fn header_checksum(descriptor: &[u8]) -> u8 {
    ((xxh32_oneshot(descriptor, 0) >> 8) & 0xFF) as u8
}

/// Checksum appended to a data block payload when block checksums are on.
#[inline]
pub fn block_checksum(payload: &[u8]) -> u32 {
    xxh32_oneshot(payload, 0)
}
