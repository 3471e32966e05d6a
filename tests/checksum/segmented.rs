// Parallel segmented checksums agree with the serial computation.

use sluice::checksum::{segmented, Checksum, ChecksumKind};

#[test]
fn segmented_matches_serial() {
    let data: Vec<u8> = (0..1_000_003u32).map(|i| (i % 253) as u8).collect();
    for kind in [ChecksumKind::Adler32, ChecksumKind::Crc32] {
        let serial = Checksum::of(kind, &data);
        for segment in [1usize << 10, 64 << 10, 333_333, 2_000_000] {
            assert_eq!(segmented(kind, &data, segment), serial, "{kind:?} / {segment}");
        }
    }
}

#[test]
fn zero_segment_length_falls_back_to_serial() {
    let data = b"tiny input";
    assert_eq!(
        segmented(ChecksumKind::Crc32, data, 0),
        Checksum::of(ChecksumKind::Crc32, data)
    );
}

#[test]
fn empty_input() {
    assert!(segmented(ChecksumKind::Adler32, &[], 16).is_empty());
}
