// Checksum algebra: update is streaming, combine matches concatenation.

use sluice::checksum::{self, Checksum, ChecksumKind};
use sluice::Error;

const KINDS: [ChecksumKind; 2] = [ChecksumKind::Adler32, ChecksumKind::Crc32];

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 3)) as u8).collect()
}

#[test]
fn known_values() {
    assert_eq!(Checksum::of(ChecksumKind::Adler32, b"Wikipedia").value(), 0x11E6_0398);
    assert_eq!(Checksum::of(ChecksumKind::Crc32, b"123456789").value(), 0xCBF4_3926);
    assert_eq!(checksum::init(ChecksumKind::Adler32).value(), 1);
    assert_eq!(checksum::init(ChecksumKind::Crc32).value(), 0);
}

#[test]
fn combine_equals_concatenation_at_every_split() {
    let data = sample(300);
    for kind in KINDS {
        let whole = Checksum::of(kind, &data);
        for split in [0usize, 1, 2, 17, 150, 299, 300] {
            let (a, b) = data.split_at(split);
            let combined = checksum::combine(
                Checksum::of(kind, a),
                Checksum::of(kind, b),
                b.len() as u64,
            )
            .unwrap();
            assert_eq!(combined, whole, "{kind:?} split at {split}");
        }
    }
}

#[test]
fn combine_with_large_second_segment() {
    // Longer than the Adler-32 modulus so the length term wraps.
    let data = sample(200_000);
    for kind in KINDS {
        let (a, b) = data.split_at(1234);
        let combined = Checksum::of(kind, a)
            .combine(Checksum::of(kind, b), b.len() as u64)
            .unwrap();
        assert_eq!(combined.value(), Checksum::of(kind, &data).value());
        assert_eq!(combined.len(), data.len() as u64);
    }
}

#[test]
fn update_in_pieces_equals_one_shot() {
    let data = sample(10_000);
    for kind in KINDS {
        let mut rolling = checksum::init(kind);
        for piece in data.chunks(333) {
            rolling = checksum::update(rolling, piece);
        }
        assert_eq!(rolling, Checksum::of(kind, &data));
    }
}

#[test]
fn combine_rejects_wrong_length_and_mixed_kinds() {
    let a = Checksum::of(ChecksumKind::Adler32, b"abc");
    let b = Checksum::of(ChecksumKind::Adler32, b"defg");
    assert_eq!(a.combine(b, 3), Err(Error::InvalidLength));
    let c = Checksum::of(ChecksumKind::Crc32, b"defg");
    assert_eq!(a.combine(c, 4), Err(Error::ParameterInvalid));
}
