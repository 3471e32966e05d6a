//! E2E: one-shot API
//!
//! Validates the buffer-to-buffer facade:
//! - compress / compress_with at every level
//! - compress_bound monotonicity and coverage
//! - decompress capacity handling (`OutputTooSmall`)
//! - checksum combination over the decoded halves

use sluice::checksum::{self, Checksum, ChecksumKind};
use sluice::error::CorruptKind;
use sluice::oneshot::{compress, compress_bound, compress_with, decompress, decompress_with};
use sluice::{Error, Framing, Level, StreamConfig};

fn corpus() -> Vec<u8> {
    let mut v = b"The quick brown fox jumps over the lazy dog. ".repeat(200);
    let mut x = 7u32;
    v.extend((0..4000).map(|_| {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (x >> 16) as u8
    }));
    v.extend_from_slice(&[0u8; 3000]);
    v
}

// ─────────────────────────────────────────────────────────────────────────────
// Concrete scenario: ten 'A's
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_ten_a_scenario() {
    let x = b"AAAAAAAAAA";
    let c = compress(x, Level::DEFAULT).expect("compress");
    assert!(c.len() <= compress_bound(10));
    assert_eq!(decompress(&c, 10).expect("decompress"), x);

    let whole = Checksum::of(ChecksumKind::Adler32, x);
    let halves = checksum::combine(
        Checksum::of(ChecksumKind::Adler32, &x[..5]),
        Checksum::of(ChecksumKind::Adler32, &x[5..]),
        5,
    )
    .expect("combine");
    assert_eq!(halves, whole);

    // The trailer is the Adler-32 of the input.
    let trailer = u32::from_le_bytes(c[c.len() - 4..].try_into().unwrap());
    assert_eq!(trailer, whole.value());
}

// ─────────────────────────────────────────────────────────────────────────────
// Levels and bound
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_every_level_roundtrips() {
    let data = corpus();
    let mut sizes = Vec::new();
    for level in 0..=9 {
        let c = compress(&data, Level::new(level).unwrap()).expect("compress");
        assert!(c.len() <= compress_bound(data.len()), "level {level} exceeds bound");
        assert_eq!(decompress(&c, data.len()).expect("decompress"), data, "level {level}");
        sizes.push(c.len());
    }
    // Level 0 stores; anything that searches does better on this corpus.
    assert!(sizes[1..].iter().all(|&s| s < sizes[0]));
}

#[test]
fn test_bound_is_monotonic() {
    let mut prev = compress_bound(0);
    for n in (1..300_000).step_by(997) {
        let b = compress_bound(n);
        assert!(b >= prev, "bound({n}) = {b} < {prev}");
        assert!(b >= n);
        prev = b;
    }
    assert!(compress_bound(usize::MAX) >= compress_bound(usize::MAX - 1));
}

#[test]
fn test_incompressible_input_fits_bound_in_every_framing() {
    let mut x = 0xDEAD_BEEFu32;
    let noise: Vec<u8> = (0..200_000)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect();
    for framing in [Framing::Wrapped, Framing::Raw] {
        let cfg = StreamConfig::default()
            .with_framing(framing)
            .with_block_checksum(sluice::BlockChecksum::Enabled);
        let c = compress_with(&noise, &cfg, None).expect("compress");
        assert!(c.len() <= compress_bound(noise.len()));
        assert_eq!(decompress_with(&c, noise.len(), &cfg, None).unwrap(), noise);
    }
}

#[test]
fn test_empty_input() {
    let c = compress(b"", Level::DEFAULT).expect("compress");
    assert!(c.len() <= compress_bound(0));
    assert_eq!(decompress(&c, 0).expect("decompress"), b"");
}

// ─────────────────────────────────────────────────────────────────────────────
// Capacity handling
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_output_too_small_suggests_a_larger_size() {
    let data = corpus();
    let c = compress(&data, Level::DEFAULT).unwrap();
    let err = decompress(&c, 100).unwrap_err();
    let Error::OutputTooSmall { minimum_required_so_far } = err else {
        panic!("unexpected error {err:?}");
    };
    assert!(minimum_required_so_far > 100);
    // Growing to the reported size eventually succeeds.
    let mut cap = minimum_required_so_far;
    loop {
        match decompress(&c, cap) {
            Ok(plain) => {
                assert_eq!(plain, data);
                break;
            }
            Err(Error::OutputTooSmall { minimum_required_so_far }) => {
                assert!(minimum_required_so_far > cap);
                cap = minimum_required_so_far;
            }
            Err(e) => panic!("unexpected error {e:?}"),
        }
    }
}

#[test]
fn test_generous_capacity_is_fine() {
    let c = compress(b"small", Level::DEFAULT).unwrap();
    assert_eq!(decompress(&c, 1 << 20).unwrap(), b"small");
}

#[test]
fn test_trailing_bytes_are_rejected() {
    let mut c = compress(b"exact", Level::DEFAULT).unwrap();
    c.push(0);
    assert_eq!(decompress(&c, 64), Err(Error::Corrupt(CorruptKind::TrailingData)));
}

#[test]
fn test_crc32_streams() {
    let cfg = StreamConfig::default().with_checksum(ChecksumKind::Crc32);
    let data = corpus();
    let c = compress_with(&data, &cfg, None).unwrap();
    let trailer = u32::from_le_bytes(c[c.len() - 4..].try_into().unwrap());
    assert_eq!(trailer, Checksum::of(ChecksumKind::Crc32, &data).value());
    // The header says which checksum is used, so the default config decodes it.
    assert_eq!(decompress(&c, data.len()).unwrap(), data);
}
