//! E2E: error handling
//!
//! Damaged and misused input must fail loudly:
//! - any single flipped byte of a checksummed payload is reported
//! - every truncation is reported
//! - contract violations are `Protocol` errors and poison the stream
//! - errors convert to and from `io::Error` without losing their identity

use std::io::{self, Read};

use sluice::container::{ContainerMeta, ContainerReader, ContainerWriter, WriteOptions};
use sluice::error::CorruptKind;
use sluice::oneshot;
use sluice::{
    BlockChecksum, CompressorStream, DecompressorStream, Error, Flush, StepStatus, StreamConfig,
};

fn payload() -> Vec<u8> {
    let mut v = b"checksums catch what parsing misses; ".repeat(12);
    v.extend((0u8..=255).rev());
    v
}

fn unpack(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut r = ContainerReader::open(bytes)?;
    let mut out = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    r.close()?;
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Bit flips
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_every_flip_after_the_header_is_detected() {
    let data = payload();
    let cfg = StreamConfig::default().with_block_checksum(BlockChecksum::Enabled);
    let packed = oneshot::compress_with(&data, &cfg, None).unwrap();
    // Header without dictionary: magic, flags, header checksum.
    for pos in 3..packed.len() {
        for mask in [0x01u8, 0x80] {
            let mut bad = packed.clone();
            bad[pos] ^= mask;
            let res = oneshot::decompress(&bad, data.len() * 2);
            assert!(
                matches!(res, Err(Error::Corrupt(_))),
                "flip {mask:#04x} at {pos} went unnoticed: {res:?}"
            );
        }
    }
}

#[test]
fn test_container_flips_never_yield_wrong_data() {
    let data = payload();
    let mut w = ContainerWriter::open(Vec::new(), ContainerMeta::default(), WriteOptions::default())
        .unwrap();
    io::Write::write_all(&mut w, &data).unwrap();
    let packed = w.finish().unwrap();

    for pos in 10..packed.len() {
        let mut bad = packed.clone();
        bad[pos] ^= 0x04;
        match unpack(&bad) {
            // A flip may leave the output intact (e.g. an equivalent match).
            Ok(out) => assert_eq!(out, data, "wrong data accepted after flip at {pos}"),
            Err(Error::Corrupt(_)) | Err(Error::TrailerMismatch) => {}
            Err(e) => panic!("unexpected error {e:?} after flip at {pos}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Truncation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_every_prefix_of_a_stream_is_rejected() {
    let data = payload();
    let packed = oneshot::compress(&data, sluice::Level::DEFAULT).unwrap();
    for n in 0..packed.len() {
        assert_eq!(
            oneshot::decompress(&packed[..n], data.len()),
            Err(Error::Corrupt(CorruptKind::Truncated)),
            "prefix of {n} bytes"
        );
    }
}

#[test]
fn test_every_prefix_of_a_container_is_rejected() {
    let data = payload();
    let mut w = ContainerWriter::open(
        Vec::new(),
        ContainerMeta::default().with_name("cut"),
        WriteOptions::default(),
    )
    .unwrap();
    io::Write::write_all(&mut w, &data).unwrap();
    let packed = w.finish().unwrap();
    for n in 0..packed.len() {
        assert_eq!(
            unpack(&packed[..n]),
            Err(Error::Corrupt(CorruptKind::Truncated)),
            "prefix of {n} bytes"
        );
    }
    assert_eq!(unpack(&packed), Ok(data));
}

// ─────────────────────────────────────────────────────────────────────────────
// Protocol violations
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_corrupt_decoder_refuses_further_steps() {
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = [0u8; 32];
    let r = d.step(b"\x00garbage", &mut out).unwrap();
    assert!(matches!(r.status, StepStatus::Corrupt(_)));
    let err = d.step(&[], &mut out).unwrap_err();
    assert_eq!(err, Error::Protocol);
    assert!(err.is_fatal());
    // Reset brings it back.
    d.reset();
    let packed = oneshot::compress(b"fresh", sluice::Level::DEFAULT).unwrap();
    assert_eq!(d.step(&packed, &mut out).unwrap().status, StepStatus::StreamEnd);
}

#[test]
fn test_failed_compressor_stays_failed_until_reset() {
    let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = [0u8; 256];
    c.step(b"abc", &mut out, Flush::Finish).unwrap();
    assert_eq!(c.step(b"more", &mut out, Flush::NoFlush), Err(Error::Protocol));
    assert_eq!(c.step(&[], &mut out, Flush::Finish), Err(Error::Protocol));
    c.reset();
    assert_eq!(c.step(b"abc", &mut out, Flush::Finish).unwrap().status, StepStatus::StreamEnd);
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let cfg = StreamConfig::default().with_window_log(40);
    assert_eq!(CompressorStream::new(cfg).unwrap_err(), Error::ParameterInvalid);
    assert_eq!(DecompressorStream::new(cfg).unwrap_err(), Error::ParameterInvalid);
    assert_eq!(sluice::Level::new(10), Err(Error::ParameterInvalid));
}

// ─────────────────────────────────────────────────────────────────────────────
// io::Error round trip
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_errors_survive_io_conversion() {
    for err in [
        Error::TrailerMismatch,
        Error::Corrupt(CorruptKind::BlockChecksum),
        Error::OutputTooSmall { minimum_required_so_far: 9 },
        Error::Closed,
    ] {
        let io_err = io::Error::from(err);
        assert_eq!(Error::from_io_ref(&io_err), Some(err));
        assert_eq!(Error::from(io_err), err);
    }
    let plain = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
    assert_eq!(Error::from(plain), Error::Io(io::ErrorKind::UnexpectedEof));
}

#[test]
fn test_read_adapter_reports_corruption_as_invalid_data() {
    let mut w = ContainerWriter::open(Vec::new(), ContainerMeta::default(), WriteOptions::default())
        .unwrap();
    io::Write::write_all(&mut w, &payload()).unwrap();
    let mut packed = w.finish().unwrap();
    packed[10..14].copy_from_slice(&[0, 0, 0, 0]);

    let mut r = ContainerReader::open(&packed[..]).unwrap();
    let mut sink = Vec::new();
    let err = Read::read_to_end(&mut r, &mut sink).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert_eq!(
        Error::from_io_ref(&err),
        Some(Error::Corrupt(CorruptKind::BlockHeader))
    );
}

#[test]
fn test_error_names_are_stable() {
    assert_eq!(Error::Protocol.error_name(), "protocol_error");
    assert_eq!(Error::TrailerMismatch.to_string(), "trailer_mismatch");
    assert_eq!(
        Error::Corrupt(CorruptKind::Truncated).to_string(),
        "corrupt input (corrupt_truncated)"
    );
}
