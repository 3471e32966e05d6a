// Decompressor step contract: partial feeding, corruption, resync and the
// pump adapters.

use std::io::Cursor;

use sluice::error::CorruptKind;
use sluice::pump;
use sluice::stream::{
    BlockChecksum, CompressorStream, DecompressorState, DecompressorStream, Flush, StepStatus,
    StreamConfig, SyncResult,
};
use sluice::{oneshot, Error};

fn sample(len: usize) -> Vec<u8> {
    let mut x = 0x2545_F491u32;
    (0..len)
        .map(|i| {
            // Runs of repeated phrases mixed with noise.
            if (i / 512) % 2 == 0 {
                b"repeat after me: "[i % 17]
            } else {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                (x >> 24) as u8
            }
        })
        .collect()
}

fn decode_chunked(stream: &[u8], in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; out_chunk];
    let mut pos = 0;
    loop {
        let end = (pos + in_chunk).min(stream.len());
        let r = d.step(&stream[pos..end], &mut buf).unwrap();
        pos += r.consumed;
        out.extend_from_slice(&buf[..r.produced]);
        match r.status {
            StepStatus::StreamEnd => break,
            StepStatus::NeedMoreInput => assert!(pos < stream.len(), "ran out of input"),
            StepStatus::NeedMoreOutput | StepStatus::Ok => {}
            other => panic!("unexpected status {other:?}"),
        }
    }
    assert_eq!(pos, stream.len());
    d.end().unwrap();
    out
}

#[test]
fn any_chunking_decodes_the_same() {
    let data = sample(140_000);
    let packed = oneshot::compress(&data, sluice::Level::DEFAULT).unwrap();
    for (in_chunk, out_chunk) in [(1usize, 65_536usize), (3, 5), (4096, 1), (1 << 20, 1 << 20)] {
        assert_eq!(decode_chunked(&packed, in_chunk, out_chunk), data, "in={in_chunk} out={out_chunk}");
    }
}

#[test]
fn counters_track_both_sides() {
    let data = sample(10_000);
    let packed = oneshot::compress(&data, sluice::Level::DEFAULT).unwrap();
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = vec![0u8; data.len()];
    let r = d.step(&packed, &mut out).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    assert!(d.is_finished());
    let totals = d.end().unwrap();
    assert_eq!(totals.total_in, packed.len() as u64);
    assert_eq!(totals.total_out, data.len() as u64);
    assert_eq!(totals.checksum.value(), sluice::Checksum::of(sluice::ChecksumKind::Adler32, &data).value());
}

#[test]
fn finished_stream_keeps_reporting_end() {
    let packed = oneshot::compress(b"done", sluice::Level::DEFAULT).unwrap();
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = [0u8; 16];
    assert_eq!(d.step(&packed, &mut out).unwrap().status, StepStatus::StreamEnd);
    let again = d.step(b"more", &mut out).unwrap();
    assert_eq!((again.consumed, again.produced, again.status), (0, 0, StepStatus::StreamEnd));
}

#[test]
fn bad_magic_is_corrupt_and_terminal() {
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = [0u8; 16];
    let r = d.step(b"not a stream", &mut out).unwrap();
    assert_eq!(r.status, StepStatus::Corrupt(CorruptKind::BadMagic));
    assert_eq!(d.corruption(), Some(CorruptKind::BadMagic));
    assert_eq!(d.state(), DecompressorState::Ended);
    assert_eq!(d.step(b"", &mut out), Err(Error::Protocol));
}

#[test]
fn flipped_trailer_fails_the_stream_checksum() {
    let mut packed = oneshot::compress(b"checksummed payload", sluice::Level::DEFAULT).unwrap();
    let last = packed.len() - 1;
    packed[last] ^= 0x80;
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = [0u8; 64];
    let r = d.step(&packed, &mut out).unwrap();
    assert_eq!(r.status, StepStatus::Corrupt(CorruptKind::StreamChecksum));
    // Decoded bytes are still handed out before the trailer check.
    assert_eq!(&out[..r.produced], b"checksummed payload");
}

#[test]
fn truncated_stream_cannot_end_cleanly() {
    let packed = oneshot::compress(&sample(5000), sluice::Level::DEFAULT).unwrap();
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = vec![0u8; 8192];
    let r = d.step(&packed[..packed.len() / 2], &mut out).unwrap();
    assert_eq!(r.status, StepStatus::NeedMoreInput);
    assert_eq!(d.end(), Err(Error::DataLoss));
}

#[test]
fn zero_output_twice_is_a_protocol_error() {
    let packed = oneshot::compress(b"abc", sluice::Level::DEFAULT).unwrap();
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    assert_eq!(d.step(&packed, &mut []).unwrap().status, StepStatus::NeedMoreOutput);
    assert_eq!(d.step(&packed, &mut []), Err(Error::Protocol));
}

#[test]
fn resync_skips_a_damaged_segment() {
    let first = sample(3000);
    let second = b"the second segment survives intact".repeat(40);
    let cfg = StreamConfig::default().with_block_checksum(BlockChecksum::Enabled);

    let mut c = CompressorStream::new(cfg).unwrap();
    let mut packed = vec![0u8; CompressorStream::bound(first.len() + second.len()) + 64];
    let a = c.step(&first, &mut packed, Flush::FullFlush).unwrap();
    let b = c.step(&second, &mut packed[a.produced..], Flush::Finish).unwrap();
    assert_eq!(b.status, StepStatus::StreamEnd);
    packed.truncate(a.produced + b.produced);

    // Damage the first block body, just past the header and block header.
    packed[3 + 4 + 10] ^= 0x55;

    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = vec![0u8; second.len() + first.len()];
    let r = d.step(&packed, &mut out).unwrap();
    assert_eq!(r.status, StepStatus::Corrupt(CorruptKind::BlockChecksum));
    assert_eq!(r.produced, 0);

    let rest = &packed[r.consumed..];
    let SyncResult::Found(skip) = d.sync(rest).unwrap() else {
        panic!("marker not found");
    };
    assert_eq!(skip, 8);
    assert!(d.is_sync_point());

    let r = d.step(&rest[skip..], &mut out).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    assert_eq!(&out[..r.produced], second.as_slice());
}

#[test]
fn sync_remembers_a_split_marker() {
    let cfg = StreamConfig::default();
    let mut c = CompressorStream::new(cfg).unwrap();
    let mut packed = vec![0u8; 4096];
    let a = c.step(b"before the marker", &mut packed, Flush::SyncFlush).unwrap();
    let b = c.step(b"after", &mut packed[a.produced..], Flush::Finish).unwrap();
    packed.truncate(a.produced + b.produced);
    let marker_end = a.produced;

    let mut d = DecompressorStream::new(cfg).unwrap();
    let mut out = [0u8; 64];
    // Header only, then scan the rest in two pieces that split the marker.
    let r = d.step(&packed[..3], &mut out).unwrap();
    assert_eq!(r.status, StepStatus::NeedMoreInput);
    let split = marker_end - 3;
    assert_eq!(d.sync(&packed[3..split]).unwrap(), SyncResult::NotFound);
    assert_eq!(d.state(), DecompressorState::Resyncing);
    assert_eq!(d.sync(&packed[split..]).unwrap(), SyncResult::Found(3));

    let r = d.step(&packed[marker_end..], &mut out).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    assert_eq!(&out[..r.produced], b"after");
}

#[test]
fn step_while_resyncing_is_invalid() {
    let packed = oneshot::compress(b"abc", sluice::Level::DEFAULT).unwrap();
    let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = [0u8; 8];
    d.step(&packed[..3], &mut out).unwrap();
    assert_eq!(d.sync(b"no marker here").unwrap(), SyncResult::NotFound);
    assert_eq!(d.step(&packed[3..], &mut out), Err(Error::InvalidState));
}

#[test]
fn pump_copies_between_reader_and_writer() {
    let data = sample(300_000);
    let cfg = StreamConfig::default();
    let mut packed = Vec::new();
    let totals = pump::compress_copy(&mut Cursor::new(&data), &mut packed, &cfg).unwrap();
    assert_eq!(totals.total_in, data.len() as u64);
    assert_eq!(totals.total_out, packed.len() as u64);

    let mut plain = Vec::new();
    let totals = pump::decompress_copy(&mut Cursor::new(&packed), &mut plain, &cfg).unwrap();
    assert_eq!(plain, data);
    assert_eq!(totals.total_in, packed.len() as u64);
}

#[test]
fn pump_reports_truncation_and_trailing_data() {
    let cfg = StreamConfig::default();
    let packed = oneshot::compress(&sample(2000), sluice::Level::DEFAULT).unwrap();

    let mut sink = Vec::new();
    let cut = &packed[..packed.len() - 2];
    assert_eq!(
        pump::decompress_copy(&mut Cursor::new(cut), &mut sink, &cfg),
        Err(Error::Corrupt(CorruptKind::Truncated))
    );

    let mut padded = packed.clone();
    padded.extend_from_slice(b"junk");
    let mut d = DecompressorStream::new(cfg).unwrap();
    let mut src = Cursor::new(padded);
    let mut out = Vec::new();
    let res = pump::decompress_with_callbacks(
        &mut d,
        |buf| std::io::Read::read(&mut src, buf),
        |chunk| {
            out.extend_from_slice(chunk);
            Ok(())
        },
    );
    assert_eq!(res.map(|t| t.total_out), Err(Error::Corrupt(CorruptKind::TrailingData)));
    assert_eq!(out, sample(2000));
}
