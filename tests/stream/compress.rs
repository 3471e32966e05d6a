// Compressor step contract: chunking independence, flush markers, protocol
// violations, parameter changes and cloning.

use sluice::stream::{
    CompressorState, CompressorStream, Flush, Framing, Level, StepStatus, Strategy, StreamConfig,
};
use sluice::{oneshot, Error};

fn text(len: usize) -> Vec<u8> {
    let words = ["sluice ", "gate ", "water ", "flows ", "through ", "the ", "mill "];
    let mut out = Vec::with_capacity(len);
    let mut i = 0usize;
    while out.len() < len {
        out.extend_from_slice(words[(i * 7 + i / 3) % words.len()].as_bytes());
        i += 1;
    }
    out.truncate(len);
    out
}

/// Feed `input` in `in_chunk` pieces with `out_chunk` output windows, then finish.
fn compress_chunked(cfg: StreamConfig, input: &[u8], in_chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut c = CompressorStream::new(cfg).unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; out_chunk];
    for piece in input.chunks(in_chunk.max(1)) {
        let mut rest = piece;
        loop {
            let r = c.step(rest, &mut buf, Flush::NoFlush).unwrap();
            out.extend_from_slice(&buf[..r.produced]);
            rest = &rest[r.consumed..];
            if r.status == StepStatus::NeedMoreInput && rest.is_empty() {
                break;
            }
        }
    }
    loop {
        let r = c.step(&[], &mut buf, Flush::Finish).unwrap();
        out.extend_from_slice(&buf[..r.produced]);
        if r.status == StepStatus::StreamEnd {
            break;
        }
    }
    c.end().unwrap();
    out
}

#[test]
fn chunking_does_not_change_output() {
    let data = text(150_000);
    let cfg = StreamConfig::default();
    let reference = oneshot::compress_with(&data, &cfg, None).unwrap();
    for (in_chunk, out_chunk) in [(7usize, 1usize), (4096, 13), (65_536, 65_536), (200_000, 3)] {
        assert_eq!(
            compress_chunked(cfg, &data, in_chunk, out_chunk),
            reference,
            "in={in_chunk} out={out_chunk}"
        );
    }
}

#[test]
fn byte_at_a_time() {
    let data = text(20_000);
    let cfg = StreamConfig::default();
    let reference = oneshot::compress_with(&data, &cfg, None).unwrap();
    assert_eq!(compress_chunked(cfg, &data, 1, 4096), reference);
}

#[test]
fn output_respects_bound_at_every_level() {
    let data = text(70_000);
    for level in 0..=9 {
        let c = oneshot::compress(&data, Level::new(level).unwrap()).unwrap();
        assert!(c.len() <= CompressorStream::bound(data.len()), "level {level}");
    }
}

#[test]
fn level_zero_stores_verbatim() {
    let data = text(1000);
    let c = oneshot::compress(&data, Level::NONE).unwrap();
    // header(3) + block header(4) + payload + end block(4) + trailer(4)
    assert_eq!(c.len(), data.len() + 15);
    assert!(c.windows(data.len()).any(|w| w == data.as_slice()));
}

#[test]
fn zero_output_twice_is_a_protocol_error() {
    let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
    let r = c.step(b"abc", &mut [], Flush::NoFlush).unwrap();
    assert_eq!((r.consumed, r.produced, r.status), (0, 0, StepStatus::NeedMoreOutput));
    assert_eq!(c.step(b"abc", &mut [], Flush::NoFlush), Err(Error::Protocol));
    assert_eq!(c.state(), CompressorState::Failed);
    let mut buf = [0u8; 64];
    assert_eq!(c.step(b"abc", &mut buf, Flush::NoFlush), Err(Error::Protocol));
}

#[test]
fn finish_locks_the_flush_mode() {
    let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
    let mut tiny = [0u8; 2];
    let r = c.step(b"some input", &mut tiny, Flush::Finish).unwrap();
    assert_eq!(r.status, StepStatus::NeedMoreOutput);
    assert_eq!(c.state(), CompressorState::Finishing);
    assert_eq!(c.step(&[], &mut tiny, Flush::NoFlush), Err(Error::Protocol));
}

#[test]
fn stream_end_is_sticky_and_extra_input_fails() {
    let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
    let mut buf = [0u8; 256];
    assert_eq!(c.step(b"x", &mut buf, Flush::Finish).unwrap().status, StepStatus::StreamEnd);
    let again = c.step(&[], &mut buf, Flush::Finish).unwrap();
    assert_eq!((again.produced, again.status), (0, StepStatus::StreamEnd));
    assert_eq!(c.step(b"y", &mut buf, Flush::Finish), Err(Error::Protocol));
}

#[test]
fn end_before_stream_end_loses_data() {
    let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
    let mut buf = [0u8; 256];
    c.step(b"unfinished", &mut buf, Flush::NoFlush).unwrap();
    assert_eq!(c.end(), Err(Error::DataLoss));

    let untouched = CompressorStream::new(StreamConfig::default()).unwrap();
    assert_eq!(untouched.end().unwrap().total_in, 0);
}

#[test]
fn repeated_sync_flush_emits_one_marker() {
    let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
    let mut buf = [0u8; 1024];
    let first = c.step(b"flush me", &mut buf, Flush::SyncFlush).unwrap();
    assert_eq!(first.status, StepStatus::Ok);
    assert_eq!(c.buffered_input(), 0);
    let out_after_first = c.total_out();
    let second = c.step(&[], &mut buf, Flush::SyncFlush).unwrap();
    assert_eq!((second.produced, second.status), (0, StepStatus::Ok));
    assert_eq!(c.total_out(), out_after_first);
    // Upgrading to a full flush still writes a (full) marker.
    let third = c.step(&[], &mut buf, Flush::FullFlush).unwrap();
    assert_eq!(third.produced, 8);
}

#[test]
fn sync_flush_makes_everything_decodable() {
    let data = text(5000);
    let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
    let mut out = vec![0u8; CompressorStream::bound(data.len())];
    let r = c.step(&data, &mut out, Flush::SyncFlush).unwrap();
    assert_eq!(r.consumed, data.len());

    let mut d = sluice::stream::DecompressorStream::new(StreamConfig::default()).unwrap();
    let mut plain = vec![0u8; data.len() + 16];
    let dr = d.step(&out[..r.produced], &mut plain).unwrap();
    assert_eq!(dr.status, StepStatus::NeedMoreInput);
    assert_eq!(&plain[..dr.produced], data.as_slice());
    assert!(d.is_sync_point());
}

#[test]
fn params_change_mid_stream() {
    let data = text(40_000);
    let mut c = CompressorStream::new(StreamConfig::default().with_level(Level::BEST)).unwrap();
    let mut out = vec![0u8; CompressorStream::bound(data.len())];
    let mut produced = 0;
    let r = c.step(&data[..10_000], &mut out, Flush::NoFlush).unwrap();
    produced += r.produced;
    c.set_params(Level::NONE, Strategy::Default).unwrap();
    let r = c.step(&data[10_000..20_000], &mut out[produced..], Flush::NoFlush).unwrap();
    produced += r.produced;
    c.set_params(Level::FAST, Strategy::Rle).unwrap();
    c.set_effort_level(Level::DEFAULT).unwrap();
    let r = c.step(&data[20_000..], &mut out[produced..], Flush::Finish).unwrap();
    produced += r.produced;
    assert_eq!(r.status, StepStatus::StreamEnd);
    assert_eq!(c.config().level, Level::DEFAULT);
    assert_eq!(c.config().strategy, Strategy::Rle);

    let plain = oneshot::decompress(&out[..produced], data.len()).unwrap();
    assert_eq!(plain, data);
}

#[test]
fn params_cannot_change_after_finish() {
    let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
    let mut tiny = [0u8; 1];
    c.step(b"abc", &mut tiny, Flush::Finish).unwrap();
    assert_eq!(c.set_params(Level::BEST, Strategy::Default), Err(Error::InvalidState));
}

#[test]
fn clone_continues_independently() {
    let data = text(30_000);
    let mut a = CompressorStream::new(StreamConfig::default()).unwrap();
    let mut head = vec![0u8; CompressorStream::bound(data.len())];
    let r = a.step(&data[..12_345], &mut head, Flush::NoFlush).unwrap();
    let head = head[..r.produced].to_vec();
    let mut b = a.clone();

    let finish = |s: &mut CompressorStream| {
        let mut out = vec![0u8; CompressorStream::bound(data.len())];
        let r = s.step(&data[12_345..], &mut out, Flush::Finish).unwrap();
        assert_eq!(r.status, StepStatus::StreamEnd);
        out.truncate(r.produced);
        out
    };
    let tail_a = finish(&mut a);
    let tail_b = finish(&mut b);
    assert_eq!(tail_a, tail_b);
    assert_eq!(a.checksum(), b.checksum());

    let mut whole = head;
    whole.extend_from_slice(&tail_a);
    assert_eq!(oneshot::decompress(&whole, data.len()).unwrap(), data);
}

#[test]
fn reset_behaves_like_a_fresh_stream() {
    let data = text(3000);
    let cfg = StreamConfig::default();
    let expected = oneshot::compress_with(&data, &cfg, None).unwrap();

    let mut c = CompressorStream::new(cfg).unwrap();
    let mut out = vec![0u8; CompressorStream::bound(data.len())];
    c.step(b"discarded prefix", &mut out, Flush::NoFlush).unwrap();
    c.reset();
    assert_eq!((c.total_in(), c.total_out()), (0, 0));
    assert_eq!(c.state(), CompressorState::Ready);
    let r = c.step(&data, &mut out, Flush::Finish).unwrap();
    assert_eq!(&out[..r.produced], expected.as_slice());
}

#[test]
fn raw_framing_has_no_header_or_trailer() {
    let cfg = StreamConfig::default().with_framing(Framing::Raw).with_level(Level::NONE);
    let c = oneshot::compress_with(b"raw", &cfg, None).unwrap();
    // block header(4) + payload(3) + end block(4)
    assert_eq!(c.len(), 11);
    assert_eq!(&c[4..7], b"raw");
}

#[test]
fn frequent_sync_flushes_keep_long_range_matches() {
    let data = text(300_000);
    let cfg = StreamConfig::default().with_window_log(20);
    let mut c = CompressorStream::new(cfg).unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; 4096];
    for piece in data.chunks(1024) {
        let r = c.step(piece, &mut buf, Flush::SyncFlush).unwrap();
        assert_eq!(r.consumed, piece.len());
        assert_eq!(c.buffered_input(), 0);
        out.extend_from_slice(&buf[..r.produced]);
    }
    let r = c.step(&[], &mut buf, Flush::Finish).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    out.extend_from_slice(&buf[..r.produced]);

    assert!(out.len() < data.len() / 8, "{} bytes", out.len());
    assert_eq!(oneshot::decompress_with(&out, data.len(), &cfg, None).unwrap(), data);
}

#[test]
fn full_flush_starts_matching_from_scratch() {
    let first = text(20_000);
    let second = text(9_000);
    let cfg = StreamConfig::default().with_framing(Framing::Raw);

    let mut c = CompressorStream::new(cfg).unwrap();
    let mut buf = vec![0u8; CompressorStream::bound(first.len())];
    let r = c.step(&first, &mut buf, Flush::FullFlush).unwrap();
    assert_eq!(r.consumed, first.len());
    let r = c.step(&second, &mut buf, Flush::Finish).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    let tail = buf[..r.produced].to_vec();

    // Nothing before the flush point may be referenced, so the tail matches
    // what a fresh raw stream writes for the same bytes.
    let fresh = oneshot::compress_with(&second, &cfg, None).unwrap();
    assert_eq!(tail, fresh);
}
