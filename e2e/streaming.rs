//! E2E: streaming API
//!
//! Drives `CompressorStream` and `DecompressorStream` the way an application
//! with fixed-size buffers would:
//! - byte-at-a-time and irregular chunking on both sides
//! - flush markers between application messages
//! - history carried across streams with `reset_keep`
//! - recovery from a lost segment with `sync`

use sluice::{
    BlockChecksum, CompressorStream, DecompressorStream, Flush, Level, StepStatus, StreamConfig,
    SyncResult,
};

fn lorem(len: usize) -> Vec<u8> {
    const WORDS: [&str; 12] = [
        "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed",
        "do", "eiusmod", "tempor",
    ];
    let mut out = Vec::with_capacity(len + 16);
    let mut seed = 1u32;
    while out.len() < len {
        seed = seed.wrapping_mul(69_069).wrapping_add(1);
        out.extend_from_slice(WORDS[(seed >> 20) as usize % WORDS.len()].as_bytes());
        out.push(if seed % 13 == 0 { b'\n' } else { b' ' });
    }
    out.truncate(len);
    out
}

/// Compress with irregular input and output chunk sizes.
fn compress_irregular(cfg: StreamConfig, data: &[u8]) -> Vec<u8> {
    let mut c = CompressorStream::new(cfg).expect("compressor");
    let sizes = [1usize, 5, 64, 333, 4096, 17];
    let mut out = Vec::new();
    let mut pos = 0;
    let mut i = 0;
    let mut finishing = false;
    loop {
        let mut take = sizes[i % sizes.len()].min(data.len() - pos);
        // Once Finish is requested it must be repeated with everything left.
        finishing |= pos + take == data.len();
        if finishing {
            take = data.len() - pos;
        }
        let mode = if finishing { Flush::Finish } else { Flush::NoFlush };
        let mut buf = vec![0u8; sizes[(i + 3) % sizes.len()]];
        let r = c.step(&data[pos..pos + take], &mut buf, mode).expect("step");
        out.extend_from_slice(&buf[..r.produced]);
        pos += r.consumed;
        i += 1;
        if r.status == StepStatus::StreamEnd {
            break;
        }
    }
    assert_eq!(pos, data.len());
    c.end().expect("end");
    out
}

fn decompress_irregular(cfg: StreamConfig, packed: &[u8]) -> Vec<u8> {
    let mut d = DecompressorStream::new(cfg).expect("decompressor");
    let sizes = [3usize, 1, 250, 8192, 7];
    let mut out = Vec::new();
    let mut pos = 0;
    let mut i = 0;
    loop {
        let end = (pos + sizes[i % sizes.len()]).min(packed.len());
        let mut buf = vec![0u8; sizes[(i + 2) % sizes.len()]];
        let r = d.step(&packed[pos..end], &mut buf).expect("step");
        out.extend_from_slice(&buf[..r.produced]);
        pos += r.consumed;
        i += 1;
        match r.status {
            StepStatus::StreamEnd => break,
            StepStatus::Corrupt(kind) => panic!("corrupt: {kind:?}"),
            _ => {}
        }
    }
    d.end().expect("end");
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Chunking
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_irregular_chunks_roundtrip() {
    let data = lorem(300_000);
    for level in [0u8, 1, 6, 9] {
        let cfg = StreamConfig::default().with_level(Level::new(level).unwrap());
        let packed = compress_irregular(cfg, &data);
        assert_eq!(packed, sluice::oneshot::compress_with(&data, &cfg, None).unwrap());
        assert_eq!(decompress_irregular(cfg, &packed), data, "level {level}");
    }
}

#[test]
fn test_byte_at_a_time_both_sides() {
    let data = lorem(6000);
    let cfg = StreamConfig::default().with_block_checksum(BlockChecksum::Enabled);
    let mut c = CompressorStream::new(cfg).unwrap();
    let mut packed = Vec::new();
    let mut byte = [0u8; 1];
    for (i, b) in data.iter().enumerate() {
        let last = i + 1 == data.len();
        let mode = if last { Flush::Finish } else { Flush::NoFlush };
        let mut input: &[u8] = std::slice::from_ref(b);
        loop {
            let r = c.step(input, &mut byte, mode).unwrap();
            packed.extend_from_slice(&byte[..r.produced]);
            input = &input[r.consumed..];
            match r.status {
                StepStatus::NeedMoreOutput => continue,
                StepStatus::StreamEnd => break,
                _ if input.is_empty() => break,
                _ => {}
            }
        }
    }

    let mut d = DecompressorStream::new(cfg).unwrap();
    let mut plain = Vec::new();
    let mut pos = 0;
    loop {
        let end = (pos + 1).min(packed.len());
        let r = d.step(&packed[pos..end], &mut byte).unwrap();
        pos += r.consumed;
        plain.extend_from_slice(&byte[..r.produced]);
        if r.status == StepStatus::StreamEnd {
            break;
        }
    }
    assert_eq!(pos, packed.len());
    assert_eq!(plain, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages and flushes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_each_flushed_message_decodes_immediately() {
    let cfg = StreamConfig::default();
    let mut c = CompressorStream::new(cfg).unwrap();
    let mut d = DecompressorStream::new(cfg).unwrap();
    let mut wire = vec![0u8; 1 << 16];
    let mut plain = vec![0u8; 1 << 16];

    for n in 0..50 {
        let msg = format!("message {n}: {}", "payload ".repeat(n % 7 + 1));
        let mode = if n % 10 == 9 { Flush::FullFlush } else { Flush::SyncFlush };
        let r = c.step(msg.as_bytes(), &mut wire, mode).unwrap();
        assert_eq!(r.consumed, msg.len());
        assert_eq!(r.status, StepStatus::Ok);

        let dr = d.step(&wire[..r.produced], &mut plain).unwrap();
        assert_eq!(dr.consumed, r.produced);
        assert_eq!(dr.status, StepStatus::NeedMoreInput);
        assert_eq!(&plain[..dr.produced], msg.as_bytes(), "message {n}");
        assert!(d.is_sync_point());
    }

    let r = c.step(&[], &mut wire, Flush::Finish).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    let dr = d.step(&wire[..r.produced], &mut plain).unwrap();
    assert_eq!((dr.produced, dr.status), (0, StepStatus::StreamEnd));
    assert_eq!(c.total_in(), d.total_out());
}

#[test]
fn test_later_messages_reuse_earlier_ones() {
    let cfg = StreamConfig::default();
    let msg = b"{\"user\":\"someone\",\"action\":\"login\",\"ok\":true}";
    let mut c = CompressorStream::new(cfg).unwrap();
    let mut wire = vec![0u8; 4096];
    let first = c.step(msg, &mut wire, Flush::SyncFlush).unwrap().produced;
    let second = c.step(msg, &mut wire, Flush::SyncFlush).unwrap().produced;
    assert!(second < first, "second copy {second} should be cheaper than {first}");
}

// ─────────────────────────────────────────────────────────────────────────────
// reset_keep and resync
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_reset_keep_chain_of_streams() {
    let cfg = StreamConfig::default();
    let mut c = CompressorStream::new(cfg).unwrap();
    let mut d = DecompressorStream::new(cfg).unwrap();
    let mut total = 0u64;
    for n in 0..5 {
        let data = lorem(1000 + n * 500);
        let mut packed = vec![0u8; CompressorStream::bound(data.len())];
        let r = c.step(&data, &mut packed, Flush::Finish).unwrap();
        assert_eq!(r.status, StepStatus::StreamEnd);
        let mut plain = vec![0u8; data.len()];
        let dr = d.step(&packed[..r.produced], &mut plain).unwrap();
        assert_eq!(dr.status, StepStatus::StreamEnd);
        assert_eq!(plain, data);
        total += data.len() as u64;
        c.reset_keep();
        d.reset_keep();
    }
    assert_eq!(c.total_in(), total);
    assert_eq!(d.total_out(), total);
}

#[test]
fn test_sync_after_lost_bytes() {
    let cfg = StreamConfig::default();
    let mut c = CompressorStream::new(cfg).unwrap();
    let mut wire = Vec::new();
    let mut buf = vec![0u8; 1 << 17];
    let segments: Vec<Vec<u8>> = (0..4).map(|i| lorem(2000 + i * 100)).collect();
    for (i, seg) in segments.iter().enumerate() {
        let mode = if i == segments.len() - 1 { Flush::Finish } else { Flush::FullFlush };
        let r = c.step(seg, &mut buf, mode).unwrap();
        wire.extend_from_slice(&buf[..r.produced]);
    }

    // Drop a chunk from the middle of the second segment's block.
    let first_len = {
        let mut sizer = CompressorStream::new(cfg).unwrap();
        sizer.step(&segments[0], &mut buf, Flush::FullFlush).unwrap().produced
    };
    let mut damaged = wire[..first_len + 20].to_vec();
    damaged.extend_from_slice(&wire[first_len + 60..]);

    let mut d = DecompressorStream::new(cfg).unwrap();
    let mut out = vec![0u8; 1 << 16];
    let r = d.step(&damaged[..first_len], &mut out).unwrap();
    assert_eq!(&out[..r.produced], segments[0].as_slice());

    let rest = &damaged[first_len..];
    let SyncResult::Found(skip) = d.sync(rest).unwrap() else {
        panic!("no marker after the damage");
    };
    let r = d.step(&rest[skip..], &mut out).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    let expected: Vec<u8> = segments[2..].concat();
    assert_eq!(&out[..r.produced], expected.as_slice());
}
