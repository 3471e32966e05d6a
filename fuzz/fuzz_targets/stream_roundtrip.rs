#![no_main]
use libfuzzer_sys::fuzz_target;
use sluice::{CompressorStream, DecompressorStream, Flush, Level, StepStatus, StreamConfig};

fuzz_target!(|data: &[u8]| {
    // First byte picks the level, the rest is the payload.
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let cfg = StreamConfig::default().with_level(Level::clamped(i32::from(selector % 10)));

    // Feed in uneven pieces with a sync flush between them.
    let mut comp = CompressorStream::new(cfg).unwrap();
    let mut packed = vec![0u8; CompressorStream::bound(payload.len()) + payload.len() * 16];
    let mut produced = 0;
    for (i, piece) in payload.chunks(usize::from(selector) + 1).enumerate() {
        let mode = if i % 2 == 0 { Flush::NoFlush } else { Flush::SyncFlush };
        let r = comp.step(piece, &mut packed[produced..], mode).unwrap();
        assert_eq!(r.consumed, piece.len());
        produced += r.produced;
    }
    let r = comp.step(&[], &mut packed[produced..], Flush::Finish).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    produced += r.produced;

    let mut decomp = DecompressorStream::new(cfg).unwrap();
    let mut out = vec![0u8; payload.len() + 1];
    let r = decomp.step(&packed[..produced], &mut out).unwrap();
    assert_eq!(r.status, StepStatus::StreamEnd);
    assert_eq!(&out[..r.produced], payload);
});
