#![no_main]
use libfuzzer_sys::fuzz_target;
use sluice::{DecompressorStream, Framing, StepStatus, StreamConfig, SyncResult};

fuzz_target!(|data: &[u8]| {
    // Arbitrary input must never panic; corruption is reported, then we try
    // to resync on whatever is left.
    for framing in [Framing::Wrapped, Framing::Raw] {
        let cfg = StreamConfig::default().with_framing(framing);
        let mut d = DecompressorStream::new(cfg).unwrap();
        let mut out = vec![0u8; 256];
        let mut pos = 0;
        for _ in 0..64 {
            let r = match d.step(&data[pos..], &mut out) {
                Ok(r) => r,
                Err(_) => break,
            };
            pos += r.consumed;
            match r.status {
                StepStatus::NeedMoreOutput => continue,
                StepStatus::Corrupt(_) if framing == Framing::Raw => {
                    match d.sync(&data[pos..]) {
                        Ok(SyncResult::Found(n)) => pos += n,
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }
});
