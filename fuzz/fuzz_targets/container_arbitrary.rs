#![no_main]
use std::io::Read;

use libfuzzer_sys::fuzz_target;
use sluice::ContainerReader;

fuzz_target!(|data: &[u8]| {
    let Ok(mut reader) = ContainerReader::open(data) else {
        return;
    };
    let mut sink = Vec::new();
    if reader.read_to_end(&mut sink).is_ok() {
        let _ = reader.close();
    }
});
