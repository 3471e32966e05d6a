//! Resumable compressor and decompressor over caller-owned buffers.
//!
//! Both streams follow the same contract: `step(input, output, ..)` never
//! reads past `input.len()` or writes past `output.len()`, reports how many
//! bytes it consumed and produced, and says what it needs next. Callers loop,
//! feeding more input or more output space as the status asks.
//!
//! ```
//! use sluice::stream::{CompressorStream, DecompressorStream, Flush, StepStatus, StreamConfig};
//!
//! let mut c = CompressorStream::new(StreamConfig::default()).unwrap();
//! let mut packed = vec![0u8; CompressorStream::bound(5)];
//! let r = c.step(b"hello", &mut packed, Flush::Finish).unwrap();
//! assert_eq!(r.status, StepStatus::StreamEnd);
//! packed.truncate(r.produced);
//!
//! let mut d = DecompressorStream::new(StreamConfig::default()).unwrap();
//! let mut plain = [0u8; 5];
//! let r = d.step(&packed, &mut plain).unwrap();
//! assert_eq!(r.status, StepStatus::StreamEnd);
//! assert_eq!(&plain, b"hello");
//! ```

pub mod compress;
pub mod decompress;
pub mod format;
pub mod types;

pub use compress::CompressorStream;
pub use decompress::DecompressorStream;
pub use types::{
    BlockChecksum, CompressorState, DecompressorState, Flush, Framing, Level, StepResult,
    StepStatus, Strategy, StreamConfig, SyncResult, TotalCounters,
};
