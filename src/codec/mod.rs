//! Block codec: the reversible transform applied to each data block.
//!
//! The streams treat this as a pluggable primitive. The compressor feeds each
//! block to a [`BlockEncoder`] that keeps the recent history as context and
//! gets back an encoded payload, which it stores verbatim instead when that is
//! not smaller.

pub mod decode;
pub mod encode;
pub mod matcher;
pub mod types;

pub use decode::decode_block;
pub use encode::BlockEncoder;
pub use types::{search_params, SearchParams, MIN_MATCH};

use crate::stream::{Level, Strategy};

/// Search parameters for a level/strategy pair.
pub fn params_for(level: Level, strategy: Strategy) -> SearchParams {
    if level.get() == 0 {
        return SearchParams::STORE;
    }
    match strategy {
        Strategy::Default => search_params(level.get()),
        Strategy::Rle => SearchParams {
            rle_only: true,
            ..SearchParams::STORE
        },
        Strategy::LiteralOnly => SearchParams::STORE,
    }
}
