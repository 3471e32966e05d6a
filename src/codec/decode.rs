//! Block decoder.
//!
//! Every length and offset read from the payload is checked before use:
//! malformed input yields a [`CorruptKind`], never a panic.

use super::types::{get_varint, MIN_MATCH, ML_MASK, RUN_MASK};
use crate::error::CorruptKind;

/// Decode one compressed payload, appending the bytes to `out`.
///
/// `history` holds the bytes preceding this block. Matches may reach back into
/// it, but never more than `max_dist` bytes. `out` must be empty on entry and
/// never grows past `max_out` bytes.
pub fn decode_block(
    payload: &[u8],
    history: &[u8],
    max_dist: usize,
    max_out: usize,
    out: &mut Vec<u8>,
) -> Result<(), CorruptKind> {
    debug_assert!(out.is_empty());
    let mut pos = 0usize;

    while pos < payload.len() {
        let token = usize::from(payload[pos]);
        pos += 1;

        // Literals.
        let mut lit_len = token >> 4;
        if lit_len == RUN_MASK {
            lit_len += get_varint(payload, &mut pos).ok_or(CorruptKind::Sequence)? as usize;
        }
        let lit_end = pos.checked_add(lit_len).ok_or(CorruptKind::Sequence)?;
        if lit_end > payload.len() {
            return Err(CorruptKind::Sequence);
        }
        if out.len() + lit_len > max_out {
            return Err(CorruptKind::BlockTooLarge);
        }
        out.extend_from_slice(&payload[pos..lit_end]);
        pos = lit_end;

        // Last sequence: literals only.
        if pos == payload.len() {
            if token & ML_MASK != 0 {
                return Err(CorruptKind::Sequence);
            }
            break;
        }

        // Match.
        let dist = get_varint(payload, &mut pos).ok_or(CorruptKind::Sequence)? as usize;
        let mut match_len = token & ML_MASK;
        if match_len == ML_MASK {
            match_len += get_varint(payload, &mut pos).ok_or(CorruptKind::Sequence)? as usize;
        }
        let match_len = match_len + MIN_MATCH;

        if dist == 0 {
            return Err(CorruptKind::Sequence);
        }
        if dist > max_dist || dist > history.len() + out.len() {
            return Err(CorruptKind::OffsetOutOfRange);
        }
        if out.len() + match_len > max_out {
            return Err(CorruptKind::BlockTooLarge);
        }
        copy_match(out, history, dist, match_len);
    }

    Ok(())
}

/// Append `len` bytes starting `dist` bytes before the end of `history ++ out`.
fn copy_match(out: &mut Vec<u8>, history: &[u8], dist: usize, mut len: usize) {
    if dist > out.len() {
        // Part (or all) of the source lies in history.
        let back = dist - out.len();
        let from = history.len() - back;
        let take = back.min(len);
        out.extend_from_slice(&history[from..from + take]);
        len -= take;
        if len == 0 {
            return;
        }
        // The rest continues from the start of this block's output.
        let mut src = 0;
        while len > 0 {
            let b = out[src];
            out.push(b);
            src += 1;
            len -= 1;
        }
        return;
    }

    let start = out.len() - dist;
    if dist >= len {
        out.extend_from_within(start..start + len);
    } else {
        // Overlapping copy: replicate the period.
        out.reserve(len);
        for i in 0..len {
            let b = out[start + i];
            out.push(b);
        }
    }
}
