//! Block encoder: greedy or lazy parse over a hash chain, emitting sequences.

use super::matcher::{run_match, HashChain, Match};
use super::types::{put_varint, SearchParams, MIN_MATCH, ML_MASK, RUN_MASK};
use crate::config::BLOCK_SIZE;

/// Match-finder state carried from one block to the next.
///
/// `window` holds the bytes a block may reference followed by the blocks
/// already encoded; the hash chain over it persists, and `next_to_update`
/// marks how far it has been filled, so each block only pays for the
/// positions it adds. The window is trimmed back to `max_dist` bytes once it
/// has grown by another `max(max_dist, BLOCK_SIZE)`.
#[derive(Clone)]
pub struct BlockEncoder {
    window: Vec<u8>,
    chain: HashChain,
    /// Positions below this are in the chain.
    next_to_update: usize,
}

impl Default for BlockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockEncoder {
    pub fn new() -> Self {
        BlockEncoder {
            window: Vec::new(),
            chain: HashChain::new(0),
            next_to_update: 0,
        }
    }

    /// Drop all context.
    pub fn clear(&mut self) {
        self.window.clear();
        self.chain.clear();
        self.next_to_update = 0;
    }

    /// Drop all context and start over from `history`.
    pub fn load(&mut self, history: &[u8]) {
        self.clear();
        self.window.extend_from_slice(history);
    }

    /// Bytes currently available as context, oldest first.
    pub fn window(&self) -> &[u8] {
        &self.window
    }

    /// Take `block` into the context without encoding it.
    pub fn skip(&mut self, block: &[u8], max_dist: usize) {
        self.trim(max_dist);
        self.window.extend_from_slice(block);
    }

    /// Encode `block` as sequences appended to `out`, then keep it as
    /// context. Matches reach back at most `max_dist` bytes. The caller
    /// decides whether the result is worth keeping over a stored block.
    pub fn encode(
        &mut self,
        block: &[u8],
        max_dist: usize,
        params: &SearchParams,
        out: &mut Vec<u8>,
    ) {
        self.trim(max_dist);
        let start = self.window.len();
        self.window.extend_from_slice(block);
        let end = self.window.len();
        if block.is_empty() {
            return;
        }
        if !params.finds_matches() {
            emit_literals(out, block);
            return;
        }
        if params.rle_only {
            self.parse_runs(start, out);
            return;
        }

        self.chain.grow(end);
        let from = self.next_to_update.max(start.saturating_sub(max_dist));
        for p in from..start {
            self.chain.insert(&self.window, p);
        }
        self.parse(start, max_dist, params, out);
        // The last MIN_MATCH - 1 positions need bytes from the next block.
        self.next_to_update = end.saturating_sub(MIN_MATCH - 1);
    }

    /// Greedy or lazy parse of `window[start..]` over the hash chain.
    fn parse(&mut self, start: usize, max_dist: usize, params: &SearchParams, out: &mut Vec<u8>) {
        let window = &self.window;
        let chain = &mut self.chain;
        let end = window.len();

        let mut anchor = start;
        let mut pos = start;
        while pos + MIN_MATCH <= end {
            let found = chain.find(window, pos, end, max_dist, params);
            chain.insert(window, pos);

            let Some(mut m) = found else {
                pos += 1;
                continue;
            };

            if params.lazy {
                while m.len < params.nice_len && pos + 1 + MIN_MATCH <= end {
                    match chain.find(window, pos + 1, end, max_dist, params) {
                        Some(next) if next.len > m.len => {
                            pos += 1;
                            chain.insert(window, pos);
                            m = next;
                        }
                        _ => break,
                    }
                }
            }

            emit_sequence(out, &window[anchor..pos], m);
            for p in pos + 1..pos + m.len {
                chain.insert(window, p);
            }
            pos += m.len;
            anchor = pos;
        }

        if anchor < end {
            emit_literals(out, &window[anchor..end]);
        }
    }

    /// Parse using only distance-one runs; the chain is left untouched.
    fn parse_runs(&self, start: usize, out: &mut Vec<u8>) {
        let window = &self.window;
        let end = window.len();
        let mut anchor = start;
        let mut pos = start;
        while pos + MIN_MATCH <= end {
            match run_match(window, pos, end) {
                Some(m) => {
                    emit_sequence(out, &window[anchor..pos], m);
                    pos += m.len;
                    anchor = pos;
                }
                None => pos += 1,
            }
        }
        if anchor < end {
            emit_literals(out, &window[anchor..end]);
        }
    }

    fn trim(&mut self, max_dist: usize) {
        let slack = max_dist.max(BLOCK_SIZE);
        if self.window.len() < max_dist + slack {
            return;
        }
        let n = self.window.len() - max_dist;
        self.window.drain(..n);
        self.chain.rebase(n);
        self.next_to_update = self.next_to_update.saturating_sub(n);
    }
}

#[inline]
fn emit_token(out: &mut Vec<u8>, lit_len: usize, ml_code: usize) {
    let token = (lit_len.min(RUN_MASK) << 4) | ml_code.min(ML_MASK);
    out.push(token as u8);
    if lit_len >= RUN_MASK {
        put_varint(out, (lit_len - RUN_MASK) as u32);
    }
}

fn emit_sequence(out: &mut Vec<u8>, literals: &[u8], m: Match) {
    let ml_code = m.len - MIN_MATCH;
    emit_token(out, literals.len(), ml_code);
    out.extend_from_slice(literals);
    put_varint(out, m.dist as u32);
    if ml_code >= ML_MASK {
        put_varint(out, (ml_code - ML_MASK) as u32);
    }
}

/// Final literal-only sequence.
fn emit_literals(out: &mut Vec<u8>, literals: &[u8]) {
    emit_token(out, literals.len(), 0);
    out.extend_from_slice(literals);
}
