//! Hash-chain match finder.
//!
//! Positions are indexes into a single contiguous window (`history ++ block`).
//! `head` maps a 4-byte hash to the most recent position with that hash and
//! `prev` links each position to the previous one in its bucket, so walking a
//! chain visits candidates from nearest to farthest. A chain lives as long as
//! its window: when the window drops its oldest bytes, [`HashChain::rebase`]
//! shifts every stored position down with it.

use super::types::{SearchParams, MIN_MATCH};

const HASH_LOG: u32 = 15;
const NIL: u32 = u32::MAX;

/// A candidate match: `len` bytes at `dist` bytes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub len: usize,
    pub dist: usize,
}

#[derive(Clone)]
pub struct HashChain {
    head: Vec<u32>,
    prev: Vec<u32>,
}

impl HashChain {
    /// Table sized for a window of `len` bytes.
    pub fn new(len: usize) -> Self {
        HashChain {
            head: vec![NIL; 1 << HASH_LOG],
            prev: vec![NIL; len],
        }
    }

    /// Make room for positions below `len`.
    #[inline]
    pub fn grow(&mut self, len: usize) {
        if self.prev.len() < len {
            self.prev.resize(len, NIL);
        }
    }

    /// Forget every inserted position.
    pub fn clear(&mut self) {
        self.head.fill(NIL);
        self.prev.clear();
    }

    /// The window dropped its first `n` bytes: drop positions below `n` and
    /// renumber the rest.
    pub fn rebase(&mut self, n: usize) {
        let shift = |p: &mut u32| {
            *p = match *p {
                NIL => NIL,
                v if (v as usize) < n => NIL,
                v => v - n as u32,
            };
        };
        self.head.iter_mut().for_each(shift);
        self.prev.drain(..n.min(self.prev.len()));
        self.prev.iter_mut().for_each(shift);
    }

    #[inline(always)]
    fn hash(window: &[u8], pos: usize) -> usize {
        let v = u32::from_le_bytes([
            window[pos],
            window[pos + 1],
            window[pos + 2],
            window[pos + 3],
        ]);
        (v.wrapping_mul(2_654_435_761) >> (32 - HASH_LOG)) as usize
    }

    /// Register `pos` as a future match candidate.
    #[inline]
    pub fn insert(&mut self, window: &[u8], pos: usize) {
        if pos + MIN_MATCH > window.len() {
            return;
        }
        let h = Self::hash(window, pos);
        self.prev[pos] = self.head[h];
        self.head[h] = pos as u32;
    }

    /// Longest match for `pos` among already inserted positions, comparing no
    /// further than `end` and reaching back at most `max_dist` bytes.
    pub fn find(
        &self,
        window: &[u8],
        pos: usize,
        end: usize,
        max_dist: usize,
        params: &SearchParams,
    ) -> Option<Match> {
        if pos + MIN_MATCH > end {
            return None;
        }
        if params.rle_only {
            return run_match(window, pos, end);
        }

        let mut best = Match { len: 0, dist: 0 };
        let mut cand = self.head[Self::hash(window, pos)];
        let mut budget = params.max_chain;
        while cand != NIL && budget > 0 {
            let c = cand as usize;
            let dist = pos - c;
            if dist > max_dist {
                break;
            }
            // Cheap reject on the byte that would extend the current best.
            if window[c + best.len.min(end - pos - 1)] == window[pos + best.len.min(end - pos - 1)]
            {
                let len = common_prefix(window, c, pos, end);
                if len > best.len {
                    best = Match { len, dist };
                    if len >= params.nice_len || pos + len == end {
                        break;
                    }
                }
            }
            cand = self.prev[c];
            budget -= 1;
        }

        (best.len >= MIN_MATCH).then_some(best)
    }
}

/// Match against the previous byte, for run-length style input.
pub(crate) fn run_match(window: &[u8], pos: usize, end: usize) -> Option<Match> {
    if pos == 0 {
        return None;
    }
    let len = common_prefix(window, pos - 1, pos, end);
    (len >= MIN_MATCH).then_some(Match { len, dist: 1 })
}

/// Number of equal bytes at `a` and `b` (`a < b`), bounded by `end`.
#[inline]
fn common_prefix(window: &[u8], a: usize, b: usize, end: usize) -> usize {
    let max = end - b;
    let mut n = 0;
    while n + 8 <= max {
        let x = u64::from_le_bytes(window[a + n..a + n + 8].try_into().unwrap_or([0; 8]));
        let y = u64::from_le_bytes(window[b + n..b + n + 8].try_into().unwrap_or([0; 8]));
        let diff = x ^ y;
        if diff != 0 {
            return n + (diff.trailing_zeros() / 8) as usize;
        }
        n += 8;
    }
    while n < max && window[a + n] == window[b + n] {
        n += 1;
    }
    n
}
