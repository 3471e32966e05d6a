//! Bounded history buffer (sliding window / dictionary).
//!
//! Holds the most recent `capacity` bytes seen by a stream, oldest first.
//! Bytes are appended to a growable buffer and the live region is tracked by
//! a start offset; the buffer is compacted once the dead prefix reaches
//! `capacity`, so memory stays below roughly twice the window.

use crate::error::{Error, Result};

#[derive(Clone)]
pub struct History {
    buf: Vec<u8>,
    start: usize,
    capacity: usize,
    /// Stream bytes have been recorded since the last reset.
    started: bool,
    /// `prime` has been called since the last reset or rewind.
    primed: bool,
    /// Oldest live bytes that were retained across a rewind rather than primed.
    carried: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        History {
            buf: Vec::new(),
            start: 0,
            capacity,
            started: false,
            primed: false,
            carried: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` once `record` has been called since the last reset.
    #[inline]
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Seed the window before any stream bytes are processed.
    ///
    /// Only the trailing `capacity` bytes of `data` are kept. Priming again
    /// replaces the earlier dictionary; bytes retained across a [`rewind`]
    /// stay in front of it. Fails with [`Error::AlreadyStarted`] once
    /// `record` has been called.
    ///
    /// [`rewind`]: History::rewind
    pub fn prime(&mut self, data: &[u8]) -> Result<()> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        if self.primed {
            self.buf.truncate(self.start + self.carried);
        } else {
            self.carried = self.len();
            self.primed = true;
        }
        self.push(data);
        Ok(())
    }

    /// Append bytes processed by the stream, evicting the oldest.
    pub fn record(&mut self, data: &[u8]) {
        self.started = true;
        self.push(data);
    }

    /// Retained bytes, oldest to newest.
    #[inline]
    pub fn export(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    /// The newest `n` retained bytes (all of them if fewer are held).
    pub fn tail(&self, n: usize) -> &[u8] {
        let live = self.export();
        &live[live.len().saturating_sub(n)..]
    }

    /// Drop everything and allow priming again.
    pub fn reset(&mut self) {
        self.forget();
        self.started = false;
        self.primed = false;
    }

    /// Keep the retained bytes but allow priming again.
    pub fn rewind(&mut self) {
        self.started = false;
        self.primed = false;
    }

    /// Drop the retained bytes without changing whether the stream started.
    pub fn forget(&mut self) {
        self.buf.clear();
        self.start = 0;
        self.carried = 0;
    }

    fn push(&mut self, data: &[u8]) {
        if self.capacity == 0 || data.is_empty() {
            return;
        }
        if data.len() >= self.capacity {
            self.buf.clear();
            self.start = 0;
            self.carried = 0;
            self.buf.extend_from_slice(&data[data.len() - self.capacity..]);
            return;
        }
        self.buf.extend_from_slice(data);
        let live = self.buf.len() - self.start;
        if live > self.capacity {
            let evicted = live - self.capacity;
            self.start += evicted;
            self.carried = self.carried.saturating_sub(evicted);
        }
        if self.start >= self.capacity {
            self.buf.drain(..self.start);
            self.start = 0;
        }
    }
}

impl core::fmt::Debug for History {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("History")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("started", &self.started)
            .finish()
    }
}
