//! Bounded look-ahead over a forward-only reader
//!
//! The scanner needs to see one frame plus the next header before it commits
//! anything, and never more than that. `Window` keeps that many bytes buffered
//! and tracks the absolute stream offset of the first one.

use std::io::{self, Read};

pub(crate) struct Window<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    offset: u64,
    eof: bool,
}

impl<R: Read> Window<R> {
    pub(crate) fn new(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buf: vec![0; capacity],
            pos: 0,
            end: 0,
            offset: 0,
            eof: false,
        }
    }

    /// Make at least `want` bytes visible unless the input ends first.
    /// Returns how many bytes are visible afterwards.
    pub(crate) fn fill(&mut self, want: usize) -> io::Result<usize> {
        if self.end - self.pos >= want || self.eof {
            return Ok(self.end - self.pos);
        }

        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.end, 0);
            self.end -= self.pos;
            self.pos = 0;
        }
        if self.buf.len() < want {
            self.buf.resize(want, 0);
        }

        while self.end < want {
            match self.inner.read(&mut self.buf[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => self.end += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(self.end)
    }

    /// The currently visible bytes
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf[self.pos..self.end]
    }

    pub(crate) fn consume(&mut self, n: usize) {
        let n = n.min(self.end - self.pos);
        self.pos += n;
        self.offset += n as u64;
    }

    /// Absolute stream offset of the first visible byte
    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }
}
