//! Junk region sinks
//!
//! Bytes that don't belong to any recognized frame (ID3v2 blocks in front,
//! garbage, ID3v1/APE trailers) are handed to a [`JunkSink`] one at a time.
//! `end_of_block` is called once after every contiguous run.

use std::io;

pub trait JunkSink {
    fn write(&mut self, byte: u8) -> io::Result<()>;

    fn end_of_block(&mut self) -> io::Result<()>;
}

/// Default sink: drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardJunk;

impl JunkSink for DiscardJunk {
    fn write(&mut self, _byte: u8) -> io::Result<()> {
        Ok(())
    }

    fn end_of_block(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Counts junk bytes and blocks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountingJunk {
    pub bytes: u64,
    pub blocks: u64,
}

impl JunkSink for CountingJunk {
    fn write(&mut self, _byte: u8) -> io::Result<()> {
        self.bytes += 1;
        Ok(())
    }

    fn end_of_block(&mut self) -> io::Result<()> {
        self.blocks += 1;
        Ok(())
    }
}

/// Keeps every junk block in memory, one `Vec` per contiguous run
#[derive(Debug, Clone, Default)]
pub struct CollectJunk {
    pub blocks: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl JunkSink for CollectJunk {
    fn write(&mut self, byte: u8) -> io::Result<()> {
        self.current.push(byte);
        Ok(())
    }

    fn end_of_block(&mut self) -> io::Result<()> {
        self.blocks.push(std::mem::take(&mut self.current));
        Ok(())
    }
}

/// Streams junk into any writer, e.g. a file that archives leading tags
pub struct WriteJunk<W: io::Write>(pub W);

impl<W: io::Write> JunkSink for WriteJunk<W> {
    fn write(&mut self, byte: u8) -> io::Result<()> {
        self.0.write_all(&[byte])
    }

    fn end_of_block(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<J: JunkSink + ?Sized> JunkSink for &mut J {
    fn write(&mut self, byte: u8) -> io::Result<()> {
        (**self).write(byte)
    }

    fn end_of_block(&mut self) -> io::Result<()> {
        (**self).end_of_block()
    }
}
