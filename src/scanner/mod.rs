//! Stream scanner
//!
//! Walks a byte source once, front to back, and splits it into MPEG audio
//! frames and junk. A header only counts as a frame when the stream agrees
//! with it: either another compatible header starts exactly where this frame
//! ends, the frame ends exactly at end of input, or the frame directly follows
//! a frame that was already committed. Everything else is handed byte by byte
//! to the [`JunkSink`].
//!
//! The first frame is checked for a Xing/Info tag. If it carries one it is
//! kept as the stream's info frame and not counted as audio.

pub mod junk;
mod window;

pub use junk::{CollectJunk, CountingJunk, DiscardJunk, JunkSink, WriteJunk};

use crate::error::Result;
use crate::mp3::frame::{self, FrameHeader, HEADER_LEN, MAX_FRAME_LEN};
use crate::mp3::lame::XingFrame;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use window::Window;

/// Initial look-ahead buffer size
const WINDOW_LEN: usize = 8192;

/// One audio frame of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameDescriptor {
    /// Absolute byte offset of the header
    pub offset: u64,
    /// Frame length including the header
    pub len: u32,
    pub header: FrameHeader,
    /// Layer III bit-reservoir back pointer
    pub main_data_begin: u16,
    /// Bytes after the side information
    pub main_data_len: u32,
}

impl FrameDescriptor {
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.len)
    }
}

/// Byte range `[start, end)` that isn't part of any frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JunkRegion {
    pub start: u64,
    pub end: u64,
}

impl JunkRegion {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Why the scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ScanStop {
    EndOfStream,
    /// A verified frame used a different sampling rate; nothing after
    /// `offset` was scanned
    SampleRateChanged { offset: u64, expected: u32, found: u32 },
}

/// Ordered audio frames of one stream plus the gaps between them
#[derive(Debug, Clone)]
pub struct FrameIndex {
    frames: Vec<FrameDescriptor>,
    junk: Vec<JunkRegion>,
    info_frame: Option<FrameDescriptor>,
    reference: Option<FrameHeader>,
    stop: ScanStop,
    scanned_len: u64,
}

/// Scanner result: the index and the tag found in the first frame, if any
#[derive(Debug, Clone)]
pub struct ScanOutput {
    pub index: FrameIndex,
    pub tag: Option<XingFrame>,
}

impl FrameIndex {
    /// Audio frames in stream order (the info frame is not among them)
    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn junk_regions(&self) -> &[JunkRegion] {
        &self.junk
    }

    /// The frame that carried a Xing/Info tag
    pub fn info_frame(&self) -> Option<&FrameDescriptor> {
        self.info_frame.as_ref()
    }

    pub fn stop(&self) -> ScanStop {
        self.stop
    }

    /// Bytes consumed by the scan
    pub fn scanned_len(&self) -> u64 {
        self.scanned_len
    }

    /// Header of the first frame; every other frame shares its version,
    /// layer and sampling rate
    pub fn stream_header(&self) -> Option<&FrameHeader> {
        self.reference.as_ref()
    }

    /// Sampling frequency in Hz, 0 for an empty index
    pub fn sample_rate(&self) -> u32 {
        self.reference.map_or(0, |h| h.sample_rate)
    }

    pub fn samples_per_frame(&self) -> u32 {
        self.reference.map_or(0, |h| h.samples_per_frame)
    }

    /// Frame count × samples per frame, before any delay/padding trimming
    pub fn raw_sample_count(&self) -> u64 {
        self.frames.len() as u64 * u64::from(self.samples_per_frame())
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats::from_index(self)
    }
}

/// Statistics about the audio frames of a stream
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameStats {
    pub frame_count: usize,
    pub audio_bytes: u64,
    pub junk_bytes: u64,
    pub junk_regions: usize,
    pub is_vbr: bool,
    pub avg_bitrate: f64,
    pub min_bitrate: u32,
    pub max_bitrate: u32,
}

impl FrameStats {
    fn from_index(index: &FrameIndex) -> Self {
        let mut stats = FrameStats {
            frame_count: index.len(),
            junk_regions: index.junk.len(),
            junk_bytes: index.junk.iter().map(JunkRegion::len).sum(),
            ..Default::default()
        };
        if index.is_empty() {
            return stats;
        }

        let mut unique_bitrates = HashSet::new();
        let mut min = u32::MAX;
        let mut max = 0;
        for frame in &index.frames {
            stats.audio_bytes += u64::from(frame.len);
            unique_bitrates.insert(frame.header.bitrate_index);
            let kbps = frame_kbps(frame);
            min = min.min(kbps);
            max = max.max(kbps);
        }

        stats.is_vbr = unique_bitrates.len() > 1;
        stats.min_bitrate = min;
        stats.max_bitrate = max;
        stats.avg_bitrate = average_kbps(index.frames(), index.samples_per_frame(), index.sample_rate());
        stats
    }
}

/// Bitrate of one frame; free-format frames get theirs from the length
fn frame_kbps(frame: &FrameDescriptor) -> u32 {
    if frame.header.bitrate > 0 {
        return frame.header.bitrate;
    }
    let bits = u64::from(frame.len) * 8 * u64::from(frame.header.sample_rate);
    (bits / u64::from(frame.header.samples_per_frame) / 1000) as u32
}

/// Average bitrate of a run of frames in kbps
pub fn average_kbps(frames: &[FrameDescriptor], samples_per_frame: u32, sample_rate: u32) -> f64 {
    if frames.is_empty() || samples_per_frame == 0 {
        return 0.0;
    }
    let bytes: u64 = frames.iter().map(|f| u64::from(f.len)).sum();
    let frame_rate = f64::from(sample_rate) / f64::from(samples_per_frame);
    bytes as f64 / frames.len() as f64 * frame_rate / 125.0
}

/// Scan `source` and build its frame index
///
/// Non-frame bytes go to `sink`. Only I/O errors (from the source or the sink)
/// fail the scan; an index without frames is a valid result here.
pub fn scan<R: Read, J: JunkSink>(source: R, sink: J) -> Result<ScanOutput> {
    Scanner {
        window: Window::new(source, WINDOW_LEN),
        sink,
        frames: Vec::new(),
        junk: Vec::new(),
        info_frame: None,
        tag: None,
        reference: None,
        free_len: None,
        junk_start: None,
        in_sync: false,
    }
    .run()
}

enum Step {
    Frame(FrameHeader, usize),
    Junk,
    Stop(ScanStop),
}

struct Scanner<R, J> {
    window: Window<R>,
    sink: J,
    frames: Vec<FrameDescriptor>,
    junk: Vec<JunkRegion>,
    info_frame: Option<FrameDescriptor>,
    tag: Option<XingFrame>,
    reference: Option<FrameHeader>,
    /// Unpadded length of the stream's free-format frames, once known
    free_len: Option<usize>,
    junk_start: Option<u64>,
    /// The window starts right after a committed frame
    in_sync: bool,
}

impl<R: Read, J: JunkSink> Scanner<R, J> {
    fn run(mut self) -> Result<ScanOutput> {
        let stop = loop {
            if self.window.fill(HEADER_LEN)? < HEADER_LEN {
                while !self.window.bytes().is_empty() {
                    self.junk_byte()?;
                }
                self.close_junk()?;
                break ScanStop::EndOfStream;
            }

            match self.examine()? {
                Step::Frame(header, len) => self.commit(header, len)?,
                Step::Junk => self.junk_byte()?,
                Step::Stop(stop) => {
                    self.close_junk()?;
                    break stop;
                }
            }
        };

        if let ScanStop::SampleRateChanged { offset, expected, found } = stop {
            warn!(
                "sampling rate changes from {} Hz to {} Hz at byte {}; ignoring the rest of the stream",
                expected, found, offset
            );
        }
        info!(
            "scanned {} bytes: {} audio frames, {} junk regions{}",
            self.window.offset(),
            self.frames.len(),
            self.junk.len(),
            if self.tag.is_some() { ", Xing/Info tag" } else { "" }
        );

        Ok(ScanOutput {
            index: FrameIndex {
                frames: self.frames,
                junk: self.junk,
                info_frame: self.info_frame,
                reference: self.reference,
                stop,
                scanned_len: self.window.offset(),
            },
            tag: self.tag,
        })
    }

    /// Decide what the bytes at the window start are
    fn examine(&mut self) -> Result<Step> {
        let offset = self.window.offset();
        let b = self.window.bytes();
        let Some(header) = FrameHeader::parse([b[0], b[1], b[2], b[3]]) else {
            return Ok(Step::Junk);
        };
        if let Some(reference) = self.reference {
            if header.version != reference.version || header.layer != reference.layer {
                return Ok(Step::Junk);
            }
        }

        let Some(len) = self.frame_len(&header)? else {
            return Ok(Step::Junk);
        };
        let avail = self.window.fill(len + HEADER_LEN)?;
        if avail < len {
            debug!(
                "frame at byte {} needs {} bytes, input ends after {}",
                offset, len, avail
            );
            return Ok(Step::Junk);
        }

        let next = if avail >= len + HEADER_LEN {
            let b = &self.window.bytes()[len..len + HEADER_LEN];
            FrameHeader::parse([b[0], b[1], b[2], b[3]])
        } else {
            None
        };
        let chained = next.filter(|n| n.version == header.version && n.layer == header.layer);
        let at_eof = avail == len;

        if let Some(reference) = self.reference {
            if reference.sample_rate != header.sample_rate {
                if chained.is_some_and(|n| n.sample_rate == header.sample_rate) {
                    return Ok(Step::Stop(ScanStop::SampleRateChanged {
                        offset,
                        expected: reference.sample_rate,
                        found: header.sample_rate,
                    }));
                }
                return Ok(Step::Junk);
            }
        }

        if chained.is_some() || at_eof || self.in_sync {
            Ok(Step::Frame(header, len))
        } else {
            debug!("unconfirmed frame header at byte {}", offset);
            Ok(Step::Junk)
        }
    }

    /// Frame length from the header, or for free format from the carried
    /// length or the distance to the next matching sync word
    fn frame_len(&mut self, header: &FrameHeader) -> Result<Option<usize>> {
        if let Some(len) = header.frame_len() {
            return Ok(Some(len));
        }
        let pad = if header.padding { header.padding_len() } else { 0 };
        if let Some(unpadded) = self.free_len {
            return Ok(Some(unpadded + pad));
        }

        let avail = self.window.fill(MAX_FRAME_LEN + HEADER_LEN)?;
        let bytes = self.window.bytes();
        let min = header.side_info_start() + header.side_info_len() + 1;
        let last = avail.saturating_sub(HEADER_LEN);
        for at in min..=last {
            if bytes[at] != 0xFF {
                continue;
            }
            let candidate = [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
            if let Some(next) = FrameHeader::parse(candidate) {
                if next.is_free_format() && next.is_compatible(header) && at > pad {
                    return Ok(Some(at));
                }
            }
        }
        Ok(None)
    }

    fn commit(&mut self, header: FrameHeader, len: usize) -> Result<()> {
        self.close_junk()?;

        let offset = self.window.offset();
        let bytes = &self.window.bytes()[..len];
        let descriptor = FrameDescriptor {
            offset,
            len: len as u32,
            header,
            main_data_begin: frame::main_data_begin(&header, bytes),
            main_data_len: len.saturating_sub(header.side_info_start() + header.side_info_len()) as u32,
        };

        if self.reference.is_none() {
            self.reference = Some(header);
            if let Some(tag) = XingFrame::parse(bytes) {
                debug!("{:?} tag in first frame at byte {}", tag.kind, offset);
                self.info_frame = Some(descriptor);
                self.tag = Some(tag);
            } else {
                self.frames.push(descriptor);
            }
        } else {
            self.frames.push(descriptor);
        }

        if header.is_free_format() && self.free_len.is_none() {
            let pad = if header.padding { header.padding_len() } else { 0 };
            self.free_len = Some(len - pad);
            debug!("free-format stream, {} byte frames", len - pad);
        }

        self.in_sync = true;
        self.window.consume(len);
        Ok(())
    }

    fn junk_byte(&mut self) -> Result<()> {
        let offset = self.window.offset();
        let byte = self.window.bytes()[0];
        if self.junk_start.is_none() {
            self.junk_start = Some(offset);
        }
        self.sink.write(byte)?;
        self.window.consume(1);
        self.in_sync = false;
        Ok(())
    }

    fn close_junk(&mut self) -> Result<()> {
        if let Some(start) = self.junk_start.take() {
            let end = self.window.offset();
            debug!("junk block {}..{} ({} bytes)", start, end, end - start);
            self.junk.push(JunkRegion { start, end });
            self.sink.end_of_block()?;
        }
        Ok(())
    }
}
