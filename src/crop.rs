//! Sample-accurate crop engine
//!
//! Frames can't be split, so a crop selects the shortest run of whole frames
//! covering the requested samples and records the excess at each end as the
//! new encoder delay and padding. Those go into a Xing/Info carrier frame at
//! the start of the output, where LAME-aware players pick them up and trim
//! the decoded audio back to the exact range.
//!
//! Sample positions come in two domains. The *effective* domain is what a
//! player outputs (delay and padding already removed); requests use it. The
//! *raw* domain counts every decoded sample of every audio frame; frame
//! arithmetic uses it. They differ by the source's encoder delay.

use crate::error::{Error, RangeError, Result};
use crate::mp3::frame::Layer;
use crate::mp3::lame::{self, TagKind, TagUpdate, XingFrame, MAX_ENCODER_DELAY, TOC_LEN};
use crate::scanner::{average_kbps, FrameDescriptor, FrameIndex};
use log::{debug, info, warn};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::ops::Range;

/// Samples of decoder lead-in kept before the range with `decoder_warmup`
pub const WARMUP_LEAD_IN: u64 = 576;
/// Samples kept after the range with `decoder_warmup`
pub const WARMUP_LEAD_OUT: u64 = 1152;

/// Half-open sample range `[start, end)` in the effective domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRequest {
    pub start: u64,
    pub end: u64,
}

impl CropRequest {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self, total: u64) -> std::result::Result<(), RangeError> {
        if self.start > self.end {
            return Err(RangeError::Reversed {
                start: self.start,
                end: self.end,
            });
        }
        if self.end > total {
            return Err(RangeError::OutOfBounds {
                start: self.start,
                end: self.end,
                total,
            });
        }
        if self.start == self.end {
            return Err(RangeError::Empty { at: self.start });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropOptions {
    /// Keep extra frames around the range so a decoder has its overlap and
    /// bit-reservoir data at both ends
    pub decoder_warmup: bool,
    /// Start the output with a Xing/Info frame holding the new delay/padding
    pub write_tag: bool,
}

impl Default for CropOptions {
    fn default() -> Self {
        Self {
            decoder_warmup: false,
            write_tag: true,
        }
    }
}

/// A planned crop: which source bytes to copy and what to put in front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CroppedResult {
    pub encoder_delay: u16,
    pub encoder_padding: u16,
    /// Selected audio frames, as indices into the frame index
    pub frames: Range<usize>,
    /// Source bytes from the first selected frame to the end of the last
    pub byte_range: Range<u64>,
    pub samples_per_frame: u32,
    /// Carrier frame written before the selected bytes
    pub tag_frame: Option<Vec<u8>>,
}

impl CroppedResult {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Samples a LAME-aware player outputs for the cropped stream
    pub fn sample_count(&self) -> u64 {
        (self.frames.len() as u64 * u64::from(self.samples_per_frame))
            .saturating_sub(u64::from(self.encoder_delay) + u64::from(self.encoder_padding))
    }

    /// Size of the cropped stream in bytes
    pub fn output_len(&self) -> u64 {
        let tag = self.tag_frame.as_ref().map_or(0, |t| t.len() as u64);
        tag + (self.byte_range.end - self.byte_range.start)
    }
}

/// Raw sample count minus the source's encoder delay and padding
pub fn effective_sample_count(index: &FrameIndex, tag: Option<&XingFrame>) -> u64 {
    let (delay, padding) = tag.map_or((0, 0), |t| (t.encoder_delay(), t.encoder_padding()));
    index
        .raw_sample_count()
        .saturating_sub(u64::from(delay) + u64::from(padding))
}

/// Work out the frames, byte range and carrier frame for `request`
///
/// Nothing is read or written. Fails with [`Error::NoAudioData`] on an empty
/// index and with [`Error::Range`] when the request doesn't fit the stream.
pub fn plan(
    request: CropRequest,
    index: &FrameIndex,
    tag: Option<&XingFrame>,
    options: &CropOptions,
) -> Result<CroppedResult> {
    if index.is_empty() {
        return Err(Error::NoAudioData);
    }
    let total = effective_sample_count(index, tag);
    request.validate(total)?;

    let spf = u64::from(index.samples_per_frame());
    let raw_total = index.raw_sample_count();
    let source_delay = u64::from(tag.map_or(0, XingFrame::encoder_delay));
    let start = request.start + source_delay;
    let end = request.end + source_delay;
    let starts_stream = request.start == 0;
    let ends_stream = request.end == total;

    // A range touching an end of the stream keeps every frame up to that
    // end, so the source's own delay or padding frames survive
    let from = if starts_stream {
        0
    } else if options.decoder_warmup {
        start.saturating_sub(WARMUP_LEAD_IN)
    } else {
        start
    };
    let to = if ends_stream {
        raw_total
    } else if options.decoder_warmup {
        (end + WARMUP_LEAD_OUT).min(raw_total)
    } else {
        end
    };

    let mut first = (from / spf) as usize;
    let last = (to.div_ceil(spf) as usize).min(index.len());
    if options.decoder_warmup {
        first = extend_for_reservoir(index.frames(), first, start, spf);
    }

    let delay = check_residual("encoder delay", start - first as u64 * spf)?;
    let padding = check_residual("encoder padding", last as u64 * spf - end)?;

    let frames = &index.frames()[first..last];
    let byte_range = index.frames()[first].offset..index.frames()[last - 1].end();
    let update = TagUpdate {
        frame_count: frames.len() as u32,
        music_bytes: byte_range.end - byte_range.start,
        toc: None,
        encoder_delay: delay,
        encoder_padding: padding,
        starts_stream,
        ends_stream,
    };
    let tag_frame = carrier_frame(frames, tag, update, options)?;

    info!(
        "crop {}..{}: frames {}..{} (bytes {}..{}), delay {}, padding {}",
        request.start, request.end, first, last, byte_range.start, byte_range.end, delay, padding
    );

    Ok(CroppedResult {
        encoder_delay: delay,
        encoder_padding: padding,
        frames: first..last,
        byte_range,
        samples_per_frame: index.samples_per_frame(),
        tag_frame,
    })
}

/// Step back over earlier frames until their main data covers the bit
/// reservoir the first frame reads from, as long as the delay still fits
fn extend_for_reservoir(frames: &[FrameDescriptor], first: usize, start: u64, spf: u64) -> usize {
    let needed = u32::from(frames[first].main_data_begin);
    let mut got = 0u32;
    let mut first = first;
    while first > 0
        && got < needed
        && start - (first as u64 - 1) * spf <= u64::from(MAX_ENCODER_DELAY)
    {
        first -= 1;
        got += frames[first].main_data_len;
    }
    if got < needed {
        debug!(
            "frame {} reads {} reservoir bytes, only {} available",
            first, needed, got
        );
    }
    first
}

fn check_residual(field: &'static str, value: u64) -> Result<u16> {
    if value > u64::from(MAX_ENCODER_DELAY) {
        return Err(RangeError::DelayOverflow { field, value }.into());
    }
    Ok(value as u16)
}

fn carrier_frame(
    frames: &[FrameDescriptor],
    tag: Option<&XingFrame>,
    mut update: TagUpdate,
    options: &CropOptions,
) -> Result<Option<Vec<u8>>> {
    if !options.write_tag {
        return Ok(None);
    }
    let Some(head) = frames.first() else {
        return Ok(None);
    };
    let header = head.header;

    if header.layer != Layer::Layer3 {
        if update.encoder_delay > 0 || update.encoder_padding > 0 {
            warn!(
                "{:?} has no LAME tag; {} leading and {} trailing samples stay in the output",
                header.layer, update.encoder_delay, update.encoder_padding
            );
        }
        return Ok(None);
    }

    match tag {
        Some(source) if source.can_rewrite() => {
            if source.has_toc() {
                update.toc = Some(seek_table(frames));
            }
            source.rewrite(&update).map(Some)
        }
        _ => {
            update.toc = Some(seek_table(frames));
            let vbr = tag.map_or_else(
                || frames.iter().any(|f| f.header.bitrate_index != header.bitrate_index),
                |t| t.kind == TagKind::Xing,
            );
            let kbps = average_kbps(frames, header.samples_per_frame, header.sample_rate);
            debug!("synthesizing carrier frame at {:.1} kbps (vbr: {})", kbps, vbr);
            lame::synthesize(&header, kbps, vbr, &update).map(Some)
        }
    }
}

/// Xing seek table: entry `i` is the byte position, scaled to 0..=255, of
/// the frame `i` percent of the way into `frames`
pub fn seek_table(frames: &[FrameDescriptor]) -> [u8; TOC_LEN] {
    let mut toc = [0u8; TOC_LEN];
    let (Some(head), Some(tail)) = (frames.first(), frames.last()) else {
        return toc;
    };
    let total = tail.end() - head.offset;
    for (i, slot) in toc.iter_mut().enumerate() {
        let frame = &frames[i * frames.len() / TOC_LEN];
        *slot = ((frame.offset - head.offset) * 256 / total).min(255) as u8;
    }
    toc
}

/// Stream a planned crop from `source` to `dest`
///
/// `source` must be positioned at the start of the stream that was scanned.
/// It is read forward only. Returns the number of bytes written.
pub fn write<R: Read, W: Write>(result: &CroppedResult, mut source: R, mut dest: W) -> Result<u64> {
    let mut written = 0;
    if let Some(frame) = &result.tag_frame {
        dest.write_all(frame)?;
        written += frame.len() as u64;
    }

    let Range { start, end } = result.byte_range.clone();
    let skipped = io::copy(&mut source.by_ref().take(start), &mut io::sink())?;
    if skipped < start {
        return Err(Error::TruncatedInput {
            expected: end,
            got: skipped,
        });
    }
    let copied = io::copy(&mut source.take(end - start), &mut dest)?;
    if copied < end - start {
        return Err(Error::TruncatedInput {
            expected: end,
            got: start + copied,
        });
    }
    dest.flush()?;

    Ok(written + copied)
}
