//! Xing/Info and LAME tag codec
//!
//! A VBR-aware encoder writes an informational frame at the start of the
//! stream. It looks like an ordinary Layer III frame but carries, right after
//! the side information:
//!
//! ```text
//! "Xing"/"Info"   4   Xing for VBR streams, Info for CBR
//! flags           4   bit 0 frames, bit 1 bytes, bit 2 TOC, bit 3 quality
//! frames          4   (optional) audio frame count
//! bytes           4   (optional) stream byte count
//! toc           100   (optional) seek table
//! quality         4   (optional)
//! LAME extension 36   encoder string, delay/padding, music length, CRC
//! ```
//!
//! LAME extension layout, offsets relative to its first byte:
//!
//! ```text
//!  0  encoder version string (9)      19  encoding flags + ATH type
//!  9  tag revision / VBR method       20  bitrate
//! 10  lowpass / 100 Hz                21  delay (12 bits) | padding (12 bits)
//! 11  peak amplitude (4)              24  misc
//! 15  radio replay gain (2)           25  mp3 gain
//! 17  audiophile replay gain (2)      26  preset / surround (2)
//!                                     28  music length (4)
//!                                     32  music CRC (2)
//!                                     34  tag CRC (2), over every frame byte before it
//! ```

use crate::error::{RangeError, Result};
use crate::mp3::frame::{FrameHeader, Layer};
use crate::Error;
use serde::Serialize;

pub const XING_ID: &[u8; 4] = b"Xing";
pub const INFO_ID: &[u8; 4] = b"Info";

const FLAG_FRAMES: u32 = 0x01;
const FLAG_BYTES: u32 = 0x02;
const FLAG_TOC: u32 = 0x04;
const FLAG_QUALITY: u32 = 0x08;

pub const TOC_LEN: usize = 100;
const LAME_EXT_LEN: usize = 36;
/// Xing id, flags, frames, bytes, TOC and quality
const FULL_XING_LEN: usize = 4 + 4 + 4 + 4 + TOC_LEN + 4;

/// Largest value the 12-bit delay and padding fields hold
pub const MAX_ENCODER_DELAY: u16 = 4095;

/// Quality field written into synthesized tags
const DEFAULT_QUALITY: u32 = 50;

/// Encoder strings that identify a LAME-family extension without a valid CRC
const KNOWN_ENCODERS: [&[u8]; 5] = [b"LAME", b"GOGO", b"Lavc", b"Lavf", b"L3.99"];

// Field offsets inside the LAME extension
const EXT_REVISION: usize = 9;
const EXT_LOWPASS: usize = 10;
const EXT_REPLAY_GAIN: usize = 11;
const EXT_FLAGS: usize = 19;
const EXT_DELAY: usize = 21;
const EXT_MUSIC_LENGTH: usize = 28;
const EXT_CRC: usize = 34;

/// Peak amplitude plus radio and audiophile gain
const REPLAY_GAIN_LEN: usize = 8;
/// Encoding flags: stream continues a previous one without a gap
const NO_GAP_PREVIOUS: u8 = 0x80;
/// Encoding flags: stream continues into the next one without a gap
const NO_GAP_NEXT: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagKind {
    /// "Xing": written for VBR streams
    Xing,
    /// "Info": written for CBR streams
    Info,
}

/// Information extracted from the LAME extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LameInfo {
    /// Encoder version string (e.g., "LAME3.100")
    pub encoder: String,
    pub revision: u8,
    /// VBR method (0 = unknown, 1 = CBR, 2 = ABR, 3-6 = VBR variants)
    pub vbr_method: u8,
    /// Lowpass filter frequency in Hz
    pub lowpass: Option<u32>,
    /// Samples to drop from the start of decoded audio
    pub encoder_delay: u16,
    /// Samples to drop from the end of decoded audio
    pub encoder_padding: u16,
    /// Stream length in bytes as recorded by the encoder
    pub music_length: u32,
    /// The tag CRC matched the frame bytes
    pub crc_valid: bool,
}

/// Byte positions of the optional fields inside the frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Layout {
    frames: Option<usize>,
    bytes: Option<usize>,
    toc: Option<usize>,
    lame: Option<usize>,
}

/// The informational first frame of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XingFrame {
    pub header: FrameHeader,
    pub kind: TagKind,
    pub frame_count: Option<u32>,
    pub byte_count: Option<u32>,
    pub toc: Option<[u8; TOC_LEN]>,
    pub quality: Option<u32>,
    pub lame: Option<LameInfo>,
    bytes: Vec<u8>,
    layout: Layout,
}

/// New field values for a carrier frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUpdate {
    /// Audio frames following the carrier
    pub frame_count: u32,
    /// Audio bytes following the carrier; the carrier's own length is added
    pub music_bytes: u64,
    pub toc: Option<[u8; TOC_LEN]>,
    pub encoder_delay: u16,
    pub encoder_padding: u16,
    /// The output begins at the source's first sample
    pub starts_stream: bool,
    /// The output ends at the source's last sample
    pub ends_stream: bool,
}

impl TagUpdate {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("encoder delay", self.encoder_delay),
            ("encoder padding", self.encoder_padding),
        ] {
            if value > MAX_ENCODER_DELAY {
                return Err(RangeError::DelayOverflow {
                    field,
                    value: u64::from(value),
                }
                .into());
            }
        }
        Ok(())
    }

    fn byte_count(&self, carrier_len: usize) -> u32 {
        let total = self.music_bytes.saturating_add(carrier_len as u64);
        u32::try_from(total).unwrap_or(u32::MAX)
    }
}

impl XingFrame {
    /// Recognize a Xing/Info tag in a complete Layer III frame
    ///
    /// Returns `None` when the identifier is missing or the frame is too short
    /// for the fields its flags announce. A missing LAME extension only leaves
    /// `lame` empty.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        let header = FrameHeader::parse(frame.get(..4)?.try_into().ok()?)?;
        if header.layer != Layer::Layer3 {
            return None;
        }

        let at = header.xing_offset();
        let kind = match frame.get(at..at + 4)? {
            id if id == XING_ID => TagKind::Xing,
            id if id == INFO_ID => TagKind::Info,
            _ => return None,
        };
        let flags = read_u32(frame, at + 4)?;

        let mut layout = Layout::default();
        let mut offset = at + 8;
        let mut frame_count = None;
        let mut byte_count = None;
        let mut toc = None;
        let mut quality = None;

        if flags & FLAG_FRAMES != 0 {
            frame_count = Some(read_u32(frame, offset)?);
            layout.frames = Some(offset);
            offset += 4;
        }
        if flags & FLAG_BYTES != 0 {
            byte_count = Some(read_u32(frame, offset)?);
            layout.bytes = Some(offset);
            offset += 4;
        }
        if flags & FLAG_TOC != 0 {
            let mut table = [0u8; TOC_LEN];
            table.copy_from_slice(frame.get(offset..offset + TOC_LEN)?);
            toc = Some(table);
            layout.toc = Some(offset);
            offset += TOC_LEN;
        }
        if flags & FLAG_QUALITY != 0 {
            quality = Some(read_u32(frame, offset)?);
            offset += 4;
        }

        let lame = parse_lame_extension(frame, offset);
        if lame.is_some() {
            layout.lame = Some(offset);
        }

        Some(XingFrame {
            header,
            kind,
            frame_count,
            byte_count,
            toc,
            quality,
            lame,
            bytes: frame.to_vec(),
            layout,
        })
    }

    /// The frame exactly as read from the source
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn encoder_delay(&self) -> u16 {
        self.lame.as_ref().map_or(0, |l| l.encoder_delay)
    }

    pub fn encoder_padding(&self) -> u16 {
        self.lame.as_ref().map_or(0, |l| l.encoder_padding)
    }

    pub fn has_toc(&self) -> bool {
        self.layout.toc.is_some()
    }

    /// This frame has room for every field a crop rewrites
    pub fn can_rewrite(&self) -> bool {
        self.layout.frames.is_some() && self.layout.bytes.is_some() && self.layout.lame.is_some()
    }

    /// Copy of this frame with new counts and delay/padding
    ///
    /// Only the frame count, byte count, TOC (when both present and supplied),
    /// LAME music length and delay/padding change; the tag CRC is recomputed.
    /// A cut that drops either end of the source also loses the source's
    /// ReplayGain values and the no-gap flag for that end. Everything else,
    /// including the frame's own payload, is kept.
    pub fn rewrite(&self, update: &TagUpdate) -> Result<Vec<u8>> {
        update.validate()?;
        let (Some(frames_at), Some(bytes_at), Some(lame_at)) =
            (self.layout.frames, self.layout.bytes, self.layout.lame)
        else {
            return Err(Error::Unsupported(
                "tag frame lacks frame/byte counts or a LAME extension".to_string(),
            ));
        };

        let mut out = self.bytes.clone();
        let byte_count = update.byte_count(out.len());
        write_u32(&mut out, frames_at, update.frame_count);
        write_u32(&mut out, bytes_at, byte_count);
        if let (Some(toc_at), Some(toc)) = (self.layout.toc, update.toc.as_ref()) {
            out[toc_at..toc_at + TOC_LEN].copy_from_slice(toc);
        }
        write_u32(&mut out, lame_at + EXT_MUSIC_LENGTH, byte_count);
        write_delays(&mut out, lame_at, update.encoder_delay, update.encoder_padding);

        // Gain was measured over the whole source
        if !(update.starts_stream && update.ends_stream) {
            let gain = lame_at + EXT_REPLAY_GAIN;
            out[gain..gain + REPLAY_GAIN_LEN].fill(0);
        }
        if !update.starts_stream {
            out[lame_at + EXT_FLAGS] &= !NO_GAP_PREVIOUS;
        }
        if !update.ends_stream {
            out[lame_at + EXT_FLAGS] &= !NO_GAP_NEXT;
        }

        seal_crc(&mut out, lame_at);
        Ok(out)
    }
}

/// Build a fresh Xing/Info carrier frame shaped like `template`
///
/// The bitrate index is the one whose bitrate is closest to `kbps` among those
/// whose frame is large enough to hold the full tag. Protection and padding are
/// switched off. All four Xing fields and a LAME extension are written.
pub fn synthesize(
    template: &FrameHeader,
    kbps: f64,
    vbr: bool,
    update: &TagUpdate,
) -> Result<Vec<u8>> {
    update.validate()?;
    if template.layer != Layer::Layer3 {
        return Err(Error::Unsupported(format!(
            "cannot build a tag frame for {:?}",
            template.layer
        )));
    }

    let needed = template.xing_offset() + FULL_XING_LEN + LAME_EXT_LEN;
    let header = (1..=14u8)
        .filter_map(|idx| template.with_bitrate_index(idx))
        .filter(|h| h.frame_len().is_some_and(|len| len >= needed))
        .min_by(|a, b| {
            let da = (f64::from(a.bitrate) - kbps).abs();
            let db = (f64::from(b.bitrate) - kbps).abs();
            da.total_cmp(&db)
        })
        .ok_or_else(|| Error::Unsupported("no bitrate can hold a tag frame".to_string()))?;
    let frame_len = header.frame_len().unwrap_or(needed);

    let mut out = vec![0u8; frame_len];
    out[..4].copy_from_slice(&header.to_bytes());

    let mut at = header.xing_offset();
    out[at..at + 4].copy_from_slice(if vbr { XING_ID } else { INFO_ID });
    at += 4;
    write_u32(&mut out, at, FLAG_FRAMES | FLAG_BYTES | FLAG_TOC | FLAG_QUALITY);
    at += 4;
    write_u32(&mut out, at, update.frame_count);
    at += 4;
    let byte_count = update.byte_count(frame_len);
    write_u32(&mut out, at, byte_count);
    at += 4;
    if let Some(toc) = update.toc.as_ref() {
        out[at..at + TOC_LEN].copy_from_slice(toc);
    }
    at += TOC_LEN;
    write_u32(&mut out, at, DEFAULT_QUALITY);
    at += 4;

    let lame_at = at;
    out[lame_at..lame_at + 4].copy_from_slice(b"LAME");
    write_u32(&mut out, lame_at + EXT_MUSIC_LENGTH, byte_count);
    write_delays(&mut out, lame_at, update.encoder_delay, update.encoder_padding);
    seal_crc(&mut out, lame_at);
    Ok(out)
}

fn parse_lame_extension(frame: &[u8], at: usize) -> Option<LameInfo> {
    let ext = frame.get(at..at + LAME_EXT_LEN)?;

    let stored_crc = u16::from_be_bytes([ext[EXT_CRC], ext[EXT_CRC + 1]]);
    let crc_valid = crc16(&frame[..at + EXT_CRC]) == stored_crc;
    let known = KNOWN_ENCODERS.iter().any(|name| ext.starts_with(name));
    if !crc_valid && !known {
        return None;
    }

    let encoder = String::from_utf8_lossy(&ext[..EXT_REVISION])
        .trim_end_matches(['\0', ' '])
        .to_string();
    let lowpass = match ext[EXT_LOWPASS] {
        0 => None,
        hz => Some(u32::from(hz) * 100),
    };
    let (encoder_delay, encoder_padding) = read_delays(ext);

    Some(LameInfo {
        encoder,
        revision: ext[EXT_REVISION] >> 4,
        vbr_method: ext[EXT_REVISION] & 0x0F,
        lowpass,
        encoder_delay,
        encoder_padding,
        music_length: u32::from_be_bytes([
            ext[EXT_MUSIC_LENGTH],
            ext[EXT_MUSIC_LENGTH + 1],
            ext[EXT_MUSIC_LENGTH + 2],
            ext[EXT_MUSIC_LENGTH + 3],
        ]),
        crc_valid,
    })
}

/// Delay is the high 12 bits of the 24-bit field, padding the low 12
fn read_delays(ext: &[u8]) -> (u16, u16) {
    let d = &ext[EXT_DELAY..EXT_DELAY + 3];
    let delay = (u16::from(d[0]) << 4) | u16::from(d[1] >> 4);
    let padding = (u16::from(d[1] & 0x0F) << 8) | u16::from(d[2]);
    (delay, padding)
}

fn write_delays(frame: &mut [u8], lame_at: usize, delay: u16, padding: u16) {
    let at = lame_at + EXT_DELAY;
    frame[at] = (delay >> 4) as u8;
    frame[at + 1] = (((delay & 0x0F) << 4) as u8) | ((padding >> 8) & 0x0F) as u8;
    frame[at + 2] = (padding & 0xFF) as u8;
}

fn seal_crc(frame: &mut [u8], lame_at: usize) {
    let at = lame_at + EXT_CRC;
    let crc = crc16(&frame[..at]);
    frame[at..at + 2].copy_from_slice(&crc.to_be_bytes());
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn write_u32(data: &mut [u8], at: usize, value: u32) {
    data[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

/// CRC-16 as used by the LAME tag (polynomial 0x8005, reflected, initial value 0)
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |mut crc, &byte| {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        }
        crc
    })
}
