//! MP3 frame header parsing
//!
//! MPEG audio frames start with a sync word (11 bits of 1s) followed by header info.
//! Frame header structure (4 bytes):
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//!
//! A = sync (11 bits)
//! B = MPEG version (2 bits): 00=2.5, 01=reserved, 10=2, 11=1
//! C = Layer (2 bits): 00=reserved, 01=III, 10=II, 11=I
//! D = Protection bit (0 = CRC follows the header)
//! E = Bitrate index (4 bits), 0 = free format, 15 = bad
//! F = Sample rate index (2 bits)
//! G = Padding bit
//! H = Private bit
//! I = Channel mode (2 bits)
//! J = Mode extension (2 bits)
//! K = Copyright
//! L = Original
//! M = Emphasis (2 bits)

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    /// CRC-16 follows the header
    pub protected: bool,
    pub bitrate_index: u8,
    /// kbps, 0 for free format
    pub bitrate: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channel_mode: ChannelMode,
    pub samples_per_frame: u32,
    #[serde(skip)]
    raw: [u8; 4],
}

// Bitrate lookup tables (kbps)
// Index 0 = free, 15 = bad
const BITRATES_V1_L3: [u32; 16] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0];
const BITRATES_V1_L2: [u32; 16] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0];
const BITRATES_V1_L1: [u32; 16] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0];
const BITRATES_V2_L23: [u32; 16] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0];
const BITRATES_V2_L1: [u32; 16] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0];

// Sample rate lookup tables (Hz)
const SAMPLE_RATES_V1: [u32; 4] = [44100, 48000, 32000, 0];
const SAMPLE_RATES_V2: [u32; 4] = [22050, 24000, 16000, 0];
const SAMPLE_RATES_V25: [u32; 4] = [11025, 12000, 8000, 0];

/// Largest frame any header can describe (MPEG-2.5 Layer II, 160 kbps, 8 kHz, padded).
pub const MAX_FRAME_LEN: usize = 2881;

/// Header size in bytes
pub const HEADER_LEN: usize = 4;

impl FrameHeader {
    /// Parse a 4-byte MPEG audio frame header
    ///
    /// Free-format headers (bitrate index 0) are accepted; their length has to be
    /// found by the scanner. Reserved versions, layers, sample rates and the bad
    /// bitrate index 15 are rejected.
    pub fn parse(header: [u8; 4]) -> Option<Self> {
        // Check sync word (11 bits of 1s)
        if header[0] != 0xFF || (header[1] & 0xE0) != 0xE0 {
            return None;
        }

        // MPEG version (bits 4-3 of byte 1)
        let version = match (header[1] >> 3) & 0x03 {
            0 => MpegVersion::Mpeg25,
            2 => MpegVersion::Mpeg2,
            3 => MpegVersion::Mpeg1,
            _ => return None, // Reserved
        };

        // Layer (bits 2-1 of byte 1)
        let layer = match (header[1] >> 1) & 0x03 {
            1 => Layer::Layer3,
            2 => Layer::Layer2,
            3 => Layer::Layer1,
            _ => return None, // Reserved
        };

        let protected = header[1] & 0x01 == 0;

        // Bitrate index (bits 7-4 of byte 2)
        let bitrate_index = (header[2] >> 4) & 0x0F;
        if bitrate_index == 0x0F {
            return None;
        }
        let bitrate = bitrate_table(version, layer)[bitrate_index as usize];

        // Sample rate index (bits 3-2 of byte 2)
        let sample_rate_idx = ((header[2] >> 2) & 0x03) as usize;
        let sample_rate = match version {
            MpegVersion::Mpeg1 => SAMPLE_RATES_V1[sample_rate_idx],
            MpegVersion::Mpeg2 => SAMPLE_RATES_V2[sample_rate_idx],
            MpegVersion::Mpeg25 => SAMPLE_RATES_V25[sample_rate_idx],
        };

        if sample_rate == 0 {
            return None;
        }

        // Padding (bit 1 of byte 2)
        let padding = (header[2] & 0x02) != 0;

        // Channel mode (bits 7-6 of byte 3)
        let channel_mode = match (header[3] >> 6) & 0x03 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        let samples_per_frame = match (version, layer) {
            (_, Layer::Layer1) => 384,
            (_, Layer::Layer2) => 1152,
            (MpegVersion::Mpeg1, Layer::Layer3) => 1152,
            (_, Layer::Layer3) => 576,
        };

        Some(FrameHeader {
            version,
            layer,
            protected,
            bitrate_index,
            bitrate,
            sample_rate,
            padding,
            channel_mode,
            samples_per_frame,
            raw: header,
        })
    }

    /// The four header bytes as they appear in the stream
    pub fn to_bytes(&self) -> [u8; 4] {
        self.raw
    }

    pub fn is_free_format(&self) -> bool {
        self.bitrate_index == 0
    }

    pub fn channels(&self) -> u32 {
        match self.channel_mode {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }

    /// Bytes added by the padding bit: one 4-byte slot for Layer I, one byte otherwise
    pub fn padding_len(&self) -> usize {
        match self.layer {
            Layer::Layer1 => 4,
            _ => 1,
        }
    }

    /// Frame length in bytes including the header, `None` for free format
    ///
    /// Layer I:   (12 * bitrate / sample_rate + padding) * 4
    /// Layer II:  144 * bitrate / sample_rate + padding
    /// Layer III: 144 (MPEG-1) or 72 (MPEG-2/2.5) * bitrate / sample_rate + padding
    pub fn frame_len(&self) -> Option<usize> {
        if self.is_free_format() {
            return None;
        }
        let bitrate = self.bitrate as usize * 1000;
        let sample_rate = self.sample_rate as usize;
        let pad = usize::from(self.padding);
        let len = match (self.layer, self.version) {
            (Layer::Layer1, _) => (12 * bitrate / sample_rate + pad) * 4,
            (Layer::Layer2, _) | (Layer::Layer3, MpegVersion::Mpeg1) => {
                144 * bitrate / sample_rate + pad
            }
            (Layer::Layer3, _) => 72 * bitrate / sample_rate + pad,
        };
        Some(len)
    }

    /// Offset of the side information (right after the header and optional CRC)
    pub fn side_info_start(&self) -> usize {
        if self.protected {
            HEADER_LEN + 2
        } else {
            HEADER_LEN
        }
    }

    /// Layer III side information size; Layers I/II carry none
    pub fn side_info_len(&self) -> usize {
        match (self.layer, self.version, self.channel_mode) {
            (Layer::Layer3, MpegVersion::Mpeg1, ChannelMode::Mono) => 17,
            (Layer::Layer3, MpegVersion::Mpeg1, _) => 32,
            (Layer::Layer3, _, ChannelMode::Mono) => 9,
            (Layer::Layer3, _, _) => 17,
            _ => 0,
        }
    }

    /// Where a Xing/Info tag starts inside a Layer III frame.
    ///
    /// Encoders place it right after the side information and ignore the CRC
    /// word, so this is header + side info regardless of the protection bit.
    pub fn xing_offset(&self) -> usize {
        HEADER_LEN + self.side_info_len()
    }

    /// Same stream family: version, layer and sample rate all match
    pub fn is_compatible(&self, other: &FrameHeader) -> bool {
        self.version == other.version
            && self.layer == other.layer
            && self.sample_rate == other.sample_rate
    }

    /// A copy with a different bitrate index (1..=14) and the padding and
    /// protection bits cleared. Used to build tag carrier frames.
    pub fn with_bitrate_index(&self, bitrate_index: u8) -> Option<Self> {
        if !(1..=14).contains(&bitrate_index) {
            return None;
        }
        let mut raw = self.raw;
        raw[1] |= 0x01; // no CRC
        raw[2] = (raw[2] & 0x0D) | (bitrate_index << 4); // clear padding
        FrameHeader::parse(raw)
    }
}

fn bitrate_table(version: MpegVersion, layer: Layer) -> &'static [u32; 16] {
    match (version, layer) {
        (MpegVersion::Mpeg1, Layer::Layer1) => &BITRATES_V1_L1,
        (MpegVersion::Mpeg1, Layer::Layer2) => &BITRATES_V1_L2,
        (MpegVersion::Mpeg1, Layer::Layer3) => &BITRATES_V1_L3,
        (_, Layer::Layer1) => &BITRATES_V2_L1,
        (_, _) => &BITRATES_V2_L23,
    }
}

/// Layer III bit-reservoir back pointer (`main_data_begin`) of a frame.
///
/// Nine bits for MPEG-1, eight for MPEG-2/2.5, read from the start of the
/// side information. Returns 0 for other layers or short buffers.
pub fn main_data_begin(header: &FrameHeader, frame: &[u8]) -> u16 {
    if header.layer != Layer::Layer3 {
        return 0;
    }
    let at = header.side_info_start();
    match header.version {
        MpegVersion::Mpeg1 if frame.len() > at + 1 => {
            (u16::from(frame[at]) << 1) | u16::from(frame[at + 1] >> 7)
        }
        MpegVersion::Mpeg2 | MpegVersion::Mpeg25 if frame.len() > at => u16::from(frame[at]),
        _ => 0,
    }
}
