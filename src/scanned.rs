//! A scanned MP3 stream, ready to be cropped any number of times
//!
//! Scanning reads the source once. Every crop afterwards needs a fresh reader
//! over the same bytes (reopen the file, rewind a cursor); the scanned data
//! itself is immutable and can be shared between threads.

use crate::crop::{self, CropOptions, CropRequest, CroppedResult};
use crate::error::{Error, Result};
use crate::mp3::lame::{LameInfo, XingFrame};
use crate::scanner::{self, DiscardJunk, FrameIndex, JunkSink};
use std::fmt;
use std::io::{Read, Write};

#[derive(Debug, Clone)]
pub struct ScannedMp3 {
    index: FrameIndex,
    tag: Option<XingFrame>,
}

impl ScannedMp3 {
    /// Scan `source`, discarding junk
    pub fn scan<R: Read>(source: R) -> Result<Self> {
        Self::scan_with(source, DiscardJunk)
    }

    /// Scan `source`, handing junk to `sink`
    pub fn scan_with<R: Read, J: JunkSink>(source: R, sink: J) -> Result<Self> {
        let out = scanner::scan(source, sink)?;
        if out.index.is_empty() {
            return Err(Error::NoAudioData);
        }
        Ok(Self {
            index: out.index,
            tag: out.tag,
        })
    }

    pub fn index(&self) -> &FrameIndex {
        &self.index
    }

    pub fn tag(&self) -> Option<&XingFrame> {
        self.tag.as_ref()
    }

    pub fn lame(&self) -> Option<&LameInfo> {
        self.tag.as_ref().and_then(|t| t.lame.as_ref())
    }

    pub fn encoder_delay(&self) -> u16 {
        self.tag.as_ref().map_or(0, XingFrame::encoder_delay)
    }

    pub fn encoder_padding(&self) -> u16 {
        self.tag.as_ref().map_or(0, XingFrame::encoder_padding)
    }

    /// Samples a LAME-aware player outputs; crop requests use this domain
    pub fn sample_count(&self) -> u64 {
        crop::effective_sample_count(&self.index, self.tag.as_ref())
    }

    pub fn sampling_frequency(&self) -> u32 {
        self.index.sample_rate()
    }

    /// Playing time in seconds
    pub fn duration_secs(&self) -> f64 {
        self.sample_count() as f64 / f64::from(self.sampling_frequency())
    }

    /// Plan a crop of `[start, end)` without touching any bytes
    pub fn plan(&self, start: u64, end: u64, options: &CropOptions) -> Result<CroppedResult> {
        crop::plan(
            CropRequest::new(start, end),
            &self.index,
            self.tag.as_ref(),
            options,
        )
    }

    /// Write samples `[start, end)` of the stream read from `source` to `dest`
    ///
    /// `source` must start at the same byte the scan started at.
    pub fn crop<R: Read, W: Write>(
        &self,
        start: u64,
        end: u64,
        source: R,
        dest: W,
    ) -> Result<CroppedResult> {
        self.crop_with(start, end, &CropOptions::default(), source, dest)
    }

    pub fn crop_with<R: Read, W: Write>(
        &self,
        start: u64,
        end: u64,
        options: &CropOptions,
        source: R,
        dest: W,
    ) -> Result<CroppedResult> {
        let result = self.plan(start, end, options)?;
        crop::write(&result, source, dest)?;
        Ok(result)
    }
}

impl fmt::Display for ScannedMp3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.index.stats();
        write!(
            f,
            "{} frames, {} Hz, {} samples ({:.2}s), {:.1} kbps{}",
            stats.frame_count,
            self.sampling_frequency(),
            self.sample_count(),
            self.duration_secs(),
            stats.avg_bitrate,
            if stats.is_vbr { " VBR" } else { "" }
        )?;
        if let Some(lame) = self.lame() {
            write!(
                f,
                ", {} delay {} padding {}",
                lame.encoder, lame.encoder_delay, lame.encoder_padding
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mp3::frame::tests::MPEG1_L3_128;
    use crate::mp3::lame::tests::tag_frame;
    use crate::mp3::lame::TagKind;
    use crate::scanner::tests::stream;
    use crate::scanner::CollectJunk;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::thread;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_scanned_is_shareable() {
        assert_send_sync::<ScannedMp3>();
    }

    #[test]
    fn test_no_audio_data() {
        let garbage = vec![0x42u8; 5000];
        assert!(matches!(ScannedMp3::scan(&garbage[..]), Err(Error::NoAudioData)));
        assert!(matches!(ScannedMp3::scan(&[0u8; 0][..]), Err(Error::NoAudioData)));
    }

    #[test]
    fn test_plain_stream_counts() {
        let mp3 = ScannedMp3::scan(&stream(MPEG1_L3_128, 10)[..]).expect("scan");
        assert_eq!(mp3.sample_count(), 11520);
        assert_eq!(mp3.sampling_frequency(), 44100);
        assert_eq!(mp3.encoder_delay(), 0);
        assert_eq!(mp3.encoder_padding(), 0);
        assert!(mp3.lame().is_none());
        assert!(mp3.to_string().starts_with("10 frames, 44100 Hz, 11520 samples"));
    }

    #[test]
    fn test_tagged_stream_counts() {
        let mut data = tag_frame(TagKind::Info, 0x03, 10, 417 * 11, Some((576, 288)));
        data.extend(stream(MPEG1_L3_128, 10));
        let mp3 = ScannedMp3::scan(&data[..]).expect("scan");
        assert_eq!(mp3.sample_count(), 10656);
        assert_eq!(mp3.encoder_delay(), 576);
        assert_eq!(mp3.encoder_padding(), 288);
        assert!(mp3.to_string().ends_with("LAME3.100 delay 576 padding 288"));
    }

    #[test]
    fn test_scan_with_sink_sees_leading_tag() {
        let mut data = b"ID3 leading block".to_vec();
        data.extend(stream(MPEG1_L3_128, 3));
        let mut junk = CollectJunk::default();
        let mp3 = ScannedMp3::scan_with(&data[..], &mut junk).expect("scan");
        assert_eq!(mp3.index().len(), 3);
        assert_eq!(junk.blocks, vec![b"ID3 leading block".to_vec()]);
    }

    #[test]
    fn test_crop_twice_from_one_scan() {
        let data = stream(MPEG1_L3_128, 10);
        let mp3 = ScannedMp3::scan(&data[..]).expect("scan");

        let mut first = Vec::new();
        let mut second = Vec::new();
        let a = mp3.crop(0, 3000, Cursor::new(&data), &mut first).expect("crop");
        let b = mp3.crop(3000, 11520, Cursor::new(&data), &mut second).expect("crop");

        assert_eq!(a.sample_count() + b.sample_count(), 11520);
        assert_eq!(ScannedMp3::scan(&first[..]).expect("rescan").sample_count(), 3000);
        assert_eq!(ScannedMp3::scan(&second[..]).expect("rescan").sample_count(), 8520);
    }

    #[test]
    fn test_concurrent_crops() {
        let data = Arc::new(stream(MPEG1_L3_128, 20));
        let mp3 = Arc::new(ScannedMp3::scan(&data[..]).expect("scan"));

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let data = Arc::clone(&data);
                let mp3 = Arc::clone(&mp3);
                thread::spawn(move || {
                    let mut out = Vec::new();
                    mp3.crop(i * 5000, i * 5000 + 4000, &data[..], &mut out)
                        .expect("crop");
                    out
                })
            })
            .collect();

        for handle in handles {
            let out = handle.join().expect("thread");
            assert_eq!(ScannedMp3::scan(&out[..]).expect("rescan").sample_count(), 4000);
        }
    }
}
