pub mod csv;
pub mod json;

use crate::mp3::lame::{LameInfo, TagKind};
use crate::scanned::ScannedMp3;
use crate::scanner::{FrameStats, ScanStop};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Write a report for one scanned file; `.json` gets the summary, anything
/// else the frame index as CSV
pub fn generate<P: AsRef<Path>>(path: P, report: &StreamReport<'_>, mp3: &ScannedMp3) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, report),
        _ => csv::write(&mut file, mp3.index()),
    }
}

/// Everything worth knowing about a scanned stream
#[derive(Debug, Clone, Serialize)]
pub struct StreamReport<'a> {
    pub file: &'a str,
    pub sample_rate: u32,
    pub samples_per_frame: u32,
    pub sample_count: u64,
    pub duration_secs: f64,
    pub encoder_delay: u16,
    pub encoder_padding: u16,
    pub tag: Option<TagKind>,
    pub lame: Option<&'a LameInfo>,
    pub stats: FrameStats,
    pub stop: ScanStop,
}

impl<'a> StreamReport<'a> {
    pub fn new(file: &'a str, mp3: &'a ScannedMp3) -> Self {
        Self {
            file,
            sample_rate: mp3.sampling_frequency(),
            samples_per_frame: mp3.index().samples_per_frame(),
            sample_count: mp3.sample_count(),
            duration_secs: mp3.duration_secs(),
            encoder_delay: mp3.encoder_delay(),
            encoder_padding: mp3.encoder_padding(),
            tag: mp3.tag().map(|t| t.kind),
            lame: mp3.lame(),
            stats: mp3.index().stats(),
            stop: mp3.index().stop(),
        }
    }
}
