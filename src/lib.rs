//! Sample-accurate, lossless MP3 cutting
//!
//! MP3 frames can't be cut, so `framecut` keeps whole frames and writes the
//! number of surplus samples at each end into the LAME tag, where players
//! that honor it drop them at decode time. The audio bytes are copied as
//! they are.
//!
//! ```no_run
//! use framecut::ScannedMp3;
//! use std::fs::File;
//!
//! # fn main() -> framecut::Result<()> {
//! let mp3 = ScannedMp3::scan(File::open("side-a.mp3")?)?;
//! let rate = u64::from(mp3.sampling_frequency());
//! mp3.crop(30 * rate, 95 * rate, File::open("side-a.mp3")?, File::create("track.mp3")?)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crop;
pub mod error;
pub mod id3v1;
pub mod mp3;
pub mod report;
pub mod scanned;
pub mod scanner;
pub mod tracks;

pub use crop::{CropOptions, CropRequest, CroppedResult};
pub use error::{Error, RangeError, Result};
pub use id3v1::Id3v1Tag;
pub use scanned::ScannedMp3;
pub use scanner::{FrameDescriptor, FrameIndex, JunkRegion, JunkSink, ScanStop};
