//! Track lists: which sample ranges to cut and what to call them
//!
//! Two sources: a manual list on the command line ([`manual`]) and a CUE
//! sheet ([`cue`]). Both end up as a `Vec<Track>` in the effective sample
//! domain of the scanned stream. [`naming`] turns a track into a file name.

pub mod cue;
pub mod manual;
pub mod naming;

use serde::Serialize;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackListError {
    #[error("malformed track entry '{0}', expected <track>:<start>-<end>")]
    Entry(String),

    #[error("invalid position '{0}', expected a sample count or [XXm]YY[.ZZ]s")]
    Position(String),

    #[error("CUE sheet line {line}: {message}")]
    Cue { line: usize, message: String },

    #[error("CUE sheet has no track with an INDEX 01")]
    NoTracks,

    #[error("naming scheme '{0}' needs %n or %t to write more than one track")]
    AmbiguousScheme(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One output track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub number: u32,
    /// First sample (inclusive)
    pub start: u64,
    /// Last sample (exclusive)
    pub end: u64,
    pub title: Option<String>,
    pub performer: Option<String>,
}

impl Track {
    pub fn new(number: u32, start: u64, end: u64) -> Self {
        Self {
            number,
            start,
            end,
            title: None,
            performer: None,
        }
    }
}
