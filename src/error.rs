//! Error types for scanning and cropping
//!
//! Malformed frame headers are never errors: the scanner folds them into junk.
//! What reaches the caller is one of the variants below.

use thiserror::Error;

/// Main error type for the crop engine and the tag codecs
#[derive(Debug, Error)]
pub enum Error {
    /// A crop request (or a value derived from it) does not fit the stream
    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    /// Not a single MPEG audio frame could be recovered from the source
    #[error("No audio data: no MPEG audio frames found")]
    NoAudioData,

    /// The source ended in the middle of a frame or a tag
    #[error("Truncated input: expected {expected} bytes, got {got}")]
    TruncatedInput { expected: u64, got: u64 },

    /// The stream uses a feature this crate cannot write
    #[error("Unsupported stream: {0}")]
    Unsupported(String),

    /// Underlying source or sink failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sample range validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Start lies after end
    #[error("start sample {start} is after end sample {end}")]
    Reversed { start: u64, end: u64 },

    /// One of the bounds lies outside the stream
    #[error("range {start}..{end} is outside 0..{total}")]
    OutOfBounds { start: u64, end: u64, total: u64 },

    /// Zero-length cuts are rejected
    #[error("empty range at sample {at}")]
    Empty { at: u64 },

    /// Delay or padding does not fit the 12-bit LAME field
    #[error("{field} of {value} samples exceeds the 4095 sample limit")]
    DelayOverflow { field: &'static str, value: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map an `UnexpectedEof` from `read_exact` to [`Error::TruncatedInput`]
    pub(crate) fn from_read(err: std::io::Error, expected: u64, got: u64) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedInput { expected, got }
        } else {
            Error::Io(err)
        }
    }
}
