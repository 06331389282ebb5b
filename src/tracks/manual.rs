//! Manual track list: `t:s-e[,t:s-e...]`
//!
//! `t` is the track number, `s` the first sample and `e` the sample after the
//! last one. Positions are either plain sample counts or times written as
//! `[XXm]YY[.ZZ]s` (`88.23s`, `3m10s`, `2m`). A track number that was
//! already used moves up to the next free one.

use super::{Track, TrackListError};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref TIME: Regex =
        Regex::new(r"^(?:(\d+)m)?(?:(\d+(?:\.\d+)?)s?)?$").expect("time pattern is valid");
}

pub fn parse(list: &str, sample_rate: u32) -> Result<Vec<Track>, TrackListError> {
    let mut used = HashSet::new();
    list.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry
                .split([':', '-'])
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            let [number, start, end] = parts.as_slice() else {
                return Err(TrackListError::Entry(entry.to_string()));
            };
            let mut number: u32 = number
                .parse()
                .map_err(|_| TrackListError::Entry(entry.to_string()))?;
            while !used.insert(number) {
                number += 1;
            }
            Ok(Track::new(
                number,
                position(start, sample_rate)?,
                position(end, sample_rate)?,
            ))
        })
        .collect()
}

/// Sample position from a sample count or a time
pub fn position(text: &str, sample_rate: u32) -> Result<u64, TrackListError> {
    let invalid = || TrackListError::Position(text.to_string());
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().map_err(|_| invalid());
    }

    let caps = TIME
        .captures(text)
        .filter(|c| c.get(1).is_some() || c.get(2).is_some())
        .ok_or_else(invalid)?;
    let minutes: f64 = match caps.get(1) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => 0.0,
    };
    let seconds: f64 = match caps.get(2) {
        Some(s) => s.as_str().parse().map_err(|_| invalid())?,
        None => 0.0,
    };
    Ok(((minutes * 60.0 + seconds) * f64::from(sample_rate)).round() as u64)
}
