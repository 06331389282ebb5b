//! Output file names
//!
//! A naming scheme is a template with these placeholders:
//!
//! | placeholder | value |
//! |-------------|-------|
//! | `%s` | source file name without extension |
//! | `%n` | track number, at least two digits |
//! | `%t` | track title |
//! | `%p` | track performer |
//! | `%a` | album |
//! | `%%` | a literal `%` |
//!
//! Unknown placeholders expand to nothing.

use super::TrackListError;

pub const DEFAULT_SCHEME: &str = "%n. %p - %t";

/// Characters that aren't safe in file names and what replaces them
const REPLACEMENTS: [(char, char); 6] = [
    ('?', ' '),
    ('*', ' '),
    ('"', '\''),
    (':', ' '),
    ('/', ' '),
    ('\\', ' '),
];

/// Values for one track
#[derive(Debug, Clone, Default)]
pub struct NameFields<'a> {
    pub source: &'a str,
    pub number: u32,
    pub title: &'a str,
    pub performer: &'a str,
    pub album: &'a str,
}

/// Two digit track label: `1` → `01`, `123` → `123`
pub fn track_label(number: u32) -> String {
    format!("{:02}", number)
}

pub fn evaluate_scheme(scheme: &str, fields: &NameFields<'_>) -> String {
    let mut out = String::with_capacity(scheme.len() + 32);
    let mut chars = scheme.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push_str(fields.source),
            Some('n') => out.push_str(&track_label(fields.number)),
            Some('t') => out.push_str(fields.title),
            Some('p') => out.push_str(fields.performer),
            Some('a') => out.push_str(fields.album),
            Some('%') => out.push('%'),
            _ => {}
        }
    }
    out
}

/// Replace characters file systems reject and collapse runs of spaces
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            REPLACEMENTS
                .iter()
                .find(|(evil, _)| *evil == c)
                .map_or(c, |(_, with)| *with)
        })
        .collect();
    replaced.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ")
}

/// With several tracks, the scheme has to tell them apart
pub fn check_scheme(scheme: &str, track_count: usize) -> Result<(), TrackListError> {
    if track_count > 1 && !scheme.contains("%n") && !scheme.contains("%t") {
        return Err(TrackListError::AmbiguousScheme(scheme.to_string()));
    }
    Ok(())
}
