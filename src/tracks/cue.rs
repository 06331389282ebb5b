//! CUE sheet reader
//!
//! Only what a splitter needs: the first `FILE`, `TITLE`/`PERFORMER` at
//! sheet and track level, `TRACK` and `INDEX 01`. CUE times are
//! `mm:ss:ff` with 75 frames ("sectors") per second.

use super::{Track, TrackListError};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

pub const SECTORS_PER_SECOND: u64 = 75;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueSheet {
    pub file: Option<String>,
    /// Album title
    pub title: Option<String>,
    /// Album performer
    pub performer: Option<String>,
    pub tracks: Vec<CueTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueTrack {
    pub number: u32,
    pub title: Option<String>,
    pub performer: Option<String>,
    /// `INDEX 01` position in sectors
    pub start: Option<u64>,
}

impl CueSheet {
    pub fn load(path: &Path) -> Result<Self, TrackListError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, TrackListError> {
        let mut sheet = CueSheet::default();

        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim_start_matches('\u{feff}').trim();
            let Some(keyword) = line.split_whitespace().next() else {
                continue;
            };
            let rest = line[keyword.len()..].trim();
            let cue_error = |message: &str| TrackListError::Cue {
                line: n + 1,
                message: message.to_string(),
            };

            match keyword.to_ascii_lowercase().as_str() {
                "file" => {
                    if sheet.file.is_none() {
                        // FILE "name" TYPE
                        let name = rest
                            .rsplit_once(char::is_whitespace)
                            .map_or(rest, |(name, _kind)| name);
                        sheet.file = Some(unquote(name.trim()));
                    }
                }
                "title" | "performer" => {
                    if rest.is_empty() {
                        continue;
                    }
                    let value = unquote(&rest.split_whitespace().collect::<Vec<_>>().join(" "));
                    let is_title = keyword.eq_ignore_ascii_case("title");
                    match (sheet.tracks.last_mut(), is_title) {
                        (Some(track), true) => track.title = Some(value),
                        (Some(track), false) => track.performer = Some(value),
                        (None, true) => sheet.title = Some(value),
                        (None, false) => sheet.performer = Some(value),
                    }
                }
                "track" => {
                    let number = rest
                        .split_whitespace()
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or_else(|| cue_error("TRACK without a track number"))?;
                    sheet.tracks.push(CueTrack {
                        number,
                        ..Default::default()
                    });
                }
                "index" => {
                    let mut fields = rest.split_whitespace();
                    let index: u32 = fields
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or_else(|| cue_error("INDEX without an index number"))?;
                    let sectors = fields
                        .next()
                        .and_then(msf_to_sectors)
                        .ok_or_else(|| cue_error("INDEX time must be mm:ss:ff"))?;
                    if index == 1 {
                        let track = sheet
                            .tracks
                            .last_mut()
                            .ok_or_else(|| cue_error("INDEX before the first TRACK"))?;
                        track.start = Some(sectors);
                    }
                }
                _ => {}
            }
        }

        Ok(sheet)
    }

    /// Tracks as sample ranges of a stream with `total_samples` samples
    ///
    /// The first track always starts at 0 so nothing before it is lost. Each
    /// track ends where the next one starts; the last one at the stream end.
    pub fn to_tracks(&self, sample_rate: u32, total_samples: u64) -> Result<Vec<Track>, TrackListError> {
        let indexed: Vec<&CueTrack> = self
            .tracks
            .iter()
            .filter(|t| {
                if t.start.is_none() {
                    warn!("CUE track {} has no INDEX 01, skipping it", t.number);
                }
                t.start.is_some()
            })
            .collect();
        if indexed.is_empty() {
            return Err(TrackListError::NoTracks);
        }

        let starts: Vec<u64> = indexed
            .iter()
            .enumerate()
            .map(|(i, t)| match (i, t.start) {
                (0, _) | (_, None) => 0,
                (_, Some(sectors)) => sectors * u64::from(sample_rate) / SECTORS_PER_SECOND,
            })
            .collect();

        Ok(indexed
            .iter()
            .enumerate()
            .map(|(i, t)| Track {
                number: t.number,
                start: starts[i],
                end: starts.get(i + 1).copied().unwrap_or(total_samples),
                title: t.title.clone(),
                performer: t.performer.clone().or_else(|| self.performer.clone()),
            })
            .collect())
    }

    /// The MP3 the sheet refers to, relative to the sheet's directory
    ///
    /// Sheets often name the WAV that was burned; the extension is switched
    /// to `.mp3`.
    pub fn source_path(&self, cue_path: &Path) -> Option<PathBuf> {
        let file = PathBuf::from(self.file.as_ref()?);
        let mut path = match cue_path.parent() {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file,
        };
        let is_mp3 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));
        if !is_mp3 {
            path.set_extension("mp3");
        }
        Some(path)
    }
}

/// `mm:ss:ff` to sectors
pub fn msf_to_sectors(time: &str) -> Option<u64> {
    let mut parts = time.trim().splitn(3, ':');
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    let frames: u64 = parts.next()?.parse().ok()?;
    Some(frames + SECTORS_PER_SECOND * (seconds + 60 * minutes))
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = r#"REM GENRE Rock
PERFORMER "The Band"
TITLE "Live   Side A"
FILE "side a.wav" WAVE
  TRACK 01 AUDIO
    TITLE "Opening"
    INDEX 00 00:00:00
    INDEX 01 00:00:32
  TRACK 02 AUDIO
    TITLE "Second: Song?"
    PERFORMER "Guest"
    INDEX 01 03:10:15
  TRACK 03 AUDIO
    INDEX 01 07:00:00
"#;

    #[test]
    fn test_parse_sheet() {
        let sheet = CueSheet::parse(SHEET).expect("parse");
        assert_eq!(sheet.file.as_deref(), Some("side a.wav"));
        assert_eq!(sheet.performer.as_deref(), Some("The Band"));
        assert_eq!(sheet.title.as_deref(), Some("Live Side A"));
        assert_eq!(sheet.tracks.len(), 3);
        assert_eq!(sheet.tracks[0].title.as_deref(), Some("Opening"));
        assert_eq!(sheet.tracks[0].start, Some(32));
        assert_eq!(sheet.tracks[1].performer.as_deref(), Some("Guest"));
        assert_eq!(sheet.tracks[1].start, Some(15 + 75 * 190));
        assert_eq!(sheet.tracks[2].title, None);
    }

    #[test]
    fn test_to_tracks() {
        let sheet = CueSheet::parse(SHEET).expect("parse");
        let tracks = sheet.to_tracks(44100, 20_000_000).expect("tracks");

        assert_eq!(tracks.len(), 3);
        // First track is pulled back to 0
        assert_eq!(tracks[0].start, 0);
        assert_eq!(tracks[0].end, (15 + 75 * 190) * 588);
        assert_eq!(tracks[1].start, tracks[0].end);
        assert_eq!(tracks[2].start, 420 * 44100);
        assert_eq!(tracks[2].end, 20_000_000);

        assert_eq!(tracks[0].performer.as_deref(), Some("The Band"));
        assert_eq!(tracks[1].performer.as_deref(), Some("Guest"));
        assert_eq!(tracks[1].number, 2);
    }

    #[test]
    fn test_other_sample_rates() {
        let sheet = CueSheet::parse("TRACK 1 AUDIO\nINDEX 01 00:00:00\nTRACK 2 AUDIO\nINDEX 01 00:01:00\n")
            .expect("parse");
        let tracks = sheet.to_tracks(48000, 96000).expect("tracks");
        assert_eq!(tracks[1].start, 48000);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            CueSheet::parse("TRACK xx AUDIO"),
            Err(TrackListError::Cue { line: 1, .. })
        ));
        assert!(matches!(
            CueSheet::parse("TRACK 01 AUDIO\n  INDEX 01 1:2"),
            Err(TrackListError::Cue { line: 2, .. })
        ));
        assert!(matches!(
            CueSheet::parse("INDEX 01 00:00:00"),
            Err(TrackListError::Cue { line: 1, .. })
        ));

        let sheet = CueSheet::parse("TRACK 01 AUDIO\n").expect("parse");
        assert!(matches!(sheet.to_tracks(44100, 100), Err(TrackListError::NoTracks)));
    }

    #[test]
    fn test_source_path() {
        let sheet = CueSheet::parse(SHEET).expect("parse");
        assert_eq!(
            sheet.source_path(Path::new("rips/live.cue")),
            Some(PathBuf::from("rips/side a.mp3"))
        );

        let sheet = CueSheet::parse("FILE album.MP3 MP3").expect("parse");
        assert_eq!(
            sheet.source_path(Path::new("live.cue")),
            Some(PathBuf::from("album.MP3"))
        );

        assert_eq!(CueSheet::default().source_path(Path::new("x.cue")), None);
    }

    #[test]
    fn test_msf() {
        assert_eq!(msf_to_sectors("01:02:03"), Some(3 + 75 * 62));
        assert_eq!(msf_to_sectors("1:2"), None);
        assert_eq!(msf_to_sectors("aa:00:00"), None);
    }
}
