//! ID3v1 / ID3v1.1 trailer
//!
//! ```text
//! offset  len  field
//!      0    3  "TAG"
//!      3   30  title
//!     33   30  artist
//!     63   30  album
//!     93    4  year
//!     97   30  comment (v1.1: 28 bytes, then 0, then track number)
//!    127    1  genre
//! ```
//!
//! Text is stored as Latin-1, zero padded. A non-zero track number turns the
//! tag into v1.1 and costs the comment its last two bytes.

use crate::error::{Error, Result};
use std::io::{self, Read, Write};

pub const TAG_LEN: usize = 128;
const MARKER: &[u8; 3] = b"TAG";

const TITLE: (usize, usize) = (3, 30);
const ARTIST: (usize, usize) = (33, 30);
const ALBUM: (usize, usize) = (63, 30);
const YEAR: (usize, usize) = (93, 4);
const COMMENT: (usize, usize) = (97, 30);
const GENRE: usize = 127;

/// Zero in v1.1 tags, part of the comment otherwise
const TRACK_MARKER: usize = COMMENT.0 + 28;
const TRACK: usize = COMMENT.0 + 29;

/// Genre byte of a new tag: not in the genre table, i.e. "none"
pub const NO_GENRE: u8 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3v1Tag {
    data: [u8; TAG_LEN],
    /// Last comment handed to `set_comment`, so a v1.1 → v1 switch can
    /// restore the two characters the track number took
    last_comment: Option<String>,
}

impl Default for Id3v1Tag {
    fn default() -> Self {
        Self::new()
    }
}

impl Id3v1Tag {
    /// Empty tag: all fields blank, no track, no genre
    pub fn new() -> Self {
        let mut data = [0u8; TAG_LEN];
        data[..3].copy_from_slice(MARKER);
        data[GENRE] = NO_GENRE;
        Self {
            data,
            last_comment: None,
        }
    }

    /// Read a tag from `buf` at `offset`
    ///
    /// `Ok(None)` if the marker isn't there. A marker without the full 128
    /// bytes behind it is [`Error::TruncatedInput`].
    pub fn from_bytes(buf: &[u8], offset: usize) -> Result<Option<Self>> {
        let rest = buf.get(offset..).unwrap_or_default();
        if !rest.starts_with(MARKER) {
            return Ok(None);
        }
        let Some(record) = rest.get(..TAG_LEN) else {
            return Err(Error::TruncatedInput {
                expected: TAG_LEN as u64,
                got: rest.len() as u64,
            });
        };
        let mut data = [0u8; TAG_LEN];
        data.copy_from_slice(record);
        Ok(Some(Self {
            data,
            last_comment: None,
        }))
    }

    /// Read exactly 128 bytes from `reader`
    pub fn read_from<R: Read>(mut reader: R) -> Result<Option<Self>> {
        let mut data = [0u8; TAG_LEN];
        let mut got = 0;
        while got < TAG_LEN {
            match reader.read(&mut data[got..]) {
                Ok(0) => {
                    return Err(Error::TruncatedInput {
                        expected: TAG_LEN as u64,
                        got: got as u64,
                    })
                }
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::from_read(e, TAG_LEN as u64, got as u64)),
            }
        }
        if !data.starts_with(MARKER) {
            return Ok(None);
        }
        Ok(Some(Self {
            data,
            last_comment: None,
        }))
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.data
    }

    /// Copy the record into `buf` at `offset`
    pub fn write_to_slice(&self, buf: &mut [u8], offset: usize) -> Result<()> {
        let available = buf.len().saturating_sub(offset);
        let Some(dest) = buf.get_mut(offset..).and_then(|rest| rest.get_mut(..TAG_LEN)) else {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("ID3v1 tag needs {} bytes, buffer has {}", TAG_LEN, available),
            )));
        };
        dest.copy_from_slice(&self.data);
        Ok(())
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.data)
    }

    pub fn title(&self) -> String {
        self.text(TITLE)
    }

    pub fn artist(&self) -> String {
        self.text(ARTIST)
    }

    pub fn album(&self) -> String {
        self.text(ALBUM)
    }

    pub fn year(&self) -> String {
        self.text(YEAR)
    }

    pub fn comment(&self) -> String {
        self.text(COMMENT)
    }

    /// Track number, 0 for a v1.0 tag
    pub fn track(&self) -> u8 {
        if self.data[TRACK_MARKER] == 0 {
            self.data[TRACK]
        } else {
            0
        }
    }

    pub fn genre(&self) -> u8 {
        self.data[GENRE]
    }

    /// Returns `false` if the title was cut to 30 characters
    pub fn set_title(&mut self, title: &str) -> bool {
        self.put_text(TITLE, title)
    }

    pub fn set_artist(&mut self, artist: &str) -> bool {
        self.put_text(ARTIST, artist)
    }

    pub fn set_album(&mut self, album: &str) -> bool {
        self.put_text(ALBUM, album)
    }

    pub fn set_year(&mut self, year: &str) -> bool {
        self.put_text(YEAR, year)
    }

    /// Up to 30 characters, 28 once a track number is set
    pub fn set_comment(&mut self, comment: &str) -> bool {
        self.last_comment = Some(comment.to_string());
        self.write_comment(comment)
    }

    pub fn set_track(&mut self, track: u8) {
        let had_track = self.track() > 0;
        if track == 0 {
            if had_track {
                let comment = self.last_comment.clone().unwrap_or_else(|| self.comment());
                self.data[TRACK] = 0;
                self.write_comment(&comment);
            }
            return;
        }
        if !had_track {
            // The comment loses its last two bytes; keep what it said so
            // clearing the track later can restore it
            if self.last_comment.is_none() {
                self.last_comment = Some(self.comment());
            }
            self.data[TRACK_MARKER] = 0;
        }
        self.data[TRACK] = track;
    }

    pub fn set_genre(&mut self, genre: u8) {
        self.data[GENRE] = genre;
    }

    fn write_comment(&mut self, comment: &str) -> bool {
        let (offset, len) = COMMENT;
        if self.track() > 0 {
            self.put_text((offset, len - 2), comment)
        } else {
            self.put_text((offset, len), comment)
        }
    }

    /// Field text up to the first zero byte, whitespace trimmed
    fn text(&self, (offset, len): (usize, usize)) -> String {
        let field = &self.data[offset..offset + len];
        let end = field.iter().position(|&b| b == 0).unwrap_or(len);
        let text: String = field[..end].iter().map(|&b| char::from(b)).collect();
        text.trim().to_string()
    }

    fn put_text(&mut self, (offset, len): (usize, usize), text: &str) -> bool {
        let encoded: Vec<u8> = text.chars().map(latin1).collect();
        let field = &mut self.data[offset..offset + len];
        field.fill(0);
        for (slot, &byte) in field.iter_mut().zip(&encoded) {
            *slot = if byte == 0 { b' ' } else { byte };
        }
        encoded.len() <= len
    }
}

fn latin1(c: char) -> u8 {
    u8::try_from(u32::from(c)).unwrap_or(b'?')
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_COMMENT: &str = "abcdefghijklmnopqrstuvwxyz0123";

    #[test]
    fn test_new_tag_is_blank() {
        let tag = Id3v1Tag::new();
        assert_eq!(&tag.as_bytes()[..3], b"TAG");
        assert_eq!(tag.title(), "");
        assert_eq!(tag.track(), 0);
        assert_eq!(tag.genre(), NO_GENRE);
    }

    #[test]
    fn test_fields_land_at_fixed_offsets() {
        let mut tag = Id3v1Tag::new();
        assert!(tag.set_title("Title"));
        assert!(tag.set_artist("Artist"));
        assert!(tag.set_album("Album"));
        assert!(tag.set_year("1999"));
        assert!(tag.set_comment("Comment"));
        tag.set_genre(17);

        let bytes = tag.as_bytes();
        assert_eq!(&bytes[3..8], b"Title");
        assert_eq!(bytes[8], 0);
        assert_eq!(&bytes[33..39], b"Artist");
        assert_eq!(&bytes[63..68], b"Album");
        assert_eq!(&bytes[93..97], b"1999");
        assert_eq!(&bytes[97..104], b"Comment");
        assert_eq!(bytes[127], 17);
    }

    #[test]
    fn test_overlong_title_is_truncated() {
        let mut tag = Id3v1Tag::new();
        let title = "x".repeat(31);
        assert!(!tag.set_title(&title));
        assert_eq!(tag.title(), "x".repeat(30));
        // The artist right behind it is untouched
        assert_eq!(tag.as_bytes()[33], 0);

        assert!(tag.set_title(&"y".repeat(30)));
    }

    #[test]
    fn test_embedded_zero_becomes_space() {
        let mut tag = Id3v1Tag::new();
        tag.set_artist("a\0b");
        assert_eq!(tag.artist(), "a b");
    }

    #[test]
    fn test_read_trims_whitespace() {
        let mut tag = Id3v1Tag::new();
        tag.set_album("  Spaced Out   ");
        assert_eq!(tag.album(), "Spaced Out");
    }

    #[test]
    fn test_latin1_round_trip() {
        let mut tag = Id3v1Tag::new();
        assert!(tag.set_title("Café Müller"));
        assert_eq!(tag.as_bytes()[6], 0xE9);
        assert_eq!(tag.title(), "Café Müller");
        tag.set_title("日本");
        assert_eq!(tag.title(), "??");
    }

    // ==========================================================================
    // v1 <-> v1.1
    // ==========================================================================
    //
    // A 30 character comment owns bytes 125 and 126. Setting a track number
    // steals them (125 becomes the zero marker, 126 the track). Clearing the
    // track gives them back and restores the full comment.
    // ==========================================================================

    #[test]
    fn test_track_number_shrinks_comment() {
        let mut tag = Id3v1Tag::new();
        assert!(tag.set_comment(LONG_COMMENT));
        assert_eq!(tag.comment(), LONG_COMMENT);
        assert_eq!(tag.track(), 0);

        tag.set_track(5);
        assert_eq!(tag.track(), 5);
        assert_eq!(tag.comment(), &LONG_COMMENT[..28]);
        assert_eq!(tag.as_bytes()[125], 0);
        assert_eq!(tag.as_bytes()[126], 5);

        // Now only 28 characters fit
        assert!(!tag.set_comment(LONG_COMMENT));
        assert!(tag.set_comment(&LONG_COMMENT[..28]));
    }

    #[test]
    fn test_clearing_track_restores_comment() {
        let mut tag = Id3v1Tag::new();
        tag.set_comment(LONG_COMMENT);
        tag.set_track(9);
        tag.set_track(0);
        assert_eq!(tag.track(), 0);
        assert_eq!(tag.comment(), LONG_COMMENT);
    }

    #[test]
    fn test_changing_track_keeps_comment() {
        let mut tag = Id3v1Tag::new();
        tag.set_comment("short");
        tag.set_track(3);
        tag.set_track(12);
        assert_eq!(tag.track(), 12);
        assert_eq!(tag.comment(), "short");
    }

    #[test]
    fn test_track_on_tag_read_from_bytes() {
        let mut original = Id3v1Tag::new();
        original.set_comment(LONG_COMMENT);
        let mut tag = Id3v1Tag::from_bytes(original.as_bytes(), 0)
            .expect("read")
            .expect("present");

        // No comment was set on this instance; the stored one is reused
        tag.set_track(2);
        tag.set_track(0);
        assert_eq!(tag.comment(), LONG_COMMENT);
    }

    #[test]
    fn test_from_bytes_at_offset() {
        let mut tag = Id3v1Tag::new();
        tag.set_title("Hidden");
        let mut buf = vec![0x55u8; 300];
        tag.write_to_slice(&mut buf, 100).expect("fits");

        let read = Id3v1Tag::from_bytes(&buf, 100).expect("read").expect("present");
        assert_eq!(read.title(), "Hidden");
        assert_eq!(read, Id3v1Tag::from_bytes(tag.as_bytes(), 0).unwrap().unwrap());

        assert!(Id3v1Tag::from_bytes(&buf, 0).expect("read").is_none());
        assert!(Id3v1Tag::from_bytes(&buf, 1000).expect("read").is_none());
        assert!(matches!(
            Id3v1Tag::from_bytes(&buf, 200),
            Ok(None)
        ));
    }

    #[test]
    fn test_from_bytes_short_record() {
        let tag = Id3v1Tag::new();
        let short = &tag.as_bytes()[..100];
        match Id3v1Tag::from_bytes(short, 0) {
            Err(Error::TruncatedInput { expected, got }) => {
                assert_eq!(expected, 128);
                assert_eq!(got, 100);
            }
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_write_to_small_buffer_fails() {
        let tag = Id3v1Tag::new();
        let mut buf = [0u8; 130];
        assert!(tag.write_to_slice(&mut buf, 2).is_ok());
        assert!(matches!(tag.write_to_slice(&mut buf, 3), Err(Error::Io(_))));
    }

    #[test]
    fn test_stream_read_and_write() {
        let mut tag = Id3v1Tag::new();
        tag.set_title("Streamed");
        tag.set_track(4);

        let mut out = Vec::new();
        tag.write_to(&mut out).expect("write");
        assert_eq!(out.len(), TAG_LEN);
        out.extend_from_slice(b"trailing");

        let mut reader = &out[..];
        let read = Id3v1Tag::read_from(&mut reader).expect("read").expect("present");
        assert_eq!(read.title(), "Streamed");
        assert_eq!(read.track(), 4);
        // Exactly 128 bytes consumed
        assert_eq!(reader, b"trailing");
    }

    #[test]
    fn test_stream_read_errors() {
        let data = [b'T', b'A', b'G', 0, 0];
        assert!(matches!(
            Id3v1Tag::read_from(&data[..]),
            Err(Error::TruncatedInput { expected: 128, got: 5 })
        ));

        let no_tag = [0x20u8; 128];
        assert!(Id3v1Tag::read_from(&no_tag[..]).expect("read").is_none());
    }
}
