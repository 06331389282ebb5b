//! Scan → crop → rescan through the public API, on real files

use framecut::mp3::lame::{self, TagUpdate};
use framecut::mp3::FrameHeader;
use framecut::scanner::CollectJunk;
use framecut::{CropOptions, Error, RangeError, ScannedMp3};
use proptest::prelude::*;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// MPEG1 Layer III, 128 kbps, 44.1 kHz, stereo: 417 bytes, 1152 samples
const HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
const FRAME_LEN: usize = 417;

fn audio_frames(n: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(n * FRAME_LEN);
    for i in 0..n {
        let mut frame = vec![0u8; FRAME_LEN];
        frame[..4].copy_from_slice(&HEADER);
        frame[200] = i as u8;
        data.extend(frame);
    }
    data
}

/// Ten audio frames behind an Info tag claiming 576 delay and 288 padding
fn tagged_stream() -> Vec<u8> {
    let header = FrameHeader::parse(HEADER).expect("valid header");
    let update = TagUpdate {
        frame_count: 10,
        music_bytes: (10 * FRAME_LEN) as u64,
        toc: None,
        encoder_delay: 576,
        encoder_padding: 288,
        starts_stream: true,
        ends_stream: true,
    };
    let mut data = lame::synthesize(&header, 128.0, false, &update).expect("tag");
    data.extend(audio_frames(10));
    data
}

fn scan_file(path: &Path) -> ScannedMp3 {
    let file = File::open(path).expect("open");
    ScannedMp3::scan(BufReader::new(file)).expect("scan")
}

fn crop_file(mp3: &ScannedMp3, source: &Path, start: u64, end: u64, dest: &Path) -> framecut::Result<()> {
    let reader = BufReader::new(File::open(source)?);
    let writer = File::create(dest)?;
    mp3.crop_with(start, end, &CropOptions::default(), reader, writer)?;
    Ok(())
}

#[test]
fn test_tagged_source_counts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("side-a.mp3");
    fs::write(&source, tagged_stream()).expect("write");

    let mp3 = scan_file(&source);
    assert_eq!(mp3.index().len(), 10);
    assert!(mp3.index().info_frame().is_some());
    assert_eq!(mp3.encoder_delay(), 576);
    assert_eq!(mp3.encoder_padding(), 288);
    assert_eq!(mp3.sample_count(), 11520 - 576 - 288);
}

#[test]
fn test_crop_then_rescan() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("side-a.mp3");
    let track = dir.path().join("01.mp3");
    fs::write(&source, tagged_stream()).expect("write");

    let mp3 = scan_file(&source);
    crop_file(&mp3, &source, 0, 5000, &track).expect("crop");

    let cut = scan_file(&track);
    assert_eq!(cut.index().len(), 5);
    assert_eq!(cut.encoder_delay(), 576);
    assert_eq!(cut.encoder_padding(), 184);
    assert_eq!(cut.sample_count(), 5000);
    assert!(cut.lame().is_some_and(|l| l.crc_valid));
}

#[test]
fn test_full_range_keeps_audio_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("side-a.mp3");
    let copy = dir.path().join("copy.mp3");
    let data = tagged_stream();
    fs::write(&source, &data).expect("write");

    let mp3 = scan_file(&source);
    crop_file(&mp3, &source, 0, mp3.sample_count(), &copy).expect("crop");

    let out = fs::read(&copy).expect("read");
    let tag_len = mp3.tag().expect("tag").len();
    assert_eq!(out.len(), data.len());
    assert_eq!(out[tag_len..], data[tag_len..]);

    let again = scan_file(&copy);
    assert_eq!(again.sample_count(), mp3.sample_count());
    assert_eq!(again.encoder_delay(), 576);
    assert_eq!(again.encoder_padding(), 288);
}

#[test]
fn test_junk_is_reported_and_dropped() {
    let mut data = b"ID3\x03\x00\x00\x00\x00\x00\x00".to_vec();
    data.extend(audio_frames(4));
    let mut trailer = b"TAG".to_vec();
    trailer.resize(128, 0);
    data.extend(&trailer);

    let mut junk = CollectJunk::default();
    let mp3 = ScannedMp3::scan_with(&data[..], &mut junk).expect("scan");
    assert_eq!(mp3.index().len(), 4);
    assert_eq!(junk.blocks.len(), 2);
    assert_eq!(junk.blocks[1], trailer);

    let mut out = Vec::new();
    mp3.crop(0, 1152, &data[..], &mut out).expect("crop");
    let cut = ScannedMp3::scan(&out[..]).expect("rescan");
    assert_eq!(cut.index().stats().junk_bytes, 0);
    assert_eq!(cut.sample_count(), 1152);
}

#[test]
fn test_recropping_full_range_is_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("side-a.mp3");
    let track = dir.path().join("02.mp3");
    let again = dir.path().join("02-again.mp3");
    fs::write(&source, tagged_stream()).expect("write");

    let mp3 = scan_file(&source);
    crop_file(&mp3, &source, 1500, 8000, &track).expect("crop");
    let cut = scan_file(&track);
    assert_eq!(cut.sample_count(), 6500);

    crop_file(&cut, &track, 0, cut.sample_count(), &again).expect("recrop");
    let first = fs::read(&track).expect("read");
    let second = fs::read(&again).expect("read");
    let tag_len = cut.tag().expect("tag").len();
    assert_eq!(second[tag_len..], first[tag_len..]);
    assert_eq!(second, first);
}

#[test]
fn test_junk_inside_selection_is_copied() {
    let garbage = b"garbage!";
    let mut data = audio_frames(2);
    data.extend(garbage);
    data.extend(audio_frames(2));

    let mp3 = ScannedMp3::scan(&data[..]).expect("scan");
    assert_eq!(mp3.index().len(), 4);
    assert_eq!(mp3.index().stats().junk_bytes, garbage.len() as u64);

    let mut out = Vec::new();
    mp3.crop(1000, 3000, &data[..], &mut out).expect("crop");
    assert!(out.windows(garbage.len()).any(|w| w == garbage));
    // Frames 0..3, garbage and all, follow the carrier verbatim
    let selected = &data[..3 * FRAME_LEN + garbage.len()];
    assert_eq!(out[out.len() - selected.len()..], selected[..]);

    let cut = ScannedMp3::scan(&out[..]).expect("rescan");
    assert_eq!(cut.index().stats().junk_bytes, garbage.len() as u64);
    assert_eq!(cut.sample_count(), 2000);
}

#[test]
fn test_bad_requests() {
    let data = tagged_stream();
    let mp3 = ScannedMp3::scan(&data[..]).expect("scan");
    let total = mp3.sample_count();

    let err = mp3.crop(10, 10, &data[..], Vec::<u8>::new()).unwrap_err();
    assert!(matches!(err, Error::Range(RangeError::Empty { .. })));
    let err = mp3.crop(0, total + 1, &data[..], Vec::<u8>::new()).unwrap_err();
    assert!(matches!(err, Error::Range(RangeError::OutOfBounds { .. })));

    let err = ScannedMp3::scan(&b"not an mp3 at all"[..]).unwrap_err();
    assert!(matches!(err, Error::NoAudioData));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_cut_has_requested_length(start in 0u64..10_000, len in 1u64..10_656) {
        let data = tagged_stream();
        let mp3 = ScannedMp3::scan(&data[..]).expect("scan");
        let end = (start + len).min(mp3.sample_count());
        prop_assume!(end > start);

        let mut out = Vec::new();
        mp3.crop(start, end, &data[..], &mut out).expect("crop");
        let cut = ScannedMp3::scan(&out[..]).expect("rescan");
        prop_assert_eq!(cut.sample_count(), end - start);
    }
}
