mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use framecut::config::{self, Config};
use framecut::report::{self, StreamReport};
use framecut::scanner::{ScanStop, WriteJunk};
use framecut::tracks::cue::CueSheet;
use framecut::tracks::naming::{self, NameFields};
use framecut::tracks::{manual, Track};
use framecut::{Error, Id3v1Tag, ScannedMp3};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use cli::{Cli, Settings};

const UNKNOWN_ARTIST: &str = "Unknown Artist";

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();

    let config = match config::find_config(cli.config.as_deref(), Path::new(".")) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };
    let settings = cli.settings(config);

    let sheet = match &cli.cue {
        Some(path) => Some(
            CueSheet::load(path)
                .with_context(|| format!("reading CUE sheet {}", path.display()))?,
        ),
        None => None,
    };

    let input = match (&cli.input, &sheet, &cli.cue) {
        (Some(input), _, _) => input.clone(),
        (None, Some(sheet), Some(cue)) => sheet
            .source_path(cue)
            .context("no input file given and the CUE sheet has no FILE line")?,
        _ => bail!("no input file given"),
    };

    let mp3 = scan(&input, cli.junk.as_deref())?;
    print_summary(&input, &mp3);

    if let Some(path) = &cli.report {
        let file = input.display().to_string();
        report::generate(path, &StreamReport::new(&file, &mp3), &mp3)
            .with_context(|| format!("writing report {}", path.display()))?;
        println!("{} {}", "report".cyan().bold(), path.display());
    }

    let rate = mp3.sampling_frequency();
    let tracks = match (&sheet, &cli.crop) {
        (Some(sheet), _) => sheet.to_tracks(rate, mp3.sample_count())?,
        (None, Some(list)) => manual::parse(list, rate)?,
        (None, None) => return Ok(()),
    };
    naming::check_scheme(&settings.naming_scheme, tracks.len())?;

    fs::create_dir_all(&settings.directory)
        .with_context(|| format!("creating {}", settings.directory.display()))?;

    let album = cli
        .album
        .clone()
        .or_else(|| sheet.as_ref().and_then(|s| s.title.clone()));
    let tagging = settings.id3v1
        && (album.is_some()
            || cli.artist.is_some()
            || tracks.iter().any(|t| t.title.is_some() || t.performer.is_some()));

    let job = Job {
        mp3: &mp3,
        input: &input,
        settings: &settings,
        album: album.as_deref(),
        artist: cli.artist.as_deref(),
        tagging,
    };
    for track in &tracks {
        job.write_track(track)
            .with_context(|| format!("cutting track {}", naming::track_label(track.number)))?;
    }

    Ok(())
}

fn scan(input: &Path, junk: Option<&Path>) -> Result<ScannedMp3> {
    let source = BufReader::new(
        File::open(input).with_context(|| format!("cannot open {}", input.display()))?,
    );
    let scanned = match junk {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create junk file {}", path.display()))?;
            ScannedMp3::scan_with(source, WriteJunk(BufWriter::new(file)))
        }
        None => ScannedMp3::scan(source),
    };
    scanned
        .map_err(explain)
        .with_context(|| format!("scanning {}", input.display()))
}

fn print_summary(input: &Path, mp3: &ScannedMp3) {
    println!("{} {}: {}", "scanned".cyan().bold(), input.display(), mp3);

    let stats = mp3.index().stats();
    if stats.junk_bytes > 0 {
        println!(
            "  {} bytes of non-audio data in {} region(s)",
            stats.junk_bytes, stats.junk_regions
        );
    }
    if let ScanStop::SampleRateChanged {
        offset,
        expected,
        found,
    } = mp3.index().stop()
    {
        eprintln!(
            "{} sample rate changes from {} to {} Hz at byte {}, only the part before it is used",
            "warning:".yellow().bold(),
            expected,
            found,
            offset
        );
    }
}

/// Library errors to what a user can act on
fn explain(err: Error) -> anyhow::Error {
    let what = match &err {
        Error::NoAudioData => "no audio frames found",
        Error::Range(_) => "requested range not representable",
        Error::TruncatedInput { .. } | Error::Io(_) => "source unreadable",
        Error::Unsupported(_) => "unsupported stream",
    };
    anyhow::Error::new(err).context(what)
}

/// Everything shared between the tracks of one run
struct Job<'a> {
    mp3: &'a ScannedMp3,
    input: &'a Path,
    settings: &'a Settings,
    album: Option<&'a str>,
    artist: Option<&'a str>,
    tagging: bool,
}

impl Job<'_> {
    fn write_track(&self, track: &Track) -> Result<PathBuf> {
        let (title, performer) = self.labels(track);
        let source_name = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fields = NameFields {
            source: &source_name,
            number: track.number,
            title: &title,
            performer: &performer,
            album: self.album.unwrap_or(""),
        };
        let name = naming::sanitize_file_name(&naming::evaluate_scheme(
            &self.settings.naming_scheme,
            &fields,
        ));
        let path = self.settings.directory.join(format!("{}.mp3", name));
        if path == self.input {
            bail!("refusing to overwrite the source {}", path.display());
        }

        let source = BufReader::new(
            File::open(self.input)
                .with_context(|| format!("cannot reopen {}", self.input.display()))?,
        );
        let mut dest = BufWriter::new(
            File::create(&path).with_context(|| format!("cannot create {}", path.display()))?,
        );
        let result = self
            .mp3
            .crop_with(track.start, track.end, &self.settings.crop, source, &mut dest)
            .map_err(explain)?;

        if self.tagging {
            let mut tag = Id3v1Tag::new();
            tag.set_title(&title);
            tag.set_artist(&performer);
            tag.set_album(self.album.unwrap_or(""));
            tag.set_track(u8::try_from(track.number).unwrap_or(0));
            tag.write_to(&mut dest)?;
        }
        dest.flush()
            .with_context(|| format!("writing {}", path.display()))?;

        log::info!(
            "Track {}: frames {:?}, delay {}, padding {}",
            track.number,
            result.frames,
            result.encoder_delay,
            result.encoder_padding
        );
        println!(
            "{} {} ({} samples, {:.2}s)",
            "wrote".green().bold(),
            path.display(),
            track.end - track.start,
            (track.end - track.start) as f64 / f64::from(self.mp3.sampling_frequency())
        );
        Ok(path)
    }

    /// Title and performer for names and tags; placeholders only when tagging
    fn labels(&self, track: &Track) -> (String, String) {
        let title = match &track.title {
            Some(title) => title.clone(),
            None if self.tagging => format!("Track {}", naming::track_label(track.number)),
            None => String::new(),
        };
        let performer = match self.artist.or(track.performer.as_deref()) {
            Some(performer) => performer.to_string(),
            None if self.tagging => UNKNOWN_ARTIST.to_string(),
            None => String::new(),
        };
        (title, performer)
    }
}
