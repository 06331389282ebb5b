use clap::{ArgAction, Parser};
use framecut::config::Config;
use framecut::CropOptions;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "framecut", version, about = "Sample-accurate, lossless MP3 cutting")]
pub struct Cli {
    /// Source MP3 (may be omitted with --cue when the sheet names its file)
    pub input: Option<PathBuf>,

    /// Split along the tracks of a CUE sheet
    #[arg(long, conflicts_with = "crop")]
    pub cue: Option<PathBuf>,

    /// Cut tracks by hand: t:s-e[,t:s-e...] with samples or [XXm]YY[.ZZ]s
    #[arg(long)]
    pub crop: Option<String>,

    /// Output file naming scheme (%s source, %n number, %t title, %p performer, %a album)
    #[arg(long = "out")]
    pub naming_scheme: Option<String>,

    /// Directory to write tracks into
    #[arg(long = "dir")]
    pub directory: Option<PathBuf>,

    /// Album title for tags and %a
    #[arg(long)]
    pub album: Option<String>,

    /// Performer for every track, overriding the CUE sheet
    #[arg(long)]
    pub artist: Option<String>,

    /// Keep extra frames so decoders start and stop cleanly
    #[arg(long)]
    pub warmup: bool,

    /// Don't write a Xing/LAME frame (delay and padding are lost)
    #[arg(long)]
    pub no_tag: bool,

    /// Don't append ID3v1 tags
    #[arg(long)]
    pub no_id3: bool,

    /// Write a scan report: .json summary, anything else a CSV frame index
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Save bytes that aren't audio frames (ID3v2, garbage) to this file
    #[arg(long)]
    pub junk: Option<PathBuf>,

    /// Path to config file (default: ./framecut.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// More output: -v info, -vv debug
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Command line merged over the config file
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub naming_scheme: String,
    pub directory: PathBuf,
    pub crop: CropOptions,
    pub id3v1: bool,
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    pub fn settings(&self, config: Config) -> Settings {
        let mut crop = config.crop.options();
        crop.decoder_warmup |= self.warmup;
        crop.write_tag &= !self.no_tag;

        Settings {
            naming_scheme: self
                .naming_scheme
                .clone()
                .unwrap_or(config.output.naming_scheme),
            directory: self
                .directory
                .clone()
                .or(config.output.directory)
                .unwrap_or_else(|| PathBuf::from(".")),
            crop,
            id3v1: config.tags.id3v1 && !self.no_id3,
        }
    }
}
