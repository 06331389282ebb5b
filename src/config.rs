//! `framecut.toml`
//!
//! ```toml
//! [output]
//! naming_scheme = "%n. %p - %t"
//! directory = "out"
//!
//! [crop]
//! decoder_warmup = false
//! info_tag = true
//!
//! [tags]
//! id3v1 = true
//! ```
//!
//! Every key is optional. Command-line flags win over the file.

use crate::crop::CropOptions;
use crate::tracks::naming::DEFAULT_SCHEME;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "framecut.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub crop: CropConfig,
    #[serde(default)]
    pub tags: TagsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_naming_scheme")]
    pub naming_scheme: String,
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CropConfig {
    #[serde(default)]
    pub decoder_warmup: bool,
    #[serde(default = "default_true")]
    pub info_tag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagsConfig {
    #[serde(default = "default_true")]
    pub id3v1: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            naming_scheme: default_naming_scheme(),
            directory: None,
        }
    }
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            decoder_warmup: false,
            info_tag: default_true(),
        }
    }
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            id3v1: default_true(),
        }
    }
}

impl CropConfig {
    pub fn options(&self) -> CropOptions {
        CropOptions {
            decoder_warmup: self.decoder_warmup,
            write_tag: self.info_tag,
        }
    }
}

fn default_naming_scheme() -> String {
    DEFAULT_SCHEME.into()
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Config::parse(&content, path)
}

/// `explicit` if given, else `framecut.toml` in `dir` if it exists
pub fn find_config(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = dir.join(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::parse("", Path::new("empty.toml")).expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.output.naming_scheme, "%n. %p - %t");
        assert!(config.crop.info_tag);
        assert!(!config.crop.decoder_warmup);
        assert!(config.tags.id3v1);
        assert_eq!(config.crop.options(), CropOptions::default());
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            "[output]\ndirectory = \"out\"\n[crop]\ndecoder_warmup = true\n",
            Path::new("partial.toml"),
        )
        .expect("parse");
        assert_eq!(config.output.directory, Some(PathBuf::from("out")));
        assert_eq!(config.output.naming_scheme, DEFAULT_SCHEME);
        assert!(config.crop.options().decoder_warmup);
        assert!(config.crop.options().write_tag);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::parse("[outptu]\nx = 1\n", Path::new("typo.toml")).unwrap_err();
        assert!(err.to_string().contains("typo.toml"));
    }

    #[test]
    fn test_load_and_find() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(find_config(None, dir.path()), None);

        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "[tags]\nid3v1 = false").expect("write");

        assert_eq!(find_config(None, dir.path()), Some(path.clone()));
        let config = load_config(&path).expect("load");
        assert!(!config.tags.id3v1);

        let missing = dir.path().join("missing.toml");
        assert_eq!(find_config(Some(missing.as_path()), dir.path()), Some(missing.clone()));
        assert!(matches!(load_config(&missing), Err(ConfigError::Read { .. })));
    }
}
