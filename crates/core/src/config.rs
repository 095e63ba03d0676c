//! Configuration with file overrides.
//!
//! Defaults are built in; a TOML file (`~/.config/tubescan/config.toml` or an
//! explicit path) may override any field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_TOP: usize = 50;
pub const DEFAULT_CACHE_HOURS: u32 = 24;
pub const DEFAULT_PADDING: usize = 23;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Root directory for the video/playlist/channel stores.
  pub cache_dir: PathBuf,
  /// How many videos from the head of a playlist-like scope to search.
  pub top: usize,
  /// Snapshot freshness window in hours before a playlist is re-enumerated.
  pub cache_hours: u32,
  /// Characters of context around each match in descriptions and captions.
  pub padding: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      cache_dir: default_cache_dir(),
      top: DEFAULT_TOP,
      cache_hours: DEFAULT_CACHE_HOURS,
      padding: DEFAULT_PADDING,
    }
  }
}

impl Config {
  /// Load from an explicit file, or fall back to the user config file, or
  /// defaults when neither exists.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => {
        let p = default_config_path();
        if !p.exists() {
          return Ok(Self::default());
        }
        p
      }
    };

    let raw = std::fs::read_to_string(&path)?;
    toml::from_str(&raw).map_err(|e| Error::Input(format!("config {}: {e}", path.display())))
  }
}

pub fn default_cache_dir() -> PathBuf {
  dirs::data_local_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("tubescan")
}

pub fn default_config_path() -> PathBuf {
  dirs::config_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("tubescan")
    .join("config.toml")
}
