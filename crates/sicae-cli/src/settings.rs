//! Layered configuration: built-in defaults, an optional TOML file, then
//! `SICAE_`-prefixed environment variables. Command-line flags are applied on
//! top by the caller.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// Root URL of the access-control API.
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  /// Where the session blob lives.
  #[serde(default = "default_state_dir")]
  pub state_dir:    PathBuf,
  /// Access point this machine validates for.
  #[serde(default)]
  pub access_point: Option<Uuid>,
  /// Address reported to the server as the reader's source.
  #[serde(default)]
  pub reader_ip:    Option<String>,
  /// Directory of `.pgm` frames replayed in place of a camera.
  #[serde(default)]
  pub frames_dir:   Option<PathBuf>,
  #[serde(default = "default_fps")]
  pub fps:          u32,
  /// V4L2 camera used when no frames directory is set.
  #[serde(default = "default_device")]
  pub device:       PathBuf,
}

fn default_base_url() -> String { "http://localhost:8080/api".to_string() }

fn default_state_dir() -> PathBuf { PathBuf::from("~/.local/state/sicae") }

fn default_fps() -> u32 { 10 }

fn default_device() -> PathBuf { PathBuf::from("/dev/video0") }

impl Settings {
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(config::Environment::with_prefix("SICAE"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Settings =
      settings.try_deserialize().context("failed to deserialise settings")?;
    settings.state_dir = expand_tilde(&settings.state_dir);
    settings.frames_dir = settings.frames_dir.as_deref().map(expand_tilde);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
