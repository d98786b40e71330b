//! Application configuration: defaults, then the config file, then
//! `SAMAR_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use samar_session::SessionConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// SQLite file holding accounts, profiles, conversations and blobs.
  pub store_path:     PathBuf,
  /// Presence heartbeat period while signed in.
  pub heartbeat_secs: u64,
  pub session:        SessionConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path:     PathBuf::from("samar.db"),
      heartbeat_secs: 60,
      session:        SessionConfig::default(),
    }
  }
}

impl AppConfig {
  /// Nested keys use `__` in the environment, e.g.
  /// `SAMAR_SESSION__MIN_PASSWORD_LEN=8`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SAMAR")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config from {}", path.display()))?;

    let mut config: Self = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    config.store_path = expand_tilde(&config.store_path);
    Ok(config)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
