//! Configuration for the `yuletide` binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use yuletide_api::ApiConfig;
use yuletide_core::ranking::Target;

/// Which site to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
  /// The snowball wall.
  Wall,
  /// The New Year bell.
  Bell,
}

/// Runtime server configuration, deserialised from `config.toml` and
/// `YULETIDE_*` environment variables. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub app:              AppKind,
  pub store_path:       PathBuf,
  pub session_ttl_days: i64,
  pub secure_cookies:   bool,
  pub target:           Target,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "127.0.0.1".to_string(),
      port:             8000,
      app:              AppKind::Bell,
      store_path:       PathBuf::from("yuletide.db"),
      session_ttl_days: 14,
      secure_cookies:   false,
      target:           Target::default(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// Fails when `session_ttl_days` does not fit a [`chrono::TimeDelta`].
  pub fn api_config(&self) -> anyhow::Result<ApiConfig> {
    let days = self.session_ttl_days.max(1);
    let session_ttl = chrono::TimeDelta::try_days(days)
      .with_context(|| format!("session_ttl_days = {days} is out of range"))?;
    Ok(ApiConfig { target: self.target, session_ttl, secure_cookies: self.secure_cookies })
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
