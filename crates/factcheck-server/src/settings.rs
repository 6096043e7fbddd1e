//! Server configuration: a TOML file overlaid with `FACTCHECK_*` environment
//! variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                     String,
  #[serde(default = "default_port")]
  pub port:                     u16,
  pub store_path:               PathBuf,
  /// Base URL of the admin UI, used in chat alert links.
  #[serde(default = "default_admin_base_url")]
  pub admin_base_url:           String,
  /// Incoming-webhook URL for proofreading alerts. Alerts are dropped when
  /// unset.
  #[serde(default)]
  pub proofreading_webhook_url: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_admin_base_url() -> String { "http://localhost:8080".to_owned() }

impl ServerConfig {
  /// Read `path` (if present) and the environment.
  pub fn load(path: PathBuf) -> anyhow::Result<Self> {
    Self::from_source(config::File::from(path).required(false))
  }

  fn from_source<T>(file: T) -> anyhow::Result<Self>
  where
    T: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(config::Environment::with_prefix("FACTCHECK"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  /// [`Self::store_path`] with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
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
