//! Server configuration.
//!
//! Read from a TOML file, then overridden by `GOALLINE__*` environment
//! variables (`__` separates nesting, so `GOALLINE__FEEDS__FETCH_INTERVAL_SECS`
//! sets `feeds.fetch_interval_secs`). Every field has a default; a missing
//! file is not an error.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use goalline_api::NewsroomConfig;
use goalline_core::workflow::UnauthorizedTransitionPolicy;
use goalline_feeds::FeedsConfig;
use goalline_notify::MailConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
  /// `reject` or `downgrade`.
  pub unauthorized_transitions: UnauthorizedTransitionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// Public base URL, used for links in notification emails.
  pub site_url:   String,
  pub store_path: PathBuf,
  pub feeds:      FeedsConfig,
  pub mail:       MailConfig,
  pub workflow:   WorkflowConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8000,
      site_url:   "http://localhost:8000".to_owned(),
      store_path: PathBuf::from("~/.local/share/goalline/goalline.db"),
      feeds:      FeedsConfig::default(),
      mail:       MailConfig::default(),
      workflow:   WorkflowConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Layer `path` (optional) under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("GOALLINE")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;
    Self::from_settings(settings)
  }

  fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn newsroom(&self) -> NewsroomConfig {
    NewsroomConfig {
      site_url:          self.site_url.clone(),
      transition_policy: self.workflow.unauthorized_transitions,
    }
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

#[cfg(test)]
mod tests {
  use config::{File, FileFormat};
  use goalline_notify::TransportKind;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    let settings = config::Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap();
    ServerConfig::from_settings(settings).unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = parse("");
    assert_eq!(cfg.address(), "127.0.0.1:8000");
    assert_eq!(cfg.feeds.fetch_interval_secs, 30 * 60);
    assert_eq!(cfg.mail.transport, TransportKind::Log);
    assert_eq!(
      cfg.workflow.unauthorized_transitions,
      UnauthorizedTransitionPolicy::Reject
    );
  }

  #[test]
  fn sections_override_single_fields() {
    let cfg = parse(
      r#"
        port = 9000
        store_path = "/var/lib/goalline.db"

        [feeds]
        fetch_interval_secs = 60

        [mail]
        transport = "smtp"
        host = "smtp.example.com"

        [workflow]
        unauthorized_transitions = "downgrade"
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/goalline.db"));
    assert_eq!(cfg.feeds.fetch_interval_secs, 60);
    assert_eq!(cfg.feeds.archive_after_days, 30);
    assert_eq!(cfg.mail.transport, TransportKind::Smtp);
    assert_eq!(cfg.mail.port, 587);
    assert_eq!(cfg.newsroom().transition_policy, UnauthorizedTransitionPolicy::Downgrade);
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    let cfg = parse(r#"store_path = "~/news.db""#);
    assert_eq!(cfg.store_path, PathBuf::from(home).join("news.db"));
  }
}
