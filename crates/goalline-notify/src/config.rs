//! The `[mail]` configuration section.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
  Smtp,
  /// Write each message to the log instead of sending it.
  #[default]
  Log,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
  pub transport:        TransportKind,
  pub host:             String,
  pub port:             u16,
  pub username:         Option<String>,
  pub password:         Option<String>,
  /// Use implicit/STARTTLS relay settings. Disable only for local relays.
  pub tls:              bool,
  pub from:             String,
  pub max_attempts:     u32,
  pub retry_delay_secs: u64,
}

impl Default for MailConfig {
  fn default() -> Self {
    Self {
      transport:        TransportKind::Log,
      host:             "localhost".to_owned(),
      port:             587,
      username:         None,
      password:         None,
      tls:              true,
      from:             "Goal Line Report <noreply@goallinereport.local>".to_owned(),
      max_attempts:     3,
      retry_delay_secs: 60,
    }
  }
}

impl MailConfig {
  pub fn retry_delay(&self) -> Duration { Duration::from_secs(self.retry_delay_secs) }
}
