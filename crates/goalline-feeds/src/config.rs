//! Tunables for fetching, retention and the background scheduler.

use std::time::Duration;

use serde::Deserialize;

/// The `[feeds]` configuration section. Every field has a default, so an
/// empty section is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
  pub fetch_interval_secs:   u64,
  pub cleanup_interval_secs: u64,
  pub health_interval_secs:  u64,
  pub request_timeout_secs:  u64,
  /// Items published longer ago than this are archived.
  pub archive_after_days:    i64,
  /// Archived items published longer ago than this are deleted.
  pub delete_after_days:     i64,
  pub stale_after_hours:     i64,
  /// Wait between attempts of a failed scheduled job.
  pub retry_delay_secs:      u64,
  pub max_attempts:          u32,
  pub user_agent:            String,
}

impl Default for FeedsConfig {
  fn default() -> Self {
    Self {
      fetch_interval_secs:   30 * 60,
      cleanup_interval_secs: 24 * 60 * 60,
      health_interval_secs:  60 * 60,
      request_timeout_secs:  30,
      archive_after_days:    30,
      delete_after_days:     90,
      stale_after_hours:     6,
      retry_delay_secs:      5 * 60,
      max_attempts:          3,
      user_agent:            "GoalLineReport-RSS-Fetcher/1.0".to_owned(),
    }
  }
}

impl FeedsConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }

  pub fn stale_after(&self) -> chrono::Duration {
    chrono::Duration::hours(self.stale_after_hours)
  }

  pub fn retry_delay(&self) -> Duration { Duration::from_secs(self.retry_delay_secs) }
}
