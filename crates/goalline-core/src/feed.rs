//! RSS sources, ingested items, fetch logs and the health signal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

// ─── Sources ─────────────────────────────────────────────────────────────────

/// The known publishers. Adding one means adding a variant with its name and
/// feed URL below.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
  BbcSport,
  EspnSoccer,
  SkySports,
  Guardian,
}

impl SourceKind {
  pub fn display_name(self) -> &'static str {
    match self {
      Self::BbcSport => "BBC Sport Football",
      Self::EspnSoccer => "ESPN Soccer",
      Self::SkySports => "Sky Sports Football",
      Self::Guardian => "Guardian Football",
    }
  }

  pub fn default_url(self) -> &'static str {
    match self {
      Self::BbcSport => "https://feeds.bbci.co.uk/sport/football/rss.xml",
      Self::EspnSoccer => "https://www.espn.com/espn/rss/soccer/news",
      Self::SkySports => "https://www.skysports.com/rss/0,20514,11661,00.xml",
      Self::Guardian => "https://www.theguardian.com/football/rss",
    }
  }
}

/// A configured external feed endpoint. At most one per [`SourceKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
  pub source_id:    Uuid,
  pub name:         String,
  pub kind:         SourceKind,
  pub feed_url:     String,
  pub active:       bool,
  pub last_fetched: Option<DateTime<Utc>>,
  pub created_at:   DateTime<Utc>,
}

impl FeedSource {
  /// Never fetched, or last fetched longer than `threshold` ago.
  pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
    self.last_fetched.is_none_or(|at| at < now - threshold)
  }
}

#[derive(Debug, Clone)]
pub struct NewFeedSource {
  pub name:     String,
  pub kind:     SourceKind,
  pub feed_url: String,
  pub active:   bool,
}

impl NewFeedSource {
  /// The built-in definition for `kind`.
  pub fn default_for(kind: SourceKind) -> Self {
    Self {
      name: kind.display_name().to_owned(),
      kind,
      feed_url: kind.default_url().to_owned(),
      active: true,
    }
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// One ingested article. `guid` is unique across every source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
  pub item_id:      Uuid,
  pub source_id:    Uuid,
  pub source_kind:  SourceKind,
  pub title:        String,
  pub description:  String,
  pub content:      String,
  pub link:         String,
  pub author:       String,
  pub category:     String,
  pub guid:         String,
  pub published_at: DateTime<Utc>,
  pub fetched_at:   DateTime<Utc>,
  pub read:         bool,
  pub archived:     bool,
}

/// Input to [`crate::store::FeedStore::insert_feed_item`]. Text fields are
/// expected to be normalised already.
#[derive(Debug, Clone)]
pub struct NewFeedItem {
  pub source_id:    Uuid,
  pub title:        String,
  pub description:  String,
  pub content:      String,
  pub link:         String,
  pub author:       String,
  pub category:     String,
  pub guid:         String,
  pub published_at: DateTime<Utc>,
}

/// Filters for [`crate::store::FeedStore::list_feed_items`]. Archived items
/// are always excluded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedItemQuery {
  pub source:      Option<SourceKind>,
  /// Case-insensitive substring of the category.
  pub category:    Option<String>,
  /// Case-insensitive substring of title or description.
  pub text:        Option<String>,
  #[serde(default)]
  pub unread_only: bool,
  pub limit:       Option<usize>,
  pub offset:      Option<usize>,
}

// ─── Fetch logs ──────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FetchStatus {
  Success,
  Partial,
  Error,
}

impl FetchStatus {
  /// `error` when the fetch itself failed; `partial` when some fetched
  /// entries were not stored as new; `success` otherwise.
  pub fn classify(fetched_ok: bool, items_fetched: u32, items_new: u32) -> Self {
    if !fetched_ok {
      Self::Error
    } else if items_new < items_fetched {
      Self::Partial
    } else {
      Self::Success
    }
  }
}

/// Immutable audit record of one fetch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLog {
  pub log_id:        Uuid,
  pub source_id:     Uuid,
  pub status:        FetchStatus,
  pub items_fetched: u32,
  pub items_new:     u32,
  pub error_message: Option<String>,
  pub duration_secs: f64,
  pub created_at:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFetchLog {
  pub source_id:     Uuid,
  pub status:        FetchStatus,
  pub items_fetched: u32,
  pub items_new:     u32,
  pub error_message: Option<String>,
  pub duration_secs: f64,
}

// ─── Retention, stats, health ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
  pub archived: u64,
  pub deleted:  u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceCounts {
  pub source_id: Uuid,
  pub items:     u64,
  pub unread:    u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedCounts {
  pub total_items:  u64,
  pub unread_items: u64,
  pub per_source:   Vec<SourceCounts>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
  Healthy,
  Warning,
  Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
  pub status:           HealthStatus,
  pub total_sources:    usize,
  pub stale_sources:    usize,
  pub recent_items_24h: u64,
  pub checked_at:       DateTime<Utc>,
}

impl HealthReport {
  /// `error` with no active sources, `warning` if any active source is
  /// stale, `healthy` otherwise.
  pub fn derive(
    active_sources: &[FeedSource],
    stale_after: Duration,
    recent_items_24h: u64,
    now: DateTime<Utc>,
  ) -> Self {
    let stale_sources = active_sources
      .iter()
      .filter(|s| s.is_stale(now, stale_after))
      .count();
    let status = if active_sources.is_empty() {
      HealthStatus::Error
    } else if stale_sources > 0 {
      HealthStatus::Warning
    } else {
      HealthStatus::Healthy
    };
    Self {
      status,
      total_sources: active_sources.len(),
      stale_sources,
      recent_items_24h,
      checked_at: now,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  fn source(last_fetched: Option<DateTime<Utc>>) -> FeedSource {
    FeedSource {
      source_id: Uuid::new_v4(),
      name: "BBC Sport Football".into(),
      kind: SourceKind::BbcSport,
      feed_url: SourceKind::BbcSport.default_url().into(),
      active: true,
      last_fetched,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn every_kind_has_a_url_and_parses_back() {
    for kind in SourceKind::iter() {
      assert!(kind.default_url().starts_with("https://"));
      assert_eq!(SourceKind::from_str(kind.as_ref()).unwrap(), kind);
    }
    assert_eq!(SourceKind::BbcSport.as_ref(), "bbc_sport");
  }

  #[test]
  fn fetch_status_classification() {
    assert_eq!(FetchStatus::classify(false, 0, 0), FetchStatus::Error);
    assert_eq!(FetchStatus::classify(true, 10, 7), FetchStatus::Partial);
    assert_eq!(FetchStatus::classify(true, 10, 10), FetchStatus::Success);
    assert_eq!(FetchStatus::classify(true, 0, 0), FetchStatus::Success);
  }

  #[test]
  fn health_is_error_without_sources() {
    let report = HealthReport::derive(&[], Duration::hours(6), 0, Utc::now());
    assert_eq!(report.status, HealthStatus::Error);
  }

  #[test]
  fn health_warns_on_stale_or_never_fetched_sources() {
    let now = Utc::now();
    let fresh = source(Some(now - Duration::hours(1)));
    let stale = source(Some(now - Duration::hours(7)));
    let never = source(None);

    let healthy = HealthReport::derive(&[fresh.clone()], Duration::hours(6), 4, now);
    assert_eq!(healthy.status, HealthStatus::Healthy);
    assert_eq!(healthy.recent_items_24h, 4);

    let warning =
      HealthReport::derive(&[fresh, stale, never], Duration::hours(6), 0, now);
    assert_eq!(warning.status, HealthStatus::Warning);
    assert_eq!(warning.stale_sources, 2);
    assert_eq!(warning.total_sources, 3);
  }
}
