//! Health signal and ingestion statistics.

use chrono::{Duration, Utc};
use goalline_core::{
  feed::{FeedCounts, FeedSource, FetchLog, HealthReport, HealthStatus},
  store::FeedStore,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
  error::{Error, Result},
  fetcher::FeedFetcher,
};

/// Counts, sources and the most recent fetch logs in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct FeedStats {
  pub counts:      FeedCounts,
  pub sources:     Vec<FeedSource>,
  pub recent_logs: Vec<FetchLog>,
}

/// Derive the health report from the active sources and the items fetched
/// in the last 24 hours.
pub async fn health_check<S: FeedStore>(
  store: &S,
  stale_after: Duration,
) -> Result<HealthReport> {
  let now = Utc::now();
  let active = store.list_sources(true).await.map_err(Error::store)?;
  let recent = store
    .count_items_fetched_since(now - Duration::hours(24))
    .await
    .map_err(Error::store)?;
  Ok(HealthReport::derive(&active, stale_after, recent, now))
}

pub async fn stats<S: FeedStore>(store: &S, log_limit: usize) -> Result<FeedStats> {
  Ok(FeedStats {
    counts:      store.feed_counts().await.map_err(Error::store)?,
    sources:     store.list_sources(false).await.map_err(Error::store)?,
    recent_logs: store
      .recent_fetch_logs(log_limit)
      .await
      .map_err(Error::store)?,
  })
}

impl<S: FeedStore> FeedFetcher<S> {
  /// [`health_check`] with the configured stale threshold. The result is
  /// logged at a level matching its status.
  pub async fn health(&self) -> Result<HealthReport> {
    let report = health_check(self.store().as_ref(), self.config().stale_after()).await?;
    match report.status {
      HealthStatus::Healthy => info!(
        sources = report.total_sources,
        recent = report.recent_items_24h,
        "feeds healthy"
      ),
      _ => warn!(
        status = %report.status,
        sources = report.total_sources,
        stale = report.stale_sources,
        recent = report.recent_items_24h,
        "feeds need attention"
      ),
    }
    Ok(report)
  }

  pub async fn stats(&self, log_limit: usize) -> Result<FeedStats> {
    stats(self.store().as_ref(), log_limit).await
  }
}
