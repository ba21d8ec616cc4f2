//! Download, parse and store one source at a time.

use std::{sync::Arc, time::Instant};

use chrono::{Duration, Utc};
use goalline_core::{
  feed::{
    FeedSource, FetchStatus, NewFeedSource, NewFetchLog, RetentionReport,
    SourceKind,
  },
  store::FeedStore,
};
use reqwest::Client;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};

use crate::{
  config::FeedsConfig,
  error::{Error, Result},
  lock::FetchLocks,
  parse::parse_document,
};

/// What one fetch attempt did. Mirrors the fetch log written for it.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
  pub source:        SourceKind,
  pub status:        FetchStatus,
  pub items_fetched: u32,
  pub items_new:     u32,
  pub duration_secs: f64,
  pub error:         Option<String>,
}

/// Aggregate over every active source. Item totals only include sources
/// that were fetched successfully.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchSummary {
  pub sources_processed:  usize,
  pub sources_successful: usize,
  pub sources_skipped:    usize,
  pub items_fetched:      u32,
  pub items_new:          u32,
  pub results:            Vec<FetchOutcome>,
}

impl FetchSummary {
  fn record(&mut self, outcome: FetchOutcome) {
    self.sources_processed += 1;
    if outcome.status != FetchStatus::Error {
      self.sources_successful += 1;
      self.items_fetched += outcome.items_fetched;
      self.items_new += outcome.items_new;
    }
    self.results.push(outcome);
  }
}

/// The ingestion pipeline, generic over its store.
pub struct FeedFetcher<S> {
  store:  Arc<S>,
  client: Client,
  config: FeedsConfig,
  locks:  FetchLocks,
}

impl<S: FeedStore> FeedFetcher<S> {
  pub fn new(store: Arc<S>, config: FeedsConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.request_timeout())
      .user_agent(config.user_agent.clone())
      .build()?;
    Ok(Self {
      store,
      client,
      config,
      locks: FetchLocks::default(),
    })
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &FeedsConfig { &self.config }

  // ─── Sources ─────────────────────────────────────────────────────────────

  /// Get-or-create every known source. With `force`, existing sources (and
  /// their items and logs) are removed first.
  pub async fn init_sources(&self, force: bool) -> Result<Vec<FeedSource>> {
    if force {
      let removed = self
        .store
        .delete_all_sources()
        .await
        .map_err(Error::store)?;
      info!(removed, "cleared feed sources");
    }

    let mut sources = Vec::new();
    for kind in SourceKind::iter() {
      let source = self
        .store
        .ensure_source(NewFeedSource::default_for(kind))
        .await
        .map_err(Error::store)?;
      sources.push(source);
    }
    info!(count = sources.len(), "feed sources ready");
    Ok(sources)
  }

  // ─── Fetching ────────────────────────────────────────────────────────────

  /// Fetch one source by kind. Unknown and inactive sources are errors;
  /// `Ok(None)` means a fetch of the same source was already running.
  pub async fn fetch_kind(&self, kind: SourceKind) -> Result<Option<FetchOutcome>> {
    let source = self
      .store
      .get_source(kind)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UnknownSource(kind))?;
    if !source.active {
      return Err(Error::InactiveSource(kind));
    }
    self.fetch_source(&source).await
  }

  /// Fetch every active source in turn. A failing source is recorded in the
  /// summary and the run moves on.
  pub async fn fetch_all_active(&self) -> Result<FetchSummary> {
    let sources = self.store.list_sources(true).await.map_err(Error::store)?;
    let mut summary = FetchSummary::default();

    for source in &sources {
      match self.fetch_source(source).await {
        Ok(Some(outcome)) => summary.record(outcome),
        Ok(None) => summary.sources_skipped += 1,
        Err(err) => {
          warn!(source = %source.kind, error = %err, "could not record fetch");
          summary.record(FetchOutcome {
            source:        source.kind,
            status:        FetchStatus::Error,
            items_fetched: 0,
            items_new:     0,
            duration_secs: 0.0,
            error:         Some(err.to_string()),
          });
        }
      }
    }

    info!(
      processed = summary.sources_processed,
      successful = summary.sources_successful,
      skipped = summary.sources_skipped,
      new = summary.items_new,
      "fetched active sources"
    );
    Ok(summary)
  }

  /// Fetch `source` and write its fetch log. Network, HTTP and parse
  /// failures end up in the returned outcome with status `error`; only a
  /// failure to write the log itself is returned as `Err`.
  #[instrument(skip_all, fields(source = %source.kind))]
  pub async fn fetch_source(&self, source: &FeedSource) -> Result<Option<FetchOutcome>> {
    let Some(_guard) = self.locks.try_acquire(source.kind) else {
      info!("fetch already in progress, skipping");
      return Ok(None);
    };

    let started = Instant::now();
    let result = self.ingest(source).await;
    let duration_secs = started.elapsed().as_secs_f64();

    let (items_fetched, items_new, error) = match result {
      Ok((fetched, new)) => {
        info!(fetched, new, "feed fetched");
        (fetched, new, None)
      }
      Err(err) => {
        warn!(error = %err, "feed fetch failed");
        (0, 0, Some(err.to_string()))
      }
    };
    let status = FetchStatus::classify(error.is_none(), items_fetched, items_new);

    self
      .store
      .record_fetch_log(NewFetchLog {
        source_id: source.source_id,
        status,
        items_fetched,
        items_new,
        error_message: error.clone(),
        duration_secs,
      })
      .await
      .map_err(Error::store)?;

    Ok(Some(FetchOutcome {
      source: source.kind,
      status,
      items_fetched,
      items_new,
      duration_secs,
      error,
    }))
  }

  /// Returns `(entries seen, entries newly stored)`.
  async fn ingest(&self, source: &FeedSource) -> Result<(u32, u32)> {
    let response = self.client.get(&source.feed_url).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(Error::Status(status));
    }
    let body = response.bytes().await?;
    let entries = parse_document(&body)?;

    let now = Utc::now();
    let mut fetched = 0u32;
    let mut new = 0u32;
    for entry in entries {
      fetched += 1;
      let title = entry.title.clone();
      let Some(item) = entry.into_new_item(source.source_id, now) else {
        warn!(%title, "entry has no id, guid or link; skipped");
        continue;
      };
      let guid = item.guid.clone();
      match self.store.insert_feed_item(item).await {
        Ok(true) => new += 1,
        Ok(false) => debug!(%guid, "already stored"),
        Err(err) => warn!(%guid, error = %err, "failed to store feed item"),
      }
    }

    self
      .store
      .touch_source(source.source_id, Utc::now())
      .await
      .map_err(Error::store)?;
    Ok((fetched, new))
  }

  // ─── Retention ───────────────────────────────────────────────────────────

  /// Apply the configured retention windows.
  pub async fn cleanup(&self) -> Result<RetentionReport> {
    self
      .cleanup_with(self.config.archive_after_days, self.config.delete_after_days)
      .await
  }

  /// Archive items published more than `archive_after_days` ago, then delete
  /// archived items published more than `delete_after_days` ago.
  pub async fn cleanup_with(
    &self,
    archive_after_days: i64,
    delete_after_days: i64,
  ) -> Result<RetentionReport> {
    let now = Utc::now();
    let archived = self
      .store
      .archive_items_before(now - Duration::days(archive_after_days))
      .await
      .map_err(Error::store)?;
    let deleted = self
      .store
      .delete_archived_before(now - Duration::days(delete_after_days))
      .await
      .map_err(Error::store)?;
    info!(archived, deleted, "feed retention applied");
    Ok(RetentionReport { archived, deleted })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn outcome(status: FetchStatus, fetched: u32, new: u32) -> FetchOutcome {
    FetchOutcome {
      source: SourceKind::Guardian,
      status,
      items_fetched: fetched,
      items_new: new,
      duration_secs: 0.1,
      error: None,
    }
  }

  #[test]
  fn summary_totals_skip_failed_sources() {
    let mut summary = FetchSummary::default();
    summary.record(outcome(FetchStatus::Success, 4, 4));
    summary.record(outcome(FetchStatus::Partial, 10, 7));
    summary.record(outcome(FetchStatus::Error, 0, 0));

    assert_eq!(summary.sources_processed, 3);
    assert_eq!(summary.sources_successful, 2);
    assert_eq!(summary.items_fetched, 14);
    assert_eq!(summary.items_new, 11);
    assert_eq!(summary.results.len(), 3);
  }
}
