//! Handlers for `/feeds` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/feeds/items` | `?source`, `?category`, `?text`, `?unread_only`, `?limit`, `?offset` |
//! | `GET`  | `/feeds/items/{item_id}` | Marks the item read; includes related items |
//! | `POST` | `/feeds/items/{item_id}/read` | |
//! | `POST` | `/feeds/items/{item_id}/archive` | |
//! | `GET`  | `/feeds/sources` | |
//! | `POST` | `/feeds/sources/{kind}/toggle` | Chief editor |
//! | `POST` | `/feeds/fetch` | Chief editor; body or query `source` limits to one |
//! | `GET`  | `/feeds/stats` | Counts, sources, last 10 fetch logs |
//! | `GET`  | `/feeds/health` | |

use std::str::FromStr;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use goalline_core::{
  account::Capability,
  feed::{FeedItem, FeedItemQuery, FeedSource, HealthReport, SourceKind},
  store::{FeedStore, NewsStore},
};
use goalline_feeds::{FeedStats, FetchOutcome, FetchSummary};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  AppState, Success,
  auth::CurrentActor,
  error::{ApiError, Result},
  success,
};

const DEFAULT_PAGE_SIZE: usize = 50;
const RELATED_ITEMS: usize = 5;
const STATS_LOG_LIMIT: usize = 10;

fn require_manage_feeds(current: &CurrentActor) -> Result<()> {
  if current.actor().can(Capability::ManageFeeds) {
    Ok(())
  } else {
    Err(ApiError::Forbidden("only a chief editor may manage feeds".into()))
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// `GET /feeds/items`
pub async fn list_items<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  Query(mut query): Query<FeedItemQuery>,
) -> Result<Json<Success<Vec<FeedItem>>>> {
  query.limit = Some(query.limit.unwrap_or(DEFAULT_PAGE_SIZE));
  let items = state
    .feeds
    .store()
    .list_feed_items(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(success(items))
}

#[derive(Debug, Serialize)]
pub struct ItemDetail {
  pub item:    FeedItem,
  /// Newest items from the same source, excluding this one.
  pub related: Vec<FeedItem>,
}

async fn load_item<S: FeedStore>(store: &S, item_id: Uuid) -> Result<FeedItem> {
  store
    .get_feed_item(item_id)
    .await
    .map_err(ApiError::store)?
    .filter(|item| !item.archived)
    .ok_or_else(|| ApiError::NotFound(format!("feed item {item_id}")))
}

/// `GET /feeds/items/{item_id}`
pub async fn item_detail<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  Path(item_id): Path<Uuid>,
) -> Result<Json<Success<ItemDetail>>> {
  let store = state.feeds.store();
  let mut item = load_item(store.as_ref(), item_id).await?;
  if !item.read {
    store
      .mark_feed_item_read(item_id)
      .await
      .map_err(ApiError::store)?;
    item.read = true;
  }

  let related = store
    .list_feed_items(&FeedItemQuery {
      source: Some(item.source_kind),
      limit: Some(RELATED_ITEMS + 1),
      ..FeedItemQuery::default()
    })
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .filter(|other| other.item_id != item.item_id)
    .take(RELATED_ITEMS)
    .collect();
  Ok(success(ItemDetail { item, related }))
}

/// `POST /feeds/items/{item_id}/read`
pub async fn mark_read<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  _current: CurrentActor,
  Path(item_id): Path<Uuid>,
) -> Result<Json<Success<String>>> {
  let found = state
    .feeds
    .store()
    .mark_feed_item_read(item_id)
    .await
    .map_err(ApiError::store)?;
  if !found {
    return Err(ApiError::NotFound(format!("feed item {item_id}")));
  }
  Ok(success(format!("feed item {item_id} marked read")))
}

/// `POST /feeds/items/{item_id}/archive`
pub async fn archive<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  _current: CurrentActor,
  Path(item_id): Path<Uuid>,
) -> Result<Json<Success<String>>> {
  let found = state
    .feeds
    .store()
    .archive_feed_item(item_id)
    .await
    .map_err(ApiError::store)?;
  if !found {
    return Err(ApiError::NotFound(format!("feed item {item_id}")));
  }
  Ok(success(format!("feed item {item_id} archived")))
}

// ─── Sources ─────────────────────────────────────────────────────────────────

/// `GET /feeds/sources`
pub async fn list_sources<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Json<Success<Vec<FeedSource>>>> {
  let sources = state
    .feeds
    .store()
    .list_sources(false)
    .await
    .map_err(ApiError::store)?;
  Ok(success(sources))
}

/// `POST /feeds/sources/{kind}/toggle`
pub async fn toggle_source<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(kind): Path<String>,
) -> Result<Json<Success<FeedSource>>> {
  require_manage_feeds(&current)?;
  let kind = SourceKind::from_str(&kind)
    .map_err(|_| ApiError::NotFound(format!("feed source {kind:?}")))?;
  let store = state.feeds.store();
  let source = store
    .get_source(kind)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("feed source {kind} is not configured")))?;
  let toggled = store
    .set_source_active(kind, !source.active)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("feed source {kind} is not configured")))?;
  info!(
    %kind,
    active = toggled.active,
    by = %current.0.account.username,
    "feed source toggled"
  );
  Ok(success(toggled))
}

// ─── Fetching ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct FetchParams {
  pub source: Option<SourceKind>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FetchResponse {
  Source(FetchOutcome),
  All(FetchSummary),
}

/// `POST /feeds/fetch`
///
/// Runs inline and answers when the fetch is done. A fetch of a source that
/// is already being fetched is a 409.
pub async fn fetch<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Query(params): Query<FetchParams>,
  body: Option<Json<FetchParams>>,
) -> Result<Json<Success<FetchResponse>>> {
  require_manage_feeds(&current)?;
  let source = body.and_then(|Json(b)| b.source).or(params.source);
  let response = match source {
    Some(kind) => {
      let outcome = state.feeds.fetch_kind(kind).await?.ok_or_else(|| {
        ApiError::Conflict(format!("feed source {kind} is already being fetched"))
      })?;
      FetchResponse::Source(outcome)
    }
    None => FetchResponse::All(state.feeds.fetch_all_active().await?),
  };
  Ok(success(response))
}

/// `GET /feeds/stats`
pub async fn stats<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Json<Success<FeedStats>>> {
  Ok(success(state.feeds.stats(STATS_LOG_LIMIT).await?))
}

/// `GET /feeds/health`
pub async fn health<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Json<Success<HealthReport>>> {
  Ok(success(state.feeds.health().await?))
}
