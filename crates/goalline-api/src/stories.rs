//! Handlers for `/stories` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/stories` | Published only; `?q`, `?tag`, `?limit`, `?offset` |
//! | `POST`   | `/stories` | Body: [`StoryInput`]; editors; created as draft |
//! | `GET`    | `/stories/mine` | The caller's stories in any status |
//! | `GET`    | `/stories/review` | Review queue; chief editor |
//! | `GET`    | `/stories/{slug}` | Detail with chapters; records a view |
//! | `PUT`    | `/stories/{slug}` | Body: [`StoryInput`] |
//! | `DELETE` | `/stories/{slug}` | Hard delete |
//! | `POST`   | `/stories/{slug}/like` | Toggle |
//! | `POST`   | `/stories/{slug}/submit` | `draft → review` |
//! | `POST`   | `/stories/{slug}/review` | Body: [`ReviewBody`] |
//! | `POST`   | `/stories/{slug}/cancel` | Body: [`NotesBody`] (optional) |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use goalline_core::{
  store::NewsStore,
  story::{LikeToggle, Story, StoryQuery},
  workflow::TransitionRequest,
};
use serde::Deserialize;

use crate::{
  AppState, Success,
  auth::{CurrentActor, MaybeActor},
  error::Result,
  newsroom::{StoryDetail, StoryInput},
  success,
};

// ─── Listing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Matches title, summary or author username.
  pub q:      Option<String>,
  /// Tag slug.
  pub tag:    Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /stories`
pub async fn list<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Success<Vec<Story>>>> {
  let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
  let stories = state
    .newsroom
    .published_stories(StoryQuery {
      text: non_empty(params.q),
      tag: non_empty(params.tag).filter(|t| !t.eq_ignore_ascii_case("all")),
      limit: params.limit,
      offset: params.offset,
      ..StoryQuery::default()
    })
    .await?;
  Ok(success(stories))
}

/// `GET /stories/mine`
pub async fn mine<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
) -> Result<Json<Success<Vec<Story>>>> {
  Ok(success(state.newsroom.my_stories(&current.actor()).await?))
}

/// `GET /stories/review`
pub async fn review_queue<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
) -> Result<Json<Success<Vec<Story>>>> {
  Ok(success(state.newsroom.review_queue(&current.actor()).await?))
}

// ─── CRUD ────────────────────────────────────────────────────────────────────

/// `POST /stories` — returns 201 + the draft.
pub async fn create<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Json(body): Json<StoryInput>,
) -> Result<impl IntoResponse> {
  let story = state.newsroom.create_story(&current.actor(), body).await?;
  Ok((StatusCode::CREATED, success(story)))
}

/// The first `X-Forwarded-For` hop, else `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
  let forwarded = headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next());
  let real = || headers.get("x-real-ip").and_then(|v| v.to_str().ok());
  forwarded
    .or_else(real)
    .map(str::trim)
    .filter(|ip| !ip.is_empty())
    .map(str::to_owned)
}

/// `GET /stories/{slug}`
pub async fn detail<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: MaybeActor,
  Path(slug): Path<String>,
  headers: HeaderMap,
) -> Result<Json<Success<StoryDetail>>> {
  let detail = state
    .newsroom
    .story_detail(viewer.actor().as_ref(), &slug, client_ip(&headers))
    .await?;
  Ok(success(detail))
}

/// `PUT /stories/{slug}`
pub async fn update<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
  Json(body): Json<StoryInput>,
) -> Result<Json<Success<Story>>> {
  let story = state
    .newsroom
    .update_story(&current.actor(), &slug, body)
    .await?;
  Ok(success(story))
}

/// `DELETE /stories/{slug}`
pub async fn delete<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
) -> Result<Json<Success<String>>> {
  state.newsroom.delete_story(&current.actor(), &slug).await?;
  Ok(success(format!("story {slug} deleted")))
}

/// `POST /stories/{slug}/like`
pub async fn like<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
) -> Result<Json<Success<LikeToggle>>> {
  let toggle = state
    .newsroom
    .toggle_story_like(&current.actor(), &slug)
    .await?;
  Ok(success(toggle))
}

// ─── Workflow ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
  Approve,
  Reject,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub action: ReviewAction,
  #[serde(default, alias = "review_notes")]
  pub notes:  Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotesBody {
  #[serde(default)]
  pub notes: Option<String>,
}

/// `POST /stories/{slug}/submit`
pub async fn submit<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
) -> Result<Json<Success<Story>>> {
  let story = state
    .newsroom
    .transition(&current.actor(), &slug, TransitionRequest::SubmitForReview)
    .await?;
  Ok(success(story))
}

/// `POST /stories/{slug}/review` — approve publishes, reject rejects.
pub async fn review<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Success<Story>>> {
  let request = match body.action {
    ReviewAction::Approve => TransitionRequest::Publish { notes: body.notes },
    ReviewAction::Reject => TransitionRequest::Reject { notes: body.notes },
  };
  let story = state
    .newsroom
    .transition(&current.actor(), &slug, request)
    .await?;
  Ok(success(story))
}

/// `POST /stories/{slug}/cancel` — the body may be omitted.
pub async fn cancel<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
  body: Option<Json<NotesBody>>,
) -> Result<Json<Success<Story>>> {
  let notes = body.and_then(|Json(b)| b.notes);
  let story = state
    .newsroom
    .transition(&current.actor(), &slug, TransitionRequest::Cancel { notes })
    .await?;
  Ok(success(story))
}
