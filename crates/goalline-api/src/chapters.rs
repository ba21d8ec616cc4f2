//! Handlers for `/stories/{slug}/chapters`.
//!
//! Chapters can be changed only while their story is a draft.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/stories/{slug}/chapters` | Ordered by position |
//! | `POST`   | `/stories/{slug}/chapters` | Body: [`ChapterInput`]; appended unless `order` is given |
//! | `PUT`    | `/stories/{slug}/chapters/order` | Body: [`ReorderBody`] |
//! | `PUT`    | `/stories/{slug}/chapters/{chapter_id}` | Body: [`ChapterInput`] |
//! | `DELETE` | `/stories/{slug}/chapters/{chapter_id}` | Remaining chapters close the gap |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use goalline_core::{store::NewsStore, story::Chapter};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Success,
  auth::{CurrentActor, MaybeActor},
  error::Result,
  newsroom::ChapterInput,
  success,
};

#[derive(Debug, Deserialize)]
pub struct ReorderBody {
  /// Every chapter of the story, in the new order.
  pub chapter_ids: Vec<Uuid>,
}

/// `GET /stories/{slug}/chapters`
pub async fn list<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: MaybeActor,
  Path(slug): Path<String>,
) -> Result<Json<Success<Vec<Chapter>>>> {
  let chapters = state
    .newsroom
    .chapters(viewer.actor().as_ref(), &slug)
    .await?;
  Ok(success(chapters))
}

/// `POST /stories/{slug}/chapters` — returns 201 + the chapter.
pub async fn create<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
  Json(body): Json<ChapterInput>,
) -> Result<impl IntoResponse> {
  let chapter = state
    .newsroom
    .add_chapter(&current.actor(), &slug, body)
    .await?;
  Ok((StatusCode::CREATED, success(chapter)))
}

/// `PUT /stories/{slug}/chapters/{chapter_id}`
pub async fn update<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path((slug, chapter_id)): Path<(String, Uuid)>,
  Json(body): Json<ChapterInput>,
) -> Result<Json<Success<Chapter>>> {
  let chapter = state
    .newsroom
    .update_chapter(&current.actor(), &slug, chapter_id, body)
    .await?;
  Ok(success(chapter))
}

/// `DELETE /stories/{slug}/chapters/{chapter_id}`
pub async fn delete<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path((slug, chapter_id)): Path<(String, Uuid)>,
) -> Result<Json<Success<String>>> {
  state
    .newsroom
    .delete_chapter(&current.actor(), &slug, chapter_id)
    .await?;
  Ok(success(format!("chapter {chapter_id} deleted")))
}

/// `PUT /stories/{slug}/chapters/order`
pub async fn reorder<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
  Json(body): Json<ReorderBody>,
) -> Result<Json<Success<Vec<Chapter>>>> {
  let chapters = state
    .newsroom
    .reorder_chapters(&current.actor(), &slug, body.chapter_ids)
    .await?;
  Ok(success(chapters))
}
