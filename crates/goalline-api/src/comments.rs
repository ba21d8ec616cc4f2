//! Handlers for story comments.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/stories/{slug}/comments` | Threaded, oldest first |
//! | `POST`   | `/stories/{slug}/comments` | Body: [`CommentInput`] |
//! | `PUT`    | `/comments/{comment_id}` | Body: [`EditBody`]; author only |
//! | `DELETE` | `/comments/{comment_id}` | Soft delete; author or chief editor |
//! | `POST`   | `/comments/{comment_id}/like` | Toggle |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use goalline_core::{
  comment::{Comment, CommentNode},
  store::NewsStore,
  story::LikeToggle,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, Success,
  auth::{CurrentActor, MaybeActor},
  error::Result,
  newsroom::CommentInput,
  success,
};

#[derive(Debug, Deserialize)]
pub struct EditBody {
  pub body: String,
}

/// `GET /stories/{slug}/comments`
pub async fn list<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: MaybeActor,
  Path(slug): Path<String>,
) -> Result<Json<Success<Vec<CommentNode>>>> {
  let thread = state
    .newsroom
    .comments(viewer.actor().as_ref(), &slug)
    .await?;
  Ok(success(thread))
}

/// `POST /stories/{slug}/comments` — returns 201 + the comment.
pub async fn create<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(slug): Path<String>,
  Json(body): Json<CommentInput>,
) -> Result<impl IntoResponse> {
  let comment = state
    .newsroom
    .add_comment(&current.actor(), &slug, body)
    .await?;
  Ok((StatusCode::CREATED, success(comment)))
}

/// `PUT /comments/{comment_id}`
pub async fn update<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(comment_id): Path<Uuid>,
  Json(body): Json<EditBody>,
) -> Result<Json<Success<Comment>>> {
  let comment = state
    .newsroom
    .edit_comment(&current.actor(), comment_id, &body.body)
    .await?;
  Ok(success(comment))
}

/// `DELETE /comments/{comment_id}`
pub async fn delete<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(comment_id): Path<Uuid>,
) -> Result<Json<Success<String>>> {
  state
    .newsroom
    .delete_comment(&current.actor(), comment_id)
    .await?;
  Ok(success(format!("comment {comment_id} deleted")))
}

/// `POST /comments/{comment_id}/like`
pub async fn like<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(comment_id): Path<Uuid>,
) -> Result<Json<Success<LikeToggle>>> {
  let toggle = state
    .newsroom
    .toggle_comment_like(&current.actor(), comment_id)
    .await?;
  Ok(success(toggle))
}
