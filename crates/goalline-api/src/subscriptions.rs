//! Newsletter subscription handlers. Both are open to anonymous callers.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use goalline_core::{
  store::NewsStore,
  subscription::{SubscribeOutcome, Subscriber},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, Success, auth::MaybeActor, error::Result, success};

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
  pub email: String,
}

/// `POST /subscriptions` — 201 for a new address, 200 for a reactivated one.
/// An address that is already active is a 409.
pub async fn subscribe<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  viewer: MaybeActor,
  Json(body): Json<SubscribeBody>,
) -> Result<impl IntoResponse> {
  let outcome = state
    .newsroom
    .subscribe(&body.email, viewer.actor().as_ref())
    .await?;
  let status = match outcome {
    SubscribeOutcome::Created(_) => StatusCode::CREATED,
    SubscribeOutcome::Reactivated(_) => StatusCode::OK,
  };
  Ok((status, success(outcome)))
}

/// `GET|POST /subscriptions/{subscriber_id}/unsubscribe`
///
/// GET is the link carried in notification emails.
pub async fn unsubscribe<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  Path(subscriber_id): Path<Uuid>,
) -> Result<Json<Success<Subscriber>>> {
  Ok(success(state.newsroom.unsubscribe(subscriber_id).await?))
}
