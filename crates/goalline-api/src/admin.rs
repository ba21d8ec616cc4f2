//! Bulk moderation.

use axum::{Json, extract::State};
use goalline_core::store::NewsStore;

use crate::{
  AppState, Success,
  auth::CurrentActor,
  error::Result,
  newsroom::{BulkReport, BulkRequest},
  success,
};

/// `POST /admin/stories/actions`
///
/// Applies one action to every listed story. The response is 200 even when
/// some stories fail; the report says which.
pub async fn story_actions<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Json(body): Json<BulkRequest>,
) -> Result<Json<Success<BulkReport>>> {
  let report = state.newsroom.bulk_action(&current.actor(), body).await?;
  Ok(success(report))
}
