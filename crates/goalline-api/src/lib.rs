//! JSON API for Goal Line Report.
//!
//! Exposes an axum [`Router`] backed by any [`NewsStore`]. Editorial
//! operations go through [`Newsroom`]; feed operations through a shared
//! [`FeedFetcher`]. Every success body has the shape
//! `{"status":"success","data":…}` and every failure
//! `{"status":"error","message":…}`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = goalline_api::router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod chapters;
pub mod comments;
pub mod error;
pub mod feeds;
pub mod newsroom;
pub mod stories;
pub mod subscriptions;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post, put},
};
use goalline_core::store::NewsStore;
use goalline_feeds::FeedFetcher;
use serde::Serialize;

pub use error::ApiError;
pub use newsroom::{Newsroom, NewsroomConfig};

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub newsroom: Arc<Newsroom<S>>,
  pub feeds:    Arc<FeedFetcher<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      newsroom: Arc::clone(&self.newsroom),
      feeds:    Arc::clone(&self.feeds),
    }
  }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Success<T> {
  pub status: &'static str,
  pub data:   T,
}

pub fn success<T: Serialize>(data: T) -> Json<Success<T>> {
  Json(Success { status: "success", data })
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: NewsStore + 'static,
{
  Router::new()
    // Accounts
    .route("/accounts", post(accounts::register::<S>))
    .route("/accounts/me", get(accounts::me))
    .route("/accounts/me/profile", put(accounts::update_profile::<S>))
    .route("/accounts/{username}/role", put(accounts::set_role::<S>))
    .route("/authors/{username}", get(accounts::author_page::<S>))
    // Stories
    .route("/stories", get(stories::list::<S>).post(stories::create::<S>))
    .route("/stories/mine", get(stories::mine::<S>))
    .route("/stories/review", get(stories::review_queue::<S>))
    .route(
      "/stories/{slug}",
      get(stories::detail::<S>)
        .put(stories::update::<S>)
        .delete(stories::delete::<S>),
    )
    .route("/stories/{slug}/like", post(stories::like::<S>))
    .route("/stories/{slug}/submit", post(stories::submit::<S>))
    .route("/stories/{slug}/review", post(stories::review::<S>))
    .route("/stories/{slug}/cancel", post(stories::cancel::<S>))
    // Chapters
    .route(
      "/stories/{slug}/chapters",
      get(chapters::list::<S>).post(chapters::create::<S>),
    )
    .route("/stories/{slug}/chapters/order", put(chapters::reorder::<S>))
    .route(
      "/stories/{slug}/chapters/{chapter_id}",
      put(chapters::update::<S>).delete(chapters::delete::<S>),
    )
    // Comments
    .route(
      "/stories/{slug}/comments",
      get(comments::list::<S>).post(comments::create::<S>),
    )
    .route(
      "/comments/{comment_id}",
      put(comments::update::<S>).delete(comments::delete::<S>),
    )
    .route("/comments/{comment_id}/like", post(comments::like::<S>))
    // Subscriptions
    .route("/subscriptions", post(subscriptions::subscribe::<S>))
    .route(
      "/subscriptions/{subscriber_id}/unsubscribe",
      get(subscriptions::unsubscribe::<S>).post(subscriptions::unsubscribe::<S>),
    )
    // Feeds
    .route("/feeds/items", get(feeds::list_items::<S>))
    .route("/feeds/items/{item_id}", get(feeds::item_detail::<S>))
    .route("/feeds/items/{item_id}/read", post(feeds::mark_read::<S>))
    .route("/feeds/items/{item_id}/archive", post(feeds::archive::<S>))
    .route("/feeds/sources", get(feeds::list_sources::<S>))
    .route("/feeds/sources/{kind}/toggle", post(feeds::toggle_source::<S>))
    .route("/feeds/fetch", post(feeds::fetch::<S>))
    .route("/feeds/stats", get(feeds::stats::<S>))
    .route("/feeds/health", get(feeds::health::<S>))
    // Admin
    .route("/admin/stories/actions", post(admin::story_actions::<S>))
    .with_state(state)
}
