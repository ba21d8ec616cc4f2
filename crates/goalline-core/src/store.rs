//! Storage traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `goalline-store-sqlite`). Higher layers (`goalline-api`, `goalline-feeds`)
//! depend on these abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  account::{Member, NewAccount, ProfileUpdate, Role},
  comment::{Comment, NewComment},
  feed::{
    FeedCounts, FeedItem, FeedItemQuery, FeedSource, FetchLog, NewFeedItem,
    NewFeedSource, NewFetchLog, SourceKind,
  },
  story::{
    Chapter, ChapterEdit, LikeToggle, NewChapter, NewStory, NewStoryView,
    Story, StoryEdit, StoryQuery, Tag,
  },
  subscription::{SubscribeOutcome, Subscriber},
  workflow::StatusChange,
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Implemented by backend error types. `domain` exposes rejections such as
/// uniqueness conflicts or missing rows so callers can report them precisely.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

/// Common supertrait carrying the backend's error type.
pub trait Store: Send + Sync {
  type Error: StoreError;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub trait AccountStore: Store {
  /// Create an account and its profile in one transaction. Fails with a
  /// conflict if the username is taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  fn get_account_by_username(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Member>, Self::Error>> + Send + '_;

  fn update_profile(
    &self,
    id: Uuid,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;

  /// Change role and, optionally, the verification flag.
  fn set_role(
    &self,
    id: Uuid,
    role: Role,
    verified: Option<bool>,
  ) -> impl Future<Output = Result<Member, Self::Error>> + Send + '_;
}

// ─── Stories ─────────────────────────────────────────────────────────────────

pub trait StoryStore: Store {
  /// Whether `slug` is used by any story other than `excluding`.
  fn slug_exists(
    &self,
    slug: String,
    excluding: Option<Uuid>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn create_story(
    &self,
    input: NewStory,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + '_;

  fn get_story(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Story>, Self::Error>> + Send + '_;

  fn get_story_by_slug(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<Option<Story>, Self::Error>> + Send + '_;

  fn update_story(
    &self,
    id: Uuid,
    edit: StoryEdit,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + '_;

  /// Persist a planned transition. `published_at` is only ever written when
  /// the stored value is still empty.
  ///
  /// The write only lands while the story is still in `change.from`. When
  /// another transition got there first the result is
  /// [`crate::Error::InvalidTransition`] from the status it now has.
  fn apply_status_change<'a>(
    &'a self,
    change: &'a StatusChange,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + 'a;

  /// Hard delete; chapters, likes, views and comments go with it.
  fn delete_story(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_stories<'a>(
    &'a self,
    query: &'a StoryQuery,
  ) -> impl Future<Output = Result<Vec<Story>, Self::Error>> + Send + 'a;

  /// Replace the story's tags, creating unknown tags by name.
  fn set_story_tags(
    &self,
    story_id: Uuid,
    names: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  // ── Chapters ──────────────────────────────────────────────────────────

  fn list_chapters(
    &self,
    story_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Chapter>, Self::Error>> + Send + '_;

  fn count_chapters(
    &self,
    story_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_chapter(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Chapter>, Self::Error>> + Send + '_;

  /// Fails with a conflict if the explicit order is already taken.
  fn add_chapter(
    &self,
    input: NewChapter,
  ) -> impl Future<Output = Result<Chapter, Self::Error>> + Send + '_;

  fn update_chapter(
    &self,
    id: Uuid,
    edit: ChapterEdit,
  ) -> impl Future<Output = Result<Chapter, Self::Error>> + Send + '_;

  fn delete_chapter(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Renumber chapters 0.. in the given order. `ordered` must name every
  /// chapter of the story exactly once.
  fn reorder_chapters(
    &self,
    story_id: Uuid,
    ordered: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<Chapter>, Self::Error>> + Send + '_;

  // ── Engagement ────────────────────────────────────────────────────────

  /// Insert the like if absent, delete it otherwise.
  fn toggle_story_like(
    &self,
    story_id: Uuid,
    account_id: Uuid,
  ) -> impl Future<Output = Result<LikeToggle, Self::Error>> + Send + '_;

  fn has_liked_story(
    &self,
    story_id: Uuid,
    account_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record an impression and return the refreshed view count.
  fn record_view(
    &self,
    view: NewStoryView,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Comments ────────────────────────────────────────────────────────────────

pub trait CommentStore: Store {
  fn add_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  fn get_comment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  fn update_comment_body(
    &self,
    id: Uuid,
    body: String,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// Soft delete. Returns `false` if the comment was already inactive.
  fn deactivate_comment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Every comment on the story, active or not.
  fn list_comments(
    &self,
    story_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  fn toggle_comment_like(
    &self,
    comment_id: Uuid,
    account_id: Uuid,
  ) -> impl Future<Output = Result<LikeToggle, Self::Error>> + Send + '_;
}

// ─── Subscribers ─────────────────────────────────────────────────────────────

pub trait SubscriberStore: Store {
  /// Fails with a conflict if the address is already actively subscribed.
  fn subscribe(
    &self,
    email: String,
    account_id: Option<Uuid>,
  ) -> impl Future<Output = Result<SubscribeOutcome, Self::Error>> + Send + '_;

  /// Returns `None` if no such subscriber exists.
  fn unsubscribe(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscriber>, Self::Error>> + Send + '_;

  fn active_subscribers(
    &self,
  ) -> impl Future<Output = Result<Vec<Subscriber>, Self::Error>> + Send + '_;
}

// ─── Feeds ───────────────────────────────────────────────────────────────────

pub trait FeedStore: Store {
  /// Get-or-create by kind; an existing source is returned unchanged.
  fn ensure_source(
    &self,
    input: NewFeedSource,
  ) -> impl Future<Output = Result<FeedSource, Self::Error>> + Send + '_;

  /// Remove every source together with its items and logs.
  fn delete_all_sources(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn list_sources(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<FeedSource>, Self::Error>> + Send + '_;

  fn get_source(
    &self,
    kind: SourceKind,
  ) -> impl Future<Output = Result<Option<FeedSource>, Self::Error>> + Send + '_;

  fn set_source_active(
    &self,
    kind: SourceKind,
    active: bool,
  ) -> impl Future<Output = Result<Option<FeedSource>, Self::Error>> + Send + '_;

  fn touch_source(
    &self,
    source_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn feed_item_exists(
    &self,
    guid: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Insert unless the GUID is already stored. Returns `true` if inserted.
  fn insert_feed_item(
    &self,
    input: NewFeedItem,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_feed_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FeedItem>, Self::Error>> + Send + '_;

  fn list_feed_items<'a>(
    &'a self,
    query: &'a FeedItemQuery,
  ) -> impl Future<Output = Result<Vec<FeedItem>, Self::Error>> + Send + 'a;

  fn mark_feed_item_read(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn archive_feed_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Archive unarchived items published before `cutoff`.
  fn archive_items_before(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Delete archived items published before `cutoff`.
  fn delete_archived_before(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn count_items_fetched_since(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn feed_counts(
    &self,
  ) -> impl Future<Output = Result<FeedCounts, Self::Error>> + Send + '_;

  fn record_fetch_log(
    &self,
    input: NewFetchLog,
  ) -> impl Future<Output = Result<FetchLog, Self::Error>> + Send + '_;

  fn recent_fetch_logs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<FetchLog>, Self::Error>> + Send + '_;
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// Everything the application needs from one backend.
pub trait NewsStore:
  AccountStore + StoryStore + CommentStore + SubscriberStore + FeedStore
{
}

impl<T> NewsStore for T where
  T: AccountStore + StoryStore + CommentStore + SubscriberStore + FeedStore
{
}
