//! The editorial service.
//!
//! [`Newsroom`] ties the pure workflow rules in `goalline-core` to a store
//! and a [`Notifier`]. Handlers stay thin: they extract, call one method
//! here and wrap the result.

use std::sync::Arc;

use chrono::Utc;
use goalline_core::{
  account::{Actor, Capability, Member, NewAccount, ProfileUpdate, Role},
  comment::{Comment, CommentNode, NewComment, build_thread},
  store::NewsStore,
  story::{
    Chapter, ChapterEdit, LikeToggle, NewChapter, NewStory, NewStoryView, Story,
    StoryEdit, StoryQuery, StoryStatus, slug_candidates, slugify,
  },
  subscription::{
    Notifier, PublishNotice, SubscribeOutcome, Subscriber, normalize_email,
  },
  workflow::{
    TransitionRequest, UnauthorizedTransitionPolicy, can_delete, can_edit,
    can_edit_chapters, can_review, can_view, plan_transition,
  },
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  auth::hash_password,
  error::{ApiError, Result},
};

#[derive(Debug, Clone)]
pub struct NewsroomConfig {
  /// Public base URL used in notification links.
  pub site_url:          String,
  pub transition_policy: UnauthorizedTransitionPolicy,
}

impl Default for NewsroomConfig {
  fn default() -> Self {
    Self {
      site_url:          "http://localhost:8000".to_owned(),
      transition_policy: UnauthorizedTransitionPolicy::default(),
    }
  }
}

// ─── Inputs and views ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub username: String,
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleChange {
  pub role:     Role,
  pub verified: Option<bool>,
}

/// Body of story create and edit requests.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryInput {
  pub title:   String,
  #[serde(alias = "content")]
  pub body:    String,
  #[serde(default)]
  pub summary: String,
  #[serde(default)]
  pub tags:    Vec<String>,
}

impl StoryInput {
  fn validated(self) -> Result<Self> {
    let title = self.title.trim().to_owned();
    let body = self.body.trim().to_owned();
    if title.is_empty() || body.is_empty() {
      return Err(ApiError::BadRequest("title and content are required".into()));
    }
    let mut tags: Vec<String> = Vec::new();
    for tag in self.tags {
      let tag = tag.trim();
      if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_owned());
      }
    }
    Ok(Self {
      title,
      body,
      summary: self.summary.trim().to_owned(),
      tags,
    })
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChapterInput {
  pub title: String,
  #[serde(default)]
  pub body:  String,
  #[serde(default)]
  pub media: Vec<String>,
  pub order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentInput {
  pub body:      String,
  pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryDetail {
  pub story:    Story,
  pub chapters: Vec<Chapter>,
  /// Whether the requesting account likes the story.
  pub liked:    bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorPage {
  pub author:  Member,
  pub stories: Vec<Story>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
  SubmitForReview,
  Publish,
  Reject,
  Cancel,
  Delete,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkRequest {
  pub action:    BulkAction,
  pub story_ids: Vec<Uuid>,
  #[serde(default)]
  pub notes:     Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
  pub story_id: Uuid,
  pub message:  String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkReport {
  pub succeeded: Vec<Uuid>,
  pub failed:    Vec<BulkFailure>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct Newsroom<S> {
  store:    Arc<S>,
  notifier: Arc<dyn Notifier>,
  config:   NewsroomConfig,
}

const MIN_PASSWORD_LEN: usize = 8;

fn forbidden(message: &str) -> ApiError { ApiError::Forbidden(message.to_owned()) }

impl<S: NewsStore> Newsroom<S> {
  pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, config: NewsroomConfig) -> Self {
    Self { store, notifier, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &NewsroomConfig { &self.config }

  // ─── Accounts ────────────────────────────────────────────────────────────

  /// Create an account with `role`. Public registration always passes
  /// [`Role::Customer`].
  pub async fn register(&self, input: Registration, role: Role) -> Result<Member> {
    let username = input.username.trim().to_owned();
    let valid_username = (3..=150).contains(&username.chars().count())
      && username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c));
    if !valid_username {
      return Err(ApiError::BadRequest(
        "username must be 3-150 letters, digits or @.+-_".into(),
      ));
    }
    if input.password.chars().count() < MIN_PASSWORD_LEN {
      return Err(ApiError::BadRequest(format!(
        "password must be at least {MIN_PASSWORD_LEN} characters"
      )));
    }
    let email = normalize_email(&input.email)?;
    let password_hash = hash_password(&input.password)?;

    let member = self
      .store
      .create_account(NewAccount {
        username,
        email,
        password_hash,
        role,
      })
      .await
      .map_err(ApiError::store)?;
    info!(username = %member.account.username, role = %role, "account created");
    Ok(member)
  }

  pub async fn update_profile(&self, actor: &Actor, update: ProfileUpdate) -> Result<Member> {
    self
      .store
      .update_profile(actor.account_id, update)
      .await
      .map_err(ApiError::store)
  }

  pub async fn set_role(
    &self,
    actor: &Actor,
    username: &str,
    change: RoleChange,
  ) -> Result<Member> {
    if !actor.can(Capability::ManageAccounts) {
      return Err(forbidden("only a chief editor may change roles"));
    }
    let member = self.member(username).await?;
    let updated = self
      .store
      .set_role(member.account.account_id, change.role, change.verified)
      .await
      .map_err(ApiError::store)?;
    info!(username, role = %change.role, by = %actor.username, "role changed");
    Ok(updated)
  }

  /// Public author page: the account and its published stories.
  pub async fn author_page(&self, username: &str) -> Result<AuthorPage> {
    let author = self.member(username).await?;
    let stories = self
      .store
      .list_stories(&StoryQuery {
        author_id: Some(author.account.account_id),
        status: Some(StoryStatus::Published),
        ..StoryQuery::default()
      })
      .await
      .map_err(ApiError::store)?;
    Ok(AuthorPage { author, stories })
  }

  async fn member(&self, username: &str) -> Result<Member> {
    self
      .store
      .get_account_by_username(username.to_owned())
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("account {username:?}")))
  }

  // ─── Stories ─────────────────────────────────────────────────────────────

  async fn story(&self, slug: &str) -> Result<Story> {
    self
      .store
      .get_story_by_slug(slug.to_owned())
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("story {slug:?}")))
  }

  async fn visible_story(&self, slug: &str, actor: Option<&Actor>) -> Result<Story> {
    let story = self.story(slug).await?;
    if !can_view(&story, actor) {
      return Err(forbidden("you do not have permission to view this story"));
    }
    Ok(story)
  }

  /// First free slug among `slugify(title)`, `-1`, `-2`, …
  async fn unique_slug(&self, title: &str, excluding: Option<Uuid>) -> Result<String> {
    let base = slugify(title);
    for candidate in slug_candidates(&base) {
      let taken = self
        .store
        .slug_exists(candidate.clone(), excluding)
        .await
        .map_err(ApiError::store)?;
      if !taken {
        return Ok(candidate);
      }
    }
    Err(ApiError::Internal("slug candidates exhausted".into()))
  }

  async fn with_tags(&self, mut story: Story, tags: Vec<String>) -> Result<Story> {
    story.tags = self
      .store
      .set_story_tags(story.story_id, tags)
      .await
      .map_err(ApiError::store)?;
    Ok(story)
  }

  /// New stories are always drafts.
  pub async fn create_story(&self, actor: &Actor, input: StoryInput) -> Result<Story> {
    if !actor.can(Capability::WriteStories) {
      return Err(forbidden("only editors may write stories"));
    }
    let input = input.validated()?;
    let slug = self.unique_slug(&input.title, None).await?;
    let story = self
      .store
      .create_story(NewStory {
        title: input.title,
        slug,
        body: input.body,
        summary: input.summary,
        author_id: actor.account_id,
      })
      .await
      .map_err(ApiError::store)?;
    info!(slug = %story.slug, author = %actor.username, "story created");
    self.with_tags(story, input.tags).await
  }

  /// Replace content and tags. The slug is regenerated only when the title
  /// changes.
  pub async fn update_story(&self, actor: &Actor, slug: &str, input: StoryInput) -> Result<Story> {
    let story = self.story(slug).await?;
    if !can_edit(&story, actor) {
      return Err(forbidden("you do not have permission to edit this story"));
    }
    let input = input.validated()?;
    let slug = if input.title == story.title {
      story.slug.clone()
    } else {
      self.unique_slug(&input.title, Some(story.story_id)).await?
    };
    let updated = self
      .store
      .update_story(story.story_id, StoryEdit {
        title: input.title,
        slug,
        body: input.body,
        summary: input.summary,
      })
      .await
      .map_err(ApiError::store)?;
    self.with_tags(updated, input.tags).await
  }

  pub async fn delete_story(&self, actor: &Actor, slug: &str) -> Result<()> {
    let story = self.story(slug).await?;
    self.delete_loaded(actor, &story).await
  }

  async fn delete_loaded(&self, actor: &Actor, story: &Story) -> Result<()> {
    if !can_delete(story, actor) {
      return Err(forbidden("you do not have permission to delete this story"));
    }
    self
      .store
      .delete_story(story.story_id)
      .await
      .map_err(ApiError::store)?;
    info!(slug = %story.slug, by = %actor.username, "story deleted");
    Ok(())
  }

  /// The detail page. Every call records a view.
  pub async fn story_detail(
    &self,
    actor: Option<&Actor>,
    slug: &str,
    ip_address: Option<String>,
  ) -> Result<StoryDetail> {
    let mut story = self.visible_story(slug, actor).await?;
    story.views_count = self
      .store
      .record_view(NewStoryView {
        story_id: story.story_id,
        account_id: actor.map(|a| a.account_id),
        ip_address,
      })
      .await
      .map_err(ApiError::store)?;
    let chapters = self
      .store
      .list_chapters(story.story_id)
      .await
      .map_err(ApiError::store)?;
    let liked = match actor {
      Some(a) => self
        .store
        .has_liked_story(story.story_id, a.account_id)
        .await
        .map_err(ApiError::store)?,
      None => false,
    };
    Ok(StoryDetail { story, chapters, liked })
  }

  /// Published stories, optionally searched (`text`) and filtered by tag
  /// slug.
  pub async fn published_stories(&self, mut query: StoryQuery) -> Result<Vec<Story>> {
    query.status = Some(StoryStatus::Published);
    query.author_id = None;
    self
      .store
      .list_stories(&query)
      .await
      .map_err(ApiError::store)
  }

  /// Every story written by `actor`, whatever its status.
  pub async fn my_stories(&self, actor: &Actor) -> Result<Vec<Story>> {
    if !actor.can(Capability::WriteStories) {
      return Err(forbidden("only editors have stories"));
    }
    self
      .store
      .list_stories(&StoryQuery {
        author_id: Some(actor.account_id),
        ..StoryQuery::default()
      })
      .await
      .map_err(ApiError::store)
  }

  pub async fn review_queue(&self, actor: &Actor) -> Result<Vec<Story>> {
    if !can_review(actor) {
      return Err(forbidden("only a chief editor may review stories"));
    }
    self
      .store
      .list_stories(&StoryQuery {
        status: Some(StoryStatus::Review),
        ..StoryQuery::default()
      })
      .await
      .map_err(ApiError::store)
  }

  pub async fn toggle_story_like(&self, actor: &Actor, slug: &str) -> Result<LikeToggle> {
    let story = self.visible_story(slug, Some(actor)).await?;
    self
      .store
      .toggle_story_like(story.story_id, actor.account_id)
      .await
      .map_err(ApiError::store)
  }

  // ─── Workflow ────────────────────────────────────────────────────────────

  pub async fn transition(
    &self,
    actor: &Actor,
    slug: &str,
    request: TransitionRequest,
  ) -> Result<Story> {
    let story = self.story(slug).await?;
    self.transition_loaded(actor, &story, request).await
  }

  async fn transition_loaded(
    &self,
    actor: &Actor,
    story: &Story,
    request: TransitionRequest,
  ) -> Result<Story> {
    let chapters = self
      .store
      .count_chapters(story.story_id)
      .await
      .map_err(ApiError::store)?;
    let change = plan_transition(
      story,
      actor,
      chapters,
      &request,
      self.config.transition_policy,
      Utc::now(),
    )?;
    let updated = self
      .store
      .apply_status_change(&change)
      .await
      .map_err(ApiError::store)?;
    info!(
      slug = %updated.slug,
      from = %change.from,
      to = %change.status,
      by = %actor.username,
      "story status changed"
    );
    if change.newly_published() {
      self.notify_subscribers(&updated).await;
    }
    Ok(updated)
  }

  /// Queue one notice per active subscriber. Failures are logged; a publish
  /// never fails because of notification trouble.
  async fn notify_subscribers(&self, story: &Story) -> usize {
    let subscribers = match self.store.active_subscribers().await {
      Ok(subscribers) => subscribers,
      Err(err) => {
        warn!(slug = %story.slug, error = %err, "could not load subscribers");
        return 0;
      }
    };
    let notices: Vec<PublishNotice> = subscribers
      .iter()
      .map(|s| PublishNotice::compose(story, s, &self.config.site_url))
      .collect();
    let total = notices.len();
    let queued = self.notifier.enqueue(notices);
    if queued < total {
      warn!(slug = %story.slug, queued, total, "some publish notices were not queued");
    } else {
      info!(slug = %story.slug, queued, "publish notices queued");
    }
    queued
  }

  /// Apply one action to many stories. Each story succeeds or fails on its
  /// own; the report lists both.
  pub async fn bulk_action(&self, actor: &Actor, request: BulkRequest) -> Result<BulkReport> {
    let allowed = match request.action {
      BulkAction::SubmitForReview => actor.can(Capability::WriteStories),
      _ => actor.can(Capability::PublishStories),
    };
    if !allowed {
      return Err(forbidden("this bulk action requires a higher role"));
    }

    let mut report = BulkReport::default();
    for story_id in request.story_ids {
      match self.bulk_one(actor, story_id, request.action, request.notes.as_deref()).await {
        Ok(()) => report.succeeded.push(story_id),
        Err(err) => report.failed.push(BulkFailure {
          story_id,
          message: err.to_string(),
        }),
      }
    }
    info!(
      by = %actor.username,
      succeeded = report.succeeded.len(),
      failed = report.failed.len(),
      "bulk story action"
    );
    Ok(report)
  }

  async fn bulk_one(
    &self,
    actor: &Actor,
    story_id: Uuid,
    action: BulkAction,
    notes: Option<&str>,
  ) -> Result<()> {
    let story = self
      .store
      .get_story(story_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("story {story_id}")))?;
    let notes = notes.map(str::to_owned);
    let request = match action {
      BulkAction::Delete => return self.delete_loaded(actor, &story).await,
      BulkAction::SubmitForReview => TransitionRequest::SubmitForReview,
      BulkAction::Publish => TransitionRequest::Publish { notes },
      BulkAction::Reject => TransitionRequest::Reject { notes },
      BulkAction::Cancel => TransitionRequest::Cancel { notes },
    };
    self.transition_loaded(actor, &story, request).await.map(drop)
  }

  // ─── Chapters ────────────────────────────────────────────────────────────

  pub async fn chapters(&self, actor: Option<&Actor>, slug: &str) -> Result<Vec<Chapter>> {
    let story = self.visible_story(slug, actor).await?;
    self
      .store
      .list_chapters(story.story_id)
      .await
      .map_err(ApiError::store)
  }

  async fn chapter_editable_story(&self, actor: &Actor, slug: &str) -> Result<Story> {
    let story = self.story(slug).await?;
    if !can_edit_chapters(&story, actor) {
      return Err(if story.status != StoryStatus::Draft {
        forbidden("chapters can only be changed while the story is a draft")
      } else {
        forbidden("you do not have permission to edit this story")
      });
    }
    Ok(story)
  }

  async fn chapter_of(&self, story: &Story, chapter_id: Uuid) -> Result<Chapter> {
    self
      .store
      .get_chapter(chapter_id)
      .await
      .map_err(ApiError::store)?
      .filter(|c| c.story_id == story.story_id)
      .ok_or_else(|| ApiError::NotFound(format!("chapter {chapter_id}")))
  }

  pub async fn add_chapter(&self, actor: &Actor, slug: &str, input: ChapterInput) -> Result<Chapter> {
    let story = self.chapter_editable_story(actor, slug).await?;
    let title = input.title.trim().to_owned();
    if title.is_empty() {
      return Err(ApiError::BadRequest("chapter title is required".into()));
    }
    self
      .store
      .add_chapter(NewChapter {
        story_id: story.story_id,
        title,
        body: input.body,
        media: input.media,
        order: input.order,
      })
      .await
      .map_err(ApiError::store)
  }

  pub async fn update_chapter(
    &self,
    actor: &Actor,
    slug: &str,
    chapter_id: Uuid,
    input: ChapterInput,
  ) -> Result<Chapter> {
    let story = self.chapter_editable_story(actor, slug).await?;
    let chapter = self.chapter_of(&story, chapter_id).await?;
    let title = input.title.trim().to_owned();
    if title.is_empty() {
      return Err(ApiError::BadRequest("chapter title is required".into()));
    }
    self
      .store
      .update_chapter(chapter.chapter_id, ChapterEdit {
        title,
        body: input.body,
        media: input.media,
      })
      .await
      .map_err(ApiError::store)
  }

  pub async fn delete_chapter(&self, actor: &Actor, slug: &str, chapter_id: Uuid) -> Result<()> {
    let story = self.chapter_editable_story(actor, slug).await?;
    let chapter = self.chapter_of(&story, chapter_id).await?;
    self
      .store
      .delete_chapter(chapter.chapter_id)
      .await
      .map_err(ApiError::store)?;
    Ok(())
  }

  pub async fn reorder_chapters(
    &self,
    actor: &Actor,
    slug: &str,
    ordered: Vec<Uuid>,
  ) -> Result<Vec<Chapter>> {
    let story = self.chapter_editable_story(actor, slug).await?;
    self
      .store
      .reorder_chapters(story.story_id, ordered)
      .await
      .map_err(ApiError::store)
  }

  // ─── Comments ────────────────────────────────────────────────────────────

  pub async fn comments(&self, actor: Option<&Actor>, slug: &str) -> Result<Vec<CommentNode>> {
    let story = self.visible_story(slug, actor).await?;
    let comments = self
      .store
      .list_comments(story.story_id)
      .await
      .map_err(ApiError::store)?;
    Ok(build_thread(comments))
  }

  pub async fn add_comment(&self, actor: &Actor, slug: &str, input: CommentInput) -> Result<Comment> {
    let story = self.visible_story(slug, Some(actor)).await?;
    let body = input.body.trim().to_owned();
    if body.is_empty() {
      return Err(ApiError::BadRequest("comment text is required".into()));
    }
    self
      .store
      .add_comment(NewComment {
        story_id: story.story_id,
        author_id: actor.account_id,
        body,
        parent_id: input.parent_id,
      })
      .await
      .map_err(ApiError::store)
  }

  async fn active_comment(&self, comment_id: Uuid) -> Result<Comment> {
    self
      .store
      .get_comment(comment_id)
      .await
      .map_err(ApiError::store)?
      .filter(|c| c.active)
      .ok_or_else(|| ApiError::NotFound(format!("comment {comment_id}")))
  }

  /// An active comment on a story `actor` may view.
  async fn visible_comment(&self, actor: &Actor, comment_id: Uuid) -> Result<Comment> {
    let comment = self.active_comment(comment_id).await?;
    let story = self
      .store
      .get_story(comment.story_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("comment {comment_id}")))?;
    if !can_view(&story, Some(actor)) {
      return Err(forbidden("you do not have permission to view this story"));
    }
    Ok(comment)
  }

  pub async fn edit_comment(&self, actor: &Actor, comment_id: Uuid, body: &str) -> Result<Comment> {
    let comment = self.visible_comment(actor, comment_id).await?;
    if comment.author_id != actor.account_id {
      return Err(forbidden("only the author may edit a comment"));
    }
    let body = body.trim();
    if body.is_empty() {
      return Err(ApiError::BadRequest("comment text is required".into()));
    }
    self
      .store
      .update_comment_body(comment_id, body.to_owned())
      .await
      .map_err(ApiError::store)
  }

  /// Soft delete, by the author or a chief editor.
  pub async fn delete_comment(&self, actor: &Actor, comment_id: Uuid) -> Result<()> {
    let comment = self.visible_comment(actor, comment_id).await?;
    if comment.author_id != actor.account_id && !can_review(actor) {
      return Err(forbidden("you do not have permission to delete this comment"));
    }
    self
      .store
      .deactivate_comment(comment_id)
      .await
      .map_err(ApiError::store)?;
    Ok(())
  }

  pub async fn toggle_comment_like(&self, actor: &Actor, comment_id: Uuid) -> Result<LikeToggle> {
    let comment = self.visible_comment(actor, comment_id).await?;
    self
      .store
      .toggle_comment_like(comment.comment_id, actor.account_id)
      .await
      .map_err(ApiError::store)
  }

  // ─── Subscriptions ───────────────────────────────────────────────────────

  pub async fn subscribe(&self, email: &str, account: Option<&Actor>) -> Result<SubscribeOutcome> {
    let email = normalize_email(email)?;
    self
      .store
      .subscribe(email, account.map(|a| a.account_id))
      .await
      .map_err(ApiError::store)
  }

  pub async fn unsubscribe(&self, subscriber_id: Uuid) -> Result<Subscriber> {
    self
      .store
      .unsubscribe(subscriber_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("subscriber {subscriber_id}")))
  }
}
