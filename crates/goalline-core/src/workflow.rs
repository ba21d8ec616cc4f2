//! The editorial state machine and the permission predicates built on it.
//!
//! ```text
//! draft ──submit──▶ review ──publish──▶ published
//!                     │
//!                     └────reject───▶ rejected
//! any (except cancelled) ──cancel──▶ cancelled
//! ```
//!
//! Everything here is a pure function of `(story, actor)`. The caller loads
//! the story, asks [`plan_transition`] for a [`StatusChange`], and persists
//! it with [`crate::store::StoryStore::apply_status_change`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  account::{Actor, Capability},
  story::{Story, StoryStatus},
};

// ─── Predicates ──────────────────────────────────────────────────────────────

/// Chief editors may always edit; anyone else only their own drafts.
pub fn can_edit(story: &Story, actor: &Actor) -> bool {
  actor.can(Capability::PublishStories)
    || (story.author_id == actor.account_id
      && story.status == StoryStatus::Draft)
}

/// Published stories are public; everything else is visible to the author
/// and to chief editors only.
pub fn can_view(story: &Story, actor: Option<&Actor>) -> bool {
  story.is_published()
    || actor.is_some_and(|a| {
      a.can(Capability::ReviewStories) || a.account_id == story.author_id
    })
}

/// Deletion follows the same rule as editing: drafts by their author, or
/// anything by a chief editor.
pub fn can_delete(story: &Story, actor: &Actor) -> bool {
  can_edit(story, actor)
}

pub fn can_review(actor: &Actor) -> bool {
  actor.can(Capability::ReviewStories)
}

pub fn can_publish(actor: &Actor) -> bool {
  actor.can(Capability::PublishStories)
}

/// Chapters are frozen once the story leaves `draft`, whoever is asking.
pub fn can_edit_chapters(story: &Story, actor: &Actor) -> bool {
  story.status == StoryStatus::Draft && can_edit(story, actor)
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// A requested move through the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransitionRequest {
  SubmitForReview,
  Publish { notes: Option<String> },
  Reject { notes: Option<String> },
  Cancel { notes: Option<String> },
}

impl TransitionRequest {
  pub fn target(&self) -> StoryStatus {
    match self {
      Self::SubmitForReview => StoryStatus::Review,
      Self::Publish { .. } => StoryStatus::Published,
      Self::Reject { .. } => StoryStatus::Rejected,
      Self::Cancel { .. } => StoryStatus::Cancelled,
    }
  }
}

/// What happens when someone without review authority asks to publish or
/// reject a story they are otherwise allowed to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedTransitionPolicy {
  /// Refuse with [`Error::Forbidden`]; the story is left untouched.
  #[default]
  Reject,
  /// Legacy form behaviour: keep the story as a draft and report success.
  Downgrade,
}

/// The fields a transition writes. Produced by [`plan_transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
  pub story_id:     Uuid,
  pub from:         StoryStatus,
  pub status:       StoryStatus,
  pub published_at: Option<DateTime<Utc>>,
  pub reviewed_by:  Option<Uuid>,
  pub reviewed_at:  Option<DateTime<Utc>>,
  pub review_notes: Option<String>,
}

impl StatusChange {
  /// `true` when this change moves the story into `published`; the only
  /// moment subscribers are notified.
  pub fn newly_published(&self) -> bool {
    self.from != StoryStatus::Published
      && self.status == StoryStatus::Published
      && self.published_at.is_some()
  }

  fn unchanged_from(story: &Story, status: StoryStatus) -> Self {
    Self {
      story_id: story.story_id,
      from: story.status,
      status,
      published_at: story.published_at,
      reviewed_by: story.reviewed_by,
      reviewed_at: story.reviewed_at,
      review_notes: story.review_notes.clone(),
    }
  }

  fn reviewed(
    story: &Story,
    status: StoryStatus,
    actor: &Actor,
    notes: Option<String>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      reviewed_by: Some(actor.account_id),
      reviewed_at: Some(now),
      review_notes: notes.or_else(|| story.review_notes.clone()),
      ..Self::unchanged_from(story, status)
    }
  }
}

/// Decide whether `actor` may apply `request` to `story` and, if so, what the
/// story looks like afterwards.
///
/// `chapter_count` is the number of chapters currently attached; submitting
/// with none is a validation failure.
pub fn plan_transition(
  story: &Story,
  actor: &Actor,
  chapter_count: usize,
  request: &TransitionRequest,
  policy: UnauthorizedTransitionPolicy,
  now: DateTime<Utc>,
) -> Result<StatusChange> {
  let target = request.target();
  let invalid = || Error::InvalidTransition { from: story.status, to: target };

  match request {
    TransitionRequest::SubmitForReview => {
      if story.author_id != actor.account_id
        || !actor.can(Capability::WriteStories)
      {
        return Err(Error::Forbidden(
          "only the author may submit a story for review".into(),
        ));
      }
      if story.status != StoryStatus::Draft {
        return Err(invalid());
      }
      if chapter_count == 0 {
        return Err(Error::Validation(
          "at least one chapter is required before submitting for review"
            .into(),
        ));
      }
      Ok(StatusChange {
        reviewed_by: None,
        reviewed_at: None,
        ..StatusChange::unchanged_from(story, StoryStatus::Review)
      })
    }

    TransitionRequest::Publish { notes } | TransitionRequest::Reject { notes } => {
      let authorised = if target == StoryStatus::Published {
        can_publish(actor)
      } else {
        can_review(actor)
      };
      if !authorised {
        return match policy {
          UnauthorizedTransitionPolicy::Downgrade if can_edit(story, actor) => {
            Ok(StatusChange::unchanged_from(story, StoryStatus::Draft))
          }
          _ => Err(Error::Forbidden(format!(
            "only a chief editor may move a story to {target}"
          ))),
        };
      }
      if story.status != StoryStatus::Review {
        return Err(invalid());
      }
      let mut change =
        StatusChange::reviewed(story, target, actor, notes.clone(), now);
      if target == StoryStatus::Published {
        change.published_at = story.published_at.or(Some(now));
      }
      Ok(change)
    }

    TransitionRequest::Cancel { notes } => {
      if !can_publish(actor) {
        return Err(Error::Forbidden(
          "only a chief editor may cancel a story".into(),
        ));
      }
      if story.status == StoryStatus::Cancelled {
        return Err(invalid());
      }
      Ok(StatusChange::reviewed(
        story,
        StoryStatus::Cancelled,
        actor,
        notes.clone(),
        now,
      ))
    }
  }
}
