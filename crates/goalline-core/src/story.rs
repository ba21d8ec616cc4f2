//! Stories, chapters, tags and engagement records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a story sits in the editorial workflow. See [`crate::workflow`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoryStatus {
  #[default]
  Draft,
  Review,
  Published,
  Rejected,
  Cancelled,
}

// ─── Story ───────────────────────────────────────────────────────────────────

/// A unit of publishable content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
  pub story_id:        Uuid,
  pub title:           String,
  pub slug:            String,
  pub body:            String,
  pub summary:         String,
  pub status:          StoryStatus,
  pub author_id:       Uuid,
  pub author_username: String,
  /// Set the first time the story is published; never cleared.
  pub published_at:    Option<DateTime<Utc>>,
  pub reviewed_by:     Option<Uuid>,
  pub reviewed_at:     Option<DateTime<Utc>>,
  pub review_notes:    Option<String>,
  pub views_count:     u64,
  pub likes_count:     u64,
  pub tags:            Vec<Tag>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Story {
  pub fn is_published(&self) -> bool {
    self.status == StoryStatus::Published
  }
}

/// Input to [`crate::store::StoryStore::create_story`]. New stories always
/// start as drafts.
#[derive(Debug, Clone)]
pub struct NewStory {
  pub title:     String,
  pub slug:      String,
  pub body:      String,
  pub summary:   String,
  pub author_id: Uuid,
}

/// Content fields replaced by an edit.
#[derive(Debug, Clone)]
pub struct StoryEdit {
  pub title:   String,
  pub slug:    String,
  pub body:    String,
  pub summary: String,
}

/// Filters for [`crate::store::StoryStore::list_stories`].
#[derive(Debug, Clone, Default)]
pub struct StoryQuery {
  /// Case-insensitive match over title, summary and author username.
  pub text:      Option<String>,
  /// Tag slug.
  pub tag:       Option<String>,
  pub author_id: Option<Uuid>,
  pub status:    Option<StoryStatus>,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
}

// ─── Chapters ────────────────────────────────────────────────────────────────

/// An ordered sub-section of a story. `order` is 0-based and unique within
/// the story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
  pub chapter_id: Uuid,
  pub story_id:   Uuid,
  pub title:      String,
  pub body:       String,
  /// References to externally stored images or videos.
  pub media:      Vec<String>,
  pub order:      u32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Input to [`crate::store::StoryStore::add_chapter`]. Without an explicit
/// `order` the chapter is appended after the current last one.
#[derive(Debug, Clone)]
pub struct NewChapter {
  pub story_id: Uuid,
  pub title:    String,
  pub body:     String,
  pub media:    Vec<String>,
  pub order:    Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChapterEdit {
  pub title: String,
  pub body:  String,
  pub media: Vec<String>,
}

// ─── Tags ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id: Uuid,
  pub name:   String,
  pub slug:   String,
}

// ─── Engagement ──────────────────────────────────────────────────────────────

/// One detail-page impression.
#[derive(Debug, Clone)]
pub struct NewStoryView {
  pub story_id:   Uuid,
  pub account_id: Option<Uuid>,
  pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
  Liked,
  Unliked,
}

/// Result of flipping a like on a story or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
  pub action:      LikeAction,
  pub likes_count: u64,
}

// ─── Slugs ───────────────────────────────────────────────────────────────────

/// Lowercase ASCII slug: alphanumerics kept, every other run of characters
/// collapsed into a single `-`.
pub fn slugify(input: &str) -> String {
  let mut slug = String::with_capacity(input.len());
  let mut pending_dash = false;
  for c in input.chars() {
    if c.is_ascii_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(c.to_ascii_lowercase());
    } else {
      pending_dash = true;
    }
  }
  if slug.is_empty() { "story".to_owned() } else { slug }
}

/// Candidate slugs in the order they are tried: `base`, `base-1`, `base-2`, …
pub fn slug_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
  std::iter::once(base.to_owned())
    .chain((1u32..).map(move |n| format!("{base}-{n}")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugify_collapses_punctuation_and_case() {
    assert_eq!(slugify("Arsenal 2 – 1 Chelsea!"), "arsenal-2-1-chelsea");
    assert_eq!(slugify("  Late   drama  "), "late-drama");
    assert_eq!(slugify("Über-Liga"), "ber-liga");
  }

  #[test]
  fn slugify_never_returns_empty() {
    assert_eq!(slugify("???"), "story");
  }

  #[test]
  fn slug_candidates_append_counters() {
    let got: Vec<_> = slug_candidates("derby").take(3).collect();
    assert_eq!(got, ["derby", "derby-1", "derby-2"]);
  }

  #[test]
  fn status_tags_round_trip_through_strum() {
    use std::str::FromStr;
    for s in [
      StoryStatus::Draft,
      StoryStatus::Review,
      StoryStatus::Published,
      StoryStatus::Rejected,
      StoryStatus::Cancelled,
    ] {
      assert_eq!(StoryStatus::from_str(s.as_ref()).unwrap(), s);
    }
  }
}
