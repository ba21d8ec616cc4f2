//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings with nanosecond precision. Enum tags use their strum
//! snake_case form. UUIDs are stored as hyphenated lowercase strings. Chapter
//! media references are a compact JSON array.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use goalline_core::{
  account::{Account, Member, Profile, Role},
  comment::Comment,
  feed::{FeedItem, FeedSource, FetchLog, FetchStatus, SourceKind},
  story::{Chapter, Story, StoryStatus, Tag},
  subscription::Subscriber,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

/// Fixed-width UTC form so lexical order in SQL matches chronological order.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

fn decode_tag<T: FromStr>(column: &'static str, value: &str) -> Result<T> {
  T::from_str(value)
    .map_err(|_| Error::UnknownTag { column, value: value.to_owned() })
}

fn count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

pub fn encode_media(media: &[String]) -> Result<String> {
  Ok(serde_json::to_string(media)?)
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub const MEMBER_SELECT: &str = "
  SELECT a.account_id, a.username, a.email, a.password_hash, a.created_at,
         p.role, p.verified, p.specialization, p.bio, p.website, p.phone,
         p.updated_at
  FROM accounts a
  JOIN profiles p ON p.account_id = a.account_id";

/// Raw strings read from an `accounts` row joined with its profile.
pub struct RawMember {
  pub account_id:     String,
  pub username:       String,
  pub email:          String,
  pub password_hash:  String,
  pub created_at:     String,
  pub role:           String,
  pub verified:       bool,
  pub specialization: Option<String>,
  pub bio:            Option<String>,
  pub website:        Option<String>,
  pub phone:          Option<String>,
  pub updated_at:     String,
}

impl RawMember {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:     row.get(0)?,
      username:       row.get(1)?,
      email:          row.get(2)?,
      password_hash:  row.get(3)?,
      created_at:     row.get(4)?,
      role:           row.get(5)?,
      verified:       row.get(6)?,
      specialization: row.get(7)?,
      bio:            row.get(8)?,
      website:        row.get(9)?,
      phone:          row.get(10)?,
      updated_at:     row.get(11)?,
    })
  }

  pub fn into_member(self) -> Result<Member> {
    let account_id = decode_uuid(&self.account_id)?;
    Ok(Member {
      account: Account {
        account_id,
        username: self.username,
        email: self.email,
        password_hash: self.password_hash,
        created_at: decode_dt(&self.created_at)?,
      },
      profile: Profile {
        account_id,
        role: decode_tag::<Role>("role", &self.role)?,
        verified: self.verified,
        specialization: self.specialization,
        bio: self.bio,
        website: self.website,
        phone: self.phone,
        updated_at: decode_dt(&self.updated_at)?,
      },
    })
  }
}

// ─── Stories ─────────────────────────────────────────────────────────────────

pub const STORY_SELECT: &str = "
  SELECT s.story_id, s.title, s.slug, s.body, s.summary, s.status,
         s.author_id, a.username, s.published_at, s.reviewed_by,
         s.reviewed_at, s.review_notes, s.views_count, s.likes_count,
         s.created_at, s.updated_at
  FROM stories s
  JOIN accounts a ON a.account_id = s.author_id";

pub struct RawStory {
  pub story_id:        String,
  pub title:           String,
  pub slug:            String,
  pub body:            String,
  pub summary:         String,
  pub status:          String,
  pub author_id:       String,
  pub author_username: String,
  pub published_at:    Option<String>,
  pub reviewed_by:     Option<String>,
  pub reviewed_at:     Option<String>,
  pub review_notes:    Option<String>,
  pub views_count:     i64,
  pub likes_count:     i64,
  pub created_at:      String,
  pub updated_at:      String,
  /// Filled by a second query after the row is read.
  pub tags:            Vec<RawTag>,
}

impl RawStory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      story_id:        row.get(0)?,
      title:           row.get(1)?,
      slug:            row.get(2)?,
      body:            row.get(3)?,
      summary:         row.get(4)?,
      status:          row.get(5)?,
      author_id:       row.get(6)?,
      author_username: row.get(7)?,
      published_at:    row.get(8)?,
      reviewed_by:     row.get(9)?,
      reviewed_at:     row.get(10)?,
      review_notes:    row.get(11)?,
      views_count:     row.get(12)?,
      likes_count:     row.get(13)?,
      created_at:      row.get(14)?,
      updated_at:      row.get(15)?,
      tags:            Vec::new(),
    })
  }

  pub fn into_story(self) -> Result<Story> {
    Ok(Story {
      story_id:        decode_uuid(&self.story_id)?,
      title:           self.title,
      slug:            self.slug,
      body:            self.body,
      summary:         self.summary,
      status:          decode_tag::<StoryStatus>("status", &self.status)?,
      author_id:       decode_uuid(&self.author_id)?,
      author_username: self.author_username,
      published_at:    decode_opt_dt(self.published_at)?,
      reviewed_by:     decode_opt_uuid(self.reviewed_by)?,
      reviewed_at:     decode_opt_dt(self.reviewed_at)?,
      review_notes:    self.review_notes,
      views_count:     count(self.views_count),
      likes_count:     count(self.likes_count),
      tags:            self
        .tags
        .into_iter()
        .map(RawTag::into_tag)
        .collect::<Result<_>>()?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawTag {
  pub tag_id: String,
  pub name:   String,
  pub slug:   String,
}

impl RawTag {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { tag_id: row.get(0)?, name: row.get(1)?, slug: row.get(2)? })
  }

  pub fn into_tag(self) -> Result<Tag> {
    Ok(Tag {
      tag_id: decode_uuid(&self.tag_id)?,
      name:   self.name,
      slug:   self.slug,
    })
  }
}

pub const CHAPTER_SELECT: &str = "
  SELECT chapter_id, story_id, title, body, media, position, created_at,
         updated_at
  FROM chapters";

pub struct RawChapter {
  pub chapter_id: String,
  pub story_id:   String,
  pub title:      String,
  pub body:       String,
  pub media:      String,
  pub position:   i64,
  pub created_at: String,
  pub updated_at: String,
}

impl RawChapter {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      chapter_id: row.get(0)?,
      story_id:   row.get(1)?,
      title:      row.get(2)?,
      body:       row.get(3)?,
      media:      row.get(4)?,
      position:   row.get(5)?,
      created_at: row.get(6)?,
      updated_at: row.get(7)?,
    })
  }

  pub fn into_chapter(self) -> Result<Chapter> {
    Ok(Chapter {
      chapter_id: decode_uuid(&self.chapter_id)?,
      story_id:   decode_uuid(&self.story_id)?,
      title:      self.title,
      body:       self.body,
      media:      serde_json::from_str(&self.media)?,
      order:      u32::try_from(self.position).unwrap_or(u32::MAX),
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

pub const COMMENT_SELECT: &str = "
  SELECT c.comment_id, c.story_id, c.author_id, a.username, c.body,
         c.parent_id, c.active,
         (SELECT COUNT(*) FROM comment_likes l WHERE l.comment_id = c.comment_id),
         c.created_at, c.updated_at
  FROM comments c
  JOIN accounts a ON a.account_id = c.author_id";

pub struct RawComment {
  pub comment_id:      String,
  pub story_id:        String,
  pub author_id:       String,
  pub author_username: String,
  pub body:            String,
  pub parent_id:       Option<String>,
  pub active:          bool,
  pub likes_count:     i64,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawComment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:      row.get(0)?,
      story_id:        row.get(1)?,
      author_id:       row.get(2)?,
      author_username: row.get(3)?,
      body:            row.get(4)?,
      parent_id:       row.get(5)?,
      active:          row.get(6)?,
      likes_count:     row.get(7)?,
      created_at:      row.get(8)?,
      updated_at:      row.get(9)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id:      decode_uuid(&self.comment_id)?,
      story_id:        decode_uuid(&self.story_id)?,
      author_id:       decode_uuid(&self.author_id)?,
      author_username: self.author_username,
      body:            self.body,
      parent_id:       decode_opt_uuid(self.parent_id)?,
      active:          self.active,
      likes_count:     count(self.likes_count),
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Subscribers ─────────────────────────────────────────────────────────────

pub const SUBSCRIBER_SELECT: &str = "
  SELECT subscriber_id, email, account_id, active, created_at, updated_at
  FROM subscribers";

pub struct RawSubscriber {
  pub subscriber_id: String,
  pub email:         String,
  pub account_id:    Option<String>,
  pub active:        bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawSubscriber {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscriber_id: row.get(0)?,
      email:         row.get(1)?,
      account_id:    row.get(2)?,
      active:        row.get(3)?,
      created_at:    row.get(4)?,
      updated_at:    row.get(5)?,
    })
  }

  pub fn into_subscriber(self) -> Result<Subscriber> {
    Ok(Subscriber {
      subscriber_id: decode_uuid(&self.subscriber_id)?,
      email:         self.email,
      account_id:    decode_opt_uuid(self.account_id)?,
      active:        self.active,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Feeds ───────────────────────────────────────────────────────────────────

pub const SOURCE_SELECT: &str = "
  SELECT source_id, name, kind, feed_url, active, last_fetched, created_at
  FROM feed_sources";

pub struct RawSource {
  pub source_id:    String,
  pub name:         String,
  pub kind:         String,
  pub feed_url:     String,
  pub active:       bool,
  pub last_fetched: Option<String>,
  pub created_at:   String,
}

impl RawSource {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      source_id:    row.get(0)?,
      name:         row.get(1)?,
      kind:         row.get(2)?,
      feed_url:     row.get(3)?,
      active:       row.get(4)?,
      last_fetched: row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_source(self) -> Result<FeedSource> {
    Ok(FeedSource {
      source_id:    decode_uuid(&self.source_id)?,
      name:         self.name,
      kind:         decode_tag::<SourceKind>("kind", &self.kind)?,
      feed_url:     self.feed_url,
      active:       self.active,
      last_fetched: decode_opt_dt(self.last_fetched)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const ITEM_SELECT: &str = "
  SELECT i.item_id, i.source_id, s.kind, i.title, i.description, i.content,
         i.link, i.author, i.category, i.guid, i.published_at, i.fetched_at,
         i.is_read, i.is_archived
  FROM feed_items i
  JOIN feed_sources s ON s.source_id = i.source_id";

pub struct RawFeedItem {
  pub item_id:      String,
  pub source_id:    String,
  pub source_kind:  String,
  pub title:        String,
  pub description:  String,
  pub content:      String,
  pub link:         String,
  pub author:       String,
  pub category:     String,
  pub guid:         String,
  pub published_at: String,
  pub fetched_at:   String,
  pub read:         bool,
  pub archived:     bool,
}

impl RawFeedItem {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:      row.get(0)?,
      source_id:    row.get(1)?,
      source_kind:  row.get(2)?,
      title:        row.get(3)?,
      description:  row.get(4)?,
      content:      row.get(5)?,
      link:         row.get(6)?,
      author:       row.get(7)?,
      category:     row.get(8)?,
      guid:         row.get(9)?,
      published_at: row.get(10)?,
      fetched_at:   row.get(11)?,
      read:         row.get(12)?,
      archived:     row.get(13)?,
    })
  }

  pub fn into_item(self) -> Result<FeedItem> {
    Ok(FeedItem {
      item_id:      decode_uuid(&self.item_id)?,
      source_id:    decode_uuid(&self.source_id)?,
      source_kind:  decode_tag::<SourceKind>("kind", &self.source_kind)?,
      title:        self.title,
      description:  self.description,
      content:      self.content,
      link:         self.link,
      author:       self.author,
      category:     self.category,
      guid:         self.guid,
      published_at: decode_dt(&self.published_at)?,
      fetched_at:   decode_dt(&self.fetched_at)?,
      read:         self.read,
      archived:     self.archived,
    })
  }
}

pub const FETCH_LOG_SELECT: &str = "
  SELECT log_id, source_id, status, items_fetched, items_new, error_message,
         duration_secs, created_at
  FROM fetch_logs";

pub struct RawFetchLog {
  pub log_id:        String,
  pub source_id:     String,
  pub status:        String,
  pub items_fetched: i64,
  pub items_new:     i64,
  pub error_message: Option<String>,
  pub duration_secs: f64,
  pub created_at:    String,
}

impl RawFetchLog {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:        row.get(0)?,
      source_id:     row.get(1)?,
      status:        row.get(2)?,
      items_fetched: row.get(3)?,
      items_new:     row.get(4)?,
      error_message: row.get(5)?,
      duration_secs: row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_log(self) -> Result<FetchLog> {
    Ok(FetchLog {
      log_id:        decode_uuid(&self.log_id)?,
      source_id:     decode_uuid(&self.source_id)?,
      status:        decode_tag::<FetchStatus>("status", &self.status)?,
      items_fetched: u32::try_from(self.items_fetched).unwrap_or(0),
      items_new:     u32::try_from(self.items_new).unwrap_or(0),
      error_message: self.error_message,
      duration_secs: self.duration_secs,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn datetime_round_trip_preserves_instant() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }

  #[test]
  fn unknown_enum_tag_is_reported_with_its_column() {
    let err = decode_tag::<Role>("role", "admin").unwrap_err();
    assert!(matches!(err, Error::UnknownTag { column: "role", .. }));
  }
}
