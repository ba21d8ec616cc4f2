//! [`SqliteStore`]: the SQLite implementation of every storage trait in
//! [`goalline_core::store`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use goalline_core::{
  account::{Member, NewAccount, ProfileUpdate, Role},
  comment::{Comment, NewComment},
  feed::{
    FeedCounts, FeedItem, FeedItemQuery, FeedSource, FetchLog, NewFeedItem,
    NewFeedSource, NewFetchLog, SourceCounts, SourceKind,
  },
  store::{
    AccountStore, CommentStore, FeedStore, Store, StoryStore, SubscriberStore,
  },
  story::{
    Chapter, ChapterEdit, LikeAction, LikeToggle, NewChapter, NewStory,
    NewStoryView, Story, StoryEdit, StoryQuery, Tag, slugify,
  },
  subscription::{SubscribeOutcome, Subscriber},
  workflow::StatusChange,
};

use crate::{
  Error, Result,
  encode::{
    CHAPTER_SELECT, COMMENT_SELECT, FETCH_LOG_SELECT, ITEM_SELECT,
    MEMBER_SELECT, RawChapter, RawComment, RawFeedItem, RawFetchLog,
    RawMember, RawSource, RawStory, RawSubscriber, RawTag, SOURCE_SELECT,
    STORY_SELECT, SUBSCRIBER_SELECT, encode_dt, encode_media, encode_uuid,
  },
  schema::SCHEMA,
};

const DEFAULT_PAGE: usize = 50;

// ─── Store ───────────────────────────────────────────────────────────────────

/// The Goal Line Report store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn member_where(
    &self,
    condition: &'static str,
    value: String,
  ) -> Result<Option<Member>> {
    let raw: Option<RawMember> = self
      .conn
      .call(move |conn| Ok(query_member(conn, condition, &value)?))
      .await?;
    raw.map(RawMember::into_member).transpose()
  }

  async fn story_where(
    &self,
    condition: &'static str,
    value: String,
  ) -> Result<Option<Story>> {
    let raw: Option<RawStory> = self
      .conn
      .call(move |conn| Ok(query_story(conn, condition, &value)?))
      .await?;
    raw.map(RawStory::into_story).transpose()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// Plain functions over a borrowed connection so they can run inside any
// `call` closure, including open transactions.

fn query_member(
  conn: &Connection,
  condition: &str,
  value: &str,
) -> rusqlite::Result<Option<RawMember>> {
  conn
    .query_row(
      &format!("{MEMBER_SELECT} WHERE {condition}"),
      rusqlite::params![value],
      RawMember::from_row,
    )
    .optional()
}

fn story_tags(conn: &Connection, story_id: &str) -> rusqlite::Result<Vec<RawTag>> {
  let mut stmt = conn.prepare(
    "SELECT t.tag_id, t.name, t.slug
     FROM tags t
     JOIN story_tags st ON st.tag_id = t.tag_id
     WHERE st.story_id = ?1
     ORDER BY t.name",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![story_id], RawTag::from_row)?
    .collect();
  rows
}

fn query_story(
  conn: &Connection,
  condition: &str,
  value: &str,
) -> rusqlite::Result<Option<RawStory>> {
  let raw = conn
    .query_row(
      &format!("{STORY_SELECT} WHERE {condition}"),
      rusqlite::params![value],
      RawStory::from_row,
    )
    .optional()?;
  match raw {
    Some(mut raw) => {
      raw.tags = story_tags(conn, &raw.story_id)?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

fn query_chapter(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawChapter>> {
  conn
    .query_row(
      &format!("{CHAPTER_SELECT} WHERE chapter_id = ?1"),
      rusqlite::params![id],
      RawChapter::from_row,
    )
    .optional()
}

fn chapters_of(conn: &Connection, story_id: &str) -> rusqlite::Result<Vec<RawChapter>> {
  let mut stmt =
    conn.prepare(&format!("{CHAPTER_SELECT} WHERE story_id = ?1 ORDER BY position"))?;
  let rows = stmt
    .query_map(rusqlite::params![story_id], RawChapter::from_row)?
    .collect();
  rows
}

fn query_comment(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawComment>> {
  conn
    .query_row(
      &format!("{COMMENT_SELECT} WHERE c.comment_id = ?1"),
      rusqlite::params![id],
      RawComment::from_row,
    )
    .optional()
}

fn query_subscriber(
  conn: &Connection,
  condition: &str,
  value: &str,
) -> rusqlite::Result<Option<RawSubscriber>> {
  conn
    .query_row(
      &format!("{SUBSCRIBER_SELECT} WHERE {condition}"),
      rusqlite::params![value],
      RawSubscriber::from_row,
    )
    .optional()
}

fn query_source(conn: &Connection, kind: &str) -> rusqlite::Result<Option<RawSource>> {
  conn
    .query_row(
      &format!("{SOURCE_SELECT} WHERE kind = ?1"),
      rusqlite::params![kind],
      RawSource::from_row,
    )
    .optional()
}

fn exists(conn: &Connection, sql: &str, value: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![value], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

/// `None` leaves a profile field untouched; a blank string clears it.
fn merge_field(current: Option<String>, update: Option<String>) -> Option<String> {
  match update {
    None => current,
    Some(v) if v.trim().is_empty() => None,
    Some(v) => Some(v.trim().to_owned()),
  }
}

fn like_pattern(text: Option<&str>) -> Option<String> {
  text
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(|t| format!("%{t}%"))
}

fn page(limit: Option<usize>, offset: Option<usize>) -> (i64, i64) {
  let limit = limit.unwrap_or(DEFAULT_PAGE).min(i64::MAX as usize) as i64;
  let offset = offset.unwrap_or(0).min(i64::MAX as usize) as i64;
  (limit, offset)
}

fn count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

// ─── Store impls ─────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;
}

// ── Accounts ──────────────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  async fn create_account(&self, input: NewAccount) -> Result<Member> {
    let account_id = Uuid::new_v4();
    let now = Utc::now();

    let id_str    = encode_uuid(account_id);
    let at_str    = encode_dt(now);
    let role_str  = input.role.as_ref().to_owned();
    let username  = input.username.clone();
    let email     = input.email.clone();
    let pw_hash   = input.password_hash.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO accounts (account_id, username, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, username, email, pw_hash, at_str],
        )?;
        tx.execute(
          "INSERT INTO profiles (account_id, role, verified, updated_at)
           VALUES (?1, ?2, 0, ?3)",
          rusqlite::params![id_str, role_str, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(|e| Error::conflict_or(e, "username already taken"))?;

    tracing::debug!(%account_id, username = %input.username, "account created");

    self
      .get_account(account_id)
      .await?
      .ok_or_else(|| Error::not_found("account"))
  }

  async fn get_account(&self, id: Uuid) -> Result<Option<Member>> {
    self.member_where("a.account_id = ?1", encode_uuid(id)).await
  }

  async fn get_account_by_username(&self, username: String) -> Result<Option<Member>> {
    self.member_where("a.username = ?1", username).await
  }

  async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<Member> {
    let current = self
      .get_account(id)
      .await?
      .ok_or_else(|| Error::not_found("account"))?
      .profile;

    let id_str         = encode_uuid(id);
    let at_str         = encode_dt(Utc::now());
    let specialization = merge_field(current.specialization, update.specialization);
    let bio            = merge_field(current.bio, update.bio);
    let website        = merge_field(current.website, update.website);
    let phone          = merge_field(current.phone, update.phone);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE profiles
           SET specialization = ?2, bio = ?3, website = ?4, phone = ?5,
               updated_at = ?6
           WHERE account_id = ?1",
          rusqlite::params![id_str, specialization, bio, website, phone, at_str],
        )?;
        Ok(())
      })
      .await?;

    self
      .get_account(id)
      .await?
      .ok_or_else(|| Error::not_found("account"))
  }

  async fn set_role(
    &self,
    id:       Uuid,
    role:     Role,
    verified: Option<bool>,
  ) -> Result<Member> {
    let id_str   = encode_uuid(id);
    let role_str = role.as_ref().to_owned();
    let at_str   = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles
           SET role = ?2, verified = COALESCE(?3, verified), updated_at = ?4
           WHERE account_id = ?1",
          rusqlite::params![id_str, role_str, verified, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::not_found("account"));
    }
    tracing::info!(account_id = %id, %role, "role changed");

    self
      .get_account(id)
      .await?
      .ok_or_else(|| Error::not_found("account"))
  }
}

// ── Stories ───────────────────────────────────────────────────────────────

impl StoryStore for SqliteStore {
  async fn slug_exists(&self, slug: String, excluding: Option<Uuid>) -> Result<bool> {
    let excluding_str = excluding.map(encode_uuid);

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM stories
                 WHERE slug = ?1 AND (?2 IS NULL OR story_id != ?2)",
                rusqlite::params![slug, excluding_str],
                |_| Ok(()),
              )
              .optional()?
              .is_some(),
          )
        })
        .await?,
    )
  }

  async fn create_story(&self, input: NewStory) -> Result<Story> {
    let story_id = Uuid::new_v4();

    let id_str     = encode_uuid(story_id);
    let author_str = encode_uuid(input.author_id);
    let at_str     = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO stories (
             story_id, title, slug, body, summary, status, author_id,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 'draft', ?6, ?7, ?7)",
          rusqlite::params![
            id_str,
            input.title,
            input.slug,
            input.body,
            input.summary,
            author_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| Error::conflict_or(e, "slug already in use"))?;

    self
      .get_story(story_id)
      .await?
      .ok_or_else(|| Error::not_found("story"))
  }

  async fn get_story(&self, id: Uuid) -> Result<Option<Story>> {
    self.story_where("s.story_id = ?1", encode_uuid(id)).await
  }

  async fn get_story_by_slug(&self, slug: String) -> Result<Option<Story>> {
    self.story_where("s.slug = ?1", slug).await
  }

  async fn update_story(&self, id: Uuid, edit: StoryEdit) -> Result<Story> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE stories
           SET title = ?2, slug = ?3, body = ?4, summary = ?5, updated_at = ?6
           WHERE story_id = ?1",
          rusqlite::params![id_str, edit.title, edit.slug, edit.body, edit.summary, at_str],
        )?)
      })
      .await
      .map_err(|e| Error::conflict_or(e, "slug already in use"))?;

    if changed == 0 {
      return Err(Error::not_found("story"));
    }
    self
      .get_story(id)
      .await?
      .ok_or_else(|| Error::not_found("story"))
  }

  async fn apply_status_change(&self, change: &StatusChange) -> Result<Story> {
    let id_str        = encode_uuid(change.story_id);
    let status_str    = change.status.as_ref().to_owned();
    let published_str = change.published_at.map(encode_dt);
    let reviewer_str  = change.reviewed_by.map(encode_uuid);
    let reviewed_str  = change.reviewed_at.map(encode_dt);
    let notes         = change.review_notes.clone();
    let at_str        = encode_dt(Utc::now());
    let from_str      = change.from.as_ref().to_owned();

    // The status guard makes the write a compare-and-set: a transition
    // planned against a status that has since changed writes nothing.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE stories
           SET status       = ?2,
               published_at = COALESCE(published_at, ?3),
               reviewed_by  = ?4,
               reviewed_at  = ?5,
               review_notes = ?6,
               updated_at   = ?7
           WHERE story_id = ?1 AND status = ?8",
          rusqlite::params![
            id_str,
            status_str,
            published_str,
            reviewer_str,
            reviewed_str,
            notes,
            at_str,
            from_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      let current = self
        .get_story(change.story_id)
        .await?
        .ok_or_else(|| Error::not_found("story"))?;
      return Err(Error::Core(goalline_core::Error::InvalidTransition {
        from: current.status,
        to:   change.status,
      }));
    }
    tracing::info!(
      story_id = %change.story_id,
      from = %change.from,
      to = %change.status,
      "story status changed"
    );

    self
      .get_story(change.story_id)
      .await?
      .ok_or_else(|| Error::not_found("story"))
  }

  async fn delete_story(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM stories WHERE story_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn list_stories(&self, query: &StoryQuery) -> Result<Vec<Story>> {
    let text_pattern      = like_pattern(query.text.as_deref());
    let tag_slug          = query.tag.clone();
    let author_str        = query.author_id.map(encode_uuid);
    let status_str        = query.status.map(|s| s.as_ref().to_owned());
    let (limit, offset)   = page(query.limit, query.offset);

    let raws: Vec<RawStory> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{STORY_SELECT}
           WHERE (?1 IS NULL
                  OR s.title LIKE ?1 OR s.summary LIKE ?1 OR a.username LIKE ?1)
             AND (?2 IS NULL OR EXISTS (
                   SELECT 1 FROM story_tags st
                   JOIN tags t ON t.tag_id = st.tag_id
                   WHERE st.story_id = s.story_id AND t.slug = ?2))
             AND (?3 IS NULL OR s.author_id = ?3)
             AND (?4 IS NULL OR s.status = ?4)
           ORDER BY COALESCE(s.published_at, s.created_at) DESC, s.created_at DESC
           LIMIT ?5 OFFSET ?6"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
          .query_map(
            rusqlite::params![
              text_pattern,
              tag_slug,
              author_str,
              status_str,
              limit,
              offset,
            ],
            RawStory::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut rows {
          raw.tags = story_tags(conn, &raw.story_id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStory::into_story).collect()
  }

  async fn set_story_tags(&self, story_id: Uuid, names: Vec<String>) -> Result<Vec<Tag>> {
    let id_str = encode_uuid(story_id);

    let mut seen = HashSet::new();
    let wanted: Vec<(String, String, String)> = names
      .iter()
      .map(|n| n.trim())
      .filter(|n| !n.is_empty())
      .map(|n| (n.to_owned(), slugify(n)))
      .filter(|(_, slug)| seen.insert(slug.clone()))
      .map(|(name, slug)| (encode_uuid(Uuid::new_v4()), name, slug))
      .collect();

    let raws: Option<Vec<RawTag>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "SELECT 1 FROM stories WHERE story_id = ?1", &id_str)? {
          return Ok(None);
        }
        tx.execute(
          "DELETE FROM story_tags WHERE story_id = ?1",
          rusqlite::params![id_str],
        )?;
        for (tag_id, name, slug) in &wanted {
          tx.execute(
            "INSERT OR IGNORE INTO tags (tag_id, name, slug) VALUES (?1, ?2, ?3)",
            rusqlite::params![tag_id, name, slug],
          )?;
          tx.execute(
            "INSERT OR IGNORE INTO story_tags (story_id, tag_id)
             SELECT ?1, tag_id FROM tags WHERE slug = ?2",
            rusqlite::params![id_str, slug],
          )?;
        }
        let tags = story_tags(&tx, &id_str)?;
        tx.commit()?;
        Ok(Some(tags))
      })
      .await?;

    raws
      .ok_or_else(|| Error::not_found("story"))?
      .into_iter()
      .map(RawTag::into_tag)
      .collect()
  }

  // ── Chapters ──────────────────────────────────────────────────────────────

  async fn list_chapters(&self, story_id: Uuid) -> Result<Vec<Chapter>> {
    let id_str = encode_uuid(story_id);
    let raws: Vec<RawChapter> = self
      .conn
      .call(move |conn| Ok(chapters_of(conn, &id_str)?))
      .await?;
    raws.into_iter().map(RawChapter::into_chapter).collect()
  }

  async fn count_chapters(&self, story_id: Uuid) -> Result<usize> {
    let id_str = encode_uuid(story_id);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM chapters WHERE story_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(usize::try_from(n).unwrap_or(0))
  }

  async fn get_chapter(&self, id: Uuid) -> Result<Option<Chapter>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawChapter> = self
      .conn
      .call(move |conn| Ok(query_chapter(conn, &id_str)?))
      .await?;
    raw.map(RawChapter::into_chapter).transpose()
  }

  async fn add_chapter(&self, input: NewChapter) -> Result<Chapter> {
    let chapter_id = Uuid::new_v4();

    let id_str    = encode_uuid(chapter_id);
    let story_str = encode_uuid(input.story_id);
    let media_str = encode_media(&input.media)?;
    let order     = input.order.map(i64::from);
    let at_str    = encode_dt(Utc::now());

    let raw: RawChapter = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let position: i64 = match order {
          Some(p) => p,
          None => tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM chapters WHERE story_id = ?1",
            rusqlite::params![story_str],
            |r| r.get(0),
          )?,
        };
        tx.execute(
          "INSERT INTO chapters (
             chapter_id, story_id, title, body, media, position,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            id_str,
            story_str,
            input.title,
            input.body,
            media_str,
            position,
            at_str,
          ],
        )?;
        let raw = query_chapter(&tx, &id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await
      .map_err(|e| Error::conflict_or(e, "chapter order already taken"))?;

    raw.into_chapter()
  }

  async fn update_chapter(&self, id: Uuid, edit: ChapterEdit) -> Result<Chapter> {
    let id_str    = encode_uuid(id);
    let media_str = encode_media(&edit.media)?;
    let at_str    = encode_dt(Utc::now());

    let raw: Option<RawChapter> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE chapters SET title = ?2, body = ?3, media = ?4, updated_at = ?5
           WHERE chapter_id = ?1",
          rusqlite::params![id_str, edit.title, edit.body, media_str, at_str],
        )?;
        Ok(query_chapter(conn, &id_str)?)
      })
      .await?;

    raw
      .ok_or_else(|| Error::not_found("chapter"))?
      .into_chapter()
  }

  async fn delete_chapter(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM chapters WHERE chapter_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn reorder_chapters(&self, story_id: Uuid, ordered: Vec<Uuid>) -> Result<Vec<Chapter>> {
    let story_str = encode_uuid(story_id);
    let ids: Vec<String> = ordered.into_iter().map(encode_uuid).collect();

    let raws: Option<Vec<RawChapter>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: HashSet<String> = chapters_of(&tx, &story_str)?
          .into_iter()
          .map(|c| c.chapter_id)
          .collect();
        let requested: HashSet<&String> = ids.iter().collect();
        if requested.len() != ids.len()
          || current.len() != ids.len()
          || !ids.iter().all(|id| current.contains(id))
        {
          return Ok(None);
        }

        // Park every row on a negative position first so the final
        // assignments never collide with UNIQUE(story_id, position).
        tx.execute(
          "UPDATE chapters SET position = -1 - position WHERE story_id = ?1",
          rusqlite::params![story_str],
        )?;
        let at_str = encode_dt(Utc::now());
        for (position, id) in ids.iter().enumerate() {
          tx.execute(
            "UPDATE chapters SET position = ?2, updated_at = ?3 WHERE chapter_id = ?1",
            rusqlite::params![id, position as i64, at_str],
          )?;
        }
        let rows = chapters_of(&tx, &story_str)?;
        tx.commit()?;
        Ok(Some(rows))
      })
      .await?;

    let raws = raws.ok_or_else(|| {
      Error::Core(goalline_core::Error::Validation(
        "chapter order must list every chapter of the story exactly once".into(),
      ))
    })?;
    raws.into_iter().map(RawChapter::into_chapter).collect()
  }

  // ── Engagement ────────────────────────────────────────────────────────────

  async fn toggle_story_like(&self, story_id: Uuid, account_id: Uuid) -> Result<LikeToggle> {
    let story_str   = encode_uuid(story_id);
    let account_str = encode_uuid(account_id);
    let at_str      = encode_dt(Utc::now());

    let outcome: Option<(bool, i64)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "SELECT 1 FROM stories WHERE story_id = ?1", &story_str)? {
          return Ok(None);
        }
        let inserted = tx.execute(
          "INSERT OR IGNORE INTO story_likes (story_id, account_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![story_str, account_str, at_str],
        )? > 0;
        if !inserted {
          tx.execute(
            "DELETE FROM story_likes WHERE story_id = ?1 AND account_id = ?2",
            rusqlite::params![story_str, account_str],
          )?;
        }
        tx.execute(
          "UPDATE stories
           SET likes_count = (SELECT COUNT(*) FROM story_likes WHERE story_id = ?1)
           WHERE story_id = ?1",
          rusqlite::params![story_str],
        )?;
        let likes: i64 = tx.query_row(
          "SELECT likes_count FROM stories WHERE story_id = ?1",
          rusqlite::params![story_str],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(Some((inserted, likes)))
      })
      .await?;

    let (liked, likes) = outcome.ok_or_else(|| Error::not_found("story"))?;
    Ok(LikeToggle {
      action:      if liked { LikeAction::Liked } else { LikeAction::Unliked },
      likes_count: count(likes),
    })
  }

  async fn has_liked_story(&self, story_id: Uuid, account_id: Uuid) -> Result<bool> {
    let story_str   = encode_uuid(story_id);
    let account_str = encode_uuid(account_id);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM story_likes WHERE story_id = ?1 AND account_id = ?2",
                rusqlite::params![story_str, account_str],
                |_| Ok(()),
              )
              .optional()?
              .is_some(),
          )
        })
        .await?,
    )
  }

  async fn record_view(&self, view: NewStoryView) -> Result<u64> {
    let view_str    = encode_uuid(Uuid::new_v4());
    let story_str   = encode_uuid(view.story_id);
    let account_str = view.account_id.map(encode_uuid);
    let at_str      = encode_dt(Utc::now());

    let views: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE stories SET views_count = views_count + 1 WHERE story_id = ?1",
          rusqlite::params![story_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO story_views (view_id, story_id, account_id, ip_address, viewed_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![view_str, story_str, account_str, view.ip_address, at_str],
        )?;
        let views: i64 = tx.query_row(
          "SELECT views_count FROM stories WHERE story_id = ?1",
          rusqlite::params![story_str],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(Some(views))
      })
      .await?;

    views.map(count).ok_or_else(|| Error::not_found("story"))
  }
}

// ── Comments ──────────────────────────────────────────────────────────────

impl CommentStore for SqliteStore {
  async fn add_comment(&self, input: NewComment) -> Result<Comment> {
    if let Some(parent_id) = input.parent_id {
      match self.get_comment(parent_id).await? {
        Some(parent) if parent.story_id == input.story_id && parent.active => {}
        Some(_) => {
          return Err(Error::Core(goalline_core::Error::Validation(
            "replies must target an active comment on the same story".into(),
          )));
        }
        None => return Err(Error::not_found("parent comment")),
      }
    }

    let comment_id = Uuid::new_v4();

    let id_str     = encode_uuid(comment_id);
    let story_str  = encode_uuid(input.story_id);
    let author_str = encode_uuid(input.author_id);
    let parent_str = input.parent_id.map(encode_uuid);
    let at_str     = encode_dt(Utc::now());

    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO comments (
             comment_id, story_id, author_id, body, parent_id, active,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)",
          rusqlite::params![id_str, story_str, author_str, input.body, parent_str, at_str],
        )?;
        Ok(query_comment(conn, &id_str)?)
      })
      .await?;

    raw
      .ok_or_else(|| Error::not_found("comment"))?
      .into_comment()
  }

  async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| Ok(query_comment(conn, &id_str)?))
      .await?;
    raw.map(RawComment::into_comment).transpose()
  }

  async fn update_comment_body(&self, id: Uuid, body: String) -> Result<Comment> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE comments SET body = ?2, updated_at = ?3
           WHERE comment_id = ?1 AND active = 1",
          rusqlite::params![id_str, body, at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(query_comment(conn, &id_str)?)
      })
      .await?;

    raw
      .ok_or_else(|| Error::not_found("comment"))?
      .into_comment()
  }

  async fn deactivate_comment(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE comments SET active = 0, updated_at = ?2
           WHERE comment_id = ?1 AND active = 1",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn list_comments(&self, story_id: Uuid) -> Result<Vec<Comment>> {
    let story_str = encode_uuid(story_id);
    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{COMMENT_SELECT} WHERE c.story_id = ?1 ORDER BY c.created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![story_str], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn toggle_comment_like(
    &self,
    comment_id: Uuid,
    account_id: Uuid,
  ) -> Result<LikeToggle> {
    let comment_str = encode_uuid(comment_id);
    let account_str = encode_uuid(account_id);
    let at_str      = encode_dt(Utc::now());

    let outcome: Option<(bool, i64)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(
          &tx,
          "SELECT 1 FROM comments WHERE comment_id = ?1 AND active = 1",
          &comment_str,
        )? {
          return Ok(None);
        }
        let inserted = tx.execute(
          "INSERT OR IGNORE INTO comment_likes (comment_id, account_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![comment_str, account_str, at_str],
        )? > 0;
        if !inserted {
          tx.execute(
            "DELETE FROM comment_likes WHERE comment_id = ?1 AND account_id = ?2",
            rusqlite::params![comment_str, account_str],
          )?;
        }
        let likes: i64 = tx.query_row(
          "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1",
          rusqlite::params![comment_str],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(Some((inserted, likes)))
      })
      .await?;

    let (liked, likes) = outcome.ok_or_else(|| Error::not_found("comment"))?;
    Ok(LikeToggle {
      action:      if liked { LikeAction::Liked } else { LikeAction::Unliked },
      likes_count: count(likes),
    })
  }
}

// ── Subscribers ───────────────────────────────────────────────────────────

impl SubscriberStore for SqliteStore {
  async fn subscribe(
    &self,
    email:      String,
    account_id: Option<Uuid>,
  ) -> Result<SubscribeOutcome> {
    let new_id_str  = encode_uuid(Uuid::new_v4());
    let account_str = account_id.map(encode_uuid);
    let at_str      = encode_dt(Utc::now());

    // `None` means the address is already actively subscribed.
    let outcome: Option<(bool, RawSubscriber)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let created = match query_subscriber(&tx, "email = ?1", &email)? {
          Some(existing) if existing.active => return Ok(None),
          Some(existing) => {
            tx.execute(
              "UPDATE subscribers
               SET active = 1, account_id = COALESCE(?2, account_id), updated_at = ?3
               WHERE subscriber_id = ?1",
              rusqlite::params![existing.subscriber_id, account_str, at_str],
            )?;
            false
          }
          None => {
            tx.execute(
              "INSERT INTO subscribers (
                 subscriber_id, email, account_id, active, created_at, updated_at
               ) VALUES (?1, ?2, ?3, 1, ?4, ?4)",
              rusqlite::params![new_id_str, email, account_str, at_str],
            )?;
            true
          }
        };
        let raw = query_subscriber(&tx, "email = ?1", &email)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(Some((created, raw)))
      })
      .await
      .map_err(|e| Error::conflict_or(e, "already subscribed"))?;

    match outcome {
      None => Err(Error::Core(goalline_core::Error::Conflict(
        "already subscribed".into(),
      ))),
      Some((true, raw)) => Ok(SubscribeOutcome::Created(raw.into_subscriber()?)),
      Some((false, raw)) => Ok(SubscribeOutcome::Reactivated(raw.into_subscriber()?)),
    }
  }

  async fn unsubscribe(&self, id: Uuid) -> Result<Option<Subscriber>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawSubscriber> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subscribers SET active = 0, updated_at = ?2
           WHERE subscriber_id = ?1 AND active = 1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(query_subscriber(conn, "subscriber_id = ?1", &id_str)?)
      })
      .await?;

    raw.map(RawSubscriber::into_subscriber).transpose()
  }

  async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
    let raws: Vec<RawSubscriber> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "{SUBSCRIBER_SELECT} WHERE active = 1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map([], RawSubscriber::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSubscriber::into_subscriber).collect()
  }
}

// ── Feeds ─────────────────────────────────────────────────────────────────

impl FeedStore for SqliteStore {
  async fn ensure_source(&self, input: NewFeedSource) -> Result<FeedSource> {
    let id_str   = encode_uuid(Uuid::new_v4());
    let kind_str = input.kind.as_ref().to_owned();
    let at_str   = encode_dt(Utc::now());

    let raw: Option<RawSource> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO feed_sources (
             source_id, name, kind, feed_url, active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, input.name, kind_str, input.feed_url, input.active, at_str],
        )?;
        Ok(query_source(conn, &kind_str)?)
      })
      .await?;

    raw
      .ok_or_else(|| Error::not_found("feed source"))?
      .into_source()
  }

  async fn delete_all_sources(&self) -> Result<u64> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM feed_sources", [])?))
      .await?;
    Ok(removed as u64)
  }

  async fn list_sources(&self, active_only: bool) -> Result<Vec<FeedSource>> {
    let raws: Vec<RawSource> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SOURCE_SELECT} WHERE (?1 = 0 OR active = 1) ORDER BY name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![active_only], RawSource::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSource::into_source).collect()
  }

  async fn get_source(&self, kind: SourceKind) -> Result<Option<FeedSource>> {
    let kind_str = kind.as_ref().to_owned();
    let raw: Option<RawSource> = self
      .conn
      .call(move |conn| Ok(query_source(conn, &kind_str)?))
      .await?;
    raw.map(RawSource::into_source).transpose()
  }

  async fn set_source_active(
    &self,
    kind:   SourceKind,
    active: bool,
  ) -> Result<Option<FeedSource>> {
    let kind_str = kind.as_ref().to_owned();
    let raw: Option<RawSource> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE feed_sources SET active = ?2 WHERE kind = ?1",
          rusqlite::params![kind_str, active],
        )?;
        Ok(query_source(conn, &kind_str)?)
      })
      .await?;
    raw.map(RawSource::into_source).transpose()
  }

  async fn touch_source(&self, source_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(source_id);
    let at_str = encode_dt(at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE feed_sources SET last_fetched = ?2 WHERE source_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn feed_item_exists(&self, guid: String) -> Result<bool> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(exists(conn, "SELECT 1 FROM feed_items WHERE guid = ?1", &guid)?)
        })
        .await?,
    )
  }

  async fn insert_feed_item(&self, input: NewFeedItem) -> Result<bool> {
    let id_str        = encode_uuid(Uuid::new_v4());
    let source_str    = encode_uuid(input.source_id);
    let published_str = encode_dt(input.published_at);
    let fetched_str   = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO feed_items (
             item_id, source_id, title, description, content, link, author,
             category, guid, published_at, fetched_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            source_str,
            input.title,
            input.description,
            input.content,
            input.link,
            input.author,
            input.category,
            input.guid,
            published_str,
            fetched_str,
          ],
        )?)
      })
      .await?;
    Ok(inserted > 0)
  }

  async fn get_feed_item(&self, id: Uuid) -> Result<Option<FeedItem>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawFeedItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{ITEM_SELECT} WHERE i.item_id = ?1"),
              rusqlite::params![id_str],
              RawFeedItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawFeedItem::into_item).transpose()
  }

  async fn list_feed_items(&self, query: &FeedItemQuery) -> Result<Vec<FeedItem>> {
    let kind_str         = query.source.map(|k| k.as_ref().to_owned());
    let category_pattern = like_pattern(query.category.as_deref());
    let text_pattern     = like_pattern(query.text.as_deref());
    let unread_only      = query.unread_only;
    let (limit, offset)  = page(query.limit, query.offset);

    let raws: Vec<RawFeedItem> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{ITEM_SELECT}
           WHERE i.is_archived = 0
             AND (?1 IS NULL OR s.kind = ?1)
             AND (?2 IS NULL OR i.category LIKE ?2)
             AND (?3 IS NULL OR i.title LIKE ?3 OR i.description LIKE ?3)
             AND (?4 = 0 OR i.is_read = 0)
           ORDER BY i.published_at DESC
           LIMIT ?5 OFFSET ?6"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              kind_str,
              category_pattern,
              text_pattern,
              unread_only,
              limit,
              offset,
            ],
            RawFeedItem::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedItem::into_item).collect()
  }

  async fn mark_feed_item_read(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE feed_items SET is_read = 1 WHERE item_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn archive_feed_item(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE feed_items SET is_archived = 1 WHERE item_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn archive_items_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
    let cutoff_str = encode_dt(cutoff);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE feed_items SET is_archived = 1
           WHERE is_archived = 0 AND published_at < ?1",
          rusqlite::params![cutoff_str],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }

  async fn delete_archived_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
    let cutoff_str = encode_dt(cutoff);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM feed_items WHERE is_archived = 1 AND published_at < ?1",
          rusqlite::params![cutoff_str],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }

  async fn count_items_fetched_since(&self, since: DateTime<Utc>) -> Result<u64> {
    let since_str = encode_dt(since);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM feed_items WHERE fetched_at >= ?1",
          rusqlite::params![since_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count(n))
  }

  async fn feed_counts(&self) -> Result<FeedCounts> {
    let (total, unread, per_source): (i64, i64, Vec<(String, i64, i64)>) = self
      .conn
      .call(|conn| {
        let (total, unread) = conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(SUM(CASE WHEN is_read = 0 AND is_archived = 0 THEN 1 ELSE 0 END), 0)
           FROM feed_items",
          [],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        let mut stmt = conn.prepare(
          "SELECT s.source_id,
                  COUNT(i.item_id),
                  COALESCE(SUM(CASE WHEN i.is_read = 0 AND i.is_archived = 0 THEN 1 ELSE 0 END), 0)
           FROM feed_sources s
           LEFT JOIN feed_items i ON i.source_id = s.source_id
           GROUP BY s.source_id
           ORDER BY s.name",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((total, unread, rows))
      })
      .await?;

    let per_source = per_source
      .into_iter()
      .map(|(id, items, unread)| {
        Ok(SourceCounts {
          source_id: crate::encode::decode_uuid(&id)?,
          items:     count(items),
          unread:    count(unread),
        })
      })
      .collect::<Result<_>>()?;

    Ok(FeedCounts {
      total_items:  count(total),
      unread_items: count(unread),
      per_source,
    })
  }

  async fn record_fetch_log(&self, input: NewFetchLog) -> Result<FetchLog> {
    let log = FetchLog {
      log_id:        Uuid::new_v4(),
      source_id:     input.source_id,
      status:        input.status,
      items_fetched: input.items_fetched,
      items_new:     input.items_new,
      error_message: input.error_message,
      duration_secs: input.duration_secs,
      created_at:    Utc::now(),
    };

    let id_str     = encode_uuid(log.log_id);
    let source_str = encode_uuid(log.source_id);
    let status_str = log.status.as_ref().to_owned();
    let message    = log.error_message.clone();
    let at_str     = encode_dt(log.created_at);
    let fetched    = log.items_fetched;
    let new        = log.items_new;
    let duration   = log.duration_secs;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO fetch_logs (
             log_id, source_id, status, items_fetched, items_new,
             error_message, duration_secs, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str, source_str, status_str, fetched, new, message, duration, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(log)
  }

  async fn recent_fetch_logs(&self, limit: usize) -> Result<Vec<FetchLog>> {
    let limit = limit.min(i64::MAX as usize) as i64;
    let raws: Vec<RawFetchLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{FETCH_LOG_SELECT} ORDER BY created_at DESC LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], RawFetchLog::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawFetchLog::into_log).collect()
  }
}
