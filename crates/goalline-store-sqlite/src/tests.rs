//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use goalline_core::{
  account::{Member, NewAccount, ProfileUpdate, Role},
  comment::NewComment,
  feed::{FeedItemQuery, FetchStatus, NewFeedItem, NewFeedSource, NewFetchLog, SourceKind},
  store::{AccountStore, CommentStore, FeedStore, StoryStore, SubscriberStore},
  story::{
    ChapterEdit, LikeAction, NewChapter, NewStory, NewStoryView, StoryEdit,
    StoryQuery, StoryStatus,
  },
  subscription::SubscribeOutcome,
  workflow::StatusChange,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn account(s: &SqliteStore, username: &str, role: Role) -> Member {
  s.create_account(NewAccount {
    username:      username.into(),
    email:         format!("{username}@example.com"),
    password_hash: "$argon2id$placeholder".into(),
    role,
  })
  .await
  .unwrap()
}

fn new_story(author_id: Uuid, title: &str) -> NewStory {
  NewStory {
    title: title.into(),
    slug: goalline_core::story::slugify(title),
    body: "Body text.".into(),
    summary: String::new(),
    author_id,
  }
}

fn chapter(story_id: Uuid, title: &str, order: Option<u32>) -> NewChapter {
  NewChapter {
    story_id,
    title: title.into(),
    body: format!("{title} body"),
    media: vec![],
    order,
  }
}

fn is_conflict(err: &Error) -> bool {
  matches!(err, Error::Core(goalline_core::Error::Conflict(_)))
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn account_is_created_with_its_profile() {
  let s = store().await;
  let member = account(&s, "reporter", Role::Editor).await;

  assert_eq!(member.profile.account_id, member.account.account_id);
  assert_eq!(member.profile.role, Role::Editor);
  assert!(!member.profile.verified);

  let by_name = s
    .get_account_by_username("reporter".into())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_name.account.account_id, member.account.account_id);
  assert_eq!(by_name.account.password_hash, "$argon2id$placeholder");
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
  let s = store().await;
  account(&s, "reporter", Role::Editor).await;

  let err = s
    .create_account(NewAccount {
      username:      "reporter".into(),
      email:         "other@example.com".into(),
      password_hash: "x".into(),
      role:          Role::Customer,
    })
    .await
    .unwrap_err();
  assert!(is_conflict(&err));
}

#[tokio::test]
async fn profile_update_sets_and_clears_fields() {
  let s = store().await;
  let member = account(&s, "reporter", Role::Editor).await;
  let id = member.account.account_id;

  let updated = s
    .update_profile(id, ProfileUpdate {
      bio: Some("Covers the Championship".into()),
      website: Some("https://example.com".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.profile.bio.as_deref(), Some("Covers the Championship"));
  assert_eq!(updated.profile.website.as_deref(), Some("https://example.com"));

  let cleared = s
    .update_profile(id, ProfileUpdate {
      website: Some("  ".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(cleared.profile.website, None);
  assert_eq!(cleared.profile.bio.as_deref(), Some("Covers the Championship"));
}

#[tokio::test]
async fn set_role_promotes_and_verifies() {
  let s = store().await;
  let member = account(&s, "fan", Role::Customer).await;

  let promoted = s
    .set_role(member.account.account_id, Role::Editor, Some(true))
    .await
    .unwrap();
  assert_eq!(promoted.profile.role, Role::Editor);
  assert!(promoted.profile.verified);

  let unchanged_flag = s
    .set_role(member.account.account_id, Role::ChiefEditor, None)
    .await
    .unwrap();
  assert!(unchanged_flag.profile.verified);

  assert!(s.set_role(Uuid::new_v4(), Role::Editor, None).await.is_err());
}

// ─── Stories ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn story_starts_as_draft_with_author_name() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;

  let story = s
    .create_story(new_story(author.account.account_id, "Derby day"))
    .await
    .unwrap();
  assert_eq!(story.status, StoryStatus::Draft);
  assert_eq!(story.slug, "derby-day");
  assert_eq!(story.author_username, "reporter");
  assert!(story.published_at.is_none());

  let by_slug = s.get_story_by_slug("derby-day".into()).await.unwrap().unwrap();
  assert_eq!(by_slug.story_id, story.story_id);
}

#[tokio::test]
async fn slug_uniqueness_is_enforced() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let first = s
    .create_story(new_story(author.account.account_id, "Derby day"))
    .await
    .unwrap();

  assert!(s.slug_exists("derby-day".into(), None).await.unwrap());
  assert!(!s.slug_exists("derby-day".into(), Some(first.story_id)).await.unwrap());

  let err = s
    .create_story(new_story(author.account.account_id, "Derby day"))
    .await
    .unwrap_err();
  assert!(is_conflict(&err));
}

#[tokio::test]
async fn update_story_replaces_content() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Derby day"))
    .await
    .unwrap();

  let edited = s
    .update_story(story.story_id, StoryEdit {
      title:   "Derby night".into(),
      slug:    "derby-night".into(),
      body:    "Under the lights.".into(),
      summary: "Late drama".into(),
    })
    .await
    .unwrap();
  assert_eq!(edited.slug, "derby-night");
  assert_eq!(edited.summary, "Late drama");
  assert!(s.get_story_by_slug("derby-day".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn published_at_survives_a_second_publication() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let chief = account(&s, "chief", Role::ChiefEditor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Cup run"))
    .await
    .unwrap();

  let first = Utc::now() - Duration::days(2);
  let published = s
    .apply_status_change(&StatusChange {
      story_id:     story.story_id,
      from:         StoryStatus::Draft,
      status:       StoryStatus::Published,
      published_at: Some(first),
      reviewed_by:  Some(chief.account.account_id),
      reviewed_at:  Some(first),
      review_notes: Some("ship it".into()),
    })
    .await
    .unwrap();
  assert_eq!(published.published_at, Some(first));
  assert_eq!(published.reviewed_by, Some(chief.account.account_id));

  s.apply_status_change(&StatusChange {
    story_id:     story.story_id,
    from:         StoryStatus::Published,
    status:       StoryStatus::Draft,
    published_at: published.published_at,
    reviewed_by:  published.reviewed_by,
    reviewed_at:  published.reviewed_at,
    review_notes: None,
  })
  .await
  .unwrap();

  let again = s
    .apply_status_change(&StatusChange {
      story_id:     story.story_id,
      from:         StoryStatus::Draft,
      status:       StoryStatus::Published,
      published_at: Some(Utc::now()),
      reviewed_by:  Some(chief.account.account_id),
      reviewed_at:  Some(Utc::now()),
      review_notes: None,
    })
    .await
    .unwrap();
  assert_eq!(again.published_at, Some(first));
}

#[tokio::test]
async fn status_change_from_a_stale_status_is_rejected() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Late winner"))
    .await
    .unwrap();

  let publish = StatusChange {
    story_id:     story.story_id,
    from:         StoryStatus::Draft,
    status:       StoryStatus::Published,
    published_at: Some(Utc::now()),
    reviewed_by:  None,
    reviewed_at:  None,
    review_notes: None,
  };
  s.apply_status_change(&publish).await.unwrap();

  let err = s.apply_status_change(&publish).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(goalline_core::Error::InvalidTransition {
      from: StoryStatus::Published,
      to:   StoryStatus::Published,
    })
  ));

  let stale_cancel = StatusChange {
    from: StoryStatus::Review,
    status: StoryStatus::Cancelled,
    ..publish.clone()
  };
  assert!(s.apply_status_change(&stale_cancel).await.is_err());
  let current = s.get_story(story.story_id).await.unwrap().unwrap();
  assert_eq!(current.status, StoryStatus::Published);

  let missing = StatusChange {
    story_id: Uuid::new_v4(),
    ..publish
  };
  assert!(matches!(
    s.apply_status_change(&missing).await.unwrap_err(),
    Error::Core(goalline_core::Error::NotFound(_))
  ));
}

#[tokio::test]
async fn list_stories_filters_by_status_text_and_tag() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let a = s
    .create_story(new_story(author.account.account_id, "Transfer window opens"))
    .await
    .unwrap();
  let b = s
    .create_story(new_story(author.account.account_id, "Derby preview"))
    .await
    .unwrap();
  s.apply_status_change(&StatusChange {
    story_id:     a.story_id,
    from:         StoryStatus::Draft,
    status:       StoryStatus::Published,
    published_at: Some(Utc::now()),
    reviewed_by:  None,
    reviewed_at:  None,
    review_notes: None,
  })
  .await
  .unwrap();
  s.set_story_tags(b.story_id, vec!["Premier League".into(), "premier league".into()])
    .await
    .unwrap();

  let published = s
    .list_stories(&StoryQuery {
      status: Some(StoryStatus::Published),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(published.len(), 1);
  assert_eq!(published[0].story_id, a.story_id);

  let by_text = s
    .list_stories(&StoryQuery { text: Some("TRANSFER".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_text.len(), 1);

  let by_author_name = s
    .list_stories(&StoryQuery { text: Some("report".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_author_name.len(), 2);

  let by_tag = s
    .list_stories(&StoryQuery { tag: Some("premier-league".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_tag.len(), 1);
  assert_eq!(by_tag[0].tags.len(), 1);
  assert_eq!(by_tag[0].tags[0].slug, "premier-league");
}

#[tokio::test]
async fn tags_are_shared_and_replaced() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let a = s
    .create_story(new_story(author.account.account_id, "One"))
    .await
    .unwrap();
  let b = s
    .create_story(new_story(author.account.account_id, "Two"))
    .await
    .unwrap();

  let ta = s.set_story_tags(a.story_id, vec!["Arsenal".into()]).await.unwrap();
  let tb = s
    .set_story_tags(b.story_id, vec!["Arsenal".into(), "Spurs".into()])
    .await
    .unwrap();
  assert_eq!(ta[0].tag_id, tb[0].tag_id);

  let replaced = s.set_story_tags(b.story_id, vec!["Spurs".into()]).await.unwrap();
  assert_eq!(replaced.len(), 1);
  assert_eq!(replaced[0].name, "Spurs");

  assert!(s.set_story_tags(Uuid::new_v4(), vec![]).await.is_err());
}

#[tokio::test]
async fn delete_story_cascades() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Gone"))
    .await
    .unwrap();
  let ch = s.add_chapter(chapter(story.story_id, "Intro", None)).await.unwrap();

  assert!(s.delete_story(story.story_id).await.unwrap());
  assert!(!s.delete_story(story.story_id).await.unwrap());
  assert!(s.get_chapter(ch.chapter_id).await.unwrap().is_none());
}

// ─── Chapters ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chapters_append_in_order() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Season review"))
    .await
    .unwrap();

  let first = s.add_chapter(chapter(story.story_id, "Autumn", None)).await.unwrap();
  let second = s.add_chapter(chapter(story.story_id, "Winter", None)).await.unwrap();
  assert_eq!(first.order, 0);
  assert_eq!(second.order, 1);
  assert_eq!(s.count_chapters(story.story_id).await.unwrap(), 2);

  let listed = s.list_chapters(story.story_id).await.unwrap();
  let titles: Vec<_> = listed.iter().map(|c| c.title.as_str()).collect();
  assert_eq!(titles, ["Autumn", "Winter"]);
}

#[tokio::test]
async fn duplicate_chapter_order_is_a_conflict() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Season review"))
    .await
    .unwrap();

  s.add_chapter(chapter(story.story_id, "Autumn", Some(3))).await.unwrap();
  let err = s
    .add_chapter(chapter(story.story_id, "Winter", Some(3)))
    .await
    .unwrap_err();
  assert!(is_conflict(&err));

  let next = s.add_chapter(chapter(story.story_id, "Spring", None)).await.unwrap();
  assert_eq!(next.order, 4);
}

#[tokio::test]
async fn chapter_edit_keeps_media_list() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Photo essay"))
    .await
    .unwrap();
  let ch = s.add_chapter(chapter(story.story_id, "Stands", None)).await.unwrap();

  let edited = s
    .update_chapter(ch.chapter_id, ChapterEdit {
      title: "The stands".into(),
      body:  "Packed.".into(),
      media: vec!["media/1.jpg".into(), "media/2.mp4".into()],
    })
    .await
    .unwrap();
  assert_eq!(edited.media, ["media/1.jpg", "media/2.mp4"]);
  assert_eq!(edited.order, ch.order);

  assert!(s.delete_chapter(ch.chapter_id).await.unwrap());
  assert!(s.update_chapter(ch.chapter_id, ChapterEdit {
    title: String::new(),
    body:  String::new(),
    media: vec![],
  })
  .await
  .is_err());
}

#[tokio::test]
async fn reorder_is_a_full_permutation() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Three acts"))
    .await
    .unwrap();
  let a = s.add_chapter(chapter(story.story_id, "A", None)).await.unwrap();
  let b = s.add_chapter(chapter(story.story_id, "B", None)).await.unwrap();
  let c = s.add_chapter(chapter(story.story_id, "C", None)).await.unwrap();

  let reordered = s
    .reorder_chapters(story.story_id, vec![c.chapter_id, a.chapter_id, b.chapter_id])
    .await
    .unwrap();
  let titles: Vec<_> = reordered.iter().map(|c| c.title.as_str()).collect();
  assert_eq!(titles, ["C", "A", "B"]);
  let orders: Vec<_> = reordered.iter().map(|c| c.order).collect();
  assert_eq!(orders, [0, 1, 2]);

  let missing = s
    .reorder_chapters(story.story_id, vec![a.chapter_id, b.chapter_id])
    .await
    .unwrap_err();
  assert!(matches!(missing, Error::Core(goalline_core::Error::Validation(_))));

  let repeated = s
    .reorder_chapters(story.story_id, vec![a.chapter_id, a.chapter_id, b.chapter_id])
    .await;
  assert!(repeated.is_err());
}

// ─── Engagement ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn story_like_toggles() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let fan = account(&s, "fan", Role::Customer).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Likeable"))
    .await
    .unwrap();

  let first = s
    .toggle_story_like(story.story_id, fan.account.account_id)
    .await
    .unwrap();
  assert_eq!(first.action, LikeAction::Liked);
  assert_eq!(first.likes_count, 1);
  assert!(s.has_liked_story(story.story_id, fan.account.account_id).await.unwrap());

  let second = s
    .toggle_story_like(story.story_id, fan.account.account_id)
    .await
    .unwrap();
  assert_eq!(second.action, LikeAction::Unliked);
  assert_eq!(second.likes_count, 0);
  assert!(!s.has_liked_story(story.story_id, fan.account.account_id).await.unwrap());

  let refreshed = s.get_story(story.story_id).await.unwrap().unwrap();
  assert_eq!(refreshed.likes_count, 0);
}

#[tokio::test]
async fn views_are_counted() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Viewed"))
    .await
    .unwrap();

  let v1 = s
    .record_view(NewStoryView {
      story_id:   story.story_id,
      account_id: None,
      ip_address: Some("203.0.113.7".into()),
    })
    .await
    .unwrap();
  let v2 = s
    .record_view(NewStoryView {
      story_id:   story.story_id,
      account_id: Some(author.account.account_id),
      ip_address: None,
    })
    .await
    .unwrap();
  assert_eq!((v1, v2), (1, 2));

  assert!(s
    .record_view(NewStoryView { story_id: Uuid::new_v4(), account_id: None, ip_address: None })
    .await
    .is_err());
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn comments_are_soft_deleted() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let fan = account(&s, "fan", Role::Customer).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Talking point"))
    .await
    .unwrap();

  let root = s
    .add_comment(NewComment {
      story_id:  story.story_id,
      author_id: fan.account.account_id,
      body:      "What a goal".into(),
      parent_id: None,
    })
    .await
    .unwrap();
  assert_eq!(root.author_username, "fan");
  assert!(root.active);

  let reply = s
    .add_comment(NewComment {
      story_id:  story.story_id,
      author_id: author.account.account_id,
      body:      "Agreed".into(),
      parent_id: Some(root.comment_id),
    })
    .await
    .unwrap();
  assert_eq!(reply.parent_id, Some(root.comment_id));

  assert!(s.deactivate_comment(root.comment_id).await.unwrap());
  assert!(!s.deactivate_comment(root.comment_id).await.unwrap());

  let all = s.list_comments(story.story_id).await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all.iter().any(|c| c.comment_id == root.comment_id && !c.active));

  let err = s
    .add_comment(NewComment {
      story_id:  story.story_id,
      author_id: fan.account.account_id,
      body:      "late reply".into(),
      parent_id: Some(root.comment_id),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(goalline_core::Error::Validation(_))));

  assert!(s.update_comment_body(root.comment_id, "edit".into()).await.is_err());
  let edited = s
    .update_comment_body(reply.comment_id, "Fully agreed".into())
    .await
    .unwrap();
  assert_eq!(edited.body, "Fully agreed");
}

#[tokio::test]
async fn comment_like_toggles() {
  let s = store().await;
  let author = account(&s, "reporter", Role::Editor).await;
  let fan = account(&s, "fan", Role::Customer).await;
  let story = s
    .create_story(new_story(author.account.account_id, "Talking point"))
    .await
    .unwrap();
  let comment = s
    .add_comment(NewComment {
      story_id:  story.story_id,
      author_id: author.account.account_id,
      body:      "Thoughts?".into(),
      parent_id: None,
    })
    .await
    .unwrap();

  let liked = s
    .toggle_comment_like(comment.comment_id, fan.account.account_id)
    .await
    .unwrap();
  assert_eq!((liked.action, liked.likes_count), (LikeAction::Liked, 1));

  let fetched = s.get_comment(comment.comment_id).await.unwrap().unwrap();
  assert_eq!(fetched.likes_count, 1);

  let unliked = s
    .toggle_comment_like(comment.comment_id, fan.account.account_id)
    .await
    .unwrap();
  assert_eq!((unliked.action, unliked.likes_count), (LikeAction::Unliked, 0));
}

// ─── Subscribers ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn subscribe_conflicts_then_reactivates() {
  let s = store().await;

  let created = s.subscribe("fan@example.com".into(), None).await.unwrap();
  assert!(matches!(created, SubscribeOutcome::Created(_)));
  let id = created.subscriber().subscriber_id;

  let err = s.subscribe("fan@example.com".into(), None).await.unwrap_err();
  assert!(is_conflict(&err));

  let gone = s.unsubscribe(id).await.unwrap().unwrap();
  assert!(!gone.active);
  assert!(s.active_subscribers().await.unwrap().is_empty());

  let back = s.subscribe("fan@example.com".into(), None).await.unwrap();
  assert!(matches!(back, SubscribeOutcome::Reactivated(_)));
  assert_eq!(back.subscriber().subscriber_id, id);
  assert_eq!(s.active_subscribers().await.unwrap().len(), 1);

  assert!(s.unsubscribe(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Feeds ───────────────────────────────────────────────────────────────────

fn item(source_id: Uuid, guid: &str, days_old: i64) -> NewFeedItem {
  NewFeedItem {
    source_id,
    title: format!("Headline {guid}"),
    description: "Match report".into(),
    content: String::new(),
    link: format!("https://example.com/{guid}"),
    author: String::new(),
    category: "Premier League".into(),
    guid: guid.into(),
    published_at: Utc::now() - Duration::days(days_old),
  }
}

#[tokio::test]
async fn ensure_source_is_get_or_create() {
  let s = store().await;
  let first = s
    .ensure_source(NewFeedSource::default_for(SourceKind::Guardian))
    .await
    .unwrap();
  let again = s
    .ensure_source(NewFeedSource::default_for(SourceKind::Guardian))
    .await
    .unwrap();
  assert_eq!(first.source_id, again.source_id);
  assert_eq!(first.name, "Guardian Football");
  assert!(first.last_fetched.is_none());

  let off = s.set_source_active(SourceKind::Guardian, false).await.unwrap().unwrap();
  assert!(!off.active);
  assert!(s.list_sources(true).await.unwrap().is_empty());
  assert_eq!(s.list_sources(false).await.unwrap().len(), 1);
  assert!(s.set_source_active(SourceKind::BbcSport, true).await.unwrap().is_none());

  assert_eq!(s.delete_all_sources().await.unwrap(), 1);
  assert!(s.get_source(SourceKind::Guardian).await.unwrap().is_none());
}

#[tokio::test]
async fn feed_items_dedupe_on_guid() {
  let s = store().await;
  let source = s
    .ensure_source(NewFeedSource::default_for(SourceKind::BbcSport))
    .await
    .unwrap();

  assert!(s.insert_feed_item(item(source.source_id, "abc", 0)).await.unwrap());
  assert!(!s.insert_feed_item(item(source.source_id, "abc", 0)).await.unwrap());
  assert!(s.insert_feed_item(item(source.source_id, "ABC", 0)).await.unwrap());
  assert!(s.feed_item_exists("abc".into()).await.unwrap());
  assert!(!s.feed_item_exists("missing".into()).await.unwrap());

  let all = s.list_feed_items(&FeedItemQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all.iter().all(|i| i.source_kind == SourceKind::BbcSport));
}

#[tokio::test]
async fn feed_item_filters_and_flags() {
  let s = store().await;
  let bbc = s
    .ensure_source(NewFeedSource::default_for(SourceKind::BbcSport))
    .await
    .unwrap();
  let sky = s
    .ensure_source(NewFeedSource::default_for(SourceKind::SkySports))
    .await
    .unwrap();
  s.insert_feed_item(item(bbc.source_id, "older", 2)).await.unwrap();
  s.insert_feed_item(item(bbc.source_id, "newer", 1)).await.unwrap();
  s.insert_feed_item(item(sky.source_id, "sky", 0)).await.unwrap();

  let bbc_items = s
    .list_feed_items(&FeedItemQuery {
      source: Some(SourceKind::BbcSport),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(bbc_items.len(), 2);
  assert_eq!(bbc_items[0].guid, "newer");

  let target = bbc_items[0].item_id;
  assert!(s.mark_feed_item_read(target).await.unwrap());
  let unread = s
    .list_feed_items(&FeedItemQuery { unread_only: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(unread.len(), 2);

  assert!(s.archive_feed_item(target).await.unwrap());
  let visible = s.list_feed_items(&FeedItemQuery::default()).await.unwrap();
  assert_eq!(visible.len(), 2);
  assert!(s.get_feed_item(target).await.unwrap().unwrap().archived);

  let by_text = s
    .list_feed_items(&FeedItemQuery { text: Some("headline sky".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_text.len(), 1);

  let by_category = s
    .list_feed_items(&FeedItemQuery { category: Some("premier".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_category.len(), 2);
}

#[tokio::test]
async fn retention_archives_then_deletes() {
  let s = store().await;
  let source = s
    .ensure_source(NewFeedSource::default_for(SourceKind::EspnSoccer))
    .await
    .unwrap();
  s.insert_feed_item(item(source.source_id, "fresh", 1)).await.unwrap();
  s.insert_feed_item(item(source.source_id, "month", 40)).await.unwrap();
  s.insert_feed_item(item(source.source_id, "ancient", 120)).await.unwrap();

  let now = Utc::now();
  assert_eq!(s.archive_items_before(now - Duration::days(30)).await.unwrap(), 2);
  assert_eq!(s.delete_archived_before(now - Duration::days(90)).await.unwrap(), 1);

  let counts = s.feed_counts().await.unwrap();
  assert_eq!(counts.total_items, 2);
  assert_eq!(counts.unread_items, 1);
  assert_eq!(counts.per_source.len(), 1);
  assert_eq!(counts.per_source[0].items, 2);
}

#[tokio::test]
async fn fetch_logs_and_recent_counts() {
  let s = store().await;
  let source = s
    .ensure_source(NewFeedSource::default_for(SourceKind::Guardian))
    .await
    .unwrap();
  s.insert_feed_item(item(source.source_id, "a", 0)).await.unwrap();

  let since = Utc::now() - Duration::hours(24);
  assert_eq!(s.count_items_fetched_since(since).await.unwrap(), 1);

  let log = s
    .record_fetch_log(NewFetchLog {
      source_id:     source.source_id,
      status:        FetchStatus::Partial,
      items_fetched: 10,
      items_new:     7,
      error_message: None,
      duration_secs: 0.42,
    })
    .await
    .unwrap();
  let logs = s.recent_fetch_logs(5).await.unwrap();
  assert_eq!(logs.len(), 1);
  assert_eq!(logs[0].log_id, log.log_id);
  assert_eq!(logs[0].status, FetchStatus::Partial);
  assert_eq!((logs[0].items_fetched, logs[0].items_new), (10, 7));

  let touched_at = Utc::now();
  s.touch_source(source.source_id, touched_at).await.unwrap();
  let source = s.get_source(SourceKind::Guardian).await.unwrap().unwrap();
  assert_eq!(source.last_fetched, Some(touched_at));
}
