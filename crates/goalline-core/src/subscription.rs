//! Email subscribers and the publish notice they receive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, story::Story};

/// An email recipient. Unsubscribing deactivates the row; it is never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
  pub subscriber_id: Uuid,
  pub email:         String,
  pub account_id:    Option<Uuid>,
  pub active:        bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// How [`crate::store::SubscriberStore::subscribe`] satisfied the request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "subscriber", rename_all = "snake_case")]
pub enum SubscribeOutcome {
  Created(Subscriber),
  /// The address had unsubscribed earlier and is active again.
  Reactivated(Subscriber),
}

impl SubscribeOutcome {
  pub fn subscriber(&self) -> &Subscriber {
    match self {
      Self::Created(s) | Self::Reactivated(s) => s,
    }
  }
}

/// Trim, lowercase and validate an address.
pub fn normalize_email(raw: &str) -> Result<String> {
  let email = raw.trim().to_lowercase();
  if validator::validate_email(email.as_str()) {
    Ok(email)
  } else {
    Err(Error::Validation(format!("invalid email address: {raw:?}")))
  }
}

// ─── Notices ─────────────────────────────────────────────────────────────────

/// One email to one subscriber about one newly published story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishNotice {
  pub subscriber_id: Uuid,
  pub story_id:      Uuid,
  pub to:            String,
  pub subject:       String,
  pub body:          String,
}

impl PublishNotice {
  pub fn compose(story: &Story, subscriber: &Subscriber, site_url: &str) -> Self {
    let site = site_url.trim_end_matches('/');
    let summary = if story.summary.trim().is_empty() {
      String::new()
    } else {
      format!("{}\n\n", story.summary.trim())
    };
    let body = format!(
      "A new story has just been published on Goal Line Report.\n\n\
       {title}\nby {author}\n\n\
       {summary}\
       Read it here: {site}/stories/{slug}\n\n\
       --\n\
       You are receiving this because {email} is subscribed.\n\
       Unsubscribe: {site}/subscriptions/{id}/unsubscribe\n",
      title = story.title,
      author = story.author_username,
      slug = story.slug,
      email = subscriber.email,
      id = subscriber.subscriber_id,
    );
    Self {
      subscriber_id: subscriber.subscriber_id,
      story_id: story.story_id,
      to: subscriber.email.clone(),
      subject: format!("New Story Published: {}", story.title),
      body,
    }
  }
}

/// Accepts publish notices for delivery. Implementations queue each notice
/// independently so a failing recipient never holds up the others.
pub trait Notifier: Send + Sync {
  /// Queue every notice; returns how many were accepted.
  fn enqueue(&self, notices: Vec<PublishNotice>) -> usize;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::story::StoryStatus;

  #[test]
  fn normalize_email_lowercases_and_trims() {
    assert_eq!(normalize_email("  Fan@Example.COM ").unwrap(), "fan@example.com");
  }

  #[test]
  fn normalize_email_rejects_garbage() {
    assert!(matches!(normalize_email("not-an-email"), Err(Error::Validation(_))));
    assert!(normalize_email("").is_err());
  }

  #[test]
  fn notice_mentions_story_and_unsubscribe_link() {
    let now = Utc::now();
    let story = Story {
      story_id: Uuid::new_v4(),
      title: "Title race tightens".into(),
      slug: "title-race-tightens".into(),
      body: String::new(),
      summary: "Three points in it.".into(),
      status: StoryStatus::Published,
      author_id: Uuid::new_v4(),
      author_username: "reporter".into(),
      published_at: Some(now),
      reviewed_by: None,
      reviewed_at: None,
      review_notes: None,
      views_count: 0,
      likes_count: 0,
      tags: vec![],
      created_at: now,
      updated_at: now,
    };
    let subscriber = Subscriber {
      subscriber_id: Uuid::new_v4(),
      email: "fan@example.com".into(),
      account_id: None,
      active: true,
      created_at: now,
      updated_at: now,
    };

    let notice = PublishNotice::compose(&story, &subscriber, "https://glr.test/");
    assert_eq!(notice.subject, "New Story Published: Title race tightens");
    assert_eq!(notice.to, "fan@example.com");
    assert!(notice.body.contains("https://glr.test/stories/title-race-tightens"));
    assert!(notice.body.contains(&format!(
      "https://glr.test/subscriptions/{}/unsubscribe",
      subscriber.subscriber_id
    )));
    assert!(notice.body.contains("Three points in it."));
  }
}
