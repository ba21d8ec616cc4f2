//! Threaded comments.
//!
//! Comments are never removed from storage: deleting one clears its `active`
//! flag. A soft-deleted comment hides its whole sub-thread from listings but
//! keeps the reply rows intact.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id:      Uuid,
  pub story_id:        Uuid,
  pub author_id:       Uuid,
  pub author_username: String,
  pub body:            String,
  pub parent_id:       Option<Uuid>,
  pub active:          bool,
  pub likes_count:     u64,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::CommentStore::add_comment`].
#[derive(Debug, Clone)]
pub struct NewComment {
  pub story_id:  Uuid,
  pub author_id: Uuid,
  pub body:      String,
  pub parent_id: Option<Uuid>,
}

/// A comment with its visible replies, as returned by listings.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
  #[serde(flatten)]
  pub comment:       Comment,
  /// Number of active direct replies.
  pub replies_count: usize,
  pub replies:       Vec<CommentNode>,
}

/// Arrange a story's comments into a tree.
///
/// Only active comments appear. Top-level comments come newest first;
/// replies oldest first so a conversation reads top to bottom.
pub fn build_thread(comments: Vec<Comment>) -> Vec<CommentNode> {
  let mut children: HashMap<Option<Uuid>, Vec<Comment>> = HashMap::new();
  for c in comments.into_iter().filter(|c| c.active) {
    children.entry(c.parent_id).or_default().push(c);
  }

  let mut roots = children.remove(&None).unwrap_or_default();
  roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  roots
    .into_iter()
    .map(|c| attach_replies(c, &mut children))
    .collect()
}

fn attach_replies(
  comment: Comment,
  children: &mut HashMap<Option<Uuid>, Vec<Comment>>,
) -> CommentNode {
  let mut direct = children.remove(&Some(comment.comment_id)).unwrap_or_default();
  direct.sort_by(|a, b| a.created_at.cmp(&b.created_at));
  let replies: Vec<CommentNode> = direct
    .into_iter()
    .map(|c| attach_replies(c, children))
    .collect();
  CommentNode { comment, replies_count: replies.len(), replies }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn comment(parent: Option<&Comment>, minutes: i64, active: bool) -> Comment {
    let at = Utc::now() + Duration::minutes(minutes);
    Comment {
      comment_id: Uuid::new_v4(),
      story_id: Uuid::nil(),
      author_id: Uuid::nil(),
      author_username: "fan".into(),
      body: format!("comment at {minutes}"),
      parent_id: parent.map(|p| p.comment_id),
      active,
      likes_count: 0,
      created_at: at,
      updated_at: at,
    }
  }

  #[test]
  fn roots_are_newest_first_and_replies_oldest_first() {
    let old_root = comment(None, 0, true);
    let new_root = comment(None, 10, true);
    let late_reply = comment(Some(&old_root), 5, true);
    let early_reply = comment(Some(&old_root), 1, true);

    let tree = build_thread(vec![
      old_root.clone(),
      late_reply.clone(),
      new_root.clone(),
      early_reply.clone(),
    ]);

    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].comment.comment_id, new_root.comment_id);
    assert_eq!(tree[1].comment.comment_id, old_root.comment_id);
    assert_eq!(tree[1].replies_count, 2);
    assert_eq!(tree[1].replies[0].comment.comment_id, early_reply.comment_id);
    assert_eq!(tree[1].replies[1].comment.comment_id, late_reply.comment_id);
  }

  #[test]
  fn inactive_comments_and_their_replies_are_hidden() {
    let root = comment(None, 0, true);
    let removed = comment(Some(&root), 1, false);
    let orphan = comment(Some(&removed), 2, true);
    let kept = comment(Some(&root), 3, true);

    let tree = build_thread(vec![root, removed, orphan, kept.clone()]);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].replies_count, 1);
    assert_eq!(tree[0].replies[0].comment.comment_id, kept.comment_id);
  }

  #[test]
  fn replies_nest_beyond_two_levels() {
    let root = comment(None, 0, true);
    let reply = comment(Some(&root), 1, true);
    let nested = comment(Some(&reply), 2, true);

    let tree = build_thread(vec![nested.clone(), reply, root]);
    assert_eq!(tree[0].replies[0].replies[0].comment.comment_id, nested.comment_id);
  }
}
