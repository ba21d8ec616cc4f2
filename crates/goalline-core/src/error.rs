//! Error types for `goalline-core`.

use thiserror::Error;

use crate::story::StoryStatus;

/// Domain-level rejections. Storage backends wrap these so callers can tell
/// a refused operation apart from an I/O failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("{0}")]
  Validation(String),

  #[error("permission denied: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("cannot move a {from} story to {to}")]
  InvalidTransition { from: StoryStatus, to: StoryStatus },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
