//! Error type for `goalline-feeds`.

use goalline_core::feed::SourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("unexpected HTTP status {0}")]
  Status(reqwest::StatusCode),

  /// The body was neither a readable RSS channel nor an Atom feed.
  #[error("feed parsing error: rss: {rss}; atom: {atom}")]
  Parse { rss: String, atom: String },

  #[error("store error: {0}")]
  Store(Box<dyn std::error::Error + Send + Sync>),

  #[error("feed source {0} is not configured")]
  UnknownSource(SourceKind),

  #[error("feed source {0} is inactive")]
  InactiveSource(SourceKind),

  #[error("all {0} active sources failed to fetch")]
  AllSourcesFailed(usize),

  #[error("scheduler task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
}

impl Error {
  pub(crate) fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
