//! Error type for `goalline-store-sqlite`.

use goalline_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] goalline_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored tag column held a value no enum variant matches.
  #[error("unknown {column} value: {value:?}")]
  UnknownTag { column: &'static str, value: String },
}

impl Error {
  /// Map a UNIQUE/foreign-key violation to a domain conflict; pass anything
  /// else through.
  pub(crate) fn conflict_or(err: tokio_rusqlite::Error, what: &str) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) =
      &err
      && e.code == rusqlite::ErrorCode::ConstraintViolation
    {
      return Error::Core(goalline_core::Error::Conflict(what.to_owned()));
    }
    Error::Database(err)
  }

  pub(crate) fn not_found(what: impl Into<String>) -> Self {
    Error::Core(goalline_core::Error::NotFound(what.into()))
  }
}

impl StoreError for Error {
  fn domain(&self) -> Option<&goalline_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
