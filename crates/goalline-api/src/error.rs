//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use goalline_core::store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication required")]
  Unauthorized,

  #[error("permission denied: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("feed error: {0}")]
  Feeds(#[source] goalline_feeds::Error),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Surface domain rejections carried by a backend error; anything else is
  /// an opaque storage failure.
  pub fn store<E: StoreError>(err: E) -> Self {
    match err.domain() {
      Some(domain) => domain.clone().into(),
      None => ApiError::Store(Box::new(err)),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Store(_) | ApiError::Feeds(_) | ApiError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl From<goalline_core::Error> for ApiError {
  fn from(err: goalline_core::Error) -> Self {
    use goalline_core::Error as Core;
    match err {
      Core::Validation(m) => ApiError::BadRequest(m),
      Core::Forbidden(m) => ApiError::Forbidden(m),
      Core::NotFound(m) => ApiError::NotFound(m),
      Core::Conflict(m) => ApiError::Conflict(m),
      e @ Core::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
    }
  }
}

impl From<goalline_feeds::Error> for ApiError {
  fn from(err: goalline_feeds::Error) -> Self {
    use goalline_feeds::Error as Feeds;
    match err {
      Feeds::UnknownSource(kind) => {
        ApiError::NotFound(format!("feed source {kind} is not configured"))
      }
      Feeds::InactiveSource(kind) => {
        ApiError::Conflict(format!("feed source {kind} is inactive"))
      }
      other => ApiError::Feeds(other),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    let body = Json(json!({ "status": "error", "message": self.to_string() }));
    let mut res = (status, body).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"goalline\""),
      );
    }
    res
  }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
