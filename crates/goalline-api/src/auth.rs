//! HTTP Basic authentication against stored accounts.
//!
//! Handlers take [`CurrentActor`] when a login is required and
//! [`MaybeActor`] when anonymous access is allowed. A request that sends
//! credentials must send valid ones either way.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use goalline_core::{
  account::{Actor, Member},
  store::NewsStore,
};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

pub fn verify_password(password_hash: &str, password: &str) -> bool {
  PasswordHash::new(password_hash).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

/// Decode `Authorization: Basic …`. `Ok(None)` when the header is absent.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let encoded = value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Basic "))
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok(Some((username.to_owned(), password.to_owned())))
}

async fn authenticate<S: NewsStore>(
  headers: &HeaderMap,
  state: &AppState<S>,
) -> Result<Option<Member>, ApiError> {
  let Some((username, password)) = basic_credentials(headers)? else {
    return Ok(None);
  };
  let member = state
    .newsroom
    .store()
    .get_account_by_username(username)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;
  if !verify_password(&member.account.password_hash, &password) {
    return Err(ApiError::Unauthorized);
  }
  Ok(Some(member))
}

/// A logged-in account. Rejects with 401 otherwise.
pub struct CurrentActor(pub Member);

impl CurrentActor {
  pub fn actor(&self) -> Actor { self.0.actor() }
}

/// An optional login.
pub struct MaybeActor(pub Option<Member>);

impl MaybeActor {
  pub fn actor(&self) -> Option<Actor> { self.0.as_ref().map(Member::actor) }
}

impl<S: NewsStore + 'static> FromRequestParts<AppState<S>> for CurrentActor {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, state)
      .await?
      .map(CurrentActor)
      .ok_or(ApiError::Unauthorized)
  }
}

impl<S: NewsStore + 'static> FromRequestParts<AppState<S>> for MaybeActor {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeActor(authenticate(&parts.headers, state).await?))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    map
  }

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("secret").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password(&hash, "secret"));
    assert!(!verify_password(&hash, "wrong"));
    assert!(!verify_password("not-a-phc-string", "secret"));
  }

  #[test]
  fn basic_header_parsing() {
    let encoded = format!("Basic {}", B64.encode("alice:pa:ss"));
    assert_eq!(
      basic_credentials(&headers(&encoded)).unwrap(),
      Some(("alice".into(), "pa:ss".into()))
    );
    assert_eq!(basic_credentials(&HeaderMap::new()).unwrap(), None);
    assert!(matches!(
      basic_credentials(&headers("Basic !!!not-base64!!!")),
      Err(ApiError::Unauthorized)
    ));
    assert!(matches!(
      basic_credentials(&headers("Bearer token")),
      Err(ApiError::Unauthorized)
    ));
  }
}
