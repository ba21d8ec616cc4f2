//! Handlers for `/accounts` and `/authors`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/accounts` | Body: [`Registration`]; always a customer |
//! | `GET`  | `/accounts/me` | The authenticated member |
//! | `PUT`  | `/accounts/me/profile` | Body: [`ProfileUpdate`] |
//! | `PUT`  | `/accounts/{username}/role` | Body: [`RoleChange`]; chief editor |
//! | `GET`  | `/authors/{username}` | Member plus published stories |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use goalline_core::{
  account::{Member, ProfileUpdate, Role},
  store::NewsStore,
};

use crate::{
  AppState, Success,
  auth::CurrentActor,
  error::Result,
  newsroom::{AuthorPage, Registration, RoleChange},
  success,
};

/// `POST /accounts` — returns 201 + the new member.
pub async fn register<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<Registration>,
) -> Result<impl IntoResponse> {
  let member = state.newsroom.register(body, Role::Customer).await?;
  Ok((StatusCode::CREATED, success(member)))
}

/// `GET /accounts/me`
pub async fn me(CurrentActor(member): CurrentActor) -> Json<Success<Member>> {
  success(member)
}

/// `PUT /accounts/me/profile`
pub async fn update_profile<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<Success<Member>>> {
  let member = state.newsroom.update_profile(&current.actor(), body).await?;
  Ok(success(member))
}

/// `PUT /accounts/{username}/role`
pub async fn set_role<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentActor,
  Path(username): Path<String>,
  Json(body): Json<RoleChange>,
) -> Result<Json<Success<Member>>> {
  let member = state
    .newsroom
    .set_role(&current.actor(), &username, body)
    .await?;
  Ok(success(member))
}

/// `GET /authors/{username}`
pub async fn author_page<S: NewsStore + 'static>(
  State(state): State<AppState<S>>,
  Path(username): Path<String>,
) -> Result<Json<Success<AuthorPage>>> {
  Ok(success(state.newsroom.author_page(&username).await?))
}
