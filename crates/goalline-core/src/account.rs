//! Accounts, profiles and the role model.
//!
//! Every account owns exactly one profile; both rows are written in the same
//! transaction by [`crate::store::AccountStore::create_account`]. Role checks go
//! through [`Role::can`] and nowhere else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Roles ───────────────────────────────────────────────────────────────────

/// The role tag attached to every profile.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  /// A reader: may comment, like and subscribe.
  #[default]
  Customer,
  /// May write stories and submit them for review.
  Editor,
  /// Publish, reject and cancel authority over every story.
  ChiefEditor,
}

/// Something an account may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
  WriteStories,
  ReviewStories,
  PublishStories,
  ManageFeeds,
  ManageAccounts,
}

impl Role {
  /// The single capability check. All permission predicates are built on it.
  pub fn can(self, capability: Capability) -> bool {
    match capability {
      Capability::WriteStories => {
        matches!(self, Self::Editor | Self::ChiefEditor)
      }
      Capability::ReviewStories
      | Capability::PublishStories
      | Capability::ManageFeeds
      | Capability::ManageAccounts => self == Self::ChiefEditor,
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// An authenticable identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub account_id:    Uuid,
  pub username:      String,
  pub email:         String,
  /// PHC string produced by argon2; never serialised to clients.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Role and editorial metadata, one-to-one with [`Account`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub account_id:     Uuid,
  pub role:           Role,
  /// Editor verification status, set by a chief editor.
  pub verified:       bool,
  pub specialization: Option<String>,
  pub bio:            Option<String>,
  pub website:        Option<String>,
  pub phone:          Option<String>,
  pub updated_at:     DateTime<Utc>,
}

/// An account joined with its profile, which is how every read returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub account: Account,
  pub profile: Profile,
}

impl Member {
  pub fn actor(&self) -> Actor {
    Actor {
      account_id: self.account.account_id,
      username:   self.account.username.clone(),
      role:       self.profile.role,
    }
  }
}

/// Input to [`crate::store::AccountStore::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub role:          Role,
}

/// Self-service profile changes. `None` leaves a field untouched; an empty
/// string clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
  pub specialization: Option<String>,
  pub bio:            Option<String>,
  pub website:        Option<String>,
  pub phone:          Option<String>,
}

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The authenticated account performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub account_id: Uuid,
  pub username:   String,
  pub role:       Role,
}

impl Actor {
  pub fn can(&self, capability: Capability) -> bool {
    self.role.can(capability)
  }
}
