//! Users and the rival pairing derived from a shared rival code.
//!
//! A pairing is not stored anywhere. It is the set of users whose
//! `rival_code` matches, and it never holds more than [`MAX_MEMBERS`] users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// The number of users a rival code can hold.
pub const MAX_MEMBERS: usize = 2;

/// Icons handed out in signup order.
const MEMBER_ICONS: [&str; MAX_MEMBERS] = ["🦊", "⚡"];

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub name:          String,
  pub email:         String,
  pub icon:          String,
  pub rival_code:    String,
  pub created_at:    DateTime<Utc>,
  /// PHC string owned by the authentication layer; never sent to clients.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
}

/// The public part of a [`User`], embedded in comparison views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
  pub user_id: Uuid,
  pub name:    String,
  pub icon:    String,
}

impl From<&User> for UserSummary {
  fn from(u: &User) -> Self {
    Self {
      user_id: u.user_id,
      name:    u.name.clone(),
      icon:    u.icon.clone(),
    }
  }
}

/// Input to [`crate::store::RivalStore::join_rival_code`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         String,
  pub rival_code:    String,
  pub password_hash: String,
}

impl NewUser {
  /// Reject blank required fields before anything reaches the store.
  pub fn validate(&self) -> Result<()> {
    for (field, value) in [
      ("name", &self.name),
      ("email", &self.email),
      ("rival_code", &self.rival_code),
      ("password", &self.password_hash),
    ] {
      if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
      }
    }
    Ok(())
  }
}

/// The icon for the `position`-th member of a pairing (zero-based).
pub fn icon_for_position(position: usize) -> &'static str {
  MEMBER_ICONS.get(position).copied().unwrap_or(MEMBER_ICONS[0])
}

/// Result of an attempt to join a rival code.
#[derive(Debug, Clone)]
pub enum JoinOutcome {
  Joined(User),
  /// The code already has [`MAX_MEMBERS`] users; nothing was written.
  Full,
  /// Another account already uses this email; nothing was written.
  EmailTaken,
}

/// All users sharing one rival code.
#[derive(Debug, Clone, Serialize)]
pub struct RivalPairing {
  pub rival_code: String,
  pub members:    Vec<User>,
}

impl RivalPairing {
  /// Build a pairing from the users returned for a code.
  ///
  /// An empty member list is reported as [`Error::PairingNotFound`].
  pub fn from_members(rival_code: &str, members: Vec<User>) -> Result<Self> {
    if members.is_empty() {
      return Err(Error::PairingNotFound(rival_code.to_owned()));
    }
    Ok(Self { rival_code: rival_code.to_owned(), members })
  }

  /// The member that is not `user_id`, if one has signed up yet.
  pub fn counterpart(&self, user_id: Uuid) -> Option<&User> {
    self.members.iter().find(|m| m.user_id != user_id)
  }

  pub fn is_full(&self) -> bool { self.members.len() >= MAX_MEMBERS }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(name: &str) -> User {
    User {
      user_id:       Uuid::new_v4(),
      name:          name.into(),
      email:         format!("{name}@example.com"),
      icon:          "🦊".into(),
      rival_code:    "duel".into(),
      created_at:    Utc::now(),
      password_hash: String::new(),
    }
  }

  #[test]
  fn empty_pairing_is_not_found() {
    let err = RivalPairing::from_members("duel", vec![]).unwrap_err();
    assert!(matches!(err, Error::PairingNotFound(code) if code == "duel"));
  }

  #[test]
  fn counterpart_of_single_member_is_none() {
    let a = user("ada");
    let pairing = RivalPairing::from_members("duel", vec![a.clone()]).unwrap();
    assert!(pairing.counterpart(a.user_id).is_none());
    assert!(!pairing.is_full());
  }

  #[test]
  fn counterpart_resolves_the_other_member() {
    let a = user("ada");
    let b = user("bob");
    let pairing =
      RivalPairing::from_members("duel", vec![a.clone(), b.clone()]).unwrap();
    assert_eq!(pairing.counterpart(a.user_id).unwrap().user_id, b.user_id);
    assert_eq!(pairing.counterpart(b.user_id).unwrap().user_id, a.user_id);
    assert!(pairing.is_full());
  }

  #[test]
  fn blank_fields_fail_validation() {
    let input = NewUser {
      name:          "ada".into(),
      email:         "  ".into(),
      rival_code:    "duel".into(),
      password_hash: "x".into(),
    };
    assert!(matches!(input.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn password_hash_is_not_serialised() {
    let mut u = user("ada");
    u.password_hash = "$argon2id$secret".into();
    let json = serde_json::to_string(&u).unwrap();
    assert!(!json.contains("secret"));
  }
}
