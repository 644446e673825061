//! Chat messages exchanged within a rival pairing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Upper bound on a single message body, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A persisted message. `rival_code` scopes visibility to the sender's
/// pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub message_id: Uuid,
  pub user_id:    Uuid,
  pub rival_code: String,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::RivalStore::record_message`].
#[derive(Debug, Clone)]
pub struct NewChatMessage {
  pub user_id:    Uuid,
  pub rival_code: String,
  pub body:       String,
}

impl NewChatMessage {
  /// Trim the body and reject it if nothing is left or it is too long.
  pub fn new(user_id: Uuid, rival_code: &str, body: &str) -> Result<Self> {
    let body = body.trim();
    if body.is_empty() {
      return Err(Error::Validation("message cannot be empty".into()));
    }
    if body.chars().count() > MAX_MESSAGE_CHARS {
      return Err(Error::Validation(format!(
        "message exceeds {MAX_MESSAGE_CHARS} characters"
      )));
    }
    Ok(Self {
      user_id,
      rival_code: rival_code.to_owned(),
      body: body.to_owned(),
    })
  }
}

/// A message annotated for display to `viewer`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEntry {
  #[serde(flatten)]
  pub message:         ChatMessage,
  pub sender_name:     String,
  pub sender_icon:     String,
  pub is_current_user: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn body_is_trimmed() {
    let m = NewChatMessage::new(Uuid::new_v4(), "duel", "  gg  \n").unwrap();
    assert_eq!(m.body, "gg");
  }

  #[test]
  fn whitespace_only_body_is_rejected() {
    let err = NewChatMessage::new(Uuid::new_v4(), "duel", " \t ").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn overlong_body_is_rejected() {
    let body = "a".repeat(MAX_MESSAGE_CHARS + 1);
    assert!(NewChatMessage::new(Uuid::new_v4(), "duel", &body).is_err());
  }
}
