//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! ordering matches time ordering. Calendar dates are `YYYY-MM-DD`. UUIDs are
//! hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rivalry_core::{
  achievement::UserAchievement,
  chat::ChatMessage,
  item::{CurriculumItem, ItemKind},
  streak::StreakState,
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── ItemKind ────────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<ItemKind> {
  ItemKind::from_discriminant(s).ok_or_else(|| Error::UnknownItemKind(s.into()))
}

fn decode_count(v: i64, column: &str) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::OutOfRange(format!("{column} = {v}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, name, email, password_hash, icon, rival_code, created_at";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
  pub icon:          String,
  pub rival_code:    String,
  pub created_at:    String,
}

impl RawUser {
  /// Read a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      password_hash: row.get(3)?,
      icon:          row.get(4)?,
      rival_code:    row.get(5)?,
      created_at:    row.get(6)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      name:          self.name,
      email:         self.email,
      icon:          self.icon,
      rival_code:    self.rival_code,
      created_at:    decode_dt(&self.created_at)?,
      password_hash: self.password_hash,
    })
  }
}

pub const ITEM_COLUMNS: &str =
  "item_id, kind, subject, item_group, number, name, created_at";

/// Raw strings read directly from an `items` row.
pub struct RawItem {
  pub item_id:    String,
  pub kind:       String,
  pub subject:    String,
  pub item_group: String,
  pub number:     String,
  pub name:       String,
  pub created_at: String,
}

impl RawItem {
  /// Read a row selected with [`ITEM_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:    row.get(0)?,
      kind:       row.get(1)?,
      subject:    row.get(2)?,
      item_group: row.get(3)?,
      number:     row.get(4)?,
      name:       row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_item(self) -> Result<CurriculumItem> {
    Ok(CurriculumItem {
      item_id:    decode_uuid(&self.item_id)?,
      kind:       decode_kind(&self.kind)?,
      subject:    self.subject,
      grouping:   self.item_group,
      number:     self.number,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `streaks` row.
pub struct RawStreak {
  pub current_streak:     i64,
  pub longest_streak:     i64,
  pub last_activity_date: Option<String>,
}

impl RawStreak {
  pub fn into_state(self) -> Result<StreakState> {
    Ok(StreakState {
      current:            decode_count(self.current_streak, "current_streak")?,
      longest:            decode_count(self.longest_streak, "longest_streak")?,
      last_activity_date: self
        .last_activity_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
    })
  }
}

/// Raw strings read from a `user_achievements` row.
pub struct RawUnlock {
  pub user_id:          String,
  pub achievement_name: String,
  pub unlocked_at:      String,
}

impl RawUnlock {
  pub fn into_unlock(self) -> Result<UserAchievement> {
    Ok(UserAchievement {
      user_id:          decode_uuid(&self.user_id)?,
      achievement_name: self.achievement_name,
      unlocked_at:      decode_dt(&self.unlocked_at)?,
    })
  }
}

/// Raw strings read from a `chat_messages` row.
pub struct RawMessage {
  pub message_id: String,
  pub user_id:    String,
  pub rival_code: String,
  pub body:       String,
  pub created_at: String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<ChatMessage> {
    Ok(ChatMessage {
      message_id: decode_uuid(&self.message_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      rival_code: self.rival_code,
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// One `(kind, subject)` aggregate row from the progress query.
pub struct RawTally {
  pub kind:      String,
  pub subject:   String,
  pub completed: i64,
  pub total:     i64,
}

impl RawTally {
  pub fn decode(&self) -> Result<(ItemKind, u32, u32)> {
    Ok((
      decode_kind(&self.kind)?,
      decode_count(self.completed, "completed")?,
      decode_count(self.total, "total")?,
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let early = DateTime::parse_from_rfc3339("2026-03-04T09:00:00Z")
      .unwrap()
      .with_timezone(&Utc);
    let late = early + chrono::Duration::milliseconds(1500);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn dates_use_iso_form() {
    let d = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
    assert_eq!(encode_date(d), "2026-01-09");
    assert_eq!(decode_date("2026-01-09").unwrap(), d);
    assert!(decode_date("09/01/2026").is_err());
  }

  #[test]
  fn negative_counts_are_rejected() {
    let raw = RawStreak {
      current_streak:     -1,
      longest_streak:     0,
      last_activity_date: None,
    };
    assert!(matches!(raw.into_state(), Err(Error::OutOfRange(_))));
  }
}
