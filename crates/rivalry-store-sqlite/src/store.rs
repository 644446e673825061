//! [`SqliteStore`], the SQLite implementation of [`RivalStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use rivalry_core::{
  achievement::UserAchievement,
  chat::{ChatMessage, NewChatMessage},
  item::{CompletionSet, CurriculumItem, ItemKind, NewItem},
  progress::{ProgressCounts, Tally},
  store::RivalStore,
  streak::StreakState,
  user::{JoinOutcome, MAX_MEMBERS, NewUser, User, icon_for_position},
};

use crate::{
  Error, Result,
  encode::{
    ITEM_COLUMNS, RawItem, RawMessage, RawStreak, RawTally, RawUnlock, RawUser,
    USER_COLUMNS, decode_dt, decode_kind, decode_uuid, encode_date, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rivalry store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What the join transaction decided, before the `User` is assembled.
enum Admission {
  Joined { icon: &'static str },
  Full,
  EmailTaken,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }
}

// ─── RivalStore impl ─────────────────────────────────────────────────────────

impl RivalStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn join_rival_code(&self, input: NewUser) -> Result<JoinOutcome> {
    let user_id    = Uuid::new_v4();
    let created_at = Utc::now();

    let id_str     = encode_uuid(user_id);
    let at_str     = encode_dt(created_at);
    let name       = input.name.clone();
    let email      = input.email.clone();
    let hash       = input.password_hash.clone();
    let code       = input.rival_code.clone();

    let admission = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the count below cannot
        // go stale before the insert.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let email_taken = tx
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if email_taken {
          return Ok(Admission::EmailTaken);
        }

        let members: i64 = tx.query_row(
          "SELECT COUNT(*) FROM users WHERE rival_code = ?1",
          rusqlite::params![code],
          |r| r.get(0),
        )?;
        let members = usize::try_from(members).unwrap_or(usize::MAX);
        if members >= MAX_MEMBERS {
          return Ok(Admission::Full);
        }

        let icon = icon_for_position(members);
        tx.execute(
          "INSERT INTO users (user_id, name, email, password_hash, icon, rival_code, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, name, email, hash, icon, code, at_str],
        )?;
        tx.execute(
          "INSERT INTO streaks (user_id, current_streak, longest_streak, last_activity_date, updated_at)
           VALUES (?1, 0, 0, NULL, ?2)",
          rusqlite::params![id_str, at_str],
        )?;
        tx.commit()?;
        Ok(Admission::Joined { icon })
      })
      .await?;

    Ok(match admission {
      Admission::Joined { icon } => JoinOutcome::Joined(User {
        user_id,
        name: input.name,
        email: input.email,
        icon: icon.to_owned(),
        rival_code: input.rival_code,
        created_at,
        password_hash: input.password_hash,
      }),
      Admission::Full => JoinOutcome::Full,
      Admission::EmailTaken => JoinOutcome::EmailTaken,
    })
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
              rusqlite::params![email],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn users_by_rival_code(&self, code: &str) -> Result<Vec<User>> {
    let code = code.to_owned();

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users WHERE rival_code = ?1
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![code], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  // ── Curriculum ────────────────────────────────────────────────────────────

  async fn add_item(&self, input: NewItem) -> Result<CurriculumItem> {
    let item = CurriculumItem {
      item_id:    Uuid::new_v4(),
      kind:       input.kind,
      subject:    input.subject.trim().to_owned(),
      grouping:   input.grouping.trim().to_owned(),
      number:     input.number.trim().to_owned(),
      name:       input.name.trim().to_owned(),
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(item.item_id);
    let kind_str = item.kind.discriminant();
    let subject  = item.subject.clone();
    let grouping = item.grouping.clone();
    let number   = item.number.clone();
    let name     = item.name.clone();
    let at_str   = encode_dt(item.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (item_id, kind, subject, item_group, number, name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, kind_str, subject, grouping, number, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(item)
  }

  async fn get_item(&self, id: Uuid) -> Result<Option<CurriculumItem>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1"),
              rusqlite::params![id_str],
              RawItem::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawItem::into_item).transpose()
  }

  async fn list_items(&self, kind: Option<ItemKind>) -> Result<Vec<CurriculumItem>> {
    let kind_str = kind.map(ItemKind::discriminant);

    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ITEM_COLUMNS} FROM items
           WHERE ?1 IS NULL OR kind = ?1
           ORDER BY subject, item_group, CAST(number AS INTEGER), number"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![kind_str], RawItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn delete_item(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM items WHERE item_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }

  // ── Completions ───────────────────────────────────────────────────────────

  async fn toggle_completion(
    &self,
    item_id: Uuid,
    user_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let item_str = encode_uuid(item_id);
    let user_str = encode_uuid(user_id);
    let at_str   = encode_dt(at);

    let completed = self
      .conn
      .call(move |conn| {
        // Delete-or-insert keyed on the primary key, never read-then-write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute(
          "DELETE FROM completions WHERE item_id = ?1 AND user_id = ?2",
          rusqlite::params![item_str, user_str],
        )?;
        if removed == 0 {
          tx.execute(
            "INSERT INTO completions (item_id, user_id, completed_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![item_str, user_str, at_str],
          )?;
        }
        tx.commit()?;
        Ok(removed == 0)
      })
      .await?;

    Ok(completed)
  }

  async fn completions_for_user(&self, user_id: Uuid) -> Result<CompletionSet> {
    let user_str = encode_uuid(user_id);

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT i.kind, c.item_id
           FROM completions c
           JOIN items i ON i.item_id = c.item_id
           WHERE c.user_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .iter()
      .map(|(kind, id)| -> Result<(ItemKind, Uuid)> {
        Ok((decode_kind(kind)?, decode_uuid(id)?))
      })
      .collect()
  }

  async fn completion_times_for_user(&self, user_id: Uuid) -> Result<Vec<DateTime<Utc>>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT completed_at FROM completions WHERE user_id = ?1 ORDER BY completed_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_dt(s)).collect()
  }

  async fn progress_counts(&self, user_id: Uuid) -> Result<ProgressCounts> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawTally> = self
      .conn
      .call(move |conn| {
        // One LEFT JOIN row per item since (item_id, user_id) is unique.
        let mut stmt = conn.prepare(
          "SELECT i.kind, i.subject, COUNT(c.item_id), COUNT(*)
           FROM items i
           LEFT JOIN completions c ON c.item_id = i.item_id AND c.user_id = ?1
           GROUP BY i.kind, i.subject",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |r| {
            Ok(RawTally {
              kind:      r.get(0)?,
              subject:   r.get(1)?,
              completed: r.get(2)?,
              total:     r.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut counts = ProgressCounts::default();
    for raw in &raws {
      let (kind, completed, total) = raw.decode()?;
      counts.record(kind, &raw.subject, Tally { completed, total });
    }
    Ok(counts)
  }

  // ── Streaks ───────────────────────────────────────────────────────────────

  async fn get_streak(&self, user_id: Uuid) -> Result<StreakState> {
    let user_str = encode_uuid(user_id);

    let raw: Option<RawStreak> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT current_streak, longest_streak, last_activity_date
               FROM streaks WHERE user_id = ?1",
              rusqlite::params![user_str],
              |r| {
                Ok(RawStreak {
                  current_streak:     r.get(0)?,
                  longest_streak:     r.get(1)?,
                  last_activity_date: r.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => raw.into_state(),
      None => Ok(StreakState::default()),
    }
  }

  async fn put_streak(&self, user_id: Uuid, state: StreakState) -> Result<()> {
    let user_str = encode_uuid(user_id);
    let last_str = state.last_activity_date.map(encode_date);
    let at_str   = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO streaks (user_id, current_streak, longest_streak, last_activity_date, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (user_id) DO UPDATE SET
             current_streak     = excluded.current_streak,
             longest_streak     = excluded.longest_streak,
             last_activity_date = excluded.last_activity_date,
             updated_at         = excluded.updated_at",
          rusqlite::params![user_str, state.current, state.longest, last_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Achievements ──────────────────────────────────────────────────────────

  async fn unlock_achievement(
    &self,
    user_id: Uuid,
    name: &str,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let user_str = encode_uuid(user_id);
    let name     = name.to_owned();
    let at_str   = encode_dt(at);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO user_achievements (user_id, achievement_name, unlocked_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![user_str, name, at_str],
        )?)
      })
      .await?;

    Ok(inserted == 1)
  }

  async fn user_achievements(&self, user_id: Uuid) -> Result<Vec<UserAchievement>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawUnlock> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, achievement_name, unlocked_at
           FROM user_achievements WHERE user_id = ?1
           ORDER BY unlocked_at, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |r| {
            Ok(RawUnlock {
              user_id:          r.get(0)?,
              achievement_name: r.get(1)?,
              unlocked_at:      r.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUnlock::into_unlock).collect()
  }

  // ── Chat ──────────────────────────────────────────────────────────────────

  async fn record_message(
    &self,
    input: NewChatMessage,
    at: DateTime<Utc>,
  ) -> Result<ChatMessage> {
    let message = ChatMessage {
      message_id: Uuid::new_v4(),
      user_id:    input.user_id,
      rival_code: input.rival_code,
      body:       input.body,
      created_at: at,
    };

    let id_str   = encode_uuid(message.message_id);
    let user_str = encode_uuid(message.user_id);
    let code     = message.rival_code.clone();
    let body     = message.body.clone();
    let at_str   = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO chat_messages (message_id, user_id, rival_code, body, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_str, code, body, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(message)
  }

  async fn messages_for_code(&self, code: &str, limit: usize) -> Result<Vec<ChatMessage>> {
    let code      = code.to_owned();
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        // Newest `limit` rows, then flipped back to chronological order.
        let mut stmt = conn.prepare(
          "SELECT message_id, user_id, rival_code, body, created_at FROM (
             SELECT rowid AS seq, message_id, user_id, rival_code, body, created_at
             FROM chat_messages
             WHERE rival_code = ?1
             ORDER BY created_at DESC, seq DESC
             LIMIT ?2
           )
           ORDER BY created_at ASC, seq ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![code, limit_val], |r| {
            Ok(RawMessage {
              message_id: r.get(0)?,
              user_id:    r.get(1)?,
              rival_code: r.get(2)?,
              body:       r.get(3)?,
              created_at: r.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn message_count(&self, user_id: Uuid) -> Result<u64> {
    let user_str = encode_uuid(user_id);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM chat_messages WHERE user_id = ?1",
          rusqlite::params![user_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    u64::try_from(count).map_err(|_| Error::OutOfRange(format!("message count = {count}")))
  }
}
