//! The `RivalStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `rivalry-store-sqlite`).
//! The [`Tracker`](crate::tracker::Tracker) depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  achievement::UserAchievement,
  chat::{ChatMessage, NewChatMessage},
  item::{CompletionSet, CurriculumItem, ItemKind, NewItem},
  progress::ProgressCounts,
  streak::StreakState,
  user::{JoinOutcome, NewUser, User},
};

/// Abstraction over a rivalry store backend.
///
/// Two operations carry invariants the backend must hold atomically:
/// [`join_rival_code`](Self::join_rival_code) never lets a third user share a
/// code, and [`toggle_completion`](Self::toggle_completion) never leaves two
/// rows for one `(item, user)` pair.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RivalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert a user under `input.rival_code` unless the code already has two
  /// members. The count and the insert are one atomic step.
  fn join_rival_code(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<JoinOutcome, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Members of a rival code, in signup order.
  fn users_by_rival_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + 'a;

  // ── Curriculum ────────────────────────────────────────────────────────

  fn add_item(
    &self,
    input: NewItem,
  ) -> impl Future<Output = Result<CurriculumItem, Self::Error>> + Send + '_;

  fn get_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CurriculumItem>, Self::Error>> + Send + '_;

  /// Items ordered by subject, grouping and number; all kinds when `kind`
  /// is `None`.
  fn list_items(
    &self,
    kind: Option<ItemKind>,
  ) -> impl Future<Output = Result<Vec<CurriculumItem>, Self::Error>> + Send + '_;

  /// Delete an item and, by cascade, its completions. Returns `false` if the
  /// item did not exist.
  fn delete_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Completions ───────────────────────────────────────────────────────

  /// Invert the completion state of `(item_id, user_id)` and return the new
  /// state. A new completion is stamped with `at`.
  fn toggle_completion(
    &self,
    item_id: Uuid,
    user_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn completions_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<CompletionSet, Self::Error>> + Send + '_;

  /// One timestamp per completion over all kinds, oldest first. Not
  /// deduplicated by day.
  fn completion_times_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DateTime<Utc>>, Self::Error>> + Send + '_;

  /// Completed and total item counts per `(kind, subject)`.
  fn progress_counts(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<ProgressCounts, Self::Error>> + Send + '_;

  // ── Streaks ───────────────────────────────────────────────────────────

  /// The stored streak, or the zero state if none has been written.
  fn get_streak(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<StreakState, Self::Error>> + Send + '_;

  fn put_streak(
    &self,
    user_id: Uuid,
    state: StreakState,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Achievements ──────────────────────────────────────────────────────

  /// Record an unlock. Returns `false` without error if the pair already
  /// exists.
  fn unlock_achievement<'a>(
    &'a self,
    user_id: Uuid,
    name: &'a str,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Unlock records for a user, oldest first.
  fn user_achievements(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<UserAchievement>, Self::Error>> + Send + '_;

  // ── Chat ──────────────────────────────────────────────────────────────

  fn record_message(
    &self,
    input: NewChatMessage,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<ChatMessage, Self::Error>> + Send + '_;

  /// The most recent `limit` messages for a rival code, oldest first.
  fn messages_for_code<'a>(
    &'a self,
    code: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ChatMessage>, Self::Error>> + Send + 'a;

  fn message_count(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
