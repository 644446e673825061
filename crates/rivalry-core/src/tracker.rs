//! [`Tracker`], the service that chains a completion toggle through streak
//! recomputation and achievement evaluation.
//!
//! Side effects of a completion (streak, unlocks) are best effort. The
//! completion itself is committed first; if a side effect fails it is logged
//! and picked up again by the next triggering event, since both recomputes
//! are pure functions of persisted state.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset as _, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  achievement::{Achievement, Catalog, Metrics, UserAchievement},
  chat::{ChatEntry, ChatMessage, NewChatMessage},
  clock::{Clock, SystemClock},
  compare::{Aggregates, Dashboard, Leader, compare},
  item::{CurriculumItem, ItemKind, ItemStatus, NewItem},
  store::RivalStore,
  streak::{StreakState, local_date},
  user::{JoinOutcome, NewUser, RivalPairing, User, UserSummary},
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TrackerConfig {
  /// Offset of the reference timezone that defines calendar days.
  pub utc_offset:         FixedOffset,
  /// Last day of the rivalry battle, if one is scheduled.
  pub battle_end:         Option<NaiveDate>,
  pub chat_history_limit: usize,
}

impl Default for TrackerConfig {
  fn default() -> Self {
    Self {
      utc_offset:         Utc.fix(),
      battle_end:         None,
      chat_history_limit: 200,
    }
  }
}

// ─── Views ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ToggleResult {
  pub completed: bool,
  /// Names of achievements unlocked by this toggle.
  pub unlocked:  Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlockedAchievement {
  pub name:        String,
  pub unlocked_at: DateTime<Utc>,
  /// Catalog details; absent if the entry was removed from the catalog after
  /// it was unlocked.
  pub icon:        Option<String>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementsView {
  pub unlocked:           Vec<UnlockedAchievement>,
  pub total_catalog_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementRow {
  #[serde(flatten)]
  pub achievement:       Achievement,
  pub user_unlocked_at:  Option<DateTime<Utc>>,
  pub rival_unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementComparison {
  pub user:   UserSummary,
  pub rival:  UserSummary,
  pub rows:   Vec<AchievementRow>,
  pub leader: Leader,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattleStatus {
  pub end_date:       Option<NaiveDate>,
  pub has_ended:      bool,
  pub days_remaining: Option<i64>,
  pub user_total:     u32,
  pub rival_total:    u32,
  pub winner:         Leader,
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

pub struct Tracker<S, C = SystemClock> {
  store:   Arc<S>,
  clock:   C,
  catalog: Catalog,
  config:  TrackerConfig,
}

impl<S, C> Tracker<S, C>
where
  S: RivalStore,
  C: Clock,
{
  pub fn new(
    store: Arc<S>,
    clock: C,
    catalog: Catalog,
    config: TrackerConfig,
  ) -> Self {
    Self { store, clock, catalog, config }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn catalog(&self) -> &Catalog { &self.catalog }

  /// Today's date in the reference timezone.
  pub fn today(&self) -> NaiveDate {
    local_date(self.clock.now(), self.config.utc_offset)
  }

  // ── Pairing ─────────────────────────────────────────────────────────────

  /// Sign `input` up under its rival code.
  pub async fn join_rival_code(&self, input: NewUser) -> Result<User> {
    input.validate()?;
    let code = input.rival_code.clone();
    let email = input.email.clone();
    match self.store.join_rival_code(input).await.map_err(Error::store)? {
      JoinOutcome::Joined(user) => {
        info!(user_id = %user.user_id, rival_code = %code, "user joined rival code");
        Ok(user)
      }
      JoinOutcome::Full => {
        info!(rival_code = %code, "rejected signup: rival code is full");
        Err(Error::PairingFull(code))
      }
      JoinOutcome::EmailTaken => Err(Error::EmailTaken(email)),
    }
  }

  /// Advisory check that `code` still has room. The binding check happens
  /// inside [`RivalStore::join_rival_code`].
  pub async fn assert_can_join(&self, code: &str) -> Result<()> {
    match self.resolve_pairing(code).await {
      Ok(pairing) if pairing.is_full() => Err(Error::PairingFull(code.to_owned())),
      Ok(_) | Err(Error::PairingNotFound(_)) => Ok(()),
      Err(e) => Err(e),
    }
  }

  pub async fn resolve_pairing(&self, code: &str) -> Result<RivalPairing> {
    let members =
      self.store.users_by_rival_code(code).await.map_err(Error::store)?;
    RivalPairing::from_members(code, members)
  }

  /// The other member of `user`'s pairing; `None` while unpaired.
  pub async fn counterpart(&self, user: &User) -> Result<Option<User>> {
    let pairing = self.resolve_pairing(&user.rival_code).await?;
    Ok(pairing.counterpart(user.user_id).cloned())
  }

  pub async fn require_user(&self, id: Uuid) -> Result<User> {
    self
      .store
      .get_user(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UserNotFound(id))
  }

  async fn require_pair(&self, id: Uuid) -> Result<(User, User)> {
    let user = self.require_user(id).await?;
    let rival = self
      .counterpart(&user)
      .await?
      .ok_or(Error::RivalNotFound(id))?;
    Ok((user, rival))
  }

  // ── Curriculum ──────────────────────────────────────────────────────────

  pub async fn add_item(&self, input: NewItem) -> Result<CurriculumItem> {
    input.validate()?;
    let item = self.store.add_item(input).await.map_err(Error::store)?;
    debug!(item_id = %item.item_id, kind = item.kind.discriminant(), "item added");
    Ok(item)
  }

  pub async fn delete_item(&self, id: Uuid) -> Result<()> {
    if self.store.delete_item(id).await.map_err(Error::store)? {
      Ok(())
    } else {
      Err(Error::ItemNotFound(id))
    }
  }

  /// Items of `kind` with both rivals' completion flags.
  pub async fn list_items(
    &self,
    user_id: Uuid,
    kind: Option<ItemKind>,
  ) -> Result<Vec<ItemStatus>> {
    let user = self.require_user(user_id).await?;
    let rival = self.counterpart(&user).await?;

    let items = self.store.list_items(kind).await.map_err(Error::store)?;
    let mine = self
      .store
      .completions_for_user(user.user_id)
      .await
      .map_err(Error::store)?;
    let theirs = match &rival {
      Some(r) => self
        .store
        .completions_for_user(r.user_id)
        .await
        .map_err(Error::store)?,
      None => Default::default(),
    };

    Ok(
      items
        .into_iter()
        .map(|item| ItemStatus {
          user_completed: mine.contains(item.kind, item.item_id),
          rival_completed: theirs.contains(item.kind, item.item_id),
          item,
        })
        .collect(),
    )
  }

  // ── Completions ─────────────────────────────────────────────────────────

  /// Flip the completion of `item_id` for `user_id`.
  ///
  /// Completing runs the streak and achievement recomputes; un-completing
  /// does not.
  pub async fn toggle_completion(
    &self,
    kind: ItemKind,
    item_id: Uuid,
    user_id: Uuid,
  ) -> Result<ToggleResult> {
    self.require_user(user_id).await?;
    let item = self
      .store
      .get_item(item_id)
      .await
      .map_err(Error::store)?
      .filter(|i| i.kind == kind)
      .ok_or(Error::ItemNotFound(item_id))?;

    let completed = self
      .store
      .toggle_completion(item.item_id, user_id, self.clock.now())
      .await
      .map_err(Error::store)?;
    debug!(%user_id, %item_id, completed, "completion toggled");

    let unlocked = if completed {
      self.after_completion(user_id).await
    } else {
      Vec::new()
    };

    Ok(ToggleResult {
      completed,
      unlocked: unlocked.into_iter().map(|a| a.name).collect(),
    })
  }

  async fn after_completion(&self, user_id: Uuid) -> Vec<Achievement> {
    if let Err(e) = self.refresh_streak(user_id).await {
      warn!(%user_id, error = %e, "streak recompute failed; deferring");
    }
    self.unlock_best_effort(user_id).await
  }

  async fn unlock_best_effort(&self, user_id: Uuid) -> Vec<Achievement> {
    match self.check_and_unlock(user_id).await {
      Ok(unlocked) => unlocked,
      Err(e) => {
        warn!(%user_id, error = %e, "achievement check failed; deferring");
        Vec::new()
      }
    }
  }

  /// Recompute and persist the streak from the user's full history.
  pub async fn refresh_streak(&self, user_id: Uuid) -> Result<StreakState> {
    let prev = self.store.get_streak(user_id).await.map_err(Error::store)?;
    let times = self
      .store
      .completion_times_for_user(user_id)
      .await
      .map_err(Error::store)?;

    let offset = self.config.utc_offset;
    let next = prev.recompute(
      times.into_iter().map(|t| local_date(t, offset)),
      self.today(),
    );

    self.store.put_streak(user_id, next).await.map_err(Error::store)?;
    debug!(%user_id, current = next.current, longest = next.longest, "streak recomputed");
    Ok(next)
  }

  // ── Achievements ────────────────────────────────────────────────────────

  async fn metrics(&self, user_id: Uuid) -> Result<Metrics> {
    let progress =
      self.store.progress_counts(user_id).await.map_err(Error::store)?;
    let streak = self.store.get_streak(user_id).await.map_err(Error::store)?;
    let messages_sent =
      self.store.message_count(user_id).await.map_err(Error::store)?;
    Ok(Metrics {
      progress,
      current_streak: streak.current_as_of(self.today()),
      messages_sent,
    })
  }

  /// Unlock every catalog entry the user now satisfies and has not unlocked
  /// yet. Returns only the entries this call actually recorded.
  pub async fn check_and_unlock(&self, user_id: Uuid) -> Result<Vec<Achievement>> {
    let have: HashSet<String> = self
      .store
      .user_achievements(user_id)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|ua| ua.achievement_name)
      .collect();

    let metrics = self.metrics(user_id).await?;
    let now = self.clock.now();

    let mut unlocked = Vec::new();
    for a in self.catalog.newly_satisfied(&metrics, &have) {
      let inserted = self
        .store
        .unlock_achievement(user_id, &a.name, now)
        .await
        .map_err(Error::store)?;
      if inserted {
        info!(%user_id, achievement = %a.name, "achievement unlocked");
        unlocked.push(a.clone());
      } else {
        debug!(%user_id, achievement = %a.name, "achievement already recorded");
      }
    }
    Ok(unlocked)
  }

  pub async fn achievements(&self, user_id: Uuid) -> Result<AchievementsView> {
    self.require_user(user_id).await?;
    let records =
      self.store.user_achievements(user_id).await.map_err(Error::store)?;
    let unlocked = records
      .into_iter()
      .map(|ua| {
        let entry = self.catalog.get(&ua.achievement_name);
        UnlockedAchievement {
          icon:        entry.map(|e| e.icon.clone()),
          description: entry.map(|e| e.description.clone()),
          name:        ua.achievement_name,
          unlocked_at: ua.unlocked_at,
        }
      })
      .collect();
    Ok(AchievementsView {
      unlocked,
      total_catalog_size: self.catalog.len(),
    })
  }

  /// Both rivals' unlocks laid against the catalog.
  pub async fn compare_achievements(
    &self,
    user_id: Uuid,
  ) -> Result<AchievementComparison> {
    let (user, rival) = self.require_pair(user_id).await?;
    let mine =
      self.store.user_achievements(user.user_id).await.map_err(Error::store)?;
    let theirs =
      self.store.user_achievements(rival.user_id).await.map_err(Error::store)?;

    let at = |list: &[UserAchievement], name: &str| {
      list
        .iter()
        .find(|ua| ua.achievement_name == name)
        .map(|ua| ua.unlocked_at)
    };

    let rows = self
      .catalog
      .entries()
      .iter()
      .map(|a| AchievementRow {
        user_unlocked_at:  at(mine.as_slice(), a.name.as_str()),
        rival_unlocked_at: at(theirs.as_slice(), a.name.as_str()),
        achievement:       a.clone(),
      })
      .collect();

    Ok(AchievementComparison {
      user: (&user).into(),
      rival: (&rival).into(),
      rows,
      leader: Leader::between(mine.len(), theirs.len()),
    })
  }

  // ── Read side ───────────────────────────────────────────────────────────

  async fn aggregates(&self, user: &User) -> Result<Aggregates> {
    let progress =
      self.store.progress_counts(user.user_id).await.map_err(Error::store)?;
    let streak =
      self.store.get_streak(user.user_id).await.map_err(Error::store)?;
    let badges = self
      .store
      .user_achievements(user.user_id)
      .await
      .map_err(Error::store)?
      .len();
    Ok(Aggregates::build(
      user,
      &progress,
      &streak,
      self.today(),
      u32::try_from(badges).unwrap_or(u32::MAX),
    ))
  }

  pub async fn dashboard(&self, user_id: Uuid) -> Result<Dashboard> {
    let user = self.require_user(user_id).await?;
    let mine = self.aggregates(&user).await?;

    let Some(rival) = self.counterpart(&user).await? else {
      return Ok(Dashboard { user: mine, rival: None, comparison: None });
    };
    let theirs = self.aggregates(&rival).await?;
    let comparison = compare(&mine, &theirs);

    Ok(Dashboard {
      user:       mine,
      rival:      Some(theirs),
      comparison: Some(comparison),
    })
  }

  pub async fn battle_status(&self, user_id: Uuid) -> Result<BattleStatus> {
    let (user, rival) = self.require_pair(user_id).await?;
    let mine = self
      .store
      .progress_counts(user.user_id)
      .await
      .map_err(Error::store)?
      .syllabus_tally()
      .completed;
    let theirs = self
      .store
      .progress_counts(rival.user_id)
      .await
      .map_err(Error::store)?
      .syllabus_tally()
      .completed;

    let today = self.today();
    let end = self.config.battle_end;
    Ok(BattleStatus {
      end_date:       end,
      has_ended:      end.is_some_and(|e| today >= e),
      days_remaining: end.map(|e| (e - today).num_days().max(0)),
      user_total:     mine,
      rival_total:    theirs,
      winner:         Leader::between(mine, theirs),
    })
  }

  // ── Chat ────────────────────────────────────────────────────────────────

  /// Persist a message in the sender's pairing and run the achievement check.
  pub async fn record_chat_message(
    &self,
    user_id: Uuid,
    text: &str,
  ) -> Result<ChatMessage> {
    let user = self.require_user(user_id).await?;
    let input = NewChatMessage::new(user.user_id, &user.rival_code, text)?;
    let message = self
      .store
      .record_message(input, self.clock.now())
      .await
      .map_err(Error::store)?;
    self.unlock_best_effort(user_id).await;
    Ok(message)
  }

  pub async fn chat_history(&self, user_id: Uuid) -> Result<Vec<ChatEntry>> {
    let user = self.require_user(user_id).await?;
    let members = self
      .store
      .users_by_rival_code(&user.rival_code)
      .await
      .map_err(Error::store)?;
    let messages = self
      .store
      .messages_for_code(&user.rival_code, self.config.chat_history_limit)
      .await
      .map_err(Error::store)?;

    Ok(
      messages
        .into_iter()
        .map(|message| {
          let sender = members.iter().find(|m| m.user_id == message.user_id);
          ChatEntry {
            sender_name:     sender.map_or("Unknown", |s| s.name.as_str()).to_owned(),
            sender_icon:     sender.map_or("?", |s| s.icon.as_str()).to_owned(),
            is_current_user: message.user_id == user_id,
            message,
          }
        })
        .collect(),
    )
  }
}
