//! The achievement catalog and unlock predicates.
//!
//! The catalog is plain data: every entry carries a [`Rule`] that one
//! dispatcher ([`Rule::is_satisfied`]) evaluates against a user's
//! [`Metrics`]. Unlocks are write-once; nothing here ever revokes one.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, item::ItemKind, progress::ProgressCounts};

// ─── Rules ───────────────────────────────────────────────────────────────────

/// The unlock predicate of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
  /// Completed lectures plus practice sets.
  Count { threshold: u32 },
  /// Completed items of a single kind.
  KindCount { item_kind: ItemKind, threshold: u32 },
  /// Completed lectures plus practice sets within one subject.
  SubjectCount { subject: String, threshold: u32 },
  /// Current streak length in days.
  Streak { threshold: u32 },
  /// Chat messages sent.
  ChatCount { threshold: u32 },
  /// Completed school lessons.
  SchoolCount { threshold: u32 },
}

impl Rule {
  pub fn threshold(&self) -> u32 {
    match self {
      Self::Count { threshold }
      | Self::KindCount { threshold, .. }
      | Self::SubjectCount { threshold, .. }
      | Self::Streak { threshold }
      | Self::ChatCount { threshold }
      | Self::SchoolCount { threshold } => *threshold,
    }
  }

  /// The metric this rule compares against its threshold.
  pub fn measure(&self, m: &Metrics) -> u64 {
    match self {
      Self::Count { .. } => m.progress.syllabus_tally().completed.into(),
      Self::KindCount { item_kind, .. } => {
        m.progress.kind_tally(*item_kind).completed.into()
      }
      Self::SubjectCount { subject, .. } => {
        m.progress.syllabus_subject_tally(subject).completed.into()
      }
      Self::Streak { .. } => m.current_streak.into(),
      Self::ChatCount { .. } => m.messages_sent,
      Self::SchoolCount { .. } => {
        m.progress.kind_tally(ItemKind::SchoolLesson).completed.into()
      }
    }
  }

  pub fn is_satisfied(&self, m: &Metrics) -> bool {
    self.measure(m) >= u64::from(self.threshold())
  }
}

/// Freshly computed aggregates for one user.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
  pub progress:       ProgressCounts,
  pub current_streak: u32,
  pub messages_sent:  u64,
}

// ─── Catalog entries ─────────────────────────────────────────────────────────

/// A badge definition. `name` is the identity used for unlock records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
  pub name:        String,
  pub description: String,
  pub icon:        String,
  #[serde(default)]
  pub category:    Option<String>,
  pub rule:        Rule,
}

/// An unlock record, unique per `(user_id, achievement_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAchievement {
  pub user_id:          Uuid,
  pub achievement_name: String,
  pub unlocked_at:      DateTime<Utc>,
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// A validated, immutable list of achievements.
#[derive(Debug, Clone)]
pub struct Catalog {
  entries: Vec<Achievement>,
}

impl Catalog {
  /// Validate `entries`: names must be non-blank and unique, thresholds
  /// positive.
  pub fn new(entries: Vec<Achievement>) -> Result<Self> {
    let mut seen = HashSet::new();
    for a in &entries {
      if a.name.trim().is_empty() {
        return Err(Error::InvalidCatalog("achievement name is blank".into()));
      }
      if !seen.insert(a.name.as_str()) {
        return Err(Error::InvalidCatalog(format!(
          "duplicate achievement {:?}",
          a.name
        )));
      }
      if a.rule.threshold() == 0 {
        return Err(Error::InvalidCatalog(format!(
          "achievement {:?} has a zero threshold",
          a.name
        )));
      }
    }
    Ok(Self { entries })
  }

  pub fn entries(&self) -> &[Achievement] { &self.entries }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn get(&self, name: &str) -> Option<&Achievement> {
    self.entries.iter().find(|a| a.name == name)
  }

  /// Entries not in `unlocked` whose rule `metrics` now satisfies.
  pub fn newly_satisfied<'a>(
    &'a self,
    metrics: &Metrics,
    unlocked: &HashSet<String>,
  ) -> Vec<&'a Achievement> {
    self
      .entries
      .iter()
      .filter(|a| !unlocked.contains(&a.name))
      .filter(|a| a.rule.is_satisfied(metrics))
      .collect()
  }
}

impl Default for Catalog {
  fn default() -> Self { Self { entries: builtin_entries() } }
}

fn entry(
  name: &str,
  description: &str,
  icon: &str,
  category: &str,
  rule: Rule,
) -> Achievement {
  Achievement {
    name: name.into(),
    description: description.into(),
    icon: icon.into(),
    category: Some(category.into()),
    rule,
  }
}

fn subject(name: &str, threshold: u32) -> Rule {
  Rule::SubjectCount { subject: name.into(), threshold }
}

fn builtin_entries() -> Vec<Achievement> {
  use ItemKind::{Lecture, PracticeSet};
  vec![
    entry("First Step", "Complete your first lecture", "🚀", "starter",
      Rule::KindCount { item_kind: Lecture, threshold: 1 }),
    entry("Problem Solver", "Complete your first practice set", "🧩", "starter",
      Rule::KindCount { item_kind: PracticeSet, threshold: 1 }),
    entry("Scholar", "Complete your first school lesson", "📖", "starter",
      Rule::SchoolCount { threshold: 1 }),
    entry("Ice Breaker", "Send your first chat message", "💬", "social",
      Rule::ChatCount { threshold: 1 }),
    entry("Lecture Legend", "Complete 10 lectures", "📚", "milestone",
      Rule::KindCount { item_kind: Lecture, threshold: 10 }),
    entry("DPP Master", "Complete 25 practice sets", "✨", "milestone",
      Rule::KindCount { item_kind: PracticeSet, threshold: 25 }),
    entry("Half Century", "Complete 50 tasks in total", "🎖️", "milestone",
      Rule::Count { threshold: 50 }),
    entry("Century Club", "Complete 100 tasks in total", "💯", "milestone",
      Rule::Count { threshold: 100 }),
    entry("Physics Novice", "Complete 10 physics tasks", "⚛️", "subject",
      subject("Physics", 10)),
    entry("Chemistry Novice", "Complete 10 chemistry tasks", "🧪", "subject",
      subject("Chemistry", 10)),
    entry("Mathematics Novice", "Complete 10 mathematics tasks", "🔢", "subject",
      subject("Mathematics", 10)),
    entry("Physics Prodigy", "Complete 40 physics tasks", "🌌", "subject",
      subject("Physics", 40)),
    entry("Chemistry Champion", "Complete 40 chemistry tasks", "⚗️", "subject",
      subject("Chemistry", 40)),
    entry("Math Wizard", "Complete 40 mathematics tasks", "📐", "subject",
      subject("Mathematics", 40)),
    entry("Streak Starter", "Reach a 7-day streak", "🔥", "streak",
      Rule::Streak { threshold: 7 }),
    entry("Consistency King", "Reach a 14-day streak", "👑", "streak",
      Rule::Streak { threshold: 14 }),
    entry("Streak Master", "Reach a 30-day streak", "🌟", "streak",
      Rule::Streak { threshold: 30 }),
    entry("Unstoppable", "Reach a 60-day streak", "⚡", "streak",
      Rule::Streak { threshold: 60 }),
    entry("Trash Talker", "Send 50 chat messages", "🗯️", "social",
      Rule::ChatCount { threshold: 50 }),
    entry("School Hero", "Complete 15 school lessons", "🏫", "school",
      Rule::SchoolCount { threshold: 15 }),
    entry("Lesson Collector", "Complete 30 school lessons", "🗂️", "school",
      Rule::SchoolCount { threshold: 30 }),
  ]
}
