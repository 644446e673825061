//! Read-side combination of two rivals' progress.
//!
//! Nothing here owns state. Views are rebuilt from store reads on every
//! request.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
  item::ItemKind,
  progress::{ProgressCounts, Tally},
  streak::StreakState,
  user::{User, UserSummary},
};

// ─── Leader ──────────────────────────────────────────────────────────────────

/// Who is ahead on one measure. Equal values are an explicit tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Leader {
  User,
  Rival,
  Tie,
}

impl Leader {
  pub fn between<T: Ord>(user: T, rival: T) -> Self {
    match user.cmp(&rival) {
      Ordering::Greater => Self::User,
      Ordering::Less => Self::Rival,
      Ordering::Equal => Self::Tie,
    }
  }

  /// The same verdict seen from the other side.
  pub fn flip(self) -> Self {
    match self {
      Self::User => Self::Rival,
      Self::Rival => Self::User,
      Self::Tie => Self::Tie,
    }
  }
}

// ─── Per-user aggregates ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SubjectProgress {
  pub subject:        String,
  pub lectures:       Tally,
  pub practice_sets:  Tally,
  pub school_lessons: Tally,
  /// Completion percentage over lectures and practice sets.
  pub percentage:     f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StreakView {
  pub current:            u32,
  pub longest:            u32,
  pub last_activity_date: Option<NaiveDate>,
}

/// Everything the dashboard shows for one user.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregates {
  pub user:               UserSummary,
  pub streak:             StreakView,
  pub subjects:           Vec<SubjectProgress>,
  /// Lectures plus practice sets.
  pub syllabus:           Tally,
  pub school_lessons:     Tally,
  pub overall_percentage: f64,
  pub achievement_count:  u32,
}

impl Aggregates {
  pub fn build(
    user: &User,
    progress: &ProgressCounts,
    streak: &StreakState,
    today: NaiveDate,
    achievement_count: u32,
  ) -> Self {
    let subjects = progress
      .subjects()
      .into_iter()
      .map(|s| {
        let syllabus = progress.syllabus_subject_tally(s);
        SubjectProgress {
          subject:        s.to_owned(),
          lectures:       progress.tally(ItemKind::Lecture, s),
          practice_sets:  progress.tally(ItemKind::PracticeSet, s),
          school_lessons: progress.tally(ItemKind::SchoolLesson, s),
          percentage:     syllabus.percentage(),
        }
      })
      .collect();

    let syllabus = progress.syllabus_tally();

    Self {
      user: user.into(),
      streak: StreakView {
        current:            streak.current_as_of(today),
        longest:            streak.longest,
        last_activity_date: streak.last_activity_date,
      },
      subjects,
      syllabus,
      school_lessons: progress.kind_tally(ItemKind::SchoolLesson),
      overall_percentage: syllabus.percentage(),
      achievement_count,
    }
  }

  fn subject_completed(&self, subject: &str) -> u32 {
    self
      .subjects
      .iter()
      .filter(|p| p.subject.eq_ignore_ascii_case(subject))
      .map(|p| p.lectures.completed + p.practice_sets.completed)
      .sum()
  }
}

// ─── Comparison ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SubjectLead {
  pub subject:         String,
  pub user_completed:  u32,
  pub rival_completed: u32,
  pub leader:          Leader,
}

/// A symmetric comparison; swapping the arguments of [`compare`] flips every
/// [`Leader`] and swaps every per-side count.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
  pub subjects:       Vec<SubjectLead>,
  pub user_total:     u32,
  pub rival_total:    u32,
  pub combined_total: u32,
  pub streak:         Leader,
  pub achievements:   Leader,
  /// Decided by syllabus completions.
  pub winner:         Leader,
}

pub fn compare(user: &Aggregates, rival: &Aggregates) -> Comparison {
  let mut names: Vec<&str> = Vec::new();
  for p in user.subjects.iter().chain(&rival.subjects) {
    if !names.iter().any(|n| n.eq_ignore_ascii_case(&p.subject)) {
      names.push(&p.subject);
    }
  }
  names.sort_by_key(|n| n.to_ascii_lowercase());

  let subjects = names
    .into_iter()
    .map(|s| {
      let u = user.subject_completed(s);
      let r = rival.subject_completed(s);
      SubjectLead {
        subject:         s.to_owned(),
        user_completed:  u,
        rival_completed: r,
        leader:          Leader::between(u, r),
      }
    })
    .collect();

  let user_total = user.syllabus.completed;
  let rival_total = rival.syllabus.completed;

  Comparison {
    subjects,
    user_total,
    rival_total,
    combined_total: user_total + rival_total,
    streak: Leader::between(user.streak.current, rival.streak.current),
    achievements: Leader::between(
      user.achievement_count,
      rival.achievement_count,
    ),
    winner: Leader::between(user_total, rival_total),
  }
}

/// The dashboard for one user; `rival` is absent while unpaired.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
  pub user:       Aggregates,
  pub rival:      Option<Aggregates>,
  pub comparison: Option<Comparison>,
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2026, 3, 4).unwrap() }

  fn aggregates(
    name: &str,
    physics: u32,
    chemistry: u32,
    streak: u32,
    badges: u32,
  ) -> Aggregates {
    let user = User {
      user_id:       Uuid::new_v4(),
      name:          name.into(),
      email:         format!("{name}@example.com"),
      icon:          "🦊".into(),
      rival_code:    "duel".into(),
      created_at:    Utc::now(),
      password_hash: String::new(),
    };
    let mut progress = ProgressCounts::default();
    progress.record(ItemKind::Lecture, "Physics", Tally {
      completed: physics,
      total:     20,
    });
    progress.record(ItemKind::PracticeSet, "Chemistry", Tally {
      completed: chemistry,
      total:     20,
    });
    let state = StreakState {
      current:            streak,
      longest:            streak,
      last_activity_date: Some(today()),
    };
    Aggregates::build(&user, &progress, &state, today(), badges)
  }

  #[test]
  fn winner_flips_when_sides_swap() {
    let a = aggregates("ada", 7, 2, 3, 1);
    let b = aggregates("bob", 4, 6, 5, 1);

    let ab = compare(&a, &b);
    let ba = compare(&b, &a);

    assert_eq!(ab.winner, Leader::Rival);
    assert_eq!(ba.winner, Leader::User);
    assert_eq!(ab.streak, ba.streak.flip());
    assert_eq!(ab.user_total, ba.rival_total);
    for (x, y) in ab.subjects.iter().zip(&ba.subjects) {
      assert_eq!(x.subject, y.subject);
      assert_eq!(x.leader, y.leader.flip());
    }
  }

  #[test]
  fn equal_totals_are_a_tie() {
    let a = aggregates("ada", 5, 5, 2, 0);
    let b = aggregates("bob", 3, 7, 2, 0);
    let c = compare(&a, &b);
    assert_eq!(c.winner, Leader::Tie);
    assert_eq!(c.streak, Leader::Tie);
    assert_eq!(c.achievements, Leader::Tie);
    assert_eq!(c.combined_total, 20);
  }

  #[test]
  fn per_subject_leaders() {
    let a = aggregates("ada", 7, 2, 0, 0);
    let b = aggregates("bob", 4, 6, 0, 0);
    let c = compare(&a, &b);
    let leads: Vec<(&str, Leader)> =
      c.subjects.iter().map(|s| (s.subject.as_str(), s.leader)).collect();
    assert_eq!(leads, vec![
      ("Chemistry", Leader::Rival),
      ("Physics", Leader::User)
    ]);
  }

  #[test]
  fn aggregates_carry_percentages() {
    let a = aggregates("ada", 10, 5, 0, 0);
    assert_eq!(a.syllabus, Tally { completed: 15, total: 40 });
    assert_eq!(a.overall_percentage, 37.5);
    let physics = a.subjects.iter().find(|s| s.subject == "Physics").unwrap();
    assert_eq!(physics.percentage, 50.0);
  }

  #[test]
  fn tie_serialises_as_string() {
    assert_eq!(serde_json::to_value(Leader::Tie).unwrap(), "tie");
  }
}
