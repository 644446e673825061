//! The streak state machine over calendar days.
//!
//! A streak counts consecutive local calendar days with at least one
//! completion. It ends today or yesterday; once the most recent active day is
//! older than yesterday the chain is dead and the count is zero until a new
//! completion starts a fresh one.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Persisted per-user streak state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
  pub current:            u32,
  /// Historical maximum of `current`; never decreases.
  pub longest:            u32,
  pub last_activity_date: Option<NaiveDate>,
}

impl StreakState {
  /// Recompute from a user's full completion history.
  ///
  /// `dates` holds one entry per completion event and need not be sorted or
  /// deduplicated.
  pub fn recompute<I>(&self, dates: I, today: NaiveDate) -> StreakState
  where
    I: IntoIterator<Item = NaiveDate>,
  {
    let days: BTreeSet<NaiveDate> = dates.into_iter().collect();

    let Some(&most_recent) = days.last() else {
      return StreakState {
        current:            0,
        longest:            self.longest,
        last_activity_date: None,
      };
    };

    let current = if is_broken(most_recent, today) {
      0
    } else {
      let anchor = if days.contains(&today) {
        Some(today)
      } else {
        today.pred_opt()
      };
      count_back(&days, anchor)
    };

    StreakState {
      current,
      longest: self.longest.max(current),
      last_activity_date: Some(most_recent),
    }
  }

  /// The streak as it should be displayed on `today` without recomputing.
  ///
  /// A stored streak whose last active day is older than yesterday has
  /// lapsed even though nothing has rewritten it yet.
  pub fn current_as_of(&self, today: NaiveDate) -> u32 {
    match self.last_activity_date {
      Some(last) if !is_broken(last, today) => self.current,
      _ => 0,
    }
  }
}

/// The calendar date of `at` in the reference timezone.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
  at.with_timezone(&offset).date_naive()
}

/// True when `last` is strictly before yesterday.
fn is_broken(last: NaiveDate, today: NaiveDate) -> bool {
  match today.pred_opt() {
    Some(yesterday) => last < yesterday,
    None => false,
  }
}

fn count_back(days: &BTreeSet<NaiveDate>, mut cursor: Option<NaiveDate>) -> u32 {
  let mut count = 0;
  while let Some(day) = cursor {
    if !days.contains(&day) {
      break;
    }
    count += 1;
    cursor = day.pred_opt();
  }
  count
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn no_history_is_zero() {
    let s = StreakState::default().recompute([], d(2026, 3, 4));
    assert_eq!(s, StreakState::default());
  }

  #[test]
  fn three_consecutive_days_ending_today() {
    let s = StreakState::default().recompute(
      [d(2026, 3, 2), d(2026, 3, 3), d(2026, 3, 4)],
      d(2026, 3, 4),
    );
    assert_eq!(s.current, 3);
    assert_eq!(s.longest, 3);
    assert_eq!(s.last_activity_date, Some(d(2026, 3, 4)));
  }

  #[test]
  fn duplicate_completions_on_one_day_count_once() {
    let s = StreakState::default().recompute(
      [d(2026, 3, 4), d(2026, 3, 4), d(2026, 3, 3), d(2026, 3, 4)],
      d(2026, 3, 4),
    );
    assert_eq!(s.current, 2);
  }

  #[test]
  fn gap_of_two_days_restarts_at_one() {
    let s = StreakState::default()
      .recompute([d(2026, 3, 1), d(2026, 3, 4)], d(2026, 3, 4));
    assert_eq!(s.current, 1);
  }

  #[test]
  fn missed_thursday_resets_week_streak() {
    // Monday..Wednesday, then nothing Thursday.
    let week = [d(2026, 3, 2), d(2026, 3, 3), d(2026, 3, 4)];
    let wednesday = StreakState::default().recompute(week, d(2026, 3, 4));
    assert_eq!(wednesday.current, 3);

    let friday = wednesday
      .recompute(week.into_iter().chain([d(2026, 3, 6)]), d(2026, 3, 6));
    assert_eq!(friday.current, 1);
    assert_eq!(friday.longest, 3);
  }

  #[test]
  fn chain_ending_yesterday_is_still_alive() {
    let s = StreakState::default()
      .recompute([d(2026, 3, 2), d(2026, 3, 3)], d(2026, 3, 4));
    assert_eq!(s.current, 2);
  }

  #[test]
  fn chain_older_than_yesterday_is_dead() {
    let prev = StreakState {
      current:            5,
      longest:            5,
      last_activity_date: Some(d(2026, 3, 2)),
    };
    let s = prev.recompute([d(2026, 3, 1), d(2026, 3, 2)], d(2026, 3, 4));
    assert_eq!(s.current, 0);
    assert_eq!(s.longest, 5);
    assert_eq!(s.last_activity_date, Some(d(2026, 3, 2)));
  }

  #[test]
  fn longest_never_decreases() {
    let prev = StreakState { current: 0, longest: 9, last_activity_date: None };
    let s = prev.recompute([d(2026, 3, 4)], d(2026, 3, 4));
    assert_eq!(s.current, 1);
    assert_eq!(s.longest, 9);
  }

  #[test]
  fn stored_streak_lapses_on_read() {
    let s = StreakState {
      current:            4,
      longest:            4,
      last_activity_date: Some(d(2026, 3, 3)),
    };
    assert_eq!(s.current_as_of(d(2026, 3, 3)), 4);
    assert_eq!(s.current_as_of(d(2026, 3, 4)), 4);
    assert_eq!(s.current_as_of(d(2026, 3, 5)), 0);
  }

  #[test]
  fn local_date_respects_offset() {
    let at = DateTime::parse_from_rfc3339("2026-03-04T22:30:00Z")
      .unwrap()
      .with_timezone(&Utc);
    let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
    assert_eq!(local_date(at, ist), d(2026, 3, 5));
    assert_eq!(local_date(at, FixedOffset::east_opt(0).unwrap()), d(2026, 3, 4));
  }
}
