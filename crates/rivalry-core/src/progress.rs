//! Per-user completion tallies grouped by item kind and subject.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::item::ItemKind;

/// Completed versus available items in one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
  pub completed: u32,
  pub total:     u32,
}

impl Tally {
  pub fn percentage(self) -> f64 {
    if self.total == 0 {
      0.0
    } else {
      f64::from(self.completed) / f64::from(self.total) * 100.0
    }
  }
}

impl std::ops::Add for Tally {
  type Output = Tally;

  fn add(self, rhs: Tally) -> Tally {
    Tally {
      completed: self.completed + rhs.completed,
      total:     self.total + rhs.total,
    }
  }
}

/// Tallies for every `(kind, subject)` pair that has at least one item.
///
/// Subjects are compared case-insensitively so "Mathematics" configured in
/// the achievement catalog matches "mathematics" typed into the item form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressCounts {
  tallies: BTreeMap<(ItemKind, String), Tally>,
}

impl ProgressCounts {
  pub fn record(&mut self, kind: ItemKind, subject: &str, tally: Tally) {
    let slot = self.tallies.entry((kind, subject.to_owned())).or_default();
    *slot = *slot + tally;
  }

  /// Distinct subject names in sorted order; spellings differing only by
  /// case collapse to the first one seen.
  pub fn subjects(&self) -> Vec<&str> {
    let sorted: BTreeSet<&str> =
      self.tallies.keys().map(|(_, s)| s.as_str()).collect();
    let mut out: Vec<&str> = Vec::with_capacity(sorted.len());
    for s in sorted {
      if !out.iter().any(|o| o.eq_ignore_ascii_case(s)) {
        out.push(s);
      }
    }
    out
  }

  pub fn tally(&self, kind: ItemKind, subject: &str) -> Tally {
    self
      .tallies
      .iter()
      .filter(|((k, s), _)| *k == kind && s.eq_ignore_ascii_case(subject))
      .fold(Tally::default(), |acc, (_, t)| acc + *t)
  }

  pub fn kind_tally(&self, kind: ItemKind) -> Tally {
    self
      .tallies
      .iter()
      .filter(|((k, _), _)| *k == kind)
      .fold(Tally::default(), |acc, (_, t)| acc + *t)
  }

  /// Lectures plus practice sets in `subject`.
  pub fn syllabus_subject_tally(&self, subject: &str) -> Tally {
    self.tally(ItemKind::Lecture, subject)
      + self.tally(ItemKind::PracticeSet, subject)
  }

  /// Lectures plus practice sets over all subjects.
  pub fn syllabus_tally(&self) -> Tally {
    self
      .tallies
      .iter()
      .filter(|((k, _), _)| k.is_syllabus())
      .fold(Tally::default(), |acc, (_, t)| acc + *t)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn t(completed: u32, total: u32) -> Tally { Tally { completed, total } }

  #[test]
  fn empty_tally_has_zero_percentage() {
    assert_eq!(Tally::default().percentage(), 0.0);
    assert_eq!(t(1, 4).percentage(), 25.0);
  }

  #[test]
  fn subject_lookup_ignores_case() {
    let mut p = ProgressCounts::default();
    p.record(ItemKind::Lecture, "Physics", t(3, 10));
    p.record(ItemKind::PracticeSet, "physics", t(2, 5));
    p.record(ItemKind::Lecture, "Chemistry", t(1, 8));
    p.record(ItemKind::SchoolLesson, "Physics", t(4, 4));

    assert_eq!(p.syllabus_subject_tally("PHYSICS"), t(5, 15));
    assert_eq!(p.syllabus_tally(), t(6, 23));
    assert_eq!(p.kind_tally(ItemKind::SchoolLesson), t(4, 4));
    assert_eq!(p.subjects(), vec!["Chemistry", "Physics"]);
  }
}
