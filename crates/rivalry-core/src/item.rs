//! Curriculum items and completion facts.
//!
//! Lectures, practice sets and school lessons share one shape and differ only
//! by their [`ItemKind`] tag.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The kind of a curriculum item. The snake_case name is the `kind`
/// discriminant stored in the database.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
  Lecture,
  /// A daily practice problem set ("DPP").
  PracticeSet,
  SchoolLesson,
}

impl ItemKind {
  pub const ALL: [ItemKind; 3] =
    [Self::Lecture, Self::PracticeSet, Self::SchoolLesson];

  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Lecture => "lecture",
      Self::PracticeSet => "practice_set",
      Self::SchoolLesson => "school_lesson",
    }
  }

  pub fn from_discriminant(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|k| k.discriminant() == s)
  }

  /// Lectures and practice sets form the competitive syllabus; school
  /// lessons are tracked separately.
  pub fn is_syllabus(self) -> bool { !matches!(self, Self::SchoolLesson) }
}

// ─── Item ────────────────────────────────────────────────────────────────────

/// A lecture, practice set or school lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumItem {
  pub item_id:    Uuid,
  pub kind:       ItemKind,
  pub subject:    String,
  /// The chapter for syllabus items, the month range for school lessons.
  pub grouping:   String,
  /// Ordinal within the grouping; free text ("12", "3b").
  pub number:     String,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::RivalStore::add_item`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
  pub kind:     ItemKind,
  pub subject:  String,
  pub grouping: String,
  pub number:   String,
  pub name:     String,
}

impl NewItem {
  pub fn validate(&self) -> Result<()> {
    for (field, value) in [
      ("subject", &self.subject),
      ("grouping", &self.grouping),
      ("number", &self.number),
      ("name", &self.name),
    ] {
      if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
      }
    }
    Ok(())
  }
}

// ─── Completions ─────────────────────────────────────────────────────────────

/// The items a user has completed, partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSet {
  by_kind: BTreeMap<ItemKind, BTreeSet<Uuid>>,
}

impl CompletionSet {
  pub fn insert(&mut self, kind: ItemKind, item_id: Uuid) {
    self.by_kind.entry(kind).or_default().insert(item_id);
  }

  pub fn contains(&self, kind: ItemKind, item_id: Uuid) -> bool {
    self.by_kind.get(&kind).is_some_and(|s| s.contains(&item_id))
  }

  pub fn of_kind(&self, kind: ItemKind) -> impl Iterator<Item = Uuid> + '_ {
    self.by_kind.get(&kind).into_iter().flatten().copied()
  }

  pub fn len(&self) -> usize { self.by_kind.values().map(BTreeSet::len).sum() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl FromIterator<(ItemKind, Uuid)> for CompletionSet {
  fn from_iter<I: IntoIterator<Item = (ItemKind, Uuid)>>(iter: I) -> Self {
    let mut set = Self::default();
    for (kind, id) in iter {
      set.insert(kind, id);
    }
    set
  }
}

/// An item with both rivals' completion flags, for side-by-side lists.
#[derive(Debug, Clone, Serialize)]
pub struct ItemStatus {
  #[serde(flatten)]
  pub item:            CurriculumItem,
  pub user_completed:  bool,
  pub rival_completed: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn discriminant_matches_serde_tag() {
    for kind in ItemKind::ALL {
      let json = serde_json::to_value(kind).unwrap();
      assert_eq!(json.as_str(), Some(kind.discriminant()));
      assert_eq!(ItemKind::from_discriminant(kind.discriminant()), Some(kind));
    }
    assert_eq!(ItemKind::from_discriminant("dpp"), None);
  }

  #[test]
  fn blank_item_fields_are_rejected() {
    let item = NewItem {
      kind:     ItemKind::Lecture,
      subject:  "Physics".into(),
      grouping: "Kinematics".into(),
      number:   "".into(),
      name:     "Projectiles".into(),
    };
    let err = item.validate().unwrap_err();
    assert!(matches!(err, Error::Validation(m) if m.contains("number")));
  }

  #[test]
  fn completion_set_partitions_by_kind() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let set: CompletionSet =
      [(ItemKind::Lecture, a), (ItemKind::PracticeSet, b)].into_iter().collect();

    assert!(set.contains(ItemKind::Lecture, a));
    assert!(!set.contains(ItemKind::PracticeSet, a));
    assert_eq!(set.of_kind(ItemKind::PracticeSet).collect::<Vec<_>>(), vec![b]);
    assert_eq!(set.of_kind(ItemKind::SchoolLesson).count(), 0);
    assert_eq!(set.len(), 2);
  }
}
