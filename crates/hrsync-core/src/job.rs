//! Job-id normalisation and engagement matching.

use std::{cmp::Ordering, fmt};

use crate::directory::Engagement;

/// Width numeric job ids are zero-padded to in the directory.
const KEY_WIDTH: usize = 5;

/// A job id in the form the directory stores it.
///
/// Numeric ids are zero-padded to five digits (`"123"` → `"00123"`);
/// anything else is kept verbatim. Keys order numerically first, then
/// symbolic keys lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
  key:     String,
  numeric: Option<u64>,
}

impl JobKey {
  pub fn parse(raw: &str) -> Self {
    let trimmed = raw.trim();
    match trimmed.parse::<u64>() {
      Ok(n) => Self {
        key:     format!("{n:0width$}", width = KEY_WIDTH),
        numeric: Some(n),
      },
      Err(_) => Self { key: trimmed.to_owned(), numeric: None },
    }
  }

  pub fn as_str(&self) -> &str { &self.key }
}

impl Ord for JobKey {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self.numeric, other.numeric) {
      (Some(a), Some(b)) => a.cmp(&b),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => self.key.cmp(&other.key),
    }
  }
}

impl PartialOrd for JobKey {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Display for JobKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.key)
  }
}

/// Find the engagement belonging to `job_id`.
///
/// Both sides are normalised before comparing. If several slices match, the
/// last one in `engagements` wins; directories return slices ordered by
/// start, so that is the most recent slice.
pub fn find<'a>(engagements: &'a [Engagement], job_id: &str) -> Option<&'a Engagement> {
  let wanted = JobKey::parse(job_id);
  engagements
    .iter()
    .filter(|e| JobKey::parse(&e.user_key) == wanted)
    .next_back()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use uuid::Uuid;

  use super::*;
  use crate::{fraction::Fraction, interval::ValidityInterval};

  fn engagement(user_key: &str, from: (i32, u32, u32)) -> Engagement {
    Engagement {
      uuid:            Uuid::new_v4(),
      person:          Uuid::nil(),
      user_key:        user_key.into(),
      org_unit:        Uuid::nil(),
      job_function:    Uuid::nil(),
      engagement_type: Uuid::nil(),
      fraction:        Fraction::FULL,
      primary:         false,
      validity:        ValidityInterval::unbounded(
        NaiveDate::from_ymd_opt(from.0, from.1, from.2).unwrap(),
      ),
    }
  }

  #[test]
  fn numeric_ids_are_zero_padded() {
    assert_eq!(JobKey::parse("123").as_str(), "00123");
    assert_eq!(JobKey::parse("00123").as_str(), "00123");
    assert_eq!(JobKey::parse("123456").as_str(), "123456");
    assert_eq!(JobKey::parse("X17").as_str(), "X17");
  }

  #[test]
  fn ordering_is_numeric_then_symbolic() {
    let mut keys: Vec<JobKey> =
      ["00042", "B", "17", "A", "9"].iter().map(|k| JobKey::parse(k)).collect();
    keys.sort();
    let listed: Vec<&str> = keys.iter().map(JobKey::as_str).collect();
    assert_eq!(listed, ["00009", "00017", "00042", "A", "B"]);
  }

  #[test]
  fn find_matches_normalised_key() {
    let list = vec![engagement("00123", (2020, 1, 1)), engagement("X1", (2020, 1, 1))];
    assert_eq!(find(&list, "123").map(|e| e.user_key.as_str()), Some("00123"));
    assert_eq!(find(&list, "X1").map(|e| e.user_key.as_str()), Some("X1"));
    assert!(find(&list, "124").is_none());
  }

  #[test]
  fn last_match_wins() {
    let first = engagement("00123", (2020, 1, 1));
    let second = engagement("00123", (2021, 1, 1));
    let list = vec![first, second.clone()];
    assert_eq!(find(&list, "123"), Some(&second));
  }
}
