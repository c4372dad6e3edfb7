//! Validity intervals and the boundary-point arithmetic built on them.
//!
//! A [`ValidityInterval`] names the first and the last day on which a record
//! is in effect. `to` is inclusive, so the interval covers the half-open range
//! `[from, day_after(to))`; `None` means the record runs indefinitely.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Stand-in for "no end" when an open interval has to take part in date
/// ordering. Sub-intervals that end here are reported as unbounded.
pub const FAR_FUTURE: NaiveDate = match NaiveDate::from_ymd_opt(9999, 12, 30) {
  Some(d) => d,
  None => panic!("invalid sentinel date"),
};

/// The upstream feed's marker for an open end.
pub const SOURCE_OPEN_END: NaiveDate =
  match NaiveDate::from_ymd_opt(9999, 12, 31) {
    Some(d) => d,
    None => panic!("invalid sentinel date"),
  };

pub fn day_after(date: NaiveDate) -> NaiveDate {
  date.succ_opt().unwrap_or(NaiveDate::MAX)
}

pub fn day_before(date: NaiveDate) -> NaiveDate {
  date.pred_opt().unwrap_or(NaiveDate::MIN)
}

// ─── ValidityInterval ────────────────────────────────────────────────────────

/// The period a record is in effect. Equality is exact on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidityInterval {
  pub from: NaiveDate,
  /// Last day in effect, inclusive. `None` is unbounded.
  pub to:   Option<NaiveDate>,
}

impl ValidityInterval {
  pub fn new(from: NaiveDate, to: Option<NaiveDate>) -> Result<Self> {
    match to {
      Some(to) if to < from => Err(Error::InvalidInterval { from, to }),
      _ => Ok(Self { from, to }),
    }
  }

  pub fn unbounded(from: NaiveDate) -> Self { Self { from, to: None } }

  /// Build an interval from a source-feed activation/deactivation pair,
  /// mapping the feed's open-end marker to `None`.
  pub fn from_source(from: NaiveDate, to: NaiveDate) -> Result<Self> {
    if to >= SOURCE_OPEN_END {
      return Ok(Self::unbounded(from));
    }
    Self::new(from, Some(to))
  }

  /// First day after the interval, or `None` when unbounded.
  pub fn end_exclusive(&self) -> Option<NaiveDate> { self.to.map(day_after) }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.from <= date && self.to.is_none_or(|to| date <= to)
  }

  pub fn overlaps(&self, other: &Self) -> bool {
    self.intersection(other).is_some()
  }

  /// True if every day of `other` is inside `self`.
  pub fn covers(&self, other: &Self) -> bool {
    if other.from < self.from {
      return false;
    }
    match (self.to, other.to) {
      (None, _) => true,
      (Some(_), None) => false,
      (Some(a), Some(b)) => b <= a,
    }
  }

  /// True if `other` starts on the day after `self` ends, or vice versa.
  pub fn is_adjacent(&self, other: &Self) -> bool {
    let touches =
      |a: &Self, b: &Self| a.to.is_some_and(|to| day_after(to) == b.from);
    touches(self, other) || touches(other, self)
  }

  pub fn intersection(&self, other: &Self) -> Option<Self> {
    let from = self.from.max(other.from);
    let to = match (self.to, other.to) {
      (None, None) => None,
      (Some(a), None) | (None, Some(a)) => Some(a),
      (Some(a), Some(b)) => Some(a.min(b)),
    };
    match to {
      Some(to) if to < from => None,
      _ => Some(Self { from, to }),
    }
  }
}

// ─── Boundary points ─────────────────────────────────────────────────────────

/// Every `from` and every `day_after(to)` of the given intervals, with
/// [`FAR_FUTURE`] standing in for open ends.
///
/// Between two consecutive points no interval starts or stops, so each
/// consecutive pair is a maximal stretch of stable membership.
pub fn boundary_points<'a>(
  intervals: impl IntoIterator<Item = &'a ValidityInterval>,
) -> BTreeSet<NaiveDate> {
  let mut points = BTreeSet::new();
  for interval in intervals {
    points.insert(interval.from);
    points.insert(interval.end_exclusive().unwrap_or(FAR_FUTURE));
  }
  points
}

/// A maximal `[start, end)` stretch between two boundary points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubInterval {
  pub start: NaiveDate,
  /// Exclusive end; `None` when the stretch runs to [`FAR_FUTURE`].
  pub end:   Option<NaiveDate>,
}

impl SubInterval {
  /// The inclusive validity covering exactly this stretch.
  pub fn validity(&self) -> ValidityInterval {
    ValidityInterval {
      from: self.start,
      to:   self.end.map(day_before),
    }
  }
}

/// Consecutive pairs of `points` as sub-intervals.
pub fn sub_intervals(points: &BTreeSet<NaiveDate>) -> Vec<SubInterval> {
  let ordered: Vec<NaiveDate> = points.iter().copied().collect();
  ordered
    .windows(2)
    .map(|pair| SubInterval {
      start: pair[0],
      end:   (pair[1] < FAR_FUTURE).then_some(pair[1]),
    })
    .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn rejects_inverted_interval() {
    let err = ValidityInterval::new(d(2020, 3, 1), Some(d(2020, 2, 1)));
    assert!(matches!(err, Err(Error::InvalidInterval { .. })));
  }

  #[test]
  fn source_open_end_becomes_unbounded() {
    let v = ValidityInterval::from_source(d(2020, 1, 1), SOURCE_OPEN_END).unwrap();
    assert_eq!(v.to, None);
    let v = ValidityInterval::from_source(d(2020, 1, 1), d(2020, 6, 30)).unwrap();
    assert_eq!(v.to, Some(d(2020, 6, 30)));
  }

  #[test]
  fn overlap_and_intersection() {
    let a = ValidityInterval::new(d(2019, 1, 1), Some(d(2019, 6, 30))).unwrap();
    let b = ValidityInterval::unbounded(d(2019, 4, 1));
    let c = ValidityInterval::unbounded(d(2019, 7, 1));

    assert!(a.overlaps(&b));
    assert!(!a.overlaps(&c));
    assert_eq!(
      a.intersection(&b),
      Some(ValidityInterval::new(d(2019, 4, 1), Some(d(2019, 6, 30))).unwrap())
    );
    assert!(a.is_adjacent(&c));
    assert!(!a.is_adjacent(&b));
  }

  #[test]
  fn covers_respects_open_ends() {
    let open = ValidityInterval::unbounded(d(2019, 1, 1));
    let closed = ValidityInterval::new(d(2019, 2, 1), Some(d(2019, 3, 1))).unwrap();
    assert!(open.covers(&closed));
    assert!(!closed.covers(&open));
    assert!(open.covers(&open));
  }

  #[test]
  fn boundary_points_of_overlapping_pair() {
    let a = ValidityInterval::new(d(2019, 1, 1), Some(d(2019, 6, 30))).unwrap();
    let b = ValidityInterval::unbounded(d(2019, 4, 1));

    let points = boundary_points([&a, &b]);
    let listed: Vec<NaiveDate> = points.iter().copied().collect();
    assert_eq!(
      listed,
      vec![d(2019, 1, 1), d(2019, 4, 1), d(2019, 7, 1), FAR_FUTURE]
    );

    let subs = sub_intervals(&points);
    assert_eq!(subs, vec![
      SubInterval { start: d(2019, 1, 1), end: Some(d(2019, 4, 1)) },
      SubInterval { start: d(2019, 4, 1), end: Some(d(2019, 7, 1)) },
      SubInterval { start: d(2019, 7, 1), end: None },
    ]);
    assert_eq!(
      subs[1].validity(),
      ValidityInterval::new(d(2019, 4, 1), Some(d(2019, 6, 30))).unwrap()
    );
    assert_eq!(subs[2].validity(), ValidityInterval::unbounded(d(2019, 7, 1)));
  }

  #[test]
  fn no_intervals_no_sub_intervals() {
    let points = boundary_points(std::iter::empty());
    assert!(sub_intervals(&points).is_empty());
  }
}
