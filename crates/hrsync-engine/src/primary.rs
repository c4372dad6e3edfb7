//! Primary engagement selection.
//!
//! A person's engagement slices are cut at every boundary point into
//! sub-intervals over which the set of valid engagements is stable. In each
//! sub-interval the engagement with the highest fraction is primary; equal
//! fractions go to the lowest job id. Only flags that differ from what the
//! directory holds produce an edit, so planning against an already settled
//! set yields nothing.

use hrsync_core::{
  directory::Engagement,
  interval::{ValidityInterval, boundary_points, sub_intervals},
  job::JobKey,
};
use thiserror::Error;
use uuid::Uuid;

/// One `primary` flag change over one sub-interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryEdit {
  pub engagement: Uuid,
  pub job_id:     String,
  pub validity:   ValidityInterval,
  pub primary:    bool,
}

/// Two engagements tie on both ranking rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("jobs {first} and {second} tie on fraction and job id over {validity:?}")]
pub struct AmbiguousPrimary {
  pub first:    String,
  pub second:   String,
  pub validity: ValidityInterval,
}

/// The edits that make exactly one engagement primary in every covered
/// sub-interval.
pub fn plan(engagements: &[Engagement]) -> Result<Vec<PrimaryEdit>, AmbiguousPrimary> {
  let points = boundary_points(engagements.iter().map(|e| &e.validity));
  let mut edits = Vec::new();

  for sub in sub_intervals(&points) {
    let window = sub.validity();
    let mut candidates: Vec<(&Engagement, JobKey)> = engagements
      .iter()
      .filter(|e| e.validity.covers(&window))
      .map(|e| (e, JobKey::parse(&e.user_key)))
      .collect();
    if candidates.is_empty() {
      continue;
    }

    candidates.sort_by(|(a, ka), (b, kb)| {
      b.fraction.cmp(&a.fraction).then_with(|| ka.cmp(kb))
    });
    if let [(first, k1), (second, k2), ..] = candidates.as_slice()
      && first.fraction == second.fraction
      && k1 == k2
    {
      return Err(AmbiguousPrimary {
        first:    first.user_key.clone(),
        second:   second.user_key.clone(),
        validity: window,
      });
    }

    let winner = candidates[0].0.uuid;
    for (engagement, _) in &candidates {
      let primary = engagement.uuid == winner;
      if engagement.primary != primary {
        edits.push(PrimaryEdit {
          engagement: engagement.uuid,
          job_id: engagement.user_key.clone(),
          validity: window,
          primary,
        });
      }
    }
  }

  Ok(edits)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use hrsync_core::{
    fraction::Fraction,
    timeline::{self, Slice, TimelineChange},
  };
  use proptest::prelude::*;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn engagement(
    job_id: &str,
    fraction: u32,
    validity: ValidityInterval,
    primary: bool,
  ) -> Engagement {
    Engagement {
      uuid: Uuid::new_v4(),
      person: Uuid::nil(),
      user_key: job_id.into(),
      org_unit: Uuid::nil(),
      job_function: Uuid::nil(),
      engagement_type: Uuid::nil(),
      fraction: Fraction::from_millionths(fraction),
      primary,
      validity,
    }
  }

  /// Apply a plan the way the directory would: split each engagement's
  /// timeline at the edit windows.
  fn apply(engagements: &[Engagement], edits: &[PrimaryEdit]) -> Vec<Engagement> {
    let mut uuids: Vec<Uuid> = engagements.iter().map(|e| e.uuid).collect();
    uuids.dedup();

    let mut out = Vec::new();
    for uuid in uuids {
      let template = engagements.iter().find(|e| e.uuid == uuid).unwrap().clone();
      let mut slices: Vec<Slice<bool>> = engagements
        .iter()
        .filter(|e| e.uuid == uuid)
        .map(|e| Slice { validity: e.validity, value: e.primary })
        .collect();
      for edit in edits.iter().filter(|e| e.engagement == uuid) {
        if let TimelineChange::Changed(next) =
          timeline::apply(&slices, &edit.validity, |_| edit.primary)
        {
          slices = next;
        }
      }
      out.extend(slices.into_iter().map(|s| Engagement {
        validity: s.validity,
        primary: s.value,
        ..template.clone()
      }));
    }
    out
  }

  #[test]
  fn lowest_job_id_breaks_a_fraction_tie() {
    let open = ValidityInterval::unbounded(d(2020, 1, 1));
    let a = engagement("00042", 500_000, open, false);
    let b = engagement("00017", 500_000, open, false);

    let edits = plan(&[a, b.clone()]).unwrap();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].engagement, b.uuid);
    assert!(edits[0].primary);
    assert_eq!(edits[0].validity, open);
  }

  #[test]
  fn highest_fraction_wins_and_demotes_the_old_primary() {
    let open = ValidityInterval::unbounded(d(2020, 1, 1));
    let small = engagement("1", 250_000, open, true);
    let big = engagement("2", 750_000, open, false);

    let edits = plan(&[small.clone(), big.clone()]).unwrap();
    assert_eq!(edits.len(), 2);
    assert!(edits.iter().any(|e| e.engagement == big.uuid && e.primary));
    assert!(edits.iter().any(|e| e.engagement == small.uuid && !e.primary));
  }

  #[test]
  fn settled_set_needs_no_edits() {
    let open = ValidityInterval::unbounded(d(2020, 1, 1));
    let a = engagement("00017", 500_000, open, true);
    let b = engagement("00042", 500_000, open, false);
    assert!(plan(&[a, b]).unwrap().is_empty());
    assert!(plan(&[]).unwrap().is_empty());
  }

  #[test]
  fn primary_changes_hands_at_a_boundary() {
    let first = ValidityInterval::new(d(2019, 1, 1), Some(d(2019, 6, 30))).unwrap();
    let second = ValidityInterval::unbounded(d(2019, 4, 1));
    let a = engagement("00010", 1_000_000, first, false);
    let b = engagement("00020", 500_000, second, false);

    let edits = plan(&[a.clone(), b.clone()]).unwrap();
    let windows: Vec<(Uuid, ValidityInterval, bool)> =
      edits.iter().map(|e| (e.engagement, e.validity, e.primary)).collect();
    assert_eq!(windows, vec![
      (a.uuid, ValidityInterval::new(d(2019, 1, 1), Some(d(2019, 3, 31))).unwrap(), true),
      (a.uuid, ValidityInterval::new(d(2019, 4, 1), Some(d(2019, 6, 30))).unwrap(), true),
      (b.uuid, ValidityInterval::unbounded(d(2019, 7, 1)), true),
    ]);
  }

  #[test]
  fn full_tie_is_ambiguous() {
    let open = ValidityInterval::unbounded(d(2020, 1, 1));
    let a = engagement("123", 500_000, open, false);
    let b = engagement("00123", 500_000, open, false);
    let err = plan(&[a, b]).unwrap_err();
    assert_eq!(err.validity, open);
  }

  proptest! {
    #[test]
    fn exactly_one_primary_after_applying_the_plan(
      specs in prop::collection::vec(
        (0_i64..90, prop::option::of(0_i64..90), 0_u32..5, any::<bool>()),
        1..6,
      ),
    ) {
      let base = d(2020, 1, 1);
      let engagements: Vec<Engagement> = specs
        .iter()
        .enumerate()
        .map(|(i, (start, len, quarter, primary))| {
          let from = base + chrono::Duration::days(*start);
          let to = len.map(|l| from + chrono::Duration::days(l));
          let validity = ValidityInterval::new(from, to).unwrap();
          engagement(&(i + 1).to_string(), quarter * 250_000, validity, *primary)
        })
        .collect();

      let edits = plan(&engagements).unwrap();
      let settled = apply(&engagements, &edits);

      let points = boundary_points(settled.iter().map(|e| &e.validity));
      for sub in sub_intervals(&points) {
        let window = sub.validity();
        let covering: Vec<&Engagement> =
          settled.iter().filter(|e| e.validity.covers(&window)).collect();
        if covering.is_empty() {
          continue;
        }
        let primaries = covering.iter().filter(|e| e.primary).count();
        prop_assert_eq!(primaries, 1, "window {:?}", window);
      }

      prop_assert!(plan(&settled).unwrap().is_empty());
    }
  }
}
