//! Validity-sliced timelines.
//!
//! The directory keeps a record as an ordered run of slices sharing one uuid,
//! each with its own validity and value. Editing a record over a window splits
//! the slices at the window edges and rewrites only the overlapped part;
//! adjacent slices that end up equal are merged back together.

use chrono::NaiveDate;

use crate::interval::{ValidityInterval, day_after, day_before};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice<T> {
  pub validity: ValidityInterval,
  pub value:    T,
}

/// What an edit or truncation did to a timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineChange<T> {
  /// The new, coalesced slices.
  Changed(Vec<Slice<T>>),
  /// The window overlapped the timeline but nothing differed.
  Unchanged,
  /// The window does not touch any slice.
  NoOverlap,
}

/// Apply `edit` to every part of `slices` that falls inside `window`.
pub fn apply<T, F>(
  slices: &[Slice<T>],
  window: &ValidityInterval,
  edit: F,
) -> TimelineChange<T>
where
  T: Clone + PartialEq,
  F: Fn(&T) -> T,
{
  let mut out = Vec::with_capacity(slices.len() + 2);
  let mut touched = false;
  let mut changed = false;

  for slice in slices {
    let Some(mid) = slice.validity.intersection(window) else {
      out.push(slice.clone());
      continue;
    };
    touched = true;

    let edited = edit(&slice.value);
    if edited == slice.value {
      out.push(slice.clone());
      continue;
    }
    changed = true;

    if slice.validity.from < mid.from {
      out.push(Slice {
        validity: ValidityInterval {
          from: slice.validity.from,
          to:   Some(day_before(mid.from)),
        },
        value:    slice.value.clone(),
      });
    }
    out.push(Slice { validity: mid, value: edited });
    if let Some(mid_to) = mid.to
      && slice.validity.to.is_none_or(|to| to > mid_to)
    {
      out.push(Slice {
        validity: ValidityInterval {
          from: day_after(mid_to),
          to:   slice.validity.to,
        },
        value:    slice.value.clone(),
      });
    }
  }

  if !touched {
    TimelineChange::NoOverlap
  } else if !changed {
    TimelineChange::Unchanged
  } else {
    TimelineChange::Changed(coalesce(out))
  }
}

/// End the timeline on `to` (inclusive). Slices starting after `to` are cut
/// away; the slice spanning `to` is shortened.
pub fn truncate<T: Clone + PartialEq>(
  slices: &[Slice<T>],
  to: NaiveDate,
) -> TimelineChange<T> {
  if slices.is_empty() {
    return TimelineChange::NoOverlap;
  }

  let mut out = Vec::with_capacity(slices.len());
  let mut changed = false;
  for slice in slices {
    if slice.validity.from > to {
      changed = true;
      continue;
    }
    match slice.validity.to {
      Some(end) if end <= to => out.push(slice.clone()),
      _ => {
        changed = true;
        out.push(Slice {
          validity: ValidityInterval { from: slice.validity.from, to: Some(to) },
          value:    slice.value.clone(),
        });
      }
    }
  }

  if !changed {
    TimelineChange::Unchanged
  } else {
    TimelineChange::Changed(coalesce(out))
  }
}

/// Make the timeline cover all of `window`.
///
/// Each uncovered stretch of the window becomes a new slice carrying the
/// value of the slice in effect just before it, or of the first slice when
/// the stretch lies before the timeline starts.
pub fn extend<T: Clone + PartialEq>(
  slices: &[Slice<T>],
  window: &ValidityInterval,
) -> TimelineChange<T> {
  let mut ordered = slices.to_vec();
  ordered.sort_by_key(|s| s.validity.from);
  let Some(first) = ordered.first() else {
    return TimelineChange::NoOverlap;
  };

  let mut gaps = Vec::new();
  // Start of the part of the window not yet known to be covered.
  let mut cursor = Some(window.from);
  let mut carried = first.value.clone();
  for slice in &ordered {
    let Some(start) = cursor else { break };
    if window.to.is_some_and(|to| to < start) {
      break;
    }
    if slice.validity.from > start {
      let gap_to = match window.to {
        Some(to) => to.min(day_before(slice.validity.from)),
        None => day_before(slice.validity.from),
      };
      gaps.push(Slice {
        validity: ValidityInterval { from: start, to: Some(gap_to) },
        value:    carried.clone(),
      });
    }
    carried = slice.value.clone();
    cursor = match slice.validity.to {
      None => None,
      Some(to) => Some(start.max(day_after(to))),
    };
  }
  if let Some(start) = cursor
    && window.to.is_none_or(|to| to >= start)
  {
    gaps.push(Slice {
      validity: ValidityInterval { from: start, to: window.to },
      value:    carried,
    });
  }

  if gaps.is_empty() {
    return TimelineChange::Unchanged;
  }
  ordered.extend(gaps);
  TimelineChange::Changed(coalesce(ordered))
}

/// Sort slices by start and merge adjacent slices with equal values.
pub fn coalesce<T: PartialEq>(mut slices: Vec<Slice<T>>) -> Vec<Slice<T>> {
  slices.sort_by_key(|s| s.validity.from);
  let mut out: Vec<Slice<T>> = Vec::with_capacity(slices.len());
  for slice in slices {
    if let Some(last) = out.last_mut()
      && last.value == slice.value
      && last.validity.to.is_some_and(|to| day_after(to) == slice.validity.from)
    {
      last.validity.to = slice.validity.to;
      continue;
    }
    out.push(slice);
  }
  out
}

/// The full span covered by a set of intervals, from the first start to the
/// last end.
pub fn lifetime<'a>(
  validities: impl IntoIterator<Item = &'a ValidityInterval>,
) -> Option<ValidityInterval> {
  let mut span: Option<ValidityInterval> = None;
  for v in validities {
    span = Some(match span {
      None => *v,
      Some(acc) => ValidityInterval {
        from: acc.from.min(v.from),
        to:   acc.to.zip(v.to).map(|(a, b)| a.max(b)),
      },
    });
  }
  span
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn v(from: NaiveDate, to: Option<NaiveDate>) -> ValidityInterval {
    ValidityInterval::new(from, to).unwrap()
  }

  fn open(value: u32) -> Vec<Slice<u32>> {
    vec![Slice { validity: v(d(2020, 1, 1), None), value }]
  }

  #[test]
  fn edit_in_the_middle_splits_three_ways() {
    let window = v(d(2020, 3, 1), Some(d(2020, 3, 31)));
    let TimelineChange::Changed(out) = apply(&open(1), &window, |_| 2) else {
      panic!("expected a change");
    };
    assert_eq!(out, vec![
      Slice { validity: v(d(2020, 1, 1), Some(d(2020, 2, 29))), value: 1 },
      Slice { validity: v(d(2020, 3, 1), Some(d(2020, 3, 31))), value: 2 },
      Slice { validity: v(d(2020, 4, 1), None), value: 1 },
    ]);
  }

  #[test]
  fn open_window_rewrites_the_tail() {
    let window = v(d(2020, 6, 1), None);
    let TimelineChange::Changed(out) = apply(&open(1), &window, |_| 2) else {
      panic!("expected a change");
    };
    assert_eq!(out.len(), 2);
    assert_eq!(out[1].validity, v(d(2020, 6, 1), None));
  }

  #[test]
  fn repeated_edit_is_unchanged() {
    let window = v(d(2020, 3, 1), Some(d(2020, 3, 31)));
    let TimelineChange::Changed(once) = apply(&open(1), &window, |_| 2) else {
      panic!("expected a change");
    };
    assert_eq!(apply(&once, &window, |_| 2), TimelineChange::Unchanged);
  }

  #[test]
  fn reverting_an_edit_coalesces_back() {
    let window = v(d(2020, 3, 1), Some(d(2020, 3, 31)));
    let TimelineChange::Changed(split) = apply(&open(1), &window, |_| 2) else {
      panic!("expected a change");
    };
    let TimelineChange::Changed(back) = apply(&split, &window, |_| 1) else {
      panic!("expected a change");
    };
    assert_eq!(back, open(1));
  }

  #[test]
  fn window_before_the_timeline_does_not_overlap() {
    let window = v(d(2019, 1, 1), Some(d(2019, 12, 31)));
    assert_eq!(apply(&open(1), &window, |_| 2), TimelineChange::NoOverlap);
  }

  #[test]
  fn truncate_shortens_and_drops() {
    let slices = vec![
      Slice { validity: v(d(2020, 1, 1), Some(d(2020, 5, 31))), value: 1 },
      Slice { validity: v(d(2020, 6, 1), None), value: 2 },
    ];
    let TimelineChange::Changed(out) = truncate(&slices, d(2020, 3, 1)) else {
      panic!("expected a change");
    };
    assert_eq!(out, vec![Slice {
      validity: v(d(2020, 1, 1), Some(d(2020, 3, 1))),
      value:    1,
    }]);
    assert_eq!(truncate(&out, d(2020, 3, 1)), TimelineChange::Unchanged);
  }

  #[test]
  fn extend_fills_the_tail_with_the_last_value() {
    let ended = vec![
      Slice { validity: v(d(2019, 1, 1), Some(d(2019, 12, 31))), value: 1 },
      Slice { validity: v(d(2020, 1, 1), Some(d(2020, 3, 1))), value: 2 },
    ];
    let TimelineChange::Changed(out) = extend(&ended, &v(d(2020, 6, 1), None)) else {
      panic!("expected a change");
    };
    assert_eq!(out.len(), 3);
    assert_eq!(out[2], Slice { validity: v(d(2020, 6, 1), None), value: 2 });
    assert_eq!(extend(&out, &v(d(2020, 6, 1), None)), TimelineChange::Unchanged);
  }

  #[test]
  fn extend_adjacent_to_the_end_coalesces() {
    let ended = vec![Slice { validity: v(d(2020, 1, 1), Some(d(2020, 1, 31))), value: 1 }];
    let TimelineChange::Changed(out) = extend(&ended, &v(d(2020, 2, 1), None)) else {
      panic!("expected a change");
    };
    assert_eq!(out, open(1));
  }

  #[test]
  fn extend_fills_a_hole_and_the_head() {
    let holed = vec![
      Slice { validity: v(d(2020, 1, 1), Some(d(2020, 1, 31))), value: 1 },
      Slice { validity: v(d(2020, 3, 1), None), value: 2 },
    ];
    let TimelineChange::Changed(out) = extend(&holed, &v(d(2019, 12, 1), Some(d(2020, 3, 15))))
    else {
      panic!("expected a change");
    };
    assert_eq!(out, vec![
      Slice { validity: v(d(2019, 12, 1), Some(d(2020, 2, 29))), value: 1 },
      Slice { validity: v(d(2020, 3, 1), None), value: 2 },
    ]);
  }

  #[test]
  fn extend_inside_the_timeline_is_unchanged() {
    assert_eq!(
      extend(&open(1), &v(d(2020, 2, 1), Some(d(2020, 2, 28)))),
      TimelineChange::Unchanged
    );
    assert_eq!(extend::<u32>(&[], &v(d(2020, 2, 1), None)), TimelineChange::NoOverlap);
  }

  #[test]
  fn lifetime_spans_all_slices() {
    let slices = vec![
      Slice { validity: v(d(2020, 1, 1), Some(d(2020, 5, 31))), value: 1 },
      Slice { validity: v(d(2020, 6, 1), Some(d(2020, 9, 30))), value: 2 },
    ];
    let span = lifetime(slices.iter().map(|s| &s.validity));
    assert_eq!(span, Some(v(d(2020, 1, 1), Some(d(2020, 9, 30)))));
    assert_eq!(lifetime([]), None);

    let open = [v(d(2021, 1, 1), None), v(d(2020, 1, 1), Some(d(2020, 2, 1)))];
    assert_eq!(lifetime(&open), Some(v(d(2020, 1, 1), None)));
  }
}
