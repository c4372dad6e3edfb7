//! Source-side records: what the personnel feed reports for a window.
//!
//! These are ephemeral. They are read once per sync window and discarded
//! after the person they belong to has been reconciled.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{fraction::Fraction, interval::ValidityInterval};

/// A person whose master data changed in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonIdentity {
  pub national_id: String,
  pub given_name:  String,
  pub surname:     String,
}

impl PersonIdentity {
  /// The name written to the directory.
  pub fn display_name(&self) -> String {
    format!("{} {}", self.given_name.trim(), self.surname.trim())
      .trim()
      .to_owned()
  }
}

/// All changed employments of one person in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonChangeRecord {
  pub national_id: String,
  pub employments: Vec<EmploymentRecord>,
}

/// One job of one person as reported for the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentRecord {
  /// Numeric or symbolic job id, verbatim from the feed.
  pub job_id:          String,
  pub employment_date: Option<NaiveDate>,
  /// Status transitions in feed order.
  pub status_events:   Vec<StatusEvent>,
  pub departments:     Vec<Department>,
  pub professions:     Vec<Profession>,
  pub working_times:   Vec<WorkingTime>,
}

impl EmploymentRecord {
  /// True if any attribute list carries more than one entry, meaning the
  /// attribute changed inside the window.
  pub fn has_follow_up_entries(&self) -> bool {
    self.departments.len() > 1
      || self.professions.len() > 1
      || self.working_times.len() > 1
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
  /// Raw code; classified by [`crate::status::classify`].
  pub code:     String,
  pub validity: ValidityInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
  pub unit_uuid: Uuid,
  /// The source's short department code, used to name units it creates.
  pub unit_key:  String,
  pub validity:  ValidityInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profession {
  pub name:     String,
  pub validity: ValidityInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingTime {
  pub rate:     Fraction,
  pub validity: ValidityInterval,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_name_joins_and_trims() {
    let p = PersonIdentity {
      national_id: "0101011234".into(),
      given_name:  " Anna ".into(),
      surname:     "Jensen".into(),
    };
    assert_eq!(p.display_name(), "Anna Jensen");

    let p = PersonIdentity { surname: String::new(), ..p };
    assert_eq!(p.display_name(), "Anna");
  }
}
