//! Per-run counters and the list of faulted persons.

use std::fmt;

use serde::Serialize;

use crate::fault::{Fault, PersonFault};

/// What a run did. Serialises to JSON for `hrsync sync --json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
  pub persons_seen:           usize,
  pub persons_created:        usize,
  pub persons_renamed:        usize,
  /// Absent persons whose events were all terminations or deletions.
  pub persons_skipped:        usize,
  pub org_units_created:      usize,
  pub job_functions_created:  usize,
  pub engagements_created:    usize,
  pub engagements_edited:     usize,
  pub engagements_terminated: usize,
  pub leaves_created:         usize,
  pub associations_created:   usize,
  pub primary_edits:          usize,
  /// Writes the directory reported as already in effect.
  pub already_applied:        usize,
  pub faults:                 Vec<PersonFault>,
}

impl RunSummary {
  pub fn record(&mut self, national_id: &str, fault: &Fault) {
    tracing::warn!(
      national_id,
      job_id = fault.job_id(),
      kind = %fault.kind(),
      "{fault}"
    );
    self.faults.push(PersonFault::new(national_id, fault));
  }

  /// Writes that changed the directory.
  pub fn writes(&self) -> usize {
    self.persons_created
      + self.persons_renamed
      + self.org_units_created
      + self.job_functions_created
      + self.engagements_created
      + self.engagements_edited
      + self.engagements_terminated
      + self.leaves_created
      + self.associations_created
      + self.primary_edits
  }

  pub fn is_clean(&self) -> bool { self.faults.is_empty() }
}

impl fmt::Display for RunSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "persons seen:           {}", self.persons_seen)?;
    writeln!(f, "persons created:        {}", self.persons_created)?;
    writeln!(f, "persons renamed:        {}", self.persons_renamed)?;
    writeln!(f, "persons skipped:        {}", self.persons_skipped)?;
    writeln!(f, "org units created:      {}", self.org_units_created)?;
    writeln!(f, "job functions created:  {}", self.job_functions_created)?;
    writeln!(f, "engagements created:    {}", self.engagements_created)?;
    writeln!(f, "engagements edited:     {}", self.engagements_edited)?;
    writeln!(f, "engagements terminated: {}", self.engagements_terminated)?;
    writeln!(f, "leaves created:         {}", self.leaves_created)?;
    writeln!(f, "associations created:   {}", self.associations_created)?;
    writeln!(f, "primary edits:          {}", self.primary_edits)?;
    writeln!(f, "already applied:        {}", self.already_applied)?;
    write!(f, "faults:                 {}", self.faults.len())?;
    for fault in &self.faults {
      write!(
        f,
        "\n  {} job={} [{}] {}",
        fault.national_id,
        fault.job_id.as_deref().unwrap_or("-"),
        fault.kind,
        fault.message
      )?;
    }
    Ok(())
  }
}
