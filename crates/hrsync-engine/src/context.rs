//! The state one person's reconciliation works against.

use hrsync_core::{
  directory::{Engagement, Person},
  interval::ValidityInterval,
  job,
  store::DirectoryReader,
  timeline::{self, Slice, TimelineChange},
};
use uuid::Uuid;

/// A person and every engagement slice the directory holds for them.
///
/// Built when the person's processing starts and reloaded after any write
/// that changes the engagement set.
#[derive(Debug, Clone)]
pub struct PersonContext {
  pub person:      Person,
  pub engagements: Vec<Engagement>,
}

impl PersonContext {
  pub async fn load<D: DirectoryReader>(directory: &D, person: Person) -> Result<Self, D::Error> {
    let engagements = directory.read_engagements(person.uuid, None).await?;
    Ok(Self { person, engagements })
  }

  pub async fn reload<D: DirectoryReader>(&mut self, directory: &D) -> Result<(), D::Error> {
    self.engagements = directory.read_engagements(self.person.uuid, None).await?;
    Ok(())
  }

  /// The engagement the directory holds for `job_id`.
  pub fn find(&self, job_id: &str) -> Option<&Engagement> {
    job::find(&self.engagements, job_id)
  }

  /// First start to last end of the engagement `uuid`, over all its slices.
  pub fn lifetime(&self, uuid: Uuid) -> Option<ValidityInterval> {
    timeline::lifetime(
      self
        .engagements
        .iter()
        .filter(|e| e.uuid == uuid)
        .map(|e| &e.validity),
    )
  }

  /// Whether the slices of engagement `uuid` leave no part of `validity`
  /// uncovered.
  pub fn covers(&self, uuid: Uuid, validity: &ValidityInterval) -> bool {
    let slices: Vec<Slice<()>> = self
      .engagements
      .iter()
      .filter(|e| e.uuid == uuid)
      .map(|e| Slice { validity: e.validity, value: () })
      .collect();
    matches!(timeline::extend(&slices, validity), TimelineChange::Unchanged)
  }
}
