//! The collaborator traits: the personnel feed and the directory.
//!
//! Backends implement these (e.g. `hrsync-feed-xml`, `hrsync-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  directory::{
    Association, Class, DetailKind, Engagement, Facet, Leave, OrgUnit, Person,
    WriteOutcome,
  },
  employment::{PersonChangeRecord, PersonIdentity},
  payload::{CreateRequest, EditRequest},
};

// ─── Source feed ─────────────────────────────────────────────────────────────

/// The authoritative personnel feed.
///
/// Windows are local calendar dates. Any caching or retrying of the
/// underlying transport is the implementation's business.
pub trait SourceFeed: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every person with employment changes in the window, with those
  /// changes.
  fn changed_employments(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<PersonChangeRecord>, Self::Error>> + Send + '_;

  /// Every person whose master data (name) changed in the window.
  fn changed_persons(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> impl Future<Output = Result<Vec<PersonIdentity>, Self::Error>> + Send + '_;
}

// ─── Directory ───────────────────────────────────────────────────────────────

/// Read access to the organisational directory.
pub trait DirectoryReader: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look a person up by their source key. Returns `None` if unknown.
  fn read_person<'a>(
    &'a self,
    national_id: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  /// The person's engagement slices, ordered by start.
  ///
  /// - `as_of: None` returns every slice, past and future.
  /// - `as_of: Some(date)` returns only the slices in effect on `date`.
  fn read_engagements(
    &self,
    person: Uuid,
    as_of: Option<NaiveDate>,
  ) -> impl Future<Output = Result<Vec<Engagement>, Self::Error>> + Send + '_;

  /// Every association slice of the person, ordered by start.
  fn read_associations(
    &self,
    person: Uuid,
  ) -> impl Future<Output = Result<Vec<Association>, Self::Error>> + Send + '_;

  /// Every leave slice of the person, ordered by start.
  fn read_leaves(
    &self,
    person: Uuid,
  ) -> impl Future<Output = Result<Vec<Leave>, Self::Error>> + Send + '_;

  /// A unit with its ancestor chain. Returns `None` if unknown.
  fn read_org_unit(
    &self,
    uuid: Uuid,
  ) -> impl Future<Output = Result<Option<OrgUnit>, Self::Error>> + Send + '_;

  fn read_classes_in_facet(
    &self,
    facet: Facet,
  ) -> impl Future<Output = Result<Vec<Class>, Self::Error>> + Send + '_;
}

/// Write access to the organisational directory.
///
/// Edits and terminations that would not change anything succeed with
/// [`WriteOutcome::AlreadyApplied`]; a genuine rejection is an error.
pub trait DirectoryWriter: DirectoryReader {
  /// Create an object and return its uuid.
  fn create(
    &self,
    request: CreateRequest,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  fn edit(
    &self,
    uuid: Uuid,
    request: EditRequest,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  /// End a detail's validity on `to` (inclusive).
  fn terminate(
    &self,
    kind: DetailKind,
    uuid: Uuid,
    to: NaiveDate,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;
}
