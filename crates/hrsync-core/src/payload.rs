//! Write payloads for the directory, and the builders that validate them.
//!
//! Every detail kind is its own variant carrying exactly the references it
//! needs, so resolving references is a match rather than a search through
//! optional fields. Builders collect fields one by one and refuse to build while a
//! required reference is missing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  directory::{DetailKind, Facet},
  fraction::Fraction,
  interval::ValidityInterval,
};

// ─── References ──────────────────────────────────────────────────────────────

/// The kind of object a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
  Person,
  OrgUnit,
  Class,
  ItSystem,
  Engagement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
  pub kind: RefKind,
  pub uuid: Uuid,
}

impl Reference {
  fn new(kind: RefKind, uuid: Uuid) -> Self { Self { kind, uuid } }
}

// ─── Detail payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementDetail {
  pub person:          Uuid,
  pub org_unit:        Uuid,
  pub job_function:    Uuid,
  pub engagement_type: Uuid,
  pub user_key:        String,
  pub fraction:        Fraction,
  pub primary:         bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDetail {
  pub person:           Uuid,
  pub org_unit:         Uuid,
  pub association_type: Uuid,
  pub user_key:         String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveDetail {
  pub person:     Uuid,
  pub leave_type: Uuid,
  pub engagement: Uuid,
}

/// Who an address or manager record hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uuid", rename_all = "snake_case")]
pub enum Owner {
  Person(Uuid),
  OrgUnit(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDetail {
  pub owner:        Owner,
  pub address_type: Uuid,
  pub value:        String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItSystemDetail {
  pub person:    Uuid,
  pub it_system: Uuid,
  pub user_key:  String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDetail {
  pub person:    Uuid,
  pub org_unit:  Uuid,
  pub role_type: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerDetail {
  pub person:           Option<Uuid>,
  pub org_unit:         Uuid,
  pub manager_type:     Uuid,
  pub manager_level:    Uuid,
  pub responsibilities: Vec<Uuid>,
}

/// A detail record. The variant name is the kind discriminant stored by the
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Detail {
  Address(AddressDetail),
  Engagement(EngagementDetail),
  Association(AssociationDetail),
  ItSystem(ItSystemDetail),
  Leave(LeaveDetail),
  Role(RoleDetail),
  Manager(ManagerDetail),
}

impl Detail {
  pub fn kind(&self) -> DetailKind {
    match self {
      Self::Address(_) => DetailKind::Address,
      Self::Engagement(_) => DetailKind::Engagement,
      Self::Association(_) => DetailKind::Association,
      Self::ItSystem(_) => DetailKind::ItSystem,
      Self::Leave(_) => DetailKind::Leave,
      Self::Role(_) => DetailKind::Role,
      Self::Manager(_) => DetailKind::Manager,
    }
  }

  /// The person this detail belongs to, if any.
  pub fn person(&self) -> Option<Uuid> {
    match self {
      Self::Address(a) => match a.owner {
        Owner::Person(p) => Some(p),
        Owner::OrgUnit(_) => None,
      },
      Self::Engagement(e) => Some(e.person),
      Self::Association(a) => Some(a.person),
      Self::ItSystem(i) => Some(i.person),
      Self::Leave(l) => Some(l.person),
      Self::Role(r) => Some(r.person),
      Self::Manager(m) => m.person,
    }
  }

  /// Every object this detail points at, for the directory to resolve.
  pub fn references(&self) -> Vec<Reference> {
    use RefKind::*;
    match self {
      Self::Address(a) => vec![
        match a.owner {
          Owner::Person(p) => Reference::new(Person, p),
          Owner::OrgUnit(u) => Reference::new(OrgUnit, u),
        },
        Reference::new(Class, a.address_type),
      ],
      Self::Engagement(e) => vec![
        Reference::new(Person, e.person),
        Reference::new(OrgUnit, e.org_unit),
        Reference::new(Class, e.job_function),
        Reference::new(Class, e.engagement_type),
      ],
      Self::Association(a) => vec![
        Reference::new(Person, a.person),
        Reference::new(OrgUnit, a.org_unit),
        Reference::new(Class, a.association_type),
      ],
      Self::ItSystem(i) => vec![
        Reference::new(Person, i.person),
        Reference::new(ItSystem, i.it_system),
      ],
      Self::Leave(l) => vec![
        Reference::new(Person, l.person),
        Reference::new(Class, l.leave_type),
        Reference::new(Engagement, l.engagement),
      ],
      Self::Role(r) => vec![
        Reference::new(Person, r.person),
        Reference::new(OrgUnit, r.org_unit),
        Reference::new(Class, r.role_type),
      ],
      Self::Manager(m) => {
        let mut refs = vec![
          Reference::new(OrgUnit, m.org_unit),
          Reference::new(Class, m.manager_type),
          Reference::new(Class, m.manager_level),
        ];
        refs.extend(m.person.map(|p| Reference::new(Person, p)));
        refs.extend(m.responsibilities.iter().map(|r| Reference::new(Class, *r)));
        refs
      }
    }
  }
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
  pub national_id: String,
  pub name:        String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrgUnit {
  pub user_key:  String,
  pub name:      String,
  pub unit_type: Uuid,
  pub parent:    Option<Uuid>,
  pub validity:  ValidityInterval,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClass {
  pub facet:    Facet,
  pub user_key: String,
  pub name:     String,
}

/// Input to [`crate::store::DirectoryWriter::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRequest {
  Person(NewPerson),
  /// Create a unit with a caller-chosen uuid (units are keyed by the source's
  /// department uuid).
  OrgUnit { uuid: Uuid, unit: NewOrgUnit },
  Class(NewClass),
  Detail { detail: Detail, validity: ValidityInterval },
}

/// A partial engagement change over one validity window. Fields left `None`
/// keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementChanges {
  pub org_unit:        Option<Uuid>,
  pub job_function:    Option<Uuid>,
  pub engagement_type: Option<Uuid>,
  pub fraction:        Option<Fraction>,
  pub primary:         Option<bool>,
}

impl EngagementChanges {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// The engagement as it would read after this change.
  pub fn apply_to(&self, current: &EngagementDetail) -> EngagementDetail {
    EngagementDetail {
      org_unit: self.org_unit.unwrap_or(current.org_unit),
      job_function: self.job_function.unwrap_or(current.job_function),
      engagement_type: self.engagement_type.unwrap_or(current.engagement_type),
      fraction: self.fraction.unwrap_or(current.fraction),
      primary: self.primary.unwrap_or(current.primary),
      ..current.clone()
    }
  }
}

/// Input to [`crate::store::DirectoryWriter::edit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditRequest {
  PersonName(String),
  Engagement {
    changes:  EngagementChanges,
    validity: ValidityInterval,
  },
  /// Make a detail cover `validity`, carrying neighbouring values into the
  /// stretches it did not cover. Used to reactivate ended engagements.
  Extend { validity: ValidityInterval },
}

// ─── Builders ────────────────────────────────────────────────────────────────

fn require<T>(value: Option<T>, operation: &'static str, field: &'static str) -> Result<T> {
  value.ok_or(Error::MissingReference { operation, field })
}

/// Builds a [`CreateRequest`] for a new engagement.
#[derive(Debug, Clone, Default)]
pub struct EngagementBuilder {
  person:          Option<Uuid>,
  org_unit:        Option<Uuid>,
  job_function:    Option<Uuid>,
  engagement_type: Option<Uuid>,
  user_key:        Option<String>,
  fraction:        Option<Fraction>,
  validity:        Option<ValidityInterval>,
}

impl EngagementBuilder {
  const OPERATION: &'static str = "engagement create";

  pub fn new() -> Self { Self::default() }

  pub fn person(mut self, uuid: Uuid) -> Self {
    self.person = Some(uuid);
    self
  }

  pub fn org_unit(mut self, uuid: Uuid) -> Self {
    self.org_unit = Some(uuid);
    self
  }

  pub fn job_function(mut self, uuid: Option<Uuid>) -> Self {
    self.job_function = uuid;
    self
  }

  pub fn engagement_type(mut self, uuid: Uuid) -> Self {
    self.engagement_type = Some(uuid);
    self
  }

  pub fn user_key(mut self, key: impl Into<String>) -> Self {
    self.user_key = Some(key.into());
    self
  }

  pub fn fraction(mut self, fraction: Option<Fraction>) -> Self {
    self.fraction = fraction;
    self
  }

  pub fn validity(mut self, validity: ValidityInterval) -> Self {
    self.validity = Some(validity);
    self
  }

  /// New engagements are never primary; the primary selector decides that.
  pub fn build(self) -> Result<CreateRequest> {
    let op = Self::OPERATION;
    let detail = EngagementDetail {
      person:          require(self.person, op, "person")?,
      org_unit:        require(self.org_unit, op, "org_unit")?,
      job_function:    require(self.job_function, op, "job_function")?,
      engagement_type: require(self.engagement_type, op, "engagement_type")?,
      user_key:        require(self.user_key, op, "user_key")?,
      fraction:        require(self.fraction, op, "fraction")?,
      primary:         false,
    };
    Ok(CreateRequest::Detail {
      detail:   Detail::Engagement(detail),
      validity: require(self.validity, op, "validity")?,
    })
  }
}

/// Builds a [`CreateRequest`] for a new association.
#[derive(Debug, Clone, Default)]
pub struct AssociationBuilder {
  person:           Option<Uuid>,
  org_unit:         Option<Uuid>,
  association_type: Option<Uuid>,
  user_key:         Option<String>,
  validity:         Option<ValidityInterval>,
}

impl AssociationBuilder {
  const OPERATION: &'static str = "association create";

  pub fn new() -> Self { Self::default() }

  pub fn person(mut self, uuid: Uuid) -> Self {
    self.person = Some(uuid);
    self
  }

  pub fn org_unit(mut self, uuid: Uuid) -> Self {
    self.org_unit = Some(uuid);
    self
  }

  pub fn association_type(mut self, uuid: Uuid) -> Self {
    self.association_type = Some(uuid);
    self
  }

  pub fn user_key(mut self, key: impl Into<String>) -> Self {
    self.user_key = Some(key.into());
    self
  }

  pub fn validity(mut self, validity: ValidityInterval) -> Self {
    self.validity = Some(validity);
    self
  }

  pub fn build(self) -> Result<CreateRequest> {
    let op = Self::OPERATION;
    let detail = AssociationDetail {
      person:           require(self.person, op, "person")?,
      org_unit:         require(self.org_unit, op, "org_unit")?,
      association_type: require(self.association_type, op, "association_type")?,
      user_key:         self.user_key.unwrap_or_default(),
    };
    Ok(CreateRequest::Detail {
      detail:   Detail::Association(detail),
      validity: require(self.validity, op, "validity")?,
    })
  }
}

/// Builds a [`CreateRequest`] for a new leave.
#[derive(Debug, Clone, Default)]
pub struct LeaveBuilder {
  person:     Option<Uuid>,
  leave_type: Option<Uuid>,
  engagement: Option<Uuid>,
  validity:   Option<ValidityInterval>,
}

impl LeaveBuilder {
  const OPERATION: &'static str = "leave create";

  pub fn new() -> Self { Self::default() }

  pub fn person(mut self, uuid: Uuid) -> Self {
    self.person = Some(uuid);
    self
  }

  pub fn leave_type(mut self, uuid: Uuid) -> Self {
    self.leave_type = Some(uuid);
    self
  }

  pub fn engagement(mut self, uuid: Option<Uuid>) -> Self {
    self.engagement = uuid;
    self
  }

  pub fn validity(mut self, validity: ValidityInterval) -> Self {
    self.validity = Some(validity);
    self
  }

  pub fn build(self) -> Result<CreateRequest> {
    let op = Self::OPERATION;
    let detail = LeaveDetail {
      person:     require(self.person, op, "person")?,
      leave_type: require(self.leave_type, op, "leave_type")?,
      engagement: require(self.engagement, op, "engagement")?,
    };
    Ok(CreateRequest::Detail {
      detail:   Detail::Leave(detail),
      validity: require(self.validity, op, "validity")?,
    })
  }
}

/// Builds an [`EditRequest`] changing engagement fields over one window.
#[derive(Debug, Clone, Default)]
pub struct EngagementEdit {
  changes:  EngagementChanges,
  validity: Option<ValidityInterval>,
}

impl EngagementEdit {
  const OPERATION: &'static str = "engagement edit";

  pub fn new() -> Self { Self::default() }

  pub fn org_unit(mut self, uuid: Uuid) -> Self {
    self.changes.org_unit = Some(uuid);
    self
  }

  pub fn job_function(mut self, uuid: Uuid) -> Self {
    self.changes.job_function = Some(uuid);
    self
  }

  pub fn engagement_type(mut self, uuid: Uuid) -> Self {
    self.changes.engagement_type = Some(uuid);
    self
  }

  pub fn fraction(mut self, fraction: Fraction) -> Self {
    self.changes.fraction = Some(fraction);
    self
  }

  pub fn primary(mut self, primary: bool) -> Self {
    self.changes.primary = Some(primary);
    self
  }

  pub fn validity(mut self, validity: ValidityInterval) -> Self {
    self.validity = Some(validity);
    self
  }

  pub fn build(self) -> Result<EditRequest> {
    let op = Self::OPERATION;
    if self.changes.is_empty() {
      return Err(Error::MissingReference { operation: op, field: "changes" });
    }
    Ok(EditRequest::Engagement {
      changes:  self.changes,
      validity: require(self.validity, op, "validity")?,
    })
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn validity() -> ValidityInterval {
    ValidityInterval::unbounded(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
  }

  #[test]
  fn engagement_builder_reports_missing_job_function() {
    let err = EngagementBuilder::new()
      .person(Uuid::new_v4())
      .org_unit(Uuid::new_v4())
      .engagement_type(Uuid::new_v4())
      .user_key("00123")
      .job_function(None)
      .validity(validity())
      .build()
      .unwrap_err();
    assert!(matches!(
      err,
      Error::MissingReference { operation: "engagement create", field: "job_function" }
    ));
  }

  #[test]
  fn engagement_builder_builds_non_primary_detail() {
    let req = EngagementBuilder::new()
      .person(Uuid::new_v4())
      .org_unit(Uuid::new_v4())
      .job_function(Some(Uuid::new_v4()))
      .engagement_type(Uuid::new_v4())
      .user_key("00123")
      .fraction(Some(Fraction::FULL))
      .validity(validity())
      .build()
      .unwrap();
    let CreateRequest::Detail { detail: Detail::Engagement(e), .. } = req else {
      panic!("expected an engagement detail");
    };
    assert!(!e.primary);
    assert_eq!(e.fraction, Fraction::FULL);
  }

  #[test]
  fn engagement_builder_requires_a_working_time() {
    let err = EngagementBuilder::new()
      .person(Uuid::new_v4())
      .org_unit(Uuid::new_v4())
      .job_function(Some(Uuid::new_v4()))
      .engagement_type(Uuid::new_v4())
      .user_key("00123")
      .fraction(None)
      .validity(validity())
      .build()
      .unwrap_err();
    assert!(matches!(err, Error::MissingReference { field: "fraction", .. }));
  }

  #[test]
  fn leave_without_engagement_is_rejected() {
    let err = LeaveBuilder::new()
      .person(Uuid::new_v4())
      .leave_type(Uuid::new_v4())
      .engagement(None)
      .validity(validity())
      .build()
      .unwrap_err();
    assert!(matches!(err, Error::MissingReference { field: "engagement", .. }));
  }

  #[test]
  fn empty_edit_is_rejected() {
    let err = EngagementEdit::new().validity(validity()).build().unwrap_err();
    assert!(matches!(err, Error::MissingReference { field: "changes", .. }));
  }

  #[test]
  fn references_follow_the_variant() {
    let person = Uuid::new_v4();
    let unit = Uuid::new_v4();
    let detail = Detail::Manager(ManagerDetail {
      person:           Some(person),
      org_unit:         unit,
      manager_type:     Uuid::new_v4(),
      manager_level:    Uuid::new_v4(),
      responsibilities: vec![Uuid::new_v4(), Uuid::new_v4()],
    });
    let refs = detail.references();
    assert_eq!(refs.len(), 6);
    assert!(refs.contains(&Reference { kind: RefKind::Person, uuid: person }));
    assert!(refs.contains(&Reference { kind: RefKind::OrgUnit, uuid: unit }));
    assert_eq!(detail.kind(), DetailKind::Manager);
  }

  #[test]
  fn detail_serialises_with_kind_tag() {
    let detail = Detail::Leave(LeaveDetail {
      person:     Uuid::nil(),
      leave_type: Uuid::nil(),
      engagement: Uuid::nil(),
    });
    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["type"], "leave");
  }
}
