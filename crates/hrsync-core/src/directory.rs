//! Target-side records as read from the organisational directory.
//!
//! These are the directory's views of its objects. The engine never keeps them
//! beyond one person's processing cycle; they are re-read whenever a write
//! may have changed them.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{fraction::Fraction, interval::ValidityInterval};

// ─── Classification ──────────────────────────────────────────────────────────

/// The facets whose classes the engine resolves once per run.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString,
  AsRefStr, IntoStaticStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Facet {
  EngagementType,
  EngagementJobFunction,
  OrgUnitType,
  LeaveType,
  AssociationType,
  AddressType,
  RoleType,
  ManagerType,
  ManagerLevel,
  Responsibility,
}

/// A class within a facet, e.g. one job function or one unit type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
  pub uuid:     Uuid,
  pub facet:    Facet,
  pub user_key: String,
  pub name:     String,
}

// ─── People and units ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub uuid:        Uuid,
  /// The source system's key for the person (civil registration number).
  pub national_id: String,
  pub name:        String,
}

/// An organisational unit with its ancestor chain materialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
  pub uuid:      Uuid,
  pub user_key:  String,
  pub name:      String,
  pub unit_type: Class,
  pub parent:    Option<Box<OrgUnit>>,
}

impl OrgUnit {
  /// This unit followed by each ancestor up to the root.
  pub fn ancestry(&self) -> impl Iterator<Item = &OrgUnit> {
    std::iter::successors(Some(self), |unit| unit.parent.as_deref())
  }
}

// ─── Details ─────────────────────────────────────────────────────────────────

/// The kinds of per-person (or per-unit) detail records the directory keeps.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString,
  AsRefStr, IntoStaticStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetailKind {
  Address,
  Engagement,
  Association,
  ItSystem,
  Leave,
  Role,
  Manager,
}

/// One validity slice of an engagement.
///
/// The directory returns one value per slice, so several `Engagement`s may
/// share a `uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
  pub uuid:            Uuid,
  pub person:          Uuid,
  /// The source job id, as written at creation.
  pub user_key:        String,
  pub org_unit:        Uuid,
  pub job_function:    Uuid,
  pub engagement_type: Uuid,
  pub fraction:        Fraction,
  pub primary:         bool,
  pub validity:        ValidityInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
  pub uuid:             Uuid,
  pub person:           Uuid,
  pub org_unit:         Uuid,
  pub association_type: Uuid,
  pub user_key:         String,
  pub validity:         ValidityInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
  pub uuid:       Uuid,
  pub person:     Uuid,
  pub leave_type: Uuid,
  pub engagement: Uuid,
  pub validity:   ValidityInterval,
}

/// Result of an edit or terminate write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
  /// The directory registered a change.
  Applied,
  /// The directory already held exactly this state; nothing was registered.
  AlreadyApplied,
}
