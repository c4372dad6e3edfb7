//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD`, which sorts correctly as text. Detail
//! payloads are stored as tagged JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::NaiveDate;
use hrsync_core::{
  directory::{Association, Class, DetailKind, Engagement, Facet, Leave},
  interval::ValidityInterval,
  payload::Detail,
  timeline::Slice,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ────────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn decode_validity(from: &str, to: Option<&str>) -> Result<ValidityInterval> {
  let from = decode_date(from)?;
  let to = to.map(decode_date).transpose()?;
  Ok(ValidityInterval::new(from, to)?)
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn encode_facet(facet: Facet) -> &'static str { facet.into() }

pub fn decode_facet(s: &str) -> Result<Facet> {
  s.parse()
    .map_err(|_| Error::Corrupt(format!("unknown facet: {s:?}")))
}

pub fn encode_kind(kind: DetailKind) -> &'static str { kind.into() }

pub fn decode_kind(s: &str) -> Result<DetailKind> {
  s.parse()
    .map_err(|_| Error::Corrupt(format!("unknown detail kind: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `details` row.
pub struct RawDetail {
  pub uuid:       String,
  pub kind:       String,
  pub payload:    String,
  pub valid_from: String,
  pub valid_to:   Option<String>,
}

/// A decoded `details` row.
pub struct DetailRow {
  pub uuid:  Uuid,
  pub kind:  DetailKind,
  pub slice: Slice<Detail>,
}

impl RawDetail {
  pub fn decode(self) -> Result<DetailRow> {
    Ok(DetailRow {
      uuid:  decode_uuid(&self.uuid)?,
      kind:  decode_kind(&self.kind)?,
      slice: Slice {
        validity: decode_validity(&self.valid_from, self.valid_to.as_deref())?,
        value:    serde_json::from_str(&self.payload)?,
      },
    })
  }
}

impl DetailRow {
  pub fn into_engagement(self) -> Result<Engagement> {
    match self.slice.value {
      Detail::Engagement(e) => Ok(Engagement {
        uuid:            self.uuid,
        person:          e.person,
        user_key:        e.user_key,
        org_unit:        e.org_unit,
        job_function:    e.job_function,
        engagement_type: e.engagement_type,
        fraction:        e.fraction,
        primary:         e.primary,
        validity:        self.slice.validity,
      }),
      other => Err(Error::Corrupt(format!(
        "{} stored as engagement holds a {} payload",
        self.uuid,
        other.kind()
      ))),
    }
  }

  pub fn into_association(self) -> Result<Association> {
    match self.slice.value {
      Detail::Association(a) => Ok(Association {
        uuid:             self.uuid,
        person:           a.person,
        org_unit:         a.org_unit,
        association_type: a.association_type,
        user_key:         a.user_key,
        validity:         self.slice.validity,
      }),
      other => Err(Error::Corrupt(format!(
        "{} stored as association holds a {} payload",
        self.uuid,
        other.kind()
      ))),
    }
  }

  pub fn into_leave(self) -> Result<Leave> {
    match self.slice.value {
      Detail::Leave(l) => Ok(Leave {
        uuid:       self.uuid,
        person:     l.person,
        leave_type: l.leave_type,
        engagement: l.engagement,
        validity:   self.slice.validity,
      }),
      other => Err(Error::Corrupt(format!(
        "{} stored as leave holds a {} payload",
        self.uuid,
        other.kind()
      ))),
    }
  }
}

/// Raw strings read directly from a `classes` row.
pub struct RawClass {
  pub uuid:     String,
  pub facet:    String,
  pub user_key: String,
  pub name:     String,
}

impl RawClass {
  pub fn into_class(self) -> Result<Class> {
    Ok(Class {
      uuid:     decode_uuid(&self.uuid)?,
      facet:    decode_facet(&self.facet)?,
      user_key: self.user_key,
      name:     self.name,
    })
  }
}

/// Raw strings read directly from an `org_units` row joined with its type.
pub struct RawOrgUnit {
  pub uuid:      String,
  pub user_key:  String,
  pub name:      String,
  pub parent:    Option<String>,
  pub unit_type: RawClass,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_round_trip() {
    let d = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
    assert_eq!(encode_date(d), "2020-02-29");
    assert_eq!(decode_date("2020-02-29").unwrap(), d);
    assert!(decode_date("29.02.2020").is_err());
  }

  #[test]
  fn enum_columns_use_snake_case() {
    assert_eq!(encode_facet(Facet::OrgUnitType), "org_unit_type");
    assert_eq!(decode_kind("engagement").unwrap(), DetailKind::Engagement);
    assert!(decode_facet("nope").is_err());
  }
}
