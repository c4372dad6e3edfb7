//! Decoding of the SD change documents.
//!
//! The wire structs mirror the SD element names and keep every value as
//! text. Conversion into the core model parses dates, rates and uuids and
//! normalises the `9999-12-31` open end.

use chrono::NaiveDate;
use hrsync_core::{
  employment::{
    Department, EmploymentRecord, PersonChangeRecord, PersonIdentity, Profession,
    StatusEvent, WorkingTime,
  },
  interval::ValidityInterval,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Wire structs ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EmploymentChanged {
  #[serde(rename = "Person", default)]
  persons: Vec<WirePerson>,
}

#[derive(Debug, Deserialize)]
struct PersonChanged {
  #[serde(rename = "Person", default)]
  persons: Vec<WireIdentity>,
}

#[derive(Debug, Deserialize)]
struct WireIdentity {
  #[serde(rename = "PersonCivilRegistrationIdentifier")]
  national_id: String,
  #[serde(rename = "PersonGivenName", default)]
  given_name:  String,
  #[serde(rename = "PersonSurnameName", default)]
  surname:     String,
}

#[derive(Debug, Deserialize)]
struct WirePerson {
  #[serde(rename = "PersonCivilRegistrationIdentifier")]
  national_id: String,
  #[serde(rename = "Employment", default)]
  employments: Vec<WireEmployment>,
}

#[derive(Debug, Deserialize)]
struct WireEmployment {
  #[serde(rename = "EmploymentIdentifier")]
  job_id:          String,
  #[serde(rename = "EmploymentDate")]
  employment_date: Option<String>,
  #[serde(rename = "EmploymentStatus", default)]
  statuses:        Vec<WireStatus>,
  #[serde(rename = "EmploymentDepartment", default)]
  departments:     Vec<WireDepartment>,
  #[serde(rename = "Profession", default)]
  professions:     Vec<WireProfession>,
  #[serde(rename = "WorkingTime", default)]
  working_times:   Vec<WireWorkingTime>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
  #[serde(rename = "ActivationDate")]
  from: String,
  #[serde(rename = "DeactivationDate")]
  to:   Option<String>,
  #[serde(rename = "EmploymentStatusCode")]
  code: String,
}

#[derive(Debug, Deserialize)]
struct WireDepartment {
  #[serde(rename = "ActivationDate")]
  from: String,
  #[serde(rename = "DeactivationDate")]
  to:   Option<String>,
  #[serde(rename = "DepartmentIdentifier", default)]
  key:  String,
  #[serde(rename = "DepartmentUUIDIdentifier")]
  uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireProfession {
  #[serde(rename = "ActivationDate")]
  from: String,
  #[serde(rename = "DeactivationDate")]
  to:   Option<String>,
  #[serde(rename = "EmploymentName")]
  name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireWorkingTime {
  #[serde(rename = "ActivationDate")]
  from: String,
  #[serde(rename = "DeactivationDate")]
  to:   Option<String>,
  #[serde(rename = "OccupationRate")]
  rate: String,
}

// ─── Conversion ──────────────────────────────────────────────────────────────

fn parse_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| Error::Date(s.to_owned()))
}

/// An absent or empty `DeactivationDate` is an open end, as is `9999-12-31`.
fn validity(from: &str, to: Option<&str>) -> Result<ValidityInterval> {
  let from = parse_date(from)?;
  match to.map(str::trim) {
    None | Some("") => Ok(ValidityInterval::unbounded(from)),
    Some(to) => Ok(ValidityInterval::from_source(from, parse_date(to)?)?),
  }
}

impl WireStatus {
  fn into_event(self) -> Result<StatusEvent> {
    Ok(StatusEvent {
      validity: validity(&self.from, self.to.as_deref())?,
      code:     self.code.trim().to_owned(),
    })
  }
}

impl WireDepartment {
  fn into_department(self, job_id: &str) -> Result<Department> {
    let uuid = self.uuid.ok_or_else(|| Error::MissingElement {
      job_id:  job_id.to_owned(),
      element: "DepartmentUUIDIdentifier",
    })?;
    Ok(Department {
      unit_uuid: Uuid::parse_str(uuid.trim())?,
      unit_key:  self.key.trim().to_owned(),
      validity:  validity(&self.from, self.to.as_deref())?,
    })
  }
}

impl WireProfession {
  fn into_profession(self, job_id: &str) -> Result<Profession> {
    let name = self.name.ok_or_else(|| Error::MissingElement {
      job_id:  job_id.to_owned(),
      element: "EmploymentName",
    })?;
    Ok(Profession {
      name:     name.trim().to_owned(),
      validity: validity(&self.from, self.to.as_deref())?,
    })
  }
}

impl WireWorkingTime {
  fn into_working_time(self) -> Result<WorkingTime> {
    Ok(WorkingTime {
      rate:     self.rate.parse()?,
      validity: validity(&self.from, self.to.as_deref())?,
    })
  }
}

impl WireEmployment {
  fn into_record(self) -> Result<EmploymentRecord> {
    let job_id = self.job_id.trim().to_owned();
    let status_events = self
      .statuses
      .into_iter()
      .map(WireStatus::into_event)
      .collect::<Result<_>>()?;
    let departments = self
      .departments
      .into_iter()
      .map(|d| d.into_department(&job_id))
      .collect::<Result<_>>()?;
    let professions = self
      .professions
      .into_iter()
      .map(|p| p.into_profession(&job_id))
      .collect::<Result<_>>()?;
    let working_times = self
      .working_times
      .into_iter()
      .map(WireWorkingTime::into_working_time)
      .collect::<Result<_>>()?;

    Ok(EmploymentRecord {
      employment_date: self.employment_date.as_deref().map(parse_date).transpose()?,
      job_id,
      status_events,
      departments,
      professions,
      working_times,
    })
  }
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Decode a `GetEmploymentChangedAtDate20111201` response.
pub fn parse_employments(xml: &str) -> Result<Vec<PersonChangeRecord>> {
  let doc: EmploymentChanged = quick_xml::de::from_str(xml)?;
  doc
    .persons
    .into_iter()
    .map(|p| -> Result<PersonChangeRecord> {
      Ok(PersonChangeRecord {
        national_id: p.national_id.trim().to_owned(),
        employments: p
          .employments
          .into_iter()
          .map(WireEmployment::into_record)
          .collect::<Result<_>>()?,
      })
    })
    .collect()
}

/// Decode a `GetPersonChangedAtDate20111201` response. Employments listed
/// there are skipped; they arrive through the employment document.
pub fn parse_persons(xml: &str) -> Result<Vec<PersonIdentity>> {
  let doc: PersonChanged = quick_xml::de::from_str(xml)?;
  Ok(
    doc
      .persons
      .into_iter()
      .map(|p| PersonIdentity {
        national_id: p.national_id.trim().to_owned(),
        given_name:  p.given_name,
        surname:     p.surname,
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use hrsync_core::fraction::Fraction;

  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  const EMPLOYMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GetEmploymentChangedAtDate20111201 creationDateTime="2020-03-02T06:00:00">
  <RequestStructure>
    <InstitutionIdentifier>XX</InstitutionIdentifier>
  </RequestStructure>
  <Person>
    <PersonCivilRegistrationIdentifier>0101801234</PersonCivilRegistrationIdentifier>
    <Employment>
      <EmploymentIdentifier>123</EmploymentIdentifier>
      <EmploymentDate>2020-01-01</EmploymentDate>
      <EmploymentDepartment changedAtDate="2020-01-01">
        <ActivationDate>2020-01-01</ActivationDate>
        <DeactivationDate>2020-05-31</DeactivationDate>
        <DepartmentIdentifier>ENH1</DepartmentIdentifier>
        <DepartmentUUIDIdentifier>6a9f2f64-35b5-4b6a-9f3b-3d9cbb1e3a01</DepartmentUUIDIdentifier>
      </EmploymentDepartment>
      <EmploymentDepartment changedAtDate="2020-01-01">
        <ActivationDate>2020-06-01</ActivationDate>
        <DeactivationDate>9999-12-31</DeactivationDate>
        <DepartmentIdentifier>ENH2</DepartmentIdentifier>
        <DepartmentUUIDIdentifier>6a9f2f64-35b5-4b6a-9f3b-3d9cbb1e3a02</DepartmentUUIDIdentifier>
      </EmploymentDepartment>
      <Profession changedAtDate="2020-01-01">
        <ActivationDate>2020-01-01</ActivationDate>
        <DeactivationDate>9999-12-31</DeactivationDate>
        <JobPositionIdentifier>7</JobPositionIdentifier>
        <EmploymentName>Pædagog</EmploymentName>
        <AppointmentCode>0</AppointmentCode>
      </Profession>
      <WorkingTime changedAtDate="2020-01-01">
        <ActivationDate>2020-01-01</ActivationDate>
        <DeactivationDate>9999-12-31</DeactivationDate>
        <OccupationRate>0.5000</OccupationRate>
        <SalariedIndicator>true</SalariedIndicator>
      </WorkingTime>
      <EmploymentStatus changedAtDate="2020-01-01">
        <ActivationDate>2020-01-01</ActivationDate>
        <DeactivationDate>9999-12-31</DeactivationDate>
        <EmploymentStatusCode>1</EmploymentStatusCode>
      </EmploymentStatus>
    </Employment>
    <Employment>
      <EmploymentIdentifier>ABC</EmploymentIdentifier>
      <EmploymentStatus>
        <ActivationDate>2020-03-01</ActivationDate>
        <DeactivationDate>9999-12-31</DeactivationDate>
        <EmploymentStatusCode>8</EmploymentStatusCode>
      </EmploymentStatus>
    </Employment>
  </Person>
</GetEmploymentChangedAtDate20111201>"#;

  #[test]
  fn decodes_employment_changes() {
    let records = parse_employments(EMPLOYMENTS).unwrap();
    assert_eq!(records.len(), 1);
    let person = &records[0];
    assert_eq!(person.national_id, "0101801234");
    assert_eq!(person.employments.len(), 2);

    let job = &person.employments[0];
    assert_eq!(job.job_id, "123");
    assert_eq!(job.employment_date, Some(d(2020, 1, 1)));
    assert_eq!(job.departments.len(), 2);
    assert_eq!(job.departments[0].unit_key, "ENH1");
    assert_eq!(job.departments[0].validity.to, Some(d(2020, 5, 31)));
    assert_eq!(job.departments[1].validity, ValidityInterval::unbounded(d(2020, 6, 1)));
    assert_eq!(job.professions[0].name, "Pædagog");
    assert_eq!(job.working_times[0].rate, Fraction::from_millionths(500_000));
    assert_eq!(job.status_events[0].code, "1");
    assert!(job.has_follow_up_entries());

    let ended = &person.employments[1];
    assert_eq!(ended.job_id, "ABC");
    assert!(ended.departments.is_empty());
    assert_eq!(ended.status_events[0].code, "8");
    assert_eq!(ended.status_events[0].validity.from, d(2020, 3, 1));
  }

  #[test]
  fn empty_response_has_no_persons() {
    let xml = "<GetEmploymentChangedAtDate20111201>\
               <RequestStructure/>\
               </GetEmploymentChangedAtDate20111201>";
    assert!(parse_employments(xml).unwrap().is_empty());
  }

  #[test]
  fn department_without_uuid_is_reported() {
    let xml = r#"<GetEmploymentChangedAtDate20111201>
  <Person>
    <PersonCivilRegistrationIdentifier>0101801234</PersonCivilRegistrationIdentifier>
    <Employment>
      <EmploymentIdentifier>00042</EmploymentIdentifier>
      <EmploymentDepartment>
        <ActivationDate>2020-01-01</ActivationDate>
        <DeactivationDate>9999-12-31</DeactivationDate>
        <DepartmentIdentifier>ENH1</DepartmentIdentifier>
      </EmploymentDepartment>
    </Employment>
  </Person>
</GetEmploymentChangedAtDate20111201>"#;
    let err = parse_employments(xml).unwrap_err();
    assert!(matches!(
      err,
      Error::MissingElement { element: "DepartmentUUIDIdentifier", .. }
    ));
  }

  #[test]
  fn bad_rate_is_rejected() {
    let xml = r#"<GetEmploymentChangedAtDate20111201>
  <Person>
    <PersonCivilRegistrationIdentifier>0101801234</PersonCivilRegistrationIdentifier>
    <Employment>
      <EmploymentIdentifier>1</EmploymentIdentifier>
      <WorkingTime>
        <ActivationDate>2020-01-01</ActivationDate>
        <OccupationRate>halv</OccupationRate>
      </WorkingTime>
    </Employment>
  </Person>
</GetEmploymentChangedAtDate20111201>"#;
    assert!(matches!(parse_employments(xml), Err(Error::Core(_))));
  }

  #[test]
  fn decodes_person_changes() {
    let xml = r#"<GetPersonChangedAtDate20111201>
  <Person>
    <PersonCivilRegistrationIdentifier>0101801234</PersonCivilRegistrationIdentifier>
    <PersonGivenName>Anna</PersonGivenName>
    <PersonSurnameName>Jensen</PersonSurnameName>
    <Employment>
      <EmploymentIdentifier>123</EmploymentIdentifier>
    </Employment>
  </Person>
  <Person>
    <PersonCivilRegistrationIdentifier>0202802345</PersonCivilRegistrationIdentifier>
    <PersonGivenName>Bo</PersonGivenName>
  </Person>
</GetPersonChangedAtDate20111201>"#;
    let persons = parse_persons(xml).unwrap();
    assert_eq!(persons.len(), 2);
    assert_eq!(persons[0].display_name(), "Anna Jensen");
    assert_eq!(persons[1].display_name(), "Bo");
  }
}
