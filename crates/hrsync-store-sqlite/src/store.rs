//! [`SqliteDirectory`]: the SQLite implementation of the directory traits.

use std::{collections::HashSet, path::Path};

use chrono::NaiveDate;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use hrsync_core::{
  directory::{
    Association, Class, DetailKind, Engagement, Facet, Leave, OrgUnit, Person,
    WriteOutcome,
  },
  interval::ValidityInterval,
  payload::{CreateRequest, Detail, EditRequest, Reference, RefKind},
  store::{DirectoryReader, DirectoryWriter},
  timeline::{self, Slice, TimelineChange},
};

use crate::{
  Error, Result,
  encode::{
    DetailRow, RawClass, RawDetail, RawOrgUnit, decode_uuid, encode_date,
    encode_facet, encode_kind, encode_uuid,
  },
  schema::SCHEMA,
};

/// Guard against parent cycles when materialising a unit's ancestry.
const MAX_UNIT_DEPTH: usize = 64;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An organisational directory backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteDirectory {
  conn: tokio_rusqlite::Connection,
}

impl SqliteDirectory {
  /// Open (or create) a directory at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory directory, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Does a row with this uuid exist in the table backing `kind`?
  async fn reference_exists(&self, reference: Reference) -> Result<bool> {
    let sql = match reference.kind {
      RefKind::Person => "SELECT 1 FROM persons WHERE uuid = ?1",
      RefKind::OrgUnit => "SELECT 1 FROM org_units WHERE uuid = ?1",
      RefKind::Class => "SELECT 1 FROM classes WHERE uuid = ?1",
      RefKind::Engagement => {
        "SELECT 1 FROM details WHERE uuid = ?1 AND kind = 'engagement' LIMIT 1"
      }
      // IT systems are not modelled by this directory.
      RefKind::ItSystem => return Ok(true),
    };
    let id_str = encode_uuid(reference.uuid);

    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![id_str], |_| Ok(true))
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn check_references(&self, references: &[Reference]) -> Result<()> {
    for reference in references {
      if !self.reference_exists(*reference).await? {
        return Err(Error::UnknownReference {
          kind: reference.kind,
          uuid: reference.uuid,
        });
      }
    }
    Ok(())
  }

  /// All slices of one detail, ordered by start.
  async fn load_detail(&self, uuid: Uuid) -> Result<Vec<DetailRow>> {
    let id_str = encode_uuid(uuid);

    let raws: Vec<RawDetail> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT uuid, kind, payload, valid_from, valid_to
           FROM details WHERE uuid = ?1 ORDER BY valid_from",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawDetail {
              uuid:       row.get(0)?,
              kind:       row.get(1)?,
              payload:    row.get(2)?,
              valid_from: row.get(3)?,
              valid_to:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDetail::decode).collect()
  }

  /// Every slice of the given kind belonging to a person, ordered by start.
  async fn person_details(
    &self,
    person: Uuid,
    kind: DetailKind,
  ) -> Result<Vec<DetailRow>> {
    let person_str = encode_uuid(person);
    let kind_str = encode_kind(kind);

    let raws: Vec<RawDetail> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT uuid, kind, payload, valid_from, valid_to
           FROM details
           WHERE person = ?1 AND kind = ?2
           ORDER BY valid_from, uuid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![person_str, kind_str], |row| {
            Ok(RawDetail {
              uuid:       row.get(0)?,
              kind:       row.get(1)?,
              payload:    row.get(2)?,
              valid_from: row.get(3)?,
              valid_to:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDetail::decode).collect()
  }

  /// Replace every slice of a detail in one transaction.
  async fn replace_detail(
    &self,
    uuid: Uuid,
    kind: DetailKind,
    slices: Vec<Slice<Detail>>,
  ) -> Result<()> {
    let id_str = encode_uuid(uuid);
    let kind_str = encode_kind(kind);
    let mut rows = Vec::with_capacity(slices.len());
    for slice in &slices {
      rows.push((
        slice.value.person().map(encode_uuid),
        serde_json::to_string(&slice.value)?,
        encode_date(slice.validity.from),
        slice.validity.to.map(encode_date),
      ));
    }

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM details WHERE uuid = ?1", rusqlite::params![id_str])?;
        for (person, payload, from, to) in rows {
          tx.execute(
            "INSERT INTO details (uuid, kind, person, payload, valid_from, valid_to)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![id_str, kind_str, person, payload, from, to],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn read_class(&self, uuid: String) -> Result<Option<Class>> {
    let raw: Option<RawClass> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT uuid, facet, user_key, name FROM classes WHERE uuid = ?1",
              rusqlite::params![uuid],
              |row| {
                Ok(RawClass {
                  uuid:     row.get(0)?,
                  facet:    row.get(1)?,
                  user_key: row.get(2)?,
                  name:     row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawClass::into_class).transpose()
  }

  async fn read_unit_row(&self, uuid: Uuid) -> Result<Option<RawOrgUnit>> {
    let id_str = encode_uuid(uuid);

    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.uuid, u.user_key, u.name, u.parent,
                      c.uuid, c.facet, c.user_key, c.name
               FROM org_units u
               JOIN classes c ON c.uuid = u.unit_type
               WHERE u.uuid = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawOrgUnit {
                  uuid:      row.get(0)?,
                  user_key:  row.get(1)?,
                  name:      row.get(2)?,
                  parent:    row.get(3)?,
                  unit_type: RawClass {
                    uuid:     row.get(4)?,
                    facet:    row.get(5)?,
                    user_key: row.get(6)?,
                    name:     row.get(7)?,
                  },
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  async fn create_detail(&self, detail: Detail, validity: ValidityInterval) -> Result<Uuid> {
    self.check_references(&detail.references()).await?;
    let uuid = Uuid::new_v4();
    let kind = detail.kind();
    self
      .replace_detail(uuid, kind, vec![Slice { validity, value: detail }])
      .await?;
    tracing::debug!(%uuid, %kind, "created detail");
    Ok(uuid)
  }
}

// ─── DirectoryReader impl ────────────────────────────────────────────────────

impl DirectoryReader for SqliteDirectory {
  type Error = Error;

  async fn read_person(&self, national_id: &str) -> Result<Option<Person>> {
    let national_id = national_id.to_owned();

    let raw: Option<(String, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT uuid, national_id, name FROM persons WHERE national_id = ?1",
              rusqlite::params![national_id],
              |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(uuid, national_id, name)| {
        Ok(Person { uuid: decode_uuid(&uuid)?, national_id, name })
      })
      .transpose()
  }

  async fn read_engagements(
    &self,
    person: Uuid,
    as_of: Option<NaiveDate>,
  ) -> Result<Vec<Engagement>> {
    let mut engagements: Vec<Engagement> = self
      .person_details(person, DetailKind::Engagement)
      .await?
      .into_iter()
      .map(DetailRow::into_engagement)
      .collect::<Result<_>>()?;

    if let Some(date) = as_of {
      engagements.retain(|e| e.validity.contains(date));
    }
    Ok(engagements)
  }

  async fn read_associations(&self, person: Uuid) -> Result<Vec<Association>> {
    self
      .person_details(person, DetailKind::Association)
      .await?
      .into_iter()
      .map(DetailRow::into_association)
      .collect()
  }

  async fn read_leaves(&self, person: Uuid) -> Result<Vec<Leave>> {
    self
      .person_details(person, DetailKind::Leave)
      .await?
      .into_iter()
      .map(DetailRow::into_leave)
      .collect()
  }

  async fn read_org_unit(&self, uuid: Uuid) -> Result<Option<OrgUnit>> {
    // Walk up to the root, then fold the chain back down into nested parents.
    let mut chain: Vec<OrgUnit> = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut next = Some(uuid);

    while let Some(current) = next {
      if !seen.insert(current) || chain.len() >= MAX_UNIT_DEPTH {
        return Err(Error::Corrupt(format!("org unit cycle at {current}")));
      }
      let Some(raw) = self.read_unit_row(current).await? else {
        if chain.is_empty() {
          return Ok(None);
        }
        return Err(Error::NotFound(current));
      };
      next = raw.parent.as_deref().map(decode_uuid).transpose()?;
      chain.push(OrgUnit {
        uuid:      decode_uuid(&raw.uuid)?,
        user_key:  raw.user_key,
        name:      raw.name,
        unit_type: raw.unit_type.into_class()?,
        parent:    None,
      });
    }

    let mut unit: Option<OrgUnit> = None;
    for mut ancestor in chain.into_iter().rev() {
      ancestor.parent = unit.map(Box::new);
      unit = Some(ancestor);
    }
    Ok(unit)
  }

  async fn read_classes_in_facet(&self, facet: Facet) -> Result<Vec<Class>> {
    let facet_str = encode_facet(facet);

    let raws: Vec<RawClass> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT uuid, facet, user_key, name FROM classes
           WHERE facet = ?1 ORDER BY user_key",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![facet_str], |row| {
            Ok(RawClass {
              uuid:     row.get(0)?,
              facet:    row.get(1)?,
              user_key: row.get(2)?,
              name:     row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClass::into_class).collect()
  }
}

// ─── DirectoryWriter impl ────────────────────────────────────────────────────

impl DirectoryWriter for SqliteDirectory {
  async fn create(&self, request: CreateRequest) -> Result<Uuid> {
    match request {
      CreateRequest::Person(person) => {
        if self.read_person(&person.national_id).await?.is_some() {
          return Err(Error::Conflict(format!(
            "person {} already exists",
            person.national_id
          )));
        }
        let uuid = Uuid::new_v4();
        let id_str = encode_uuid(uuid);
        self
          .conn
          .call(move |conn| {
            conn.execute(
              "INSERT INTO persons (uuid, national_id, name) VALUES (?1, ?2, ?3)",
              rusqlite::params![id_str, person.national_id, person.name],
            )?;
            Ok(())
          })
          .await?;
        Ok(uuid)
      }

      CreateRequest::OrgUnit { uuid, unit } => {
        if self.read_unit_row(uuid).await?.is_some() {
          return Err(Error::Conflict(format!("org unit {uuid} already exists")));
        }
        let mut refs = vec![Reference { kind: RefKind::Class, uuid: unit.unit_type }];
        refs.extend(unit.parent.map(|p| Reference { kind: RefKind::OrgUnit, uuid: p }));
        self.check_references(&refs).await?;

        let id_str = encode_uuid(uuid);
        let type_str = encode_uuid(unit.unit_type);
        let parent_str = unit.parent.map(encode_uuid);
        let from_str = encode_date(unit.validity.from);
        let to_str = unit.validity.to.map(encode_date);
        self
          .conn
          .call(move |conn| {
            conn.execute(
              "INSERT INTO org_units (uuid, user_key, name, unit_type, parent, valid_from, valid_to)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
              rusqlite::params![
                id_str,
                unit.user_key,
                unit.name,
                type_str,
                parent_str,
                from_str,
                to_str,
              ],
            )?;
            Ok(())
          })
          .await?;
        Ok(uuid)
      }

      CreateRequest::Class(class) => {
        let existing = self.read_classes_in_facet(class.facet).await?;
        if existing.iter().any(|c| c.user_key == class.user_key) {
          return Err(Error::Conflict(format!(
            "class {} already exists in {}",
            class.user_key, class.facet
          )));
        }
        let uuid = Uuid::new_v4();
        let id_str = encode_uuid(uuid);
        let facet_str = encode_facet(class.facet);
        self
          .conn
          .call(move |conn| {
            conn.execute(
              "INSERT INTO classes (uuid, facet, user_key, name) VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![id_str, facet_str, class.user_key, class.name],
            )?;
            Ok(())
          })
          .await?;
        Ok(uuid)
      }

      CreateRequest::Detail { detail, validity } => {
        self.create_detail(detail, validity).await
      }
    }
  }

  async fn edit(&self, uuid: Uuid, request: EditRequest) -> Result<WriteOutcome> {
    match request {
      EditRequest::PersonName(name) => {
        let id_str = encode_uuid(uuid);
        let current: Option<String> = self
          .conn
          .call({
            let id_str = id_str.clone();
            move |conn| {
              Ok(
                conn
                  .query_row(
                    "SELECT name FROM persons WHERE uuid = ?1",
                    rusqlite::params![id_str],
                    |row| row.get(0),
                  )
                  .optional()?,
              )
            }
          })
          .await?;

        match current {
          None => Err(Error::NotFound(uuid)),
          Some(current) if current == name => Ok(WriteOutcome::AlreadyApplied),
          Some(_) => {
            self
              .conn
              .call(move |conn| {
                conn.execute(
                  "UPDATE persons SET name = ?2 WHERE uuid = ?1",
                  rusqlite::params![id_str, name],
                )?;
                Ok(())
              })
              .await?;
            Ok(WriteOutcome::Applied)
          }
        }
      }

      EditRequest::Engagement { changes, validity } => {
        let rows = self.load_detail(uuid).await?;
        if rows.is_empty() || rows.iter().any(|r| r.kind != DetailKind::Engagement) {
          return Err(Error::NotFound(uuid));
        }

        let mut refs = Vec::new();
        refs.extend(changes.org_unit.map(|u| Reference { kind: RefKind::OrgUnit, uuid: u }));
        refs.extend(changes.job_function.map(|c| Reference { kind: RefKind::Class, uuid: c }));
        refs.extend(
          changes.engagement_type.map(|c| Reference { kind: RefKind::Class, uuid: c }),
        );
        self.check_references(&refs).await?;

        let slices: Vec<Slice<Detail>> = rows.into_iter().map(|r| r.slice).collect();
        let change = timeline::apply(&slices, &validity, |detail| match detail {
          Detail::Engagement(e) => Detail::Engagement(changes.apply_to(e)),
          other => other.clone(),
        });

        match change {
          TimelineChange::Changed(slices) => {
            self.replace_detail(uuid, DetailKind::Engagement, slices).await?;
            Ok(WriteOutcome::Applied)
          }
          TimelineChange::Unchanged => Ok(WriteOutcome::AlreadyApplied),
          TimelineChange::NoOverlap => Err(Error::NoRegistration { uuid, validity }),
        }
      }

      EditRequest::Extend { validity } => {
        let rows = self.load_detail(uuid).await?;
        let Some(kind) = rows.first().map(|r| r.kind) else {
          return Err(Error::NotFound(uuid));
        };
        let slices: Vec<Slice<Detail>> = rows.into_iter().map(|r| r.slice).collect();
        match timeline::extend(&slices, &validity) {
          TimelineChange::Changed(slices) => {
            self.replace_detail(uuid, kind, slices).await?;
            Ok(WriteOutcome::Applied)
          }
          TimelineChange::Unchanged => Ok(WriteOutcome::AlreadyApplied),
          TimelineChange::NoOverlap => Err(Error::NotFound(uuid)),
        }
      }
    }
  }

  async fn terminate(
    &self,
    kind: DetailKind,
    uuid: Uuid,
    to: NaiveDate,
  ) -> Result<WriteOutcome> {
    let rows = self.load_detail(uuid).await?;
    if rows.is_empty() || rows.iter().any(|r| r.kind != kind) {
      return Err(Error::NotFound(uuid));
    }

    let slices: Vec<Slice<Detail>> = rows.into_iter().map(|r| r.slice).collect();
    match timeline::truncate(&slices, to) {
      TimelineChange::Changed(slices) if slices.is_empty() => Err(Error::Conflict(
        format!("terminating {uuid} on {to} would remove it entirely"),
      )),
      TimelineChange::Changed(slices) => {
        self.replace_detail(uuid, kind, slices).await?;
        Ok(WriteOutcome::Applied)
      }
      TimelineChange::Unchanged => Ok(WriteOutcome::AlreadyApplied),
      TimelineChange::NoOverlap => Err(Error::NotFound(uuid)),
    }
  }
}
