//! [`XmlFeed`]: a [`SourceFeed`] over a directory of saved SD responses.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use hrsync_core::{
  employment::{PersonChangeRecord, PersonIdentity},
  store::SourceFeed,
};

use crate::{
  Error, Result,
  document::{parse_employments, parse_persons},
};

pub const EMPLOYMENT_DOCUMENT: &str = "GetEmploymentChangedAtDate20111201.xml";
pub const PERSON_DOCUMENT: &str = "GetPersonChangedAtDate20111201.xml";

/// Reads `<root>/<from>_<to>/<document>` for each requested window, with
/// both dates in `YYYY-MM-DD` form.
#[derive(Debug, Clone)]
pub struct XmlFeed {
  root: PathBuf,
}

impl XmlFeed {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Where the document for the window is expected.
  pub fn document_path(&self, from: NaiveDate, to: NaiveDate, document: &str) -> PathBuf {
    self
      .root
      .join(format!("{}_{}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d")))
      .join(document)
  }

  async fn read(&self, from: NaiveDate, to: NaiveDate, document: &str) -> Result<String> {
    let path = self.document_path(from, to, document);
    tracing::debug!(path = %path.display(), "reading feed document");
    match tokio::fs::read_to_string(&path).await {
      Ok(xml) => Ok(xml),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::MissingDocument(path)),
      Err(source) => Err(Error::Io { path, source }),
    }
  }
}

impl SourceFeed for XmlFeed {
  type Error = Error;

  async fn changed_employments(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<Vec<PersonChangeRecord>> {
    let xml = self.read(from, to, EMPLOYMENT_DOCUMENT).await?;
    let records = parse_employments(&xml)?;
    tracing::info!(%from, %to, persons = records.len(), "employment changes loaded");
    Ok(records)
  }

  async fn changed_persons(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<PersonIdentity>> {
    let xml = self.read(from, to, PERSON_DOCUMENT).await?;
    let persons = parse_persons(&xml)?;
    tracing::info!(%from, %to, persons = persons.len(), "person changes loaded");
    Ok(persons)
  }
}
