//! Error type for `hrsync-feed-xml`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("no document at {0:?}")]
  MissingDocument(PathBuf),

  #[error("xml decode error: {0}")]
  Xml(#[from] quick_xml::DeError),

  #[error("bad date {0:?}")]
  Date(String),

  /// Bad fraction or inverted interval.
  #[error(transparent)]
  Core(#[from] hrsync_core::Error),

  #[error("bad uuid: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("job {job_id} is missing <{element}>")]
  MissingElement {
    job_id:  String,
    element: &'static str,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
