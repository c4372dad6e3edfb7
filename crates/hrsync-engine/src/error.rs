//! Run-aborting errors.
//!
//! Anything that only affects one person is a [`Fault`](crate::Fault)
//! instead.

use hrsync_core::directory::Facet;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("source feed error: {0}")]
  Feed(#[source] BoxError),

  /// A status code outside the closed set. Raised before any write.
  #[error("unknown status code {code:?} for person {national_id}, job {job_id}")]
  Classification {
    national_id: String,
    job_id:      String,
    code:        String,
  },

  #[error("directory error: {0}")]
  Directory(#[source] BoxError),

  #[error("class {user_key:?} not found in facet {facet}")]
  MissingClass { facet: Facet, user_key: String },
}

impl Error {
  pub(crate) fn feed(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Feed(Box::new(e))
  }

  pub(crate) fn directory(
    e: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Directory(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
