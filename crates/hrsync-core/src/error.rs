//! Error types for `hrsync-core`.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown employment status code: {0:?}")]
  UnknownStatusCode(String),

  #[error("invalid validity interval: {from} is after {to}")]
  InvalidInterval { from: NaiveDate, to: NaiveDate },

  #[error("invalid working-time fraction: {0:?}")]
  InvalidFraction(String),

  /// A payload builder was asked to build without a required reference.
  #[error("{operation} is missing required field `{field}`")]
  MissingReference {
    operation: &'static str,
    field:     &'static str,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
