//! Error type for `hrsync-store-sqlite`.

use hrsync_core::{interval::ValidityInterval, payload::RefKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] hrsync_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  #[error("unknown stored value: {0}")]
  Corrupt(String),

  #[error("object not found: {0}")]
  NotFound(uuid::Uuid),

  /// A payload pointed at an object the directory does not hold.
  #[error("unknown {kind:?} reference: {uuid}")]
  UnknownReference { kind: RefKind, uuid: uuid::Uuid },

  #[error("conflict: {0}")]
  Conflict(String),

  /// An edit window that does not touch any registration of the object.
  #[error("{uuid} has no registration within {validity:?}")]
  NoRegistration {
    uuid:     uuid::Uuid,
    validity: ValidityInterval,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
