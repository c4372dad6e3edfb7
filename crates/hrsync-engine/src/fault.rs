//! Per-person faults.

use serde::Serialize;
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::error::BoxError;

/// Something went wrong with one person. The run continues with the next.
#[derive(Debug, Error)]
pub enum Fault {
  /// The directory disagrees with a termination or deletion in the feed.
  /// Stops the person.
  #[error("{message}")]
  Consistency {
    job_id:  Option<String>,
    message: String,
  },

  /// An event referred to something that does not exist. Only the event is
  /// skipped.
  #[error("{message}")]
  MissingReference {
    job_id:  Option<String>,
    message: String,
  },

  /// The directory rejected a write. Stops the person.
  #[error("write rejected: {source}")]
  WriteConflict {
    job_id: Option<String>,
    #[source]
    source: BoxError,
  },

  /// The directory could not be read. Stops the person.
  #[error("directory read failed: {source}")]
  DirectoryRead {
    #[source]
    source: BoxError,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FaultKind {
  Consistency,
  MissingReference,
  WriteConflict,
  DirectoryRead,
}

impl Fault {
  pub(crate) fn consistency(job_id: &str, message: impl Into<String>) -> Self {
    Self::Consistency { job_id: Some(job_id.to_owned()), message: message.into() }
  }

  pub(crate) fn missing(job_id: Option<&str>, message: impl Into<String>) -> Self {
    Self::MissingReference {
      job_id:  job_id.map(str::to_owned),
      message: message.into(),
    }
  }

  pub(crate) fn write(
    job_id: Option<&str>,
    e: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::WriteConflict { job_id: job_id.map(str::to_owned), source: Box::new(e) }
  }

  pub(crate) fn read(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::DirectoryRead { source: Box::new(e) }
  }

  pub fn kind(&self) -> FaultKind {
    match self {
      Self::Consistency { .. } => FaultKind::Consistency,
      Self::MissingReference { .. } => FaultKind::MissingReference,
      Self::WriteConflict { .. } => FaultKind::WriteConflict,
      Self::DirectoryRead { .. } => FaultKind::DirectoryRead,
    }
  }

  pub fn job_id(&self) -> Option<&str> {
    match self {
      Self::Consistency { job_id, .. }
      | Self::MissingReference { job_id, .. }
      | Self::WriteConflict { job_id, .. } => job_id.as_deref(),
      Self::DirectoryRead { .. } => None,
    }
  }

  /// Whether the rest of the person's events must be abandoned.
  pub fn stops_person(&self) -> bool {
    !matches!(self, Self::MissingReference { .. })
  }
}

/// A recorded fault, as reported in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonFault {
  pub national_id: String,
  pub job_id:      Option<String>,
  pub kind:        FaultKind,
  pub message:     String,
}

impl PersonFault {
  pub fn new(national_id: &str, fault: &Fault) -> Self {
    Self {
      national_id: national_id.to_owned(),
      job_id:      fault.job_id().map(str::to_owned),
      kind:        fault.kind(),
      message:     fault.to_string(),
    }
  }
}
