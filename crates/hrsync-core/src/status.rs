//! Employment status codes and the transitions they trigger.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// The closed set of status codes the source feed emits.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString,
  AsRefStr, Display,
)]
pub enum StatusCode {
  /// Pre-hire, no salary yet.
  #[strum(serialize = "0")]
  NoSalary,
  #[strum(serialize = "1")]
  Active,
  /// Leave of absence.
  #[strum(serialize = "3")]
  Leave,
  #[strum(serialize = "8")]
  Terminated,
  /// Deleted; the employment never took effect.
  #[strum(serialize = "9")]
  Deleted,
  /// Deleted before start ("slettet").
  #[strum(serialize = "S")]
  Removed,
}

/// What the reconciliation engine does with a status event.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum TransitionKind {
  /// Create the engagement, or edit it if it already exists.
  ActivateOrEdit,
  /// Create a leave against the engagement.
  Leave,
  /// End-date the engagement.
  Terminate,
  /// Verify that the directory already agrees the engagement is gone.
  ConsistencyCheck,
}

impl StatusCode {
  pub fn parse(code: &str) -> Result<Self> {
    code
      .trim()
      .parse()
      .map_err(|_| Error::UnknownStatusCode(code.to_owned()))
  }

  pub fn transition(self) -> TransitionKind {
    match self {
      Self::NoSalary | Self::Active => TransitionKind::ActivateOrEdit,
      Self::Leave => TransitionKind::Leave,
      Self::Terminated => TransitionKind::Terminate,
      Self::Deleted | Self::Removed => TransitionKind::ConsistencyCheck,
    }
  }
}

/// Map a raw status code to its transition. Fails on codes outside the
/// closed set.
pub fn classify(code: &str) -> Result<TransitionKind> {
  StatusCode::parse(code).map(StatusCode::transition)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_every_known_code() {
    assert_eq!(classify("0").unwrap(), TransitionKind::ActivateOrEdit);
    assert_eq!(classify("1").unwrap(), TransitionKind::ActivateOrEdit);
    assert_eq!(classify("3").unwrap(), TransitionKind::Leave);
    assert_eq!(classify("8").unwrap(), TransitionKind::Terminate);
    assert_eq!(classify("9").unwrap(), TransitionKind::ConsistencyCheck);
    assert_eq!(classify("S").unwrap(), TransitionKind::ConsistencyCheck);
  }

  #[test]
  fn unknown_code_is_a_fault() {
    for code in ["2", "7", "s", "", "10"] {
      assert!(
        matches!(classify(code), Err(Error::UnknownStatusCode(c)) if c == code),
        "code {code:?} should be rejected"
      );
    }
  }

  #[test]
  fn codes_round_trip_through_display() {
    assert_eq!(StatusCode::Removed.to_string(), "S");
    assert_eq!(StatusCode::parse(" 8 ").unwrap(), StatusCode::Terminated);
  }
}
