//! Engine configuration.

use hrsync_core::directory::OrgUnit;
use serde::{Deserialize, Serialize};

/// Everything the engine needs to know about the target installation.
///
/// Classes are named by their `user_key` in the directory, except the
/// too-deep unit types, which are matched against the unit type's display
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Unit types too fine-grained to carry an engagement.
  pub too_deep_unit_types:        Vec<String>,
  /// Engagement type for engagements created by an active (code 1) event.
  pub engagement_type:            String,
  /// Engagement type for engagements created by a pre-hire (code 0) event.
  pub no_salary_engagement_type:  String,
  /// Unit type given to departments created because the feed referenced
  /// them before the directory knew them.
  pub orphan_unit_type:           String,
  pub leave_type:                 String,
  pub association_type:           String,
  pub create_missing_departments: bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      too_deep_unit_types:        vec![
        "Afdelings-niveau".into(),
        "NY1-niveau".into(),
        "NY2-niveau".into(),
      ],
      engagement_type:            "Ansat".into(),
      no_salary_engagement_type:  "status0".into(),
      orphan_unit_type:           "Orphan".into(),
      leave_type:                 "Orlov".into(),
      association_type:           "SD-medarbejder".into(),
      create_missing_departments: true,
    }
  }
}

impl SyncConfig {
  pub fn is_too_deep(&self, unit: &OrgUnit) -> bool {
    self
      .too_deep_unit_types
      .iter()
      .any(|t| *t == unit.unit_type.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_config_falls_back_to_defaults() {
    let cfg: SyncConfig =
      serde_json::from_str(r#"{ "leave_type": "Barsel" }"#).unwrap();
    assert_eq!(cfg.leave_type, "Barsel");
    assert_eq!(cfg.engagement_type, "Ansat");
    assert_eq!(cfg.too_deep_unit_types.len(), 3);
    assert!(cfg.create_missing_departments);
  }
}
