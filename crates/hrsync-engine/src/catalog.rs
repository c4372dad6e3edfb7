//! Classes resolved once per run, and the job-function cache.

use std::collections::HashMap;

use hrsync_core::{
  directory::{Class, Facet},
  payload::{CreateRequest, NewClass},
  status::StatusCode,
  store::{DirectoryReader, DirectoryWriter},
};
use uuid::Uuid;

use crate::{Error, Result, SyncConfig};

/// The class uuids a run writes with.
///
/// Owned by the run and passed by `&mut` through the person loop, so the
/// job-function cache has exactly one writer.
#[derive(Debug, Clone)]
pub struct Catalog {
  pub engagement_type:           Uuid,
  pub no_salary_engagement_type: Uuid,
  pub orphan_unit_type:          Uuid,
  pub leave_type:                Uuid,
  pub association_type:          Uuid,
  /// Job function name → class uuid. Grows as new professions appear.
  job_functions:                 HashMap<String, Uuid>,
  job_functions_created:         usize,
}

/// The configured classes every run needs, as `(facet, user_key)`.
fn required_classes(config: &SyncConfig) -> [(Facet, &str); 5] {
  [
    (Facet::EngagementType, config.engagement_type.as_str()),
    (Facet::EngagementType, config.no_salary_engagement_type.as_str()),
    (Facet::OrgUnitType, config.orphan_unit_type.as_str()),
    (Facet::LeaveType, config.leave_type.as_str()),
    (Facet::AssociationType, config.association_type.as_str()),
  ]
}

async fn classes<D: DirectoryReader>(directory: &D, facet: Facet) -> Result<Vec<Class>> {
  directory
    .read_classes_in_facet(facet)
    .await
    .map_err(Error::directory)
}

impl Catalog {
  /// Resolve every configured class. A missing class aborts the run.
  pub async fn load<D: DirectoryReader>(directory: &D, config: &SyncConfig) -> Result<Self> {
    let mut resolved = Vec::with_capacity(5);
    for (facet, user_key) in required_classes(config) {
      let uuid = classes(directory, facet)
        .await?
        .into_iter()
        .find(|c| c.user_key == user_key)
        .map(|c| c.uuid)
        .ok_or_else(|| Error::MissingClass { facet, user_key: user_key.to_owned() })?;
      resolved.push(uuid);
    }

    let job_functions: HashMap<String, Uuid> =
      classes(directory, Facet::EngagementJobFunction)
        .await?
        .into_iter()
        .map(|c| (c.name, c.uuid))
        .collect();
    tracing::debug!(job_functions = job_functions.len(), "catalog loaded");

    Ok(Self {
      engagement_type: resolved[0],
      no_salary_engagement_type: resolved[1],
      orphan_unit_type: resolved[2],
      leave_type: resolved[3],
      association_type: resolved[4],
      job_functions,
      job_functions_created: 0,
    })
  }

  /// Create whichever configured classes the directory lacks. Returns how
  /// many were created.
  pub async fn seed<D: DirectoryWriter>(directory: &D, config: &SyncConfig) -> Result<usize> {
    let mut created = 0;
    for (facet, user_key) in required_classes(config) {
      let exists = classes(directory, facet)
        .await?
        .iter()
        .any(|c| c.user_key == user_key);
      if exists {
        continue;
      }
      directory
        .create(CreateRequest::Class(NewClass {
          facet,
          user_key: user_key.to_owned(),
          name: user_key.to_owned(),
        }))
        .await
        .map_err(Error::directory)?;
      tracing::info!(%facet, user_key, "created class");
      created += 1;
    }
    Ok(created)
  }

  /// The engagement type a newly created engagement gets for `code`.
  pub fn engagement_type_for(&self, code: StatusCode) -> Uuid {
    match code {
      StatusCode::NoSalary => self.no_salary_engagement_type,
      _ => self.engagement_type,
    }
  }

  /// The job-function class named `name`, created in the directory on
  /// first sight.
  pub async fn job_function<D: DirectoryWriter>(
    &mut self,
    directory: &D,
    name: &str,
  ) -> Result<Uuid, D::Error> {
    if let Some(uuid) = self.job_functions.get(name) {
      return Ok(*uuid);
    }
    let uuid = directory
      .create(CreateRequest::Class(NewClass {
        facet:    Facet::EngagementJobFunction,
        user_key: name.to_owned(),
        name:     name.to_owned(),
      }))
      .await?;
    tracing::info!(name, %uuid, "new job function");
    self.job_functions.insert(name.to_owned(), uuid);
    self.job_functions_created += 1;
    Ok(uuid)
  }

  pub fn job_functions_created(&self) -> usize { self.job_functions_created }
}
