//! The reconciliation engine.

use std::collections::HashMap;

use chrono::NaiveDate;
use hrsync_core::{
  directory::{DetailKind, WriteOutcome},
  employment::{EmploymentRecord, PersonChangeRecord, PersonIdentity, StatusEvent},
  interval::{ValidityInterval, day_after},
  job::JobKey,
  payload::{
    AssociationBuilder, CreateRequest, EditRequest, EngagementBuilder,
    EngagementEdit, LeaveBuilder, NewOrgUnit, NewPerson,
  },
  status::{StatusCode, TransitionKind},
  store::{DirectoryWriter, SourceFeed},
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
  Catalog, Error, Fault, Result, RunSummary, SyncConfig, context::PersonContext,
  primary,
};

/// One employment record with its status events already classified.
struct Classified<'a> {
  record: &'a EmploymentRecord,
  events: Vec<(StatusCode, &'a StatusEvent)>,
}

/// Classify every event of the batch up front so an unknown code aborts the
/// run before anything is written.
fn classify_batch(changes: &[PersonChangeRecord]) -> Result<Vec<Vec<Classified<'_>>>> {
  changes
    .iter()
    .map(|change| {
      change
        .employments
        .iter()
        .map(|record| {
          let events = record
            .status_events
            .iter()
            .map(|event| {
              StatusCode::parse(&event.code)
                .map(|code| (code, event))
                .map_err(|_| Error::Classification {
                  national_id: change.national_id.clone(),
                  job_id:      record.job_id.clone(),
                  code:        event.code.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
          Ok(Classified { record, events })
        })
        .collect::<Result<Vec<_>>>()
    })
    .collect()
}

/// Reconciles a [`SourceFeed`] against a [`DirectoryWriter`].
///
/// The engine holds no per-person state; everything a person's
/// reconciliation needs travels in a [`PersonContext`].
pub struct Engine<F, D> {
  feed:      F,
  directory: D,
  config:    SyncConfig,
}

impl<F, D> Engine<F, D>
where
  F: SourceFeed,
  D: DirectoryWriter,
{
  pub fn new(feed: F, directory: D, config: SyncConfig) -> Self {
    Self { feed, directory, config }
  }

  pub fn directory(&self) -> &D { &self.directory }

  /// Apply every change the feed reports for `[from, to]`.
  pub async fn sync_window(&self, from: NaiveDate, to: NaiveDate) -> Result<RunSummary> {
    tracing::info!(%from, %to, "sync window");

    let persons = self
      .feed
      .changed_persons(from, to)
      .await
      .map_err(Error::feed)?;
    let changes = self
      .feed
      .changed_employments(from, to)
      .await
      .map_err(Error::feed)?;
    let classified = classify_batch(&changes)?;
    tracing::info!(
      persons = persons.len(),
      employments = changes.len(),
      "feed read"
    );

    let mut catalog = Catalog::load(&self.directory, &self.config).await?;
    let mut summary = RunSummary::default();

    for identity in &persons {
      if let Err(fault) = self.upsert_person(identity, &mut summary).await {
        summary.record(&identity.national_id, &fault);
      }
    }

    if self.config.create_missing_departments {
      self
        .create_missing_departments(&changes, &catalog, &mut summary)
        .await?;
    }

    for (change, records) in changes.iter().zip(&classified) {
      summary.persons_seen += 1;
      self
        .reconcile_person(&change.national_id, records, &mut catalog, &mut summary)
        .await;
    }

    summary.job_functions_created = catalog.job_functions_created();
    tracing::info!(
      writes = summary.writes(),
      already_applied = summary.already_applied,
      faults = summary.faults.len(),
      "sync window done"
    );
    Ok(summary)
  }

  /// Run only the primary selector for one person.
  pub async fn recalculate_primary(&self, national_id: &str) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let person = self
      .directory
      .read_person(national_id)
      .await
      .map_err(Error::directory)?;

    let Some(person) = person else {
      let fault =
        Fault::missing(None, format!("person {national_id} is not in the directory"));
      summary.record(national_id, &fault);
      return Ok(summary);
    };

    summary.persons_seen = 1;
    let settled = async {
      let mut ctx = PersonContext::load(&self.directory, person)
        .await
        .map_err(Fault::read)?;
      self.settle_primary(&mut ctx, &mut summary).await
    }
    .await;
    if let Err(fault) = settled {
      summary.record(national_id, &fault);
    }
    Ok(summary)
  }

  // ─── Persons and units ─────────────────────────────────────────────────────

  async fn upsert_person(
    &self,
    identity: &PersonIdentity,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let name = identity.display_name();
    let existing = self
      .directory
      .read_person(&identity.national_id)
      .await
      .map_err(Fault::read)?;

    match existing {
      None => {
        self
          .directory
          .create(CreateRequest::Person(NewPerson {
            national_id: identity.national_id.clone(),
            name,
          }))
          .await
          .map_err(|e| Fault::write(None, e))?;
        tracing::info!(national_id = %identity.national_id, "created person");
        summary.persons_created += 1;
      }
      Some(person) if person.name == name => {}
      Some(person) => {
        let outcome = self
          .directory
          .edit(person.uuid, EditRequest::PersonName(name))
          .await
          .map_err(|e| Fault::write(None, e))?;
        match outcome {
          WriteOutcome::Applied => summary.persons_renamed += 1,
          WriteOutcome::AlreadyApplied => summary.already_applied += 1,
        }
      }
    }
    Ok(())
  }

  /// Create every referenced department the directory does not know as a
  /// root unit of the orphan type. They are expected to be moved into place
  /// later.
  async fn create_missing_departments(
    &self,
    changes: &[PersonChangeRecord],
    catalog: &Catalog,
    summary: &mut RunSummary,
  ) -> Result<()> {
    // unit uuid → (key, earliest referenced start), in first-seen order
    let mut order: Vec<Uuid> = Vec::new();
    let mut referenced: HashMap<Uuid, (&str, NaiveDate)> = HashMap::new();
    let departments = changes
      .iter()
      .flat_map(|c| &c.employments)
      .flat_map(|r| &r.departments);
    for department in departments {
      referenced
        .entry(department.unit_uuid)
        .and_modify(|(_, from)| *from = (*from).min(department.validity.from))
        .or_insert_with(|| {
          order.push(department.unit_uuid);
          (department.unit_key.as_str(), department.validity.from)
        });
    }

    for uuid in order {
      let Some(&(key, from)) = referenced.get(&uuid) else {
        continue;
      };
      let known = self
        .directory
        .read_org_unit(uuid)
        .await
        .map_err(Error::directory)?;
      if known.is_some() {
        continue;
      }

      self
        .directory
        .create(CreateRequest::OrgUnit {
          uuid,
          unit: NewOrgUnit {
            user_key:  key.to_owned(),
            name:      key.to_owned(),
            unit_type: catalog.orphan_unit_type,
            parent:    None,
            validity:  ValidityInterval::unbounded(from),
          },
        })
        .await
        .map_err(Error::directory)?;
      tracing::info!(%uuid, key, "created missing department");
      summary.org_units_created += 1;
    }
    Ok(())
  }

  // ─── Per person ────────────────────────────────────────────────────────────

  #[instrument(skip(self, records, catalog, summary))]
  async fn reconcile_person(
    &self,
    national_id: &str,
    records: &[Classified<'_>],
    catalog: &mut Catalog,
    summary: &mut RunSummary,
  ) {
    let person = match self.directory.read_person(national_id).await {
      Ok(Some(person)) => person,
      Ok(None) => {
        let ended = records.iter().flat_map(|r| &r.events).all(|(code, _)| {
          matches!(
            code.transition(),
            TransitionKind::Terminate | TransitionKind::ConsistencyCheck
          )
        });
        if ended {
          tracing::debug!("ended or deleted before import, skipping");
          summary.persons_skipped += 1;
        } else {
          let fault = Fault::missing(
            None,
            format!("person {national_id} is not in the directory"),
          );
          summary.record(national_id, &fault);
        }
        return;
      }
      Err(e) => {
        summary.record(national_id, &Fault::read(e));
        return;
      }
    };

    let mut ctx = match PersonContext::load(&self.directory, person).await {
      Ok(ctx) => ctx,
      Err(e) => {
        summary.record(national_id, &Fault::read(e));
        return;
      }
    };

    for record in records {
      if let Err(fault) = self.reconcile_record(&mut ctx, record, catalog, summary).await {
        summary.record(national_id, &fault);
        return;
      }
    }

    if let Err(fault) = self.settle_primary(&mut ctx, summary).await {
      summary.record(national_id, &fault);
    }
  }

  /// Apply one record's events in feed order. Only faults that stop the
  /// person are returned; skipped events are recorded here.
  async fn reconcile_record(
    &self,
    ctx: &mut PersonContext,
    classified: &Classified<'_>,
    catalog: &mut Catalog,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let record = classified.record;
    let job_id = record.job_id.as_str();
    // Set when an event already covered the record's attributes, or when an
    // event was skipped; either way the trailing edit pass is not run.
    let mut handled = false;

    for &(code, event) in &classified.events {
      tracing::debug!(job_id, %code, from = %event.validity.from, "status event");
      let outcome = match code.transition() {
        TransitionKind::ActivateOrEdit => {
          handled = true;
          self
            .activate_or_edit(ctx, record, code, event, catalog, summary)
            .await
        }
        TransitionKind::Leave => self.create_leave(ctx, job_id, event, catalog, summary).await,
        TransitionKind::Terminate => self.terminate(ctx, job_id, event, summary).await,
        TransitionKind::ConsistencyCheck => {
          self.check_consistency(ctx, job_id, event).map(|matched| {
            handled |= matched;
          })
        }
      };

      match outcome {
        Ok(()) => {}
        Err(fault) if !fault.stops_person() => {
          summary.record(&ctx.person.national_id, &fault);
          handled = true;
        }
        Err(fault) => return Err(fault),
      }
    }

    if !handled {
      match self.edit_pass(ctx, record, 0, catalog, summary).await {
        Ok(()) => {}
        Err(fault) if !fault.stops_person() => {
          summary.record(&ctx.person.national_id, &fault);
        }
        Err(fault) => return Err(fault),
      }
    }
    Ok(())
  }

  // ─── Transitions ───────────────────────────────────────────────────────────

  async fn activate_or_edit(
    &self,
    ctx: &mut PersonContext,
    record: &EmploymentRecord,
    code: StatusCode,
    event: &StatusEvent,
    catalog: &mut Catalog,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    if let Some(engagement) = ctx.find(&record.job_id) {
      let uuid = engagement.uuid;
      if !ctx.covers(uuid, &event.validity) {
        let engagement_type = catalog.engagement_type_for(code);
        self
          .reactivate(ctx, uuid, &record.job_id, event, engagement_type, summary)
          .await?;
      }
      return self.edit_pass(ctx, record, 0, catalog, summary).await;
    }

    self
      .create_engagement(ctx, record, code, event, catalog, summary)
      .await?;
    ctx.reload(&self.directory).await.map_err(Fault::read)?;

    // Entry 1 went into the create; the rest become edits.
    if record.has_follow_up_entries() {
      self.edit_pass(ctx, record, 1, catalog, summary).await?;
    }
    Ok(())
  }

  /// Stretch an existing engagement over an activation event that reaches
  /// past it, then give the event's window the engagement type its code
  /// calls for.
  async fn reactivate(
    &self,
    ctx: &mut PersonContext,
    uuid: Uuid,
    job_id: &str,
    event: &StatusEvent,
    engagement_type: Uuid,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let outcome = self
      .directory
      .edit(uuid, EditRequest::Extend { validity: event.validity })
      .await
      .map_err(|e| Fault::write(Some(job_id), e))?;
    match outcome {
      WriteOutcome::Applied => {
        tracing::info!(job_id, from = %event.validity.from, "extended engagement");
        summary.engagements_edited += 1;
      }
      WriteOutcome::AlreadyApplied => summary.already_applied += 1,
    }
    ctx.reload(&self.directory).await.map_err(Fault::read)?;

    let edit = EngagementEdit::new()
      .engagement_type(engagement_type)
      .validity(event.validity);
    self.edit_engagement(uuid, job_id, edit, summary).await
  }

  async fn create_engagement(
    &self,
    ctx: &PersonContext,
    record: &EmploymentRecord,
    code: StatusCode,
    event: &StatusEvent,
    catalog: &mut Catalog,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let job_id = record.job_id.as_str();
    let department = record.departments.first().ok_or_else(|| {
      Fault::missing(Some(job_id), format!("job {job_id} has no department"))
    })?;
    // Same window the edit pass derives for this entry, so a rerun finds
    // the association it wrote.
    let placement = department
      .validity
      .intersection(&event.validity)
      .unwrap_or(event.validity);
    let org_unit = self
      .place(ctx, job_id, department.unit_uuid, placement, catalog, summary)
      .await?;

    let job_function = match record.professions.first() {
      Some(profession) => Some(
        catalog
          .job_function(&self.directory, &profession.name)
          .await
          .map_err(|e| Fault::write(Some(job_id), e))?,
      ),
      None => None,
    };

    let request = EngagementBuilder::new()
      .person(ctx.person.uuid)
      .org_unit(org_unit)
      .job_function(job_function)
      .engagement_type(catalog.engagement_type_for(code))
      .user_key(JobKey::parse(job_id).as_str())
      .fraction(record.working_times.first().map(|w| w.rate))
      .validity(event.validity)
      .build()
      .map_err(|e| Fault::missing(Some(job_id), e.to_string()))?;

    let uuid = self
      .directory
      .create(request)
      .await
      .map_err(|e| Fault::write(Some(job_id), e))?;
    tracing::info!(job_id, %uuid, "created engagement");
    summary.engagements_created += 1;
    Ok(())
  }

  /// Write each department, profession and working-time entry from index
  /// `skip` onwards as its own edit, clipped to the engagement's lifetime.
  async fn edit_pass(
    &self,
    ctx: &PersonContext,
    record: &EmploymentRecord,
    skip: usize,
    catalog: &mut Catalog,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let job_id = record.job_id.as_str();
    let entries = [
      record.departments.len(),
      record.professions.len(),
      record.working_times.len(),
    ];
    if entries.iter().all(|&n| n <= skip) {
      return Ok(());
    }
    let Some(engagement) = ctx.find(job_id) else {
      return Err(Fault::missing(
        Some(job_id),
        format!("no engagement for job {job_id} to edit"),
      ));
    };
    let uuid = engagement.uuid;
    let Some(lifetime) = ctx.lifetime(uuid) else {
      return Ok(());
    };

    for department in record.departments.iter().skip(skip) {
      let Some(window) = department.validity.intersection(&lifetime) else {
        tracing::debug!(job_id, "department entry outside the engagement");
        continue;
      };
      let org_unit = self
        .place(ctx, job_id, department.unit_uuid, window, catalog, summary)
        .await?;
      let edit = EngagementEdit::new().org_unit(org_unit).validity(window);
      self.edit_engagement(uuid, job_id, edit, summary).await?;
    }

    for profession in record.professions.iter().skip(skip) {
      let Some(window) = profession.validity.intersection(&lifetime) else {
        tracing::debug!(job_id, "profession entry outside the engagement");
        continue;
      };
      let job_function = catalog
        .job_function(&self.directory, &profession.name)
        .await
        .map_err(|e| Fault::write(Some(job_id), e))?;
      let edit = EngagementEdit::new().job_function(job_function).validity(window);
      self.edit_engagement(uuid, job_id, edit, summary).await?;
    }

    for working_time in record.working_times.iter().skip(skip) {
      let Some(window) = working_time.validity.intersection(&lifetime) else {
        tracing::debug!(job_id, "working-time entry outside the engagement");
        continue;
      };
      let edit = EngagementEdit::new().fraction(working_time.rate).validity(window);
      self.edit_engagement(uuid, job_id, edit, summary).await?;
    }
    Ok(())
  }

  async fn edit_engagement(
    &self,
    uuid: Uuid,
    job_id: &str,
    edit: EngagementEdit,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let request = edit
      .build()
      .map_err(|e| Fault::missing(Some(job_id), e.to_string()))?;
    let outcome = self
      .directory
      .edit(uuid, request)
      .await
      .map_err(|e| Fault::write(Some(job_id), e))?;
    match outcome {
      WriteOutcome::Applied => summary.engagements_edited += 1,
      WriteOutcome::AlreadyApplied => {
        tracing::debug!(job_id, "edit already applied");
        summary.already_applied += 1;
      }
    }
    Ok(())
  }

  /// The unit an engagement in `unit` is placed on.
  ///
  /// Units whose type is too deep cannot hold engagements. The engagement
  /// goes to the nearest ancestor that can, and the person gets an
  /// association to the original unit instead.
  async fn place(
    &self,
    ctx: &PersonContext,
    job_id: &str,
    unit: Uuid,
    validity: ValidityInterval,
    catalog: &Catalog,
    summary: &mut RunSummary,
  ) -> Result<Uuid, Fault> {
    let ou = self
      .directory
      .read_org_unit(unit)
      .await
      .map_err(Fault::read)?
      .ok_or_else(|| {
        Fault::missing(Some(job_id), format!("org unit {unit} is not in the directory"))
      })?;
    if !self.config.is_too_deep(&ou) {
      return Ok(ou.uuid);
    }

    let target = ou
      .ancestry()
      .find(|u| !self.config.is_too_deep(u))
      .map(|u| u.uuid)
      .ok_or_else(|| {
        Fault::missing(
          Some(job_id),
          format!("org unit {} has no ancestor that can hold an engagement", ou.user_key),
        )
      })?;
    tracing::debug!(job_id, from = %ou.user_key, to = %target, "climbed past too-deep unit");

    self
      .associate(ctx, job_id, ou.uuid, validity, catalog, summary)
      .await?;
    Ok(target)
  }

  async fn associate(
    &self,
    ctx: &PersonContext,
    job_id: &str,
    unit: Uuid,
    validity: ValidityInterval,
    catalog: &Catalog,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let existing = self
      .directory
      .read_associations(ctx.person.uuid)
      .await
      .map_err(Fault::read)?;
    if existing
      .iter()
      .any(|a| a.org_unit == unit && a.validity.covers(&validity))
    {
      return Ok(());
    }

    let request = AssociationBuilder::new()
      .person(ctx.person.uuid)
      .org_unit(unit)
      .association_type(catalog.association_type)
      .user_key(JobKey::parse(job_id).as_str())
      .validity(validity)
      .build()
      .map_err(|e| Fault::missing(Some(job_id), e.to_string()))?;
    self
      .directory
      .create(request)
      .await
      .map_err(|e| Fault::write(Some(job_id), e))?;
    summary.associations_created += 1;
    Ok(())
  }

  async fn create_leave(
    &self,
    ctx: &PersonContext,
    job_id: &str,
    event: &StatusEvent,
    catalog: &Catalog,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let engagement = ctx.find(job_id).ok_or_else(|| {
      Fault::missing(Some(job_id), format!("leave for job {job_id}, which has no engagement"))
    })?;

    // Leaves are created as reported, even if an identical one exists.
    let request = LeaveBuilder::new()
      .person(ctx.person.uuid)
      .leave_type(catalog.leave_type)
      .engagement(Some(engagement.uuid))
      .validity(event.validity)
      .build()
      .map_err(|e| Fault::missing(Some(job_id), e.to_string()))?;
    self
      .directory
      .create(request)
      .await
      .map_err(|e| Fault::write(Some(job_id), e))?;
    tracing::debug!(job_id, from = %event.validity.from, "created leave");
    summary.leaves_created += 1;
    Ok(())
  }

  async fn terminate(
    &self,
    ctx: &mut PersonContext,
    job_id: &str,
    event: &StatusEvent,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    let engagement = ctx.find(job_id).ok_or_else(|| {
      Fault::missing(
        Some(job_id),
        format!("termination of job {job_id}, which was never created"),
      )
    })?;

    let to = event.validity.from;
    let outcome = self
      .directory
      .terminate(DetailKind::Engagement, engagement.uuid, to)
      .await
      .map_err(|e| Fault::write(Some(job_id), e))?;
    match outcome {
      WriteOutcome::Applied => {
        tracing::info!(job_id, %to, "terminated engagement");
        summary.engagements_terminated += 1;
        ctx.reload(&self.directory).await.map_err(Fault::read)?;
      }
      WriteOutcome::AlreadyApplied => summary.already_applied += 1,
    }
    Ok(())
  }

  /// A deletion must find the engagement either absent (never hired) or
  /// ending the day before the deletion takes effect. Returns whether an
  /// engagement was found.
  fn check_consistency(
    &self,
    ctx: &PersonContext,
    job_id: &str,
    event: &StatusEvent,
  ) -> Result<bool, Fault> {
    let Some(engagement) = ctx.find(job_id) else {
      tracing::debug!(job_id, "deleted job was never hired");
      return Ok(false);
    };

    let ends = ctx.lifetime(engagement.uuid).and_then(|l| l.to);
    if ends.map(day_after) == Some(event.validity.from) {
      return Ok(true);
    }
    let ends = ends.map_or_else(|| "never".to_owned(), |d| d.to_string());
    Err(Fault::consistency(
      job_id,
      format!(
        "job {job_id} ends {ends} in the directory, but is deleted from {}",
        event.validity.from
      ),
    ))
  }

  // ─── Primary ───────────────────────────────────────────────────────────────

  async fn settle_primary(
    &self,
    ctx: &mut PersonContext,
    summary: &mut RunSummary,
  ) -> Result<(), Fault> {
    ctx.reload(&self.directory).await.map_err(Fault::read)?;
    let edits = primary::plan(&ctx.engagements).map_err(|e| Fault::Consistency {
      job_id:  Some(e.first.clone()),
      message: e.to_string(),
    })?;

    for edit in edits {
      let request = EngagementEdit::new()
        .primary(edit.primary)
        .validity(edit.validity)
        .build()
        .map_err(|e| Fault::missing(Some(edit.job_id.as_str()), e.to_string()))?;
      let outcome = self
        .directory
        .edit(edit.engagement, request)
        .await
        .map_err(|e| Fault::write(Some(edit.job_id.as_str()), e))?;
      match outcome {
        WriteOutcome::Applied => {
          tracing::debug!(job_id = %edit.job_id, primary = edit.primary, "primary flag set");
          summary.primary_edits += 1;
        }
        WriteOutcome::AlreadyApplied => summary.already_applied += 1,
      }
    }
    Ok(())
  }
}
