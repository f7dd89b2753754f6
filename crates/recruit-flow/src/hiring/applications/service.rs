use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::domain::{
    ApplicationView, CandidateApplication, OpenApplicationRequest, StageHistoryEntry,
    StageMoveOutcome,
};
use super::repository::{HiringStore, RepositoryError};
use crate::config::HiringConfig;
use crate::hiring::assignments::{PositionStageAssignment, StageAssignmentError};
use crate::hiring::candidates::{CompanyCandidate, CompanyCandidateDraft, CompanyCandidateError};
use crate::hiring::events::{
    ApplicationStageChangedEvent, EventError, OutboxDispatcher, StageChangeDraft,
    StageEventPublisher,
};
use crate::hiring::fields::{
    CustomField, CustomFieldDraft, FieldConfiguration, FieldError, FieldValues,
};
use crate::hiring::ids::{
    ApplicationId, CompanyCandidateId, CompanyId, IdGenerator, PhaseId, PositionId,
    SequenceIdGenerator, StageId, UserId, WorkflowId,
};
use crate::hiring::phases::{order_phases, Phase, PhaseDraft, PhaseError, PhaseStatus};
use crate::hiring::positions::{
    self, Company, JobPosition, LegacyWorkflowMigration, MigrationReport, ResolutionError,
};
use crate::hiring::stages::{Stage, Workflow, WorkflowError};
use crate::hiring::transitions::{TransitionError, TransitionValidator};
use crate::hiring::visibility::{ResolvedField, VisibilityResolver};

/// Orchestrates workflow configuration, candidate lifecycle, and stage moves on top of a
/// [`HiringStore`], publishing stage change events through `P`.
pub struct HiringPipelineService<S, P> {
    store: Arc<S>,
    publisher: Arc<P>,
    ids: Arc<dyn IdGenerator>,
    config: HiringConfig,
}

impl<S, P> HiringPipelineService<S, P>
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, config: HiringConfig) -> Self {
        Self::with_id_generator(store, publisher, Arc::new(SequenceIdGenerator::default()), config)
    }

    pub fn with_id_generator(
        store: Arc<S>,
        publisher: Arc<P>,
        ids: Arc<dyn IdGenerator>,
        config: HiringConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            ids,
            config,
        }
    }

    pub fn config(&self) -> &HiringConfig {
        &self.config
    }

    /// Dispatcher re-delivering outbox entries through the same publisher.
    pub fn outbox_dispatcher(&self) -> OutboxDispatcher<S, P> {
        OutboxDispatcher::new(
            self.store.clone(),
            self.publisher.clone(),
            self.config.outbox_batch,
        )
    }

    pub fn register_company(
        &self,
        id: CompanyId,
        name: impl Into<String>,
    ) -> Result<Company, HiringError> {
        let name = name.into();
        if id.is_blank() || name.trim().is_empty() {
            return Err(HiringError::Validation(
                "company id and name must not be empty".to_string(),
            ));
        }
        let company = self.store.insert_company(Company {
            id,
            name: name.trim().to_string(),
        })?;
        info!(company_id = %company.id, "company registered");
        Ok(company)
    }

    pub fn register_workflow(&self, workflow: Workflow) -> Result<Workflow, HiringError> {
        self.company(&workflow.company_id)?;

        for warning in workflow.convention_warnings() {
            warn!(
                workflow_id = %workflow.id,
                warning = %warning.describe(),
                "workflow deviates from convention"
            );
        }

        let workflow = self.store.insert_workflow(workflow)?;
        info!(
            workflow_id = %workflow.id,
            stages = workflow.stages().len(),
            "workflow registered"
        );
        Ok(workflow)
    }

    /// Replace a stage definition; its type is frozen while applications occupy it.
    pub fn update_stage(
        &self,
        workflow_id: &WorkflowId,
        stage: Stage,
    ) -> Result<Workflow, HiringError> {
        let mut workflow = self.workflow(workflow_id)?;
        if stage.workflow_id != workflow.id {
            return Err(WorkflowError::ForeignStage {
                stage_id: stage.id.clone(),
                expected: workflow.id.clone(),
                found: stage.workflow_id.clone(),
            }
            .into());
        }
        let current = workflow
            .stage(&stage.id)
            .ok_or_else(|| HiringError::not_found("stage", &stage.id))?;

        if current.stage_type != stage.stage_type {
            let occupants = self.store.count_at_stage(&stage.id)?;
            if occupants > 0 {
                return Err(HiringError::BusinessRule(format!(
                    "stage {} holds {occupants} application(s); its type cannot change from {} to {}",
                    stage.id,
                    current.stage_type.label(),
                    stage.stage_type.label()
                )));
            }
        }

        workflow.replace_stage(stage)?;
        self.store.update_workflow(workflow.clone())?;
        Ok(workflow)
    }

    pub fn add_custom_field(&self, draft: CustomFieldDraft) -> Result<CustomField, HiringError> {
        self.workflow(&draft.workflow_id)?;
        let field = CustomField::create(self.ids.next_id("cf").into(), draft)?;

        let existing = self.store.custom_fields(&field.workflow_id)?;
        if existing.iter().any(|other| other.field_key == field.field_key) {
            return Err(FieldError::DuplicateFieldKey {
                workflow_id: field.workflow_id,
                field_key: field.field_key,
            }
            .into());
        }

        Ok(self.store.insert_custom_field(field)?)
    }

    /// Set the visibility of a field at a stage, replacing any earlier row for the pair.
    pub fn configure_field(
        &self,
        configuration: FieldConfiguration,
    ) -> Result<FieldConfiguration, HiringError> {
        let field = self
            .store
            .fetch_custom_field(&configuration.custom_field_id)?
            .ok_or_else(|| HiringError::not_found("custom field", &configuration.custom_field_id))?;
        let workflow = self.workflow(&field.workflow_id)?;
        if workflow.stage(&configuration.stage_id).is_none() {
            return Err(TransitionError::StageNotInWorkflow {
                workflow_id: workflow.id,
                stage_id: configuration.stage_id,
            }
            .into());
        }

        self.store.upsert_field_configuration(configuration.clone())?;
        debug!(
            stage_id = %configuration.stage_id,
            field_key = %field.field_key,
            visibility = configuration.visibility.label(),
            "field visibility configured"
        );
        Ok(configuration)
    }

    pub fn stage_fields(
        &self,
        workflow_id: &WorkflowId,
        stage_id: &StageId,
    ) -> Result<Vec<ResolvedField>, HiringError> {
        let workflow = self.workflow(workflow_id)?;
        if workflow.stage(stage_id).is_none() {
            return Err(HiringError::not_found("stage", stage_id));
        }
        let (fields, resolver) = self.field_rules(workflow_id)?;
        Ok(resolver.resolve(stage_id, &fields))
    }

    pub fn create_phase(
        &self,
        company_id: &CompanyId,
        draft: PhaseDraft,
    ) -> Result<Phase, HiringError> {
        self.company(company_id)?;
        let existing = self.store.phases_for_company(company_id)?;
        let phase = Phase::create(
            self.ids.next_id("phase").into(),
            company_id.clone(),
            draft,
            &existing,
        )?;
        Ok(self.store.insert_phase(phase)?)
    }

    pub fn list_phases(&self, company_id: &CompanyId) -> Result<Vec<Phase>, HiringError> {
        self.company(company_id)?;
        Ok(order_phases(self.store.phases_for_company(company_id)?))
    }

    pub fn change_phase_status(
        &self,
        phase_id: &PhaseId,
        status: PhaseStatus,
    ) -> Result<Phase, HiringError> {
        let mut phase = self.phase(phase_id)?;
        let previous = phase.status;
        phase.change_status(status)?;
        self.store.update_phase(phase.clone())?;
        info!(
            phase_id = %phase.id,
            from = previous.label(),
            to = status.label(),
            "phase status changed"
        );
        Ok(phase)
    }

    pub fn register_position(&self, position: JobPosition) -> Result<JobPosition, HiringError> {
        self.company(&position.company_id)?;
        if position.id.is_blank() || position.title.trim().is_empty() {
            return Err(HiringError::Validation(
                "position id and title must not be empty".to_string(),
            ));
        }

        if !position.is_unmigrated() {
            let mut scratch = JobPosition::new(
                position.id.clone(),
                position.company_id.clone(),
                position.title.clone(),
            );
            for (phase_id, workflow_id) in &position.phase_workflows {
                let phase = self.phase(phase_id)?;
                let workflow = self.workflow(workflow_id)?;
                positions::assign_phase_workflow(&mut scratch, &phase, &workflow)?;
            }
        }

        Ok(self.store.insert_position(position)?)
    }

    pub fn assign_phase_workflow(
        &self,
        position_id: &PositionId,
        phase_id: &PhaseId,
        workflow_id: &WorkflowId,
    ) -> Result<JobPosition, HiringError> {
        let mut position = self.position(position_id)?;
        let phase = self.phase(phase_id)?;
        let workflow = self.workflow(workflow_id)?;

        positions::assign_phase_workflow(&mut position, &phase, &workflow)?;
        self.store.update_position(position.clone())?;
        info!(
            position_id = %position.id,
            phase_id = %phase.id,
            workflow_id = %workflow.id,
            "phase workflow assigned"
        );
        Ok(position)
    }

    pub fn resolve_workflow(
        &self,
        position_id: &PositionId,
        phase_id: &PhaseId,
    ) -> Result<Option<WorkflowId>, HiringError> {
        let position = self.position(position_id)?;
        Ok(positions::resolve_workflow(&position, phase_id)?)
    }

    /// Backfill phase workflow maps for every position still on a legacy reference.
    ///
    /// Only migrated positions are written; failed and pending ones keep their legacy
    /// reference and keep failing resolution.
    pub fn run_legacy_migration(&self) -> Result<MigrationReport, HiringError> {
        let mut all_positions = self.store.positions()?;
        let companies: BTreeSet<CompanyId> = all_positions
            .iter()
            .map(|position| position.company_id.clone())
            .collect();
        let legacy_workflows: BTreeSet<WorkflowId> = all_positions
            .iter()
            .filter_map(|position| position.legacy_workflow_id.clone())
            .collect();

        let mut phases = Vec::new();
        for company_id in &companies {
            phases.extend(self.store.phases_for_company(company_id)?);
        }
        let mut workflows = Vec::new();
        for workflow_id in &legacy_workflows {
            workflows.extend(self.store.fetch_workflow(workflow_id)?);
        }

        let report = LegacyWorkflowMigration.apply(&mut all_positions, &phases, &workflows);
        for position in all_positions
            .into_iter()
            .filter(|position| report.migrated.contains(&position.id))
        {
            self.store.update_position(position)?;
        }

        for failure in &report.failed {
            warn!(
                position_id = %failure.position_id,
                reason = %failure.reason,
                "legacy workflow not migrated"
            );
        }
        info!(
            version = report.version,
            migrated = report.migrated.len(),
            skipped = report.skipped.len(),
            pending = report.pending.len(),
            failed = report.failed.len(),
            "legacy workflow migration finished"
        );
        Ok(report)
    }

    pub fn add_company_candidate(
        &self,
        draft: CompanyCandidateDraft,
    ) -> Result<CompanyCandidate, HiringError> {
        let candidate = CompanyCandidate::create(self.ids.next_id("cc").into(), draft)?;
        self.company(&candidate.company_id)?;

        if let Some(phase_id) = &candidate.phase_id {
            let phase = self.phase(phase_id)?;
            if phase.company_id != candidate.company_id {
                return Err(CompanyCandidateError::Validation(format!(
                    "phase {phase_id} does not belong to company {}",
                    candidate.company_id
                ))
                .into());
            }
        }

        let already_exists = || CompanyCandidateError::AlreadyExists {
            candidate_id: candidate.candidate_id.clone(),
            company_id: candidate.company_id.clone(),
        };
        if self
            .store
            .find_company_candidate(&candidate.candidate_id, &candidate.company_id)?
            .is_some()
        {
            return Err(already_exists().into());
        }

        match self.store.insert_company_candidate(candidate.clone()) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Conflict) => Err(already_exists().into()),
            Err(other) => Err(other.into()),
        }
    }

    pub fn get_company_candidate(
        &self,
        id: &CompanyCandidateId,
    ) -> Result<CompanyCandidate, HiringError> {
        self.store
            .fetch_company_candidate(id)?
            .ok_or_else(|| CompanyCandidateError::NotFound(id.clone()).into())
    }

    pub fn invite_candidate(
        &self,
        id: &CompanyCandidateId,
        now: DateTime<Utc>,
    ) -> Result<CompanyCandidate, HiringError> {
        let ttl = self.config.invitation_ttl;
        self.update_company_candidate(id, |candidate| candidate.invite(now, ttl))
    }

    pub fn accept_invitation(
        &self,
        id: &CompanyCandidateId,
        now: DateTime<Utc>,
    ) -> Result<CompanyCandidate, HiringError> {
        self.update_company_candidate(id, |candidate| candidate.accept_invitation(now))
    }

    pub fn reject_invitation(
        &self,
        id: &CompanyCandidateId,
        now: DateTime<Utc>,
    ) -> Result<CompanyCandidate, HiringError> {
        self.update_company_candidate(id, |candidate| candidate.reject_invitation(now))
    }

    pub fn capture_snapshot(
        &self,
        id: &CompanyCandidateId,
        markdown: &str,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<CompanyCandidate, HiringError> {
        self.update_company_candidate(id, |candidate| {
            candidate.capture_snapshot(markdown, data, now);
            Ok(())
        })
    }

    fn update_company_candidate<F>(
        &self,
        id: &CompanyCandidateId,
        change: F,
    ) -> Result<CompanyCandidate, HiringError>
    where
        F: FnOnce(&mut CompanyCandidate) -> Result<(), CompanyCandidateError>,
    {
        let mut candidate = self.get_company_candidate(id)?;
        let previous = candidate.ownership_status;
        change(&mut candidate)?;
        self.store.update_company_candidate(candidate.clone())?;

        if previous != candidate.ownership_status {
            info!(
                company_candidate_id = %candidate.id,
                from = previous.label(),
                to = candidate.ownership_status.label(),
                "ownership status changed"
            );
        }
        Ok(candidate)
    }

    /// Open an application on the workflow mapped to the position's phase.
    ///
    /// The application has no stage until the first [`move_to_stage`](Self::move_to_stage).
    pub fn open_application(
        &self,
        request: OpenApplicationRequest,
    ) -> Result<CandidateApplication, HiringError> {
        let mut company_candidate = self.get_company_candidate(&request.company_candidate_id)?;
        let position = self.position(&request.position_id)?;
        let phase = self.phase(&request.phase_id)?;

        if company_candidate.company_id != position.company_id {
            return Err(HiringError::BusinessRule(format!(
                "candidate {} belongs to company {}, position {} to {}",
                company_candidate.id,
                company_candidate.company_id,
                position.id,
                position.company_id
            )));
        }
        if phase.company_id != position.company_id {
            return Err(ResolutionError::PhaseCompanyMismatch {
                position_id: position.id,
                phase_id: phase.id,
                phase_company: phase.company_id,
                position_company: position.company_id,
            }
            .into());
        }
        if phase.status == PhaseStatus::Archived {
            return Err(ResolutionError::ArchivedPhase { phase_id: phase.id }.into());
        }

        let workflow_id = positions::resolve_workflow(&position, &phase.id)?.ok_or_else(|| {
            HiringError::BusinessRule(format!(
                "position {} has no workflow for phase {}",
                position.id, phase.id
            ))
        })?;
        self.workflow(&workflow_id)?;

        let application = self.store.insert_application(CandidateApplication {
            id: self.ids.next_id("app").into(),
            company_candidate_id: company_candidate.id.clone(),
            candidate_id: company_candidate.candidate_id.clone(),
            position_id: position.id.clone(),
            phase_id: phase.id.clone(),
            workflow_id,
            stage_id: None,
            field_values: FieldValues::new(),
            version: 0,
            history: Vec::new(),
        })?;

        if company_candidate.phase_id.as_ref() != Some(&phase.id) {
            company_candidate.phase_id = Some(phase.id.clone());
            self.store.update_company_candidate(company_candidate)?;
        }

        info!(
            application_id = %application.id,
            position_id = %application.position_id,
            workflow_id = %application.workflow_id,
            "application opened"
        );
        Ok(application)
    }

    pub fn get_application(&self, id: &ApplicationId) -> Result<CandidateApplication, HiringError> {
        self.store
            .fetch_application(id)?
            .ok_or_else(|| HiringError::not_found("application", id))
    }

    pub fn application_view(&self, id: &ApplicationId) -> Result<ApplicationView, HiringError> {
        let application = self.get_application(id)?;
        let stage_name = match &application.stage_id {
            Some(stage_id) => self
                .workflow(&application.workflow_id)?
                .stage(stage_id)
                .map(|stage| stage.name.clone()),
            None => None,
        };
        Ok(application.view(stage_name))
    }

    /// Write custom field values; `null` clears a value.
    ///
    /// Once the application sits at a stage, only fields VISIBLE or REQUIRED there are
    /// writable.
    pub fn set_field_values(
        &self,
        id: &ApplicationId,
        values: FieldValues,
    ) -> Result<CandidateApplication, HiringError> {
        let mut application = self.get_application(id)?;
        let (fields, resolver) = self.field_rules(&application.workflow_id)?;

        for (key, value) in &values {
            let field = fields
                .iter()
                .find(|field| &field.field_key == key)
                .ok_or_else(|| FieldError::UnknownField {
                    field_key: key.clone(),
                })?;

            if let Some(stage_id) = &application.stage_id {
                let visibility = resolver.visibility_of(stage_id, field);
                if !visibility.is_writable() {
                    return Err(FieldError::NotWritable {
                        field_key: key.clone(),
                        visibility,
                    }
                    .into());
                }
            }
            field.validate_value(value)?;
        }

        for (key, value) in values {
            if value.is_null() {
                application.field_values.remove(&key);
            } else {
                application.field_values.insert(key, value);
            }
        }

        let expected = application.version;
        Ok(self.store.update_application(application, expected)?)
    }

    /// Validate and commit a stage move, then publish the change event.
    ///
    /// The event is written to the outbox in the same commit. A failed publish is logged
    /// and left for the outbox dispatcher; the move stays committed.
    pub fn move_to_stage(
        &self,
        id: &ApplicationId,
        target: &StageId,
        changed_by: Option<UserId>,
    ) -> Result<StageMoveOutcome, HiringError> {
        let mut application = self.get_application(id)?;
        let workflow = self.workflow(&application.workflow_id)?;
        let (fields, resolver) = self.field_rules(&workflow.id)?;

        let plan = TransitionValidator::new(&resolver)
            .validate(
                &workflow,
                application.stage_id.as_ref(),
                target,
                &fields,
                &application.field_values,
            )
            .map_err(|error| {
                debug!(application_id = %application.id, %error, "stage transition rejected");
                error
            })?;

        let company_candidate = self.get_company_candidate(&application.company_candidate_id)?;
        let position = self.position(&application.position_id)?;
        let company = self.company(&position.company_id)?;
        let changed_at = Utc::now();

        let event = ApplicationStageChangedEvent::new(StageChangeDraft {
            application_id: application.id.clone(),
            candidate_id: application.candidate_id.clone(),
            workflow_id: workflow.id.clone(),
            previous_stage_id: plan.from.clone(),
            new_stage_id: plan.to.id.clone(),
            new_stage_name: plan.to.name.clone(),
            candidate_email: company_candidate.contact.email.clone(),
            candidate_name: company_candidate.contact.name.clone(),
            position_title: position.title.clone(),
            company_name: company.name.clone(),
            changed_at,
            changed_by_user_id: changed_by.clone(),
        })?;

        let expected = application.version;
        application.stage_id = Some(plan.to.id.clone());
        application.history.push(StageHistoryEntry {
            from: plan.from.clone(),
            to: plan.to.id.clone(),
            kind: plan.kind.label().to_string(),
            changed_at,
            changed_by,
        });

        let committed =
            self.store
                .commit_transition(application, expected, event.clone(), changed_at)?;
        info!(
            application_id = %committed.application.id,
            from = ?plan.from.as_ref().map(StageId::as_str),
            to = %plan.to.id,
            kind = plan.kind.label(),
            version = committed.application.version,
            "stage transition committed"
        );
        if plan.enters_process_stage() {
            info!(
                application_id = %committed.application.id,
                stage_id = %plan.to.id,
                "application entered an automated stage"
            );
        }
        if plan.reaches_outcome() {
            info!(
                application_id = %committed.application.id,
                stage_id = %plan.to.id,
                outcome = plan.to.stage_type.label(),
                "application reached a final stage"
            );
        }

        let delivered = self.publish_committed(committed.outbox.id, &event);

        Ok(StageMoveOutcome {
            application: committed.application,
            transition: plan.kind,
            event,
            delivered,
        })
    }

    fn publish_committed(&self, outbox_id: u64, event: &ApplicationStageChangedEvent) -> bool {
        match self.publisher.publish(event) {
            Ok(()) => {
                if let Err(error) = self.store.mark_delivered(outbox_id, Utc::now()) {
                    warn!(outbox_id, %error, "could not mark outbox entry delivered");
                }
                true
            }
            Err(error) => {
                warn!(
                    outbox_id,
                    application_id = %event.application_id,
                    %error,
                    "stage change publish failed; left pending in outbox"
                );
                if let Err(store_error) = self.store.record_failure(outbox_id, error.to_string()) {
                    warn!(outbox_id, error = %store_error, "could not record publish failure");
                }
                false
            }
        }
    }

    pub fn assign_stage_user(
        &self,
        position_id: &PositionId,
        stage_id: &StageId,
        user_id: UserId,
    ) -> Result<PositionStageAssignment, HiringError> {
        let mut assignment = self.assignment(position_id, stage_id)?;
        assignment.assign(user_id)?;
        self.store.save_assignment(assignment.clone())?;
        Ok(assignment)
    }

    pub fn unassign_stage_user(
        &self,
        position_id: &PositionId,
        stage_id: &StageId,
        user_id: &UserId,
    ) -> Result<PositionStageAssignment, HiringError> {
        let mut assignment = self.assignment(position_id, stage_id)?;
        assignment.unassign(user_id)?;
        self.store.save_assignment(assignment.clone())?;
        Ok(assignment)
    }

    pub fn stage_assignees(
        &self,
        position_id: &PositionId,
        stage_id: &StageId,
    ) -> Result<Vec<UserId>, HiringError> {
        Ok(self.assignment(position_id, stage_id)?.users().to_vec())
    }

    /// Stored assignment for the pair, or an empty one once the stage is known to belong
    /// to a workflow mapped on the position.
    fn assignment(
        &self,
        position_id: &PositionId,
        stage_id: &StageId,
    ) -> Result<PositionStageAssignment, HiringError> {
        let position = self.position(position_id)?;

        let mut known_stage = false;
        for workflow_id in position.phase_workflows.values() {
            if self.workflow(workflow_id)?.stage(stage_id).is_some() {
                known_stage = true;
                break;
            }
        }
        if !known_stage {
            return Err(HiringError::not_found("stage", stage_id));
        }

        Ok(self
            .store
            .fetch_assignment(position_id, stage_id)?
            .unwrap_or_else(|| PositionStageAssignment::new(position_id.clone(), stage_id.clone())))
    }

    fn company(&self, id: &CompanyId) -> Result<Company, HiringError> {
        self.store
            .fetch_company(id)?
            .ok_or_else(|| HiringError::not_found("company", id))
    }

    fn workflow(&self, id: &WorkflowId) -> Result<Workflow, HiringError> {
        self.store
            .fetch_workflow(id)?
            .ok_or_else(|| HiringError::not_found("workflow", id))
    }

    fn phase(&self, id: &PhaseId) -> Result<Phase, HiringError> {
        self.store
            .fetch_phase(id)?
            .ok_or_else(|| HiringError::not_found("phase", id))
    }

    fn position(&self, id: &PositionId) -> Result<JobPosition, HiringError> {
        self.store
            .fetch_position(id)?
            .ok_or_else(|| HiringError::not_found("position", id))
    }

    fn field_rules(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<(Vec<CustomField>, VisibilityResolver), HiringError> {
        let fields = self.store.custom_fields(workflow_id)?;
        let resolver = VisibilityResolver::new(
            self.config.default_field_visibility,
            self.store.field_configurations(workflow_id)?,
        );
        Ok((fields, resolver))
    }
}

/// Coarse classification used at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    BusinessRule,
    Conflict,
    Unavailable,
}

/// Error raised by the hiring pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum HiringError {
    #[error("{entity} {id} not found")]
    EntityNotFound { entity: &'static str, id: String },
    #[error("{0}")]
    BusinessRule(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Candidate(#[from] CompanyCandidateError),
    #[error(transparent)]
    Assignment(#[from] StageAssignmentError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl HiringError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::EntityNotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EntityNotFound { .. } => ErrorKind::NotFound,
            Self::BusinessRule(_) => ErrorKind::BusinessRule,
            Self::Validation(_) | Self::Workflow(_) | Self::Event(_) => ErrorKind::Validation,
            Self::Field(FieldError::DuplicateFieldKey { .. }) => ErrorKind::Conflict,
            Self::Field(_) => ErrorKind::Validation,
            Self::Phase(PhaseError::DuplicateSortOrder { .. }) => ErrorKind::Conflict,
            Self::Phase(PhaseError::EmptyName) => ErrorKind::Validation,
            Self::Phase(PhaseError::InvalidStatusTransition { .. }) => ErrorKind::BusinessRule,
            Self::Resolution(_) | Self::Transition(_) => ErrorKind::BusinessRule,
            Self::Candidate(error) => match error {
                CompanyCandidateError::NotFound(_) => ErrorKind::NotFound,
                CompanyCandidateError::Validation(_) => ErrorKind::Validation,
                CompanyCandidateError::AlreadyExists { .. } => ErrorKind::Conflict,
                CompanyCandidateError::InvitationExpired { .. }
                | CompanyCandidateError::InvitationAlreadyProcessed
                | CompanyCandidateError::InvalidOwnershipTransition { .. } => {
                    ErrorKind::BusinessRule
                }
            },
            Self::Assignment(StageAssignmentError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Assignment(StageAssignmentError::Duplicate { .. }) => ErrorKind::Conflict,
            Self::Repository(error) => match error {
                RepositoryError::Conflict | RepositoryError::StaleVersion { .. } => {
                    ErrorKind::Conflict
                }
                RepositoryError::NotFound => ErrorKind::NotFound,
                RepositoryError::Unavailable(_) => ErrorKind::Unavailable,
            },
        }
    }
}
