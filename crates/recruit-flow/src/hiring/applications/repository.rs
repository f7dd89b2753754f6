use chrono::{DateTime, Utc};

use super::domain::CandidateApplication;
use crate::hiring::assignments::PositionStageAssignment;
use crate::hiring::candidates::CompanyCandidate;
use crate::hiring::events::{ApplicationStageChangedEvent, OutboxEntry};
use crate::hiring::fields::{CustomField, FieldConfiguration};
use crate::hiring::ids::{
    ApplicationId, CandidateId, CompanyCandidateId, CompanyId, CustomFieldId, PhaseId, PositionId,
    StageId, WorkflowId,
};
use crate::hiring::phases::Phase;
use crate::hiring::positions::{Company, JobPosition};
use crate::hiring::stages::Workflow;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record was modified concurrently (expected version {expected}, found {found})")]
    StaleVersion { expected: u64, found: u64 },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub trait CompanyRepository: Send + Sync {
    fn insert_company(&self, company: Company) -> Result<Company, RepositoryError>;
    fn fetch_company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError>;
}

/// Workflows together with their custom fields and per-stage field configuration.
pub trait WorkflowRepository: Send + Sync {
    fn insert_workflow(&self, workflow: Workflow) -> Result<Workflow, RepositoryError>;
    fn update_workflow(&self, workflow: Workflow) -> Result<(), RepositoryError>;
    fn fetch_workflow(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError>;

    fn insert_custom_field(&self, field: CustomField) -> Result<CustomField, RepositoryError>;
    fn fetch_custom_field(&self, id: &CustomFieldId)
        -> Result<Option<CustomField>, RepositoryError>;
    fn custom_fields(&self, workflow_id: &WorkflowId) -> Result<Vec<CustomField>, RepositoryError>;

    /// Insert or replace the row for `(stage_id, custom_field_id)`.
    fn upsert_field_configuration(
        &self,
        configuration: FieldConfiguration,
    ) -> Result<(), RepositoryError>;
    fn field_configurations(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<FieldConfiguration>, RepositoryError>;
}

pub trait PhaseRepository: Send + Sync {
    fn insert_phase(&self, phase: Phase) -> Result<Phase, RepositoryError>;
    fn update_phase(&self, phase: Phase) -> Result<(), RepositoryError>;
    fn fetch_phase(&self, id: &PhaseId) -> Result<Option<Phase>, RepositoryError>;
    fn phases_for_company(&self, company_id: &CompanyId) -> Result<Vec<Phase>, RepositoryError>;
}

pub trait PositionRepository: Send + Sync {
    fn insert_position(&self, position: JobPosition) -> Result<JobPosition, RepositoryError>;
    fn update_position(&self, position: JobPosition) -> Result<(), RepositoryError>;
    fn fetch_position(&self, id: &PositionId) -> Result<Option<JobPosition>, RepositoryError>;
    fn positions(&self) -> Result<Vec<JobPosition>, RepositoryError>;
}

pub trait CompanyCandidateRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the (candidate, company) pair exists.
    fn insert_company_candidate(
        &self,
        candidate: CompanyCandidate,
    ) -> Result<CompanyCandidate, RepositoryError>;
    fn update_company_candidate(&self, candidate: CompanyCandidate) -> Result<(), RepositoryError>;
    fn fetch_company_candidate(
        &self,
        id: &CompanyCandidateId,
    ) -> Result<Option<CompanyCandidate>, RepositoryError>;
    fn find_company_candidate(
        &self,
        candidate_id: &CandidateId,
        company_id: &CompanyId,
    ) -> Result<Option<CompanyCandidate>, RepositoryError>;
}

/// Stage change persisted together with its outbox entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedTransition {
    pub application: CandidateApplication,
    pub outbox: OutboxEntry,
}

pub trait ApplicationRepository: Send + Sync {
    fn insert_application(
        &self,
        application: CandidateApplication,
    ) -> Result<CandidateApplication, RepositoryError>;
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<CandidateApplication>, RepositoryError>;

    /// Store `application` if the stored version still equals `expected_version`.
    ///
    /// The stored copy receives `expected_version + 1`.
    fn update_application(
        &self,
        application: CandidateApplication,
        expected_version: u64,
    ) -> Result<CandidateApplication, RepositoryError>;

    /// Versioned update plus outbox append in one atomic write.
    fn commit_transition(
        &self,
        application: CandidateApplication,
        expected_version: u64,
        event: ApplicationStageChangedEvent,
        recorded_at: DateTime<Utc>,
    ) -> Result<CommittedTransition, RepositoryError>;

    fn count_at_stage(&self, stage_id: &StageId) -> Result<usize, RepositoryError>;
}

pub trait OutboxRepository: Send + Sync {
    /// Undelivered entries, oldest first.
    fn pending_events(&self, limit: usize) -> Result<Vec<OutboxEntry>, RepositoryError>;
    /// Delivered entries never come back from `pending_events`.
    fn mark_delivered(&self, id: u64, delivered_at: DateTime<Utc>) -> Result<(), RepositoryError>;
    fn record_failure(&self, id: u64, error: String) -> Result<(), RepositoryError>;
}

pub trait AssignmentRepository: Send + Sync {
    fn fetch_assignment(
        &self,
        position_id: &PositionId,
        stage_id: &StageId,
    ) -> Result<Option<PositionStageAssignment>, RepositoryError>;
    fn save_assignment(&self, assignment: PositionStageAssignment) -> Result<(), RepositoryError>;
}

/// Everything the pipeline service persists.
pub trait HiringStore:
    CompanyRepository
    + WorkflowRepository
    + PhaseRepository
    + PositionRepository
    + CompanyCandidateRepository
    + ApplicationRepository
    + OutboxRepository
    + AssignmentRepository
{
}

impl<T> HiringStore for T where
    T: CompanyRepository
        + WorkflowRepository
        + PhaseRepository
        + PositionRepository
        + CompanyCandidateRepository
        + ApplicationRepository
        + OutboxRepository
        + AssignmentRepository
{
}
