//! Candidate applications: opening them on a phase workflow, writing custom field values,
//! and moving them between stages.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationView, CandidateApplication, CompanyRegistration, FieldValuesUpdate,
    FieldVisibilityUpdate, OpenApplicationRequest, PhaseWorkflowAssignment, StageDraft,
    StageHistoryEntry, StageMoveOutcome, StageMoveRequest, WorkflowRegistration,
};
pub use repository::{
    ApplicationRepository, AssignmentRepository, CommittedTransition, CompanyCandidateRepository,
    CompanyRepository, HiringStore, OutboxRepository, PhaseRepository, PositionRepository,
    RepositoryError, WorkflowRepository,
};
pub use router::hiring_router;
pub use service::{ErrorKind, HiringError, HiringPipelineService};
