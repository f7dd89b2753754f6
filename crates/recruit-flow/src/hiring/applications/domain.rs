use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hiring::events::ApplicationStageChangedEvent;
use crate::hiring::fields::{FieldValues, FieldVisibility};
use crate::hiring::ids::{
    ApplicationId, CandidateId, CompanyCandidateId, CompanyId, PhaseId, PositionId, StageId,
    UserId, WorkflowId,
};
use crate::hiring::stages::{KanbanDisplay, Stage, StageType, Workflow, WorkflowError};
use crate::hiring::transitions::TransitionKind;

/// A company candidate's progress through the workflow of one position phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateApplication {
    pub id: ApplicationId,
    pub company_candidate_id: CompanyCandidateId,
    pub candidate_id: CandidateId,
    pub position_id: PositionId,
    pub phase_id: PhaseId,
    pub workflow_id: WorkflowId,
    /// `None` until the first placement.
    pub stage_id: Option<StageId>,
    #[serde(default)]
    pub field_values: FieldValues,
    /// Incremented on every committed write; guards concurrent moves.
    pub version: u64,
    #[serde(default)]
    pub history: Vec<StageHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub from: Option<StageId>,
    pub to: StageId,
    pub kind: String,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<UserId>,
}

impl CandidateApplication {
    pub fn view(&self, stage_name: Option<String>) -> ApplicationView {
        ApplicationView {
            application_id: self.id.clone(),
            candidate_id: self.candidate_id.clone(),
            position_id: self.position_id.clone(),
            phase_id: self.phase_id.clone(),
            workflow_id: self.workflow_id.clone(),
            stage_id: self.stage_id.clone(),
            stage_name,
            version: self.version,
            field_values: self.field_values.clone(),
            transitions: self.history.len(),
        }
    }
}

/// Body of `POST /api/v1/applications`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenApplicationRequest {
    pub company_candidate_id: CompanyCandidateId,
    pub position_id: PositionId,
    pub phase_id: PhaseId,
}

/// Body of `POST /api/v1/applications/:id/stage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMoveRequest {
    pub target_stage_id: StageId,
    #[serde(default)]
    pub changed_by: Option<UserId>,
}

/// Body of `PUT /api/v1/applications/:id/fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValuesUpdate {
    pub values: FieldValues,
}

/// Result of a committed stage move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMoveOutcome {
    pub application: CandidateApplication,
    pub transition: TransitionKind,
    pub event: ApplicationStageChangedEvent,
    /// `false` when the immediate publish failed and the outbox will retry.
    pub delivered: bool,
}

/// Sanitized representation returned by the HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationView {
    pub application_id: ApplicationId,
    pub candidate_id: CandidateId,
    pub position_id: PositionId,
    pub phase_id: PhaseId,
    pub workflow_id: WorkflowId,
    pub stage_id: Option<StageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,
    pub version: u64,
    pub field_values: FieldValues,
    pub transitions: usize,
}

/// Inbound payload for registering a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRegistration {
    pub id: CompanyId,
    pub name: String,
}

/// One stage of a workflow submitted over HTTP; the workflow id comes from the enclosing
/// registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDraft {
    pub id: StageId,
    pub name: String,
    pub order: u32,
    #[serde(default)]
    pub stage_type: Option<StageType>,
    #[serde(default)]
    pub allow_skip: bool,
    #[serde(default)]
    pub kanban_display: KanbanDisplay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRegistration {
    pub id: WorkflowId,
    pub company_id: CompanyId,
    pub name: String,
    pub stages: Vec<StageDraft>,
}

impl WorkflowRegistration {
    pub fn into_workflow(self) -> Result<Workflow, WorkflowError> {
        let workflow_id = self.id;
        let stages = self
            .stages
            .into_iter()
            .map(|draft| {
                Stage::new(draft.id, workflow_id.clone(), draft.name, draft.order)
                    .with_type(draft.stage_type.unwrap_or(StageType::Standard))
                    .skippable(draft.allow_skip)
                    .displayed_as(draft.kanban_display)
            })
            .collect();
        Workflow::new(workflow_id, self.company_id, self.name, stages)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVisibilityUpdate {
    pub visibility: FieldVisibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseWorkflowAssignment {
    pub workflow_id: WorkflowId,
}
