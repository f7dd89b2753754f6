//! Job positions and the phase → workflow mapping that decides which workflow governs an
//! application.
//!
//! Positions created before phase-keyed workflows carry a single `legacy_workflow_id`.
//! Those must be migrated with [`LegacyWorkflowMigration`] before resolution runs; the
//! resolver refuses to guess for unmigrated positions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::{CompanyId, PhaseId, PositionId, WorkflowId};
use super::phases::{Phase, PhaseStatus};
use super::stages::Workflow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosition {
    pub id: PositionId,
    pub company_id: CompanyId,
    pub title: String,
    #[serde(default)]
    pub phase_workflows: BTreeMap<PhaseId, WorkflowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_workflow_id: Option<WorkflowId>,
}

impl JobPosition {
    pub fn new(id: PositionId, company_id: CompanyId, title: impl Into<String>) -> Self {
        Self {
            id,
            company_id,
            title: title.into(),
            phase_workflows: BTreeMap::new(),
            legacy_workflow_id: None,
        }
    }

    pub fn is_unmigrated(&self) -> bool {
        self.legacy_workflow_id.is_some() && self.phase_workflows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("position {position_id} still uses a legacy workflow reference; run the phase workflow migration first")]
    UnmigratedPosition { position_id: PositionId },
    #[error("phase {phase_id} belongs to company {phase_company}, position {position_id} to {position_company}")]
    PhaseCompanyMismatch {
        position_id: PositionId,
        phase_id: PhaseId,
        phase_company: CompanyId,
        position_company: CompanyId,
    },
    #[error("workflow {workflow_id} belongs to company {workflow_company}, position {position_id} to {position_company}")]
    WorkflowCompanyMismatch {
        position_id: PositionId,
        workflow_id: WorkflowId,
        workflow_company: CompanyId,
        position_company: CompanyId,
    },
    #[error("phase {phase_id} is archived")]
    ArchivedPhase { phase_id: PhaseId },
    #[error("position {position_id} references unknown workflow {workflow_id}")]
    UnknownWorkflow {
        position_id: PositionId,
        workflow_id: WorkflowId,
    },
}

/// Workflow governing the given phase of a position, if one is mapped.
pub fn resolve_workflow(
    position: &JobPosition,
    phase_id: &PhaseId,
) -> Result<Option<WorkflowId>, ResolutionError> {
    if position.is_unmigrated() {
        return Err(ResolutionError::UnmigratedPosition {
            position_id: position.id.clone(),
        });
    }
    Ok(position.phase_workflows.get(phase_id).cloned())
}

/// Record a phase → workflow mapping after checking both ends belong to the position's company.
pub fn assign_phase_workflow(
    position: &mut JobPosition,
    phase: &Phase,
    workflow: &Workflow,
) -> Result<(), ResolutionError> {
    if position.is_unmigrated() {
        return Err(ResolutionError::UnmigratedPosition {
            position_id: position.id.clone(),
        });
    }
    if phase.company_id != position.company_id {
        return Err(ResolutionError::PhaseCompanyMismatch {
            position_id: position.id.clone(),
            phase_id: phase.id.clone(),
            phase_company: phase.company_id.clone(),
            position_company: position.company_id.clone(),
        });
    }
    if workflow.company_id != position.company_id {
        return Err(ResolutionError::WorkflowCompanyMismatch {
            position_id: position.id.clone(),
            workflow_id: workflow.id.clone(),
            workflow_company: workflow.company_id.clone(),
            position_company: position.company_id.clone(),
        });
    }
    if phase.status == PhaseStatus::Archived {
        return Err(ResolutionError::ArchivedPhase {
            phase_id: phase.id.clone(),
        });
    }

    position
        .phase_workflows
        .insert(phase.id.clone(), workflow.id.clone());
    Ok(())
}

/// Outcome of one migration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub version: u32,
    pub migrated: Vec<PositionId>,
    /// Positions without a legacy reference.
    pub skipped: Vec<PositionId>,
    /// Legacy positions whose company has no draft or active phase yet. Left untouched.
    pub pending: Vec<PositionId>,
    /// Legacy positions whose workflow cannot be mapped. Left untouched.
    pub failed: Vec<MigrationFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationFailure {
    pub position_id: PositionId,
    pub reason: String,
}

/// Backfills `phase_workflows` from the single legacy workflow reference.
///
/// The legacy workflow is mapped to every non-archived phase of the position's company
/// that has no mapping yet, with the same checks as [`assign_phase_workflow`]. The legacy
/// reference is cleared only once a phase carries a mapping; positions that fail a check
/// or have no eligible phase keep it and stay unresolvable. Running the step twice is
/// harmless.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyWorkflowMigration;

impl LegacyWorkflowMigration {
    pub const VERSION: u32 = 1;

    pub fn apply(
        &self,
        positions: &mut [JobPosition],
        phases: &[Phase],
        workflows: &[Workflow],
    ) -> MigrationReport {
        let mut report = MigrationReport {
            version: Self::VERSION,
            ..MigrationReport::default()
        };

        for position in positions.iter_mut() {
            let Some(legacy) = position.legacy_workflow_id.clone() else {
                report.skipped.push(position.id.clone());
                continue;
            };

            match Self::backfill(position, &legacy, phases, workflows) {
                Ok(Some(staged)) => {
                    *position = staged;
                    report.migrated.push(position.id.clone());
                }
                Ok(None) => report.pending.push(position.id.clone()),
                Err(error) => report.failed.push(MigrationFailure {
                    position_id: position.id.clone(),
                    reason: error.to_string(),
                }),
            }
        }

        report
    }

    /// Mapped copy of `position`, or `None` when no phase can take the workflow yet.
    fn backfill(
        position: &JobPosition,
        legacy: &WorkflowId,
        phases: &[Phase],
        workflows: &[Workflow],
    ) -> Result<Option<JobPosition>, ResolutionError> {
        let workflow = workflows
            .iter()
            .find(|workflow| &workflow.id == legacy)
            .ok_or_else(|| ResolutionError::UnknownWorkflow {
                position_id: position.id.clone(),
                workflow_id: legacy.clone(),
            })?;
        if workflow.company_id != position.company_id {
            return Err(ResolutionError::WorkflowCompanyMismatch {
                position_id: position.id.clone(),
                workflow_id: workflow.id.clone(),
                workflow_company: workflow.company_id.clone(),
                position_company: position.company_id.clone(),
            });
        }

        let mut staged = JobPosition {
            legacy_workflow_id: None,
            ..position.clone()
        };
        let mut eligible = 0;
        for phase in phases.iter().filter(|phase| {
            phase.company_id == position.company_id && phase.status != PhaseStatus::Archived
        }) {
            eligible += 1;
            if !staged.phase_workflows.contains_key(&phase.id) {
                assign_phase_workflow(&mut staged, phase, workflow)?;
            }
        }

        Ok((eligible > 0).then_some(staged))
    }
}
