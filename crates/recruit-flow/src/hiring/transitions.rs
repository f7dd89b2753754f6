//! Stage transition rules for applications moving through a workflow.
//!
//! Moving backward is always permitted. Moving forward to the next stage is permitted once
//! every field REQUIRED at the current stage is set; jumping further additionally requires
//! every stage in between to allow skipping. Initial placement behaves like a move from
//! before the first stage, without the required-field check.

use serde::Serialize;

use super::fields::{CustomField, FieldValues};
use super::ids::{StageId, WorkflowId};
use super::stages::{Stage, StageType, Workflow};
use super::visibility::VisibilityResolver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionKind {
    /// First placement of an application into the workflow.
    Initial { skipped: Vec<StageId> },
    Advance,
    Skip { skipped: Vec<StageId> },
    Backward,
}

impl TransitionKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::Advance => "advance",
            Self::Skip { .. } => "skip",
            Self::Backward => "backward",
        }
    }
}

/// Approved transition, ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub kind: TransitionKind,
    pub from: Option<StageId>,
    pub to: Stage,
}

impl TransitionPlan {
    /// PROCESS stages are handled by automation reacting to the change event.
    pub fn enters_process_stage(&self) -> bool {
        self.to.stage_type == StageType::Process
    }

    /// The target is a SUCCESS or FAIL stage.
    pub fn reaches_outcome(&self) -> bool {
        self.to.stage_type.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("stage {stage_id} is not part of workflow {workflow_id}")]
    StageNotInWorkflow {
        workflow_id: WorkflowId,
        stage_id: StageId,
    },
    #[error("application is already at stage {stage_id}")]
    AlreadyAtStage { stage_id: StageId },
    #[error("cannot skip stage {blocking} on the way to {to}")]
    SkipNotAllowed {
        from: Option<StageId>,
        to: StageId,
        blocking: StageId,
    },
    #[error("required fields missing at stage {stage_id}: {}", .fields.join(", "))]
    RequiredFieldsMissing {
        stage_id: StageId,
        fields: Vec<String>,
    },
}

/// Decides whether an application may move between two stages of a workflow.
#[derive(Debug, Clone, Copy)]
pub struct TransitionValidator<'a> {
    resolver: &'a VisibilityResolver,
}

impl<'a> TransitionValidator<'a> {
    pub fn new(resolver: &'a VisibilityResolver) -> Self {
        Self { resolver }
    }

    pub fn validate(
        &self,
        workflow: &Workflow,
        current: Option<&StageId>,
        target: &StageId,
        fields: &[CustomField],
        values: &FieldValues,
    ) -> Result<TransitionPlan, TransitionError> {
        let not_in_workflow = |stage_id: &StageId| TransitionError::StageNotInWorkflow {
            workflow_id: workflow.id.clone(),
            stage_id: stage_id.clone(),
        };

        let to_index = workflow
            .position_of(target)
            .ok_or_else(|| not_in_workflow(target))?;
        let to = workflow.stages()[to_index].clone();

        let Some(current) = current else {
            let skipped = self.ensure_skippable(&workflow.stages()[..to_index], None, target)?;
            return Ok(TransitionPlan {
                kind: TransitionKind::Initial { skipped },
                from: None,
                to,
            });
        };

        let from_index = workflow
            .position_of(current)
            .ok_or_else(|| not_in_workflow(current))?;

        if from_index == to_index {
            return Err(TransitionError::AlreadyAtStage {
                stage_id: target.clone(),
            });
        }

        if to_index < from_index {
            return Ok(TransitionPlan {
                kind: TransitionKind::Backward,
                from: Some(current.clone()),
                to,
            });
        }

        let missing = self.resolver.missing_required(current, fields, values);
        if !missing.is_empty() {
            return Err(TransitionError::RequiredFieldsMissing {
                stage_id: current.clone(),
                fields: missing,
            });
        }

        let between = workflow.stages_between(from_index, to_index);
        let kind = if between.is_empty() {
            TransitionKind::Advance
        } else {
            let skipped = self.ensure_skippable(between, Some(current), target)?;
            TransitionKind::Skip { skipped }
        };

        Ok(TransitionPlan {
            kind,
            from: Some(current.clone()),
            to,
        })
    }

    fn ensure_skippable(
        &self,
        stages: &[Stage],
        from: Option<&StageId>,
        to: &StageId,
    ) -> Result<Vec<StageId>, TransitionError> {
        if let Some(blocking) = stages.iter().find(|stage| !stage.allow_skip) {
            return Err(TransitionError::SkipNotAllowed {
                from: from.cloned(),
                to: to.clone(),
                blocking: blocking.id.clone(),
            });
        }
        Ok(stages.iter().map(|stage| stage.id.clone()).collect())
    }
}
