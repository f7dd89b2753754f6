use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ids::{CompanyId, StageId, WorkflowId};

/// Semantic role of a stage inside a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageType {
    Standard,
    Success,
    Fail,
    Review,
    /// Automated step; external automation reacts to the stage change event.
    Process,
}

impl StageType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Review => "review",
            Self::Process => "process",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

/// Where the stage is placed on the kanban board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KanbanDisplay {
    #[default]
    Column,
    Row,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStyle {
    pub icon: String,
    pub color: String,
    pub background_color: String,
}

impl Default for StageStyle {
    fn default() -> Self {
        Self {
            icon: "circle".to_string(),
            color: "#1f2937".to_string(),
            background_color: "#f3f4f6".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub workflow_id: WorkflowId,
    pub name: String,
    pub stage_type: StageType,
    pub order: u32,
    pub allow_skip: bool,
    #[serde(default)]
    pub style: StageStyle,
    #[serde(default)]
    pub kanban_display: KanbanDisplay,
}

impl Stage {
    pub fn new(
        id: impl Into<StageId>,
        workflow_id: impl Into<WorkflowId>,
        name: impl Into<String>,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            workflow_id: workflow_id.into(),
            name: name.into(),
            stage_type: StageType::Standard,
            order,
            allow_skip: false,
            style: StageStyle::default(),
            kanban_display: KanbanDisplay::default(),
        }
    }

    pub fn with_type(mut self, stage_type: StageType) -> Self {
        self.stage_type = stage_type;
        self
    }

    pub fn skippable(mut self, allow_skip: bool) -> Self {
        self.allow_skip = allow_skip;
        self
    }

    pub fn displayed_as(mut self, kanban_display: KanbanDisplay) -> Self {
        self.kanban_display = kanban_display;
        self
    }
}

/// Structural problems detected while assembling a workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("stage order {order} is used more than once in workflow {workflow_id}")]
    DuplicateOrder { workflow_id: WorkflowId, order: u32 },
    #[error("stage {stage_id} appears more than once in workflow {workflow_id}")]
    DuplicateStage {
        workflow_id: WorkflowId,
        stage_id: StageId,
    },
    #[error("stage {stage_id} belongs to workflow {found}, not {expected}")]
    ForeignStage {
        stage_id: StageId,
        expected: WorkflowId,
        found: WorkflowId,
    },
    #[error("stage name must not be empty")]
    EmptyStageName,
}

/// Non-fatal deviations from the conventional workflow shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConventionWarning {
    SuccessStageCount(usize),
    FailStageCount(usize),
}

impl ConventionWarning {
    pub fn describe(&self) -> String {
        match self {
            Self::SuccessStageCount(count) => {
                format!("expected exactly one SUCCESS stage, found {count}")
            }
            Self::FailStageCount(count) => {
                format!("expected exactly one FAIL stage, found {count}")
            }
        }
    }
}

/// An ordered collection of stages; the order defines forward progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub company_id: CompanyId,
    pub name: String,
    stages: Vec<Stage>,
}

impl Workflow {
    pub fn new(
        id: impl Into<WorkflowId>,
        company_id: CompanyId,
        name: impl Into<String>,
        mut stages: Vec<Stage>,
    ) -> Result<Self, WorkflowError> {
        let id = id.into();
        let mut seen_ids = HashSet::new();
        let mut seen_orders = HashSet::new();

        for stage in &stages {
            if stage.workflow_id != id {
                return Err(WorkflowError::ForeignStage {
                    stage_id: stage.id.clone(),
                    expected: id,
                    found: stage.workflow_id.clone(),
                });
            }
            if stage.name.trim().is_empty() {
                return Err(WorkflowError::EmptyStageName);
            }
            if !seen_ids.insert(stage.id.clone()) {
                return Err(WorkflowError::DuplicateStage {
                    workflow_id: id,
                    stage_id: stage.id.clone(),
                });
            }
            if !seen_orders.insert(stage.order) {
                return Err(WorkflowError::DuplicateOrder {
                    workflow_id: id,
                    order: stage.order,
                });
            }
        }

        stages.sort_by_key(|stage| stage.order);

        Ok(Self {
            id,
            company_id,
            name: name.into(),
            stages,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn first_stage(&self) -> Option<&Stage> {
        self.stages.first()
    }

    pub fn stage(&self, id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|stage| &stage.id == id)
    }

    /// Zero-based index of the stage in forward order.
    pub fn position_of(&self, id: &StageId) -> Option<usize> {
        self.stages.iter().position(|stage| &stage.id == id)
    }

    /// Stages strictly between `from` and `to` in forward direction.
    ///
    /// Returns an empty slice when `to` does not come after `from`.
    pub fn stages_between(&self, from: usize, to: usize) -> &[Stage] {
        if to <= from + 1 || to > self.stages.len() {
            return &[];
        }
        &self.stages[from + 1..to]
    }

    /// Replace a stage in place, keeping its slot in the ordering.
    pub(crate) fn replace_stage(&mut self, stage: Stage) -> Result<(), WorkflowError> {
        if stage.name.trim().is_empty() {
            return Err(WorkflowError::EmptyStageName);
        }
        if let Some(conflict) = self
            .stages
            .iter()
            .find(|existing| existing.order == stage.order && existing.id != stage.id)
        {
            return Err(WorkflowError::DuplicateOrder {
                workflow_id: self.id.clone(),
                order: conflict.order,
            });
        }
        if let Some(slot) = self.stages.iter_mut().find(|existing| existing.id == stage.id) {
            *slot = stage;
        }
        self.stages.sort_by_key(|stage| stage.order);
        Ok(())
    }

    pub fn convention_warnings(&self) -> Vec<ConventionWarning> {
        let count = |kind: StageType| {
            self.stages
                .iter()
                .filter(|stage| stage.stage_type == kind)
                .count()
        };

        let mut warnings = Vec::new();
        let success = count(StageType::Success);
        if success != 1 {
            warnings.push(ConventionWarning::SuccessStageCount(success));
        }
        let fail = count(StageType::Fail);
        if fail != 1 {
            warnings.push(ConventionWarning::FailStageCount(fail));
        }
        warnings
    }

    pub fn kanban_columns(&self) -> Vec<&Stage> {
        self.stages_displayed_as(KanbanDisplay::Column)
    }

    pub fn kanban_rows(&self) -> Vec<&Stage> {
        self.stages_displayed_as(KanbanDisplay::Row)
    }

    fn stages_displayed_as(&self, display: KanbanDisplay) -> Vec<&Stage> {
        self.stages
            .iter()
            .filter(|stage| stage.kanban_display == display)
            .collect()
    }
}
