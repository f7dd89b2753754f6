use serde::{Deserialize, Serialize};

use super::ids::{CompanyId, PhaseId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefaultView {
    #[default]
    Kanban,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl PhaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    /// Lifecycle edges; nothing returns to DRAFT.
    pub const fn can_transition_to(self, next: PhaseStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active)
                | (Self::Draft, Self::Archived)
                | (Self::Active, Self::Archived)
                | (Self::Archived, Self::Active)
        )
    }
}

/// Company-level grouping of hiring work with its own lifecycle and display mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub company_id: CompanyId,
    pub name: String,
    pub sort_order: u32,
    pub default_view: DefaultView,
    pub status: PhaseStatus,
    pub objective: String,
}

/// Inbound payload for creating a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDraft {
    pub name: String,
    pub sort_order: u32,
    #[serde(default)]
    pub default_view: DefaultView,
    #[serde(default)]
    pub objective: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("sort order {sort_order} is already used by phase {existing} in company {company_id}")]
    DuplicateSortOrder {
        company_id: CompanyId,
        sort_order: u32,
        existing: PhaseId,
    },
    #[error("phase name must not be empty")]
    EmptyName,
    #[error("phase {phase_id} cannot move from {} to {}", .from.label(), .to.label())]
    InvalidStatusTransition {
        phase_id: PhaseId,
        from: PhaseStatus,
        to: PhaseStatus,
    },
}

impl Phase {
    /// Build a DRAFT phase after checking the company's existing sort orders.
    pub fn create(
        id: PhaseId,
        company_id: CompanyId,
        draft: PhaseDraft,
        existing: &[Phase],
    ) -> Result<Self, PhaseError> {
        if draft.name.trim().is_empty() {
            return Err(PhaseError::EmptyName);
        }

        if let Some(clash) = existing
            .iter()
            .find(|phase| phase.company_id == company_id && phase.sort_order == draft.sort_order)
        {
            return Err(PhaseError::DuplicateSortOrder {
                company_id,
                sort_order: draft.sort_order,
                existing: clash.id.clone(),
            });
        }

        Ok(Self {
            id,
            company_id,
            name: draft.name.trim().to_string(),
            sort_order: draft.sort_order,
            default_view: draft.default_view,
            status: PhaseStatus::Draft,
            objective: draft.objective,
        })
    }

    pub fn change_status(&mut self, next: PhaseStatus) -> Result<(), PhaseError> {
        if !self.status.can_transition_to(next) {
            return Err(PhaseError::InvalidStatusTransition {
                phase_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Sort phases for display: ascending `sort_order`.
pub fn order_phases(mut phases: Vec<Phase>) -> Vec<Phase> {
    phases.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
    phases
}
