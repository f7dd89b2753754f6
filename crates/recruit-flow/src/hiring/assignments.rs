use serde::{Deserialize, Serialize};

use super::ids::{PositionId, StageId, UserId};

/// Interviewers and reviewers attached to one stage of one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionStageAssignment {
    pub position_id: PositionId,
    pub stage_id: StageId,
    users: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageAssignmentError {
    #[error("user {user_id} is not assigned to stage {stage_id} of position {position_id}")]
    NotFound {
        position_id: PositionId,
        stage_id: StageId,
        user_id: UserId,
    },
    #[error("user {user_id} is already assigned to stage {stage_id} of position {position_id}")]
    Duplicate {
        position_id: PositionId,
        stage_id: StageId,
        user_id: UserId,
    },
}

impl PositionStageAssignment {
    pub fn new(position_id: PositionId, stage_id: StageId) -> Self {
        Self {
            position_id,
            stage_id,
            users: Vec::new(),
        }
    }

    /// Assigned users in insertion order.
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn assign(&mut self, user_id: UserId) -> Result<(), StageAssignmentError> {
        if self.users.contains(&user_id) {
            return Err(StageAssignmentError::Duplicate {
                position_id: self.position_id.clone(),
                stage_id: self.stage_id.clone(),
                user_id,
            });
        }
        self.users.push(user_id);
        Ok(())
    }

    pub fn unassign(&mut self, user_id: &UserId) -> Result<(), StageAssignmentError> {
        let Some(index) = self.users.iter().position(|assigned| assigned == user_id) else {
            return Err(StageAssignmentError::NotFound {
                position_id: self.position_id.clone(),
                stage_id: self.stage_id.clone(),
                user_id: user_id.clone(),
            });
        };
        self.users.remove(index);
        Ok(())
    }
}
