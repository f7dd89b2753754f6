//! Stage change events and their delivery.
//!
//! The pipeline service records every [`ApplicationStageChangedEvent`] in the outbox within
//! the same repository commit as the stage change, then publishes immediately. A failed
//! publish leaves the entry pending for [`OutboxDispatcher`]; it never undoes the move.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::applications::repository::{OutboxRepository, RepositoryError};
use super::ids::{ApplicationId, CandidateId, StageId, UserId, WorkflowId};

/// Fully denormalized payload so consumers never read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StageChangeDraft")]
pub struct ApplicationStageChangedEvent {
    pub application_id: ApplicationId,
    pub candidate_id: CandidateId,
    pub workflow_id: WorkflowId,
    pub previous_stage_id: Option<StageId>,
    pub new_stage_id: StageId,
    pub new_stage_name: String,
    pub candidate_email: String,
    pub candidate_name: String,
    pub position_title: String,
    pub company_name: String,
    pub changed_at: DateTime<Utc>,
    pub changed_by_user_id: Option<UserId>,
}

/// Unvalidated event fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StageChangeDraft {
    pub application_id: ApplicationId,
    pub candidate_id: CandidateId,
    pub workflow_id: WorkflowId,
    #[serde(default)]
    pub previous_stage_id: Option<StageId>,
    pub new_stage_id: StageId,
    pub new_stage_name: String,
    pub candidate_email: String,
    pub candidate_name: String,
    pub position_title: String,
    pub company_name: String,
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub changed_by_user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("{field} must not be empty")]
    MissingField { field: &'static str },
}

impl ApplicationStageChangedEvent {
    pub const NAME: &'static str = "application.stage_changed";

    pub fn new(draft: StageChangeDraft) -> Result<Self, EventError> {
        let required = [
            ("application_id", draft.application_id.is_blank()),
            ("candidate_id", draft.candidate_id.is_blank()),
            ("workflow_id", draft.workflow_id.is_blank()),
            ("new_stage_id", draft.new_stage_id.is_blank()),
            ("candidate_email", draft.candidate_email.trim().is_empty()),
        ];
        if let Some(&(field, _)) = required.iter().find(|(_, blank)| *blank) {
            return Err(EventError::MissingField { field });
        }

        Ok(Self {
            application_id: draft.application_id,
            candidate_id: draft.candidate_id,
            workflow_id: draft.workflow_id,
            previous_stage_id: draft.previous_stage_id,
            new_stage_id: draft.new_stage_id,
            new_stage_name: draft.new_stage_name,
            candidate_email: draft.candidate_email,
            candidate_name: draft.candidate_name,
            position_title: draft.position_title,
            company_name: draft.company_name,
            changed_at: draft.changed_at,
            changed_by_user_id: draft.changed_by_user_id,
        })
    }
}

impl TryFrom<StageChangeDraft> for ApplicationStageChangedEvent {
    type Error = EventError;

    fn try_from(draft: StageChangeDraft) -> Result<Self, Self::Error> {
        Self::new(draft)
    }
}

/// Outbound hook for notification and activity-log consumers.
pub trait StageEventPublisher: Send + Sync {
    fn publish(&self, event: &ApplicationStageChangedEvent) -> Result<(), PublishError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out over a `tokio::sync::broadcast` channel.
///
/// Publishing with no live subscribers succeeds; the event is simply dropped.
pub struct BroadcastStageEventPublisher {
    sender: broadcast::Sender<ApplicationStageChangedEvent>,
}

impl BroadcastStageEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ApplicationStageChangedEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastStageEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl StageEventPublisher for BroadcastStageEventPublisher {
    fn publish(&self, event: &ApplicationStageChangedEvent) -> Result<(), PublishError> {
        let receivers = self.sender.send(event.clone()).unwrap_or(0);
        debug!(
            application_id = %event.application_id,
            receivers,
            "stage change broadcast"
        );
        Ok(())
    }
}

/// Persisted event awaiting (or done with) delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboxEntry {
    pub id: u64,
    pub event: ApplicationStageChangedEvent,
    pub recorded_at: DateTime<Utc>,
    pub attempts: u32,
    pub delivered_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl OutboxEntry {
    pub fn is_pending(&self) -> bool {
        self.delivered_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Re-delivers pending outbox entries; at-least-once.
pub struct OutboxDispatcher<S: ?Sized, P: ?Sized> {
    store: Arc<S>,
    publisher: Arc<P>,
    batch: usize,
}

impl<S, P> OutboxDispatcher<S, P>
where
    S: OutboxRepository + ?Sized,
    P: StageEventPublisher + ?Sized,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, batch: usize) -> Self {
        Self {
            store,
            publisher,
            batch: batch.max(1),
        }
    }

    pub fn dispatch_pending(&self) -> Result<DispatchReport, RepositoryError> {
        let mut report = DispatchReport::default();

        for entry in self.store.pending_events(self.batch)? {
            match self.publisher.publish(&entry.event) {
                Ok(()) => {
                    self.store.mark_delivered(entry.id, Utc::now())?;
                    report.delivered += 1;
                }
                Err(error) => {
                    warn!(
                        outbox_id = entry.id,
                        attempts = entry.attempts + 1,
                        %error,
                        "stage change redelivery failed"
                    );
                    self.store.record_failure(entry.id, error.to_string())?;
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
