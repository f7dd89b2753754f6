//! Mutex-guarded in-memory [`HiringStore`](super::applications::HiringStore), used by the
//! API binary and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::applications::domain::CandidateApplication;
use super::applications::repository::{
    ApplicationRepository, AssignmentRepository, CommittedTransition, CompanyCandidateRepository,
    CompanyRepository, OutboxRepository, PhaseRepository, PositionRepository, RepositoryError,
    WorkflowRepository,
};
use super::assignments::PositionStageAssignment;
use super::candidates::CompanyCandidate;
use super::events::{ApplicationStageChangedEvent, OutboxEntry};
use super::fields::{CustomField, FieldConfiguration};
use super::ids::{
    ApplicationId, CandidateId, CompanyCandidateId, CompanyId, CustomFieldId, PhaseId, PositionId,
    StageId, WorkflowId,
};
use super::phases::Phase;
use super::positions::{Company, JobPosition};
use super::stages::Workflow;

#[derive(Default)]
struct State {
    companies: BTreeMap<CompanyId, Company>,
    workflows: BTreeMap<WorkflowId, Workflow>,
    custom_fields: BTreeMap<CustomFieldId, CustomField>,
    field_configurations: BTreeMap<(StageId, CustomFieldId), FieldConfiguration>,
    phases: BTreeMap<PhaseId, Phase>,
    positions: BTreeMap<PositionId, JobPosition>,
    company_candidates: BTreeMap<CompanyCandidateId, CompanyCandidate>,
    applications: BTreeMap<ApplicationId, CandidateApplication>,
    /// Undelivered entries only; delivery removes them.
    outbox: BTreeMap<u64, OutboxEntry>,
    next_outbox_id: u64,
    delivered_outbox: usize,
    assignments: BTreeMap<(PositionId, StageId), PositionStageAssignment>,
}

#[derive(Default)]
pub struct InMemoryHiringStore {
    state: Mutex<State>,
}

impl InMemoryHiringStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries still awaiting delivery, oldest first.
    pub fn pending_outbox(&self) -> Result<Vec<OutboxEntry>, RepositoryError> {
        Ok(self.lock()?.outbox.values().cloned().collect())
    }

    pub fn delivered_outbox_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.delivered_outbox)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("hiring store mutex poisoned".to_string()))
    }
}

fn insert_new<K: Ord, V: Clone>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
) -> Result<V, RepositoryError> {
    if map.contains_key(&key) {
        return Err(RepositoryError::Conflict);
    }
    map.insert(key, value.clone());
    Ok(value)
}

fn replace_existing<K: Ord, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
) -> Result<(), RepositoryError> {
    match map.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

impl State {
    fn versioned_write(
        &mut self,
        mut application: CandidateApplication,
        expected_version: u64,
    ) -> Result<CandidateApplication, RepositoryError> {
        let stored = self
            .applications
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::StaleVersion {
                expected: expected_version,
                found: stored.version,
            });
        }
        application.version = expected_version + 1;
        *stored = application.clone();
        Ok(application)
    }
}

impl CompanyRepository for InMemoryHiringStore {
    fn insert_company(&self, company: Company) -> Result<Company, RepositoryError> {
        let mut state = self.lock()?;
        insert_new(&mut state.companies, company.id.clone(), company)
    }

    fn fetch_company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        Ok(self.lock()?.companies.get(id).cloned())
    }
}

impl WorkflowRepository for InMemoryHiringStore {
    fn insert_workflow(&self, workflow: Workflow) -> Result<Workflow, RepositoryError> {
        let mut state = self.lock()?;
        insert_new(&mut state.workflows, workflow.id.clone(), workflow)
    }

    fn update_workflow(&self, workflow: Workflow) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        replace_existing(&mut state.workflows, workflow.id.clone(), workflow)
    }

    fn fetch_workflow(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
        Ok(self.lock()?.workflows.get(id).cloned())
    }

    fn insert_custom_field(&self, field: CustomField) -> Result<CustomField, RepositoryError> {
        let mut state = self.lock()?;
        let clash = state.custom_fields.values().any(|existing| {
            existing.workflow_id == field.workflow_id && existing.field_key == field.field_key
        });
        if clash {
            return Err(RepositoryError::Conflict);
        }
        insert_new(&mut state.custom_fields, field.id.clone(), field)
    }

    fn fetch_custom_field(
        &self,
        id: &CustomFieldId,
    ) -> Result<Option<CustomField>, RepositoryError> {
        Ok(self.lock()?.custom_fields.get(id).cloned())
    }

    fn custom_fields(&self, workflow_id: &WorkflowId) -> Result<Vec<CustomField>, RepositoryError> {
        Ok(self
            .lock()?
            .custom_fields
            .values()
            .filter(|field| &field.workflow_id == workflow_id)
            .cloned()
            .collect())
    }

    fn upsert_field_configuration(
        &self,
        configuration: FieldConfiguration,
    ) -> Result<(), RepositoryError> {
        let key = (
            configuration.stage_id.clone(),
            configuration.custom_field_id.clone(),
        );
        self.lock()?.field_configurations.insert(key, configuration);
        Ok(())
    }

    fn field_configurations(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<FieldConfiguration>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .field_configurations
            .values()
            .filter(|configuration| {
                state
                    .custom_fields
                    .get(&configuration.custom_field_id)
                    .is_some_and(|field| &field.workflow_id == workflow_id)
            })
            .cloned()
            .collect())
    }
}

impl PhaseRepository for InMemoryHiringStore {
    fn insert_phase(&self, phase: Phase) -> Result<Phase, RepositoryError> {
        let mut state = self.lock()?;
        let clash = state.phases.values().any(|existing| {
            existing.company_id == phase.company_id && existing.sort_order == phase.sort_order
        });
        if clash {
            return Err(RepositoryError::Conflict);
        }
        insert_new(&mut state.phases, phase.id.clone(), phase)
    }

    fn update_phase(&self, phase: Phase) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        replace_existing(&mut state.phases, phase.id.clone(), phase)
    }

    fn fetch_phase(&self, id: &PhaseId) -> Result<Option<Phase>, RepositoryError> {
        Ok(self.lock()?.phases.get(id).cloned())
    }

    fn phases_for_company(&self, company_id: &CompanyId) -> Result<Vec<Phase>, RepositoryError> {
        Ok(self
            .lock()?
            .phases
            .values()
            .filter(|phase| &phase.company_id == company_id)
            .cloned()
            .collect())
    }
}

impl PositionRepository for InMemoryHiringStore {
    fn insert_position(&self, position: JobPosition) -> Result<JobPosition, RepositoryError> {
        let mut state = self.lock()?;
        insert_new(&mut state.positions, position.id.clone(), position)
    }

    fn update_position(&self, position: JobPosition) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        replace_existing(&mut state.positions, position.id.clone(), position)
    }

    fn fetch_position(&self, id: &PositionId) -> Result<Option<JobPosition>, RepositoryError> {
        Ok(self.lock()?.positions.get(id).cloned())
    }

    fn positions(&self) -> Result<Vec<JobPosition>, RepositoryError> {
        Ok(self.lock()?.positions.values().cloned().collect())
    }
}

impl CompanyCandidateRepository for InMemoryHiringStore {
    fn insert_company_candidate(
        &self,
        candidate: CompanyCandidate,
    ) -> Result<CompanyCandidate, RepositoryError> {
        let mut state = self.lock()?;
        let clash = state.company_candidates.values().any(|existing| {
            existing.candidate_id == candidate.candidate_id
                && existing.company_id == candidate.company_id
        });
        if clash {
            return Err(RepositoryError::Conflict);
        }
        insert_new(&mut state.company_candidates, candidate.id.clone(), candidate)
    }

    fn update_company_candidate(&self, candidate: CompanyCandidate) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        replace_existing(&mut state.company_candidates, candidate.id.clone(), candidate)
    }

    fn fetch_company_candidate(
        &self,
        id: &CompanyCandidateId,
    ) -> Result<Option<CompanyCandidate>, RepositoryError> {
        Ok(self.lock()?.company_candidates.get(id).cloned())
    }

    fn find_company_candidate(
        &self,
        candidate_id: &CandidateId,
        company_id: &CompanyId,
    ) -> Result<Option<CompanyCandidate>, RepositoryError> {
        Ok(self
            .lock()?
            .company_candidates
            .values()
            .find(|existing| {
                &existing.candidate_id == candidate_id && &existing.company_id == company_id
            })
            .cloned())
    }
}

impl ApplicationRepository for InMemoryHiringStore {
    fn insert_application(
        &self,
        application: CandidateApplication,
    ) -> Result<CandidateApplication, RepositoryError> {
        let mut state = self.lock()?;
        insert_new(&mut state.applications, application.id.clone(), application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<CandidateApplication>, RepositoryError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn update_application(
        &self,
        application: CandidateApplication,
        expected_version: u64,
    ) -> Result<CandidateApplication, RepositoryError> {
        self.lock()?.versioned_write(application, expected_version)
    }

    fn commit_transition(
        &self,
        application: CandidateApplication,
        expected_version: u64,
        event: ApplicationStageChangedEvent,
        recorded_at: DateTime<Utc>,
    ) -> Result<CommittedTransition, RepositoryError> {
        let mut state = self.lock()?;
        let application = state.versioned_write(application, expected_version)?;

        state.next_outbox_id += 1;
        let outbox = OutboxEntry {
            id: state.next_outbox_id,
            event,
            recorded_at,
            attempts: 0,
            delivered_at: None,
            last_error: None,
        };
        state.outbox.insert(outbox.id, outbox.clone());

        Ok(CommittedTransition {
            application,
            outbox,
        })
    }

    fn count_at_stage(&self, stage_id: &StageId) -> Result<usize, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .filter(|application| application.stage_id.as_ref() == Some(stage_id))
            .count())
    }
}

impl OutboxRepository for InMemoryHiringStore {
    fn pending_events(&self, limit: usize) -> Result<Vec<OutboxEntry>, RepositoryError> {
        Ok(self.lock()?.outbox.values().take(limit).cloned().collect())
    }

    fn mark_delivered(&self, id: u64, _delivered_at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.outbox.remove(&id).ok_or(RepositoryError::NotFound)?;
        state.delivered_outbox += 1;
        Ok(())
    }

    fn record_failure(&self, id: u64, error: String) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let entry = state.outbox.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        entry.attempts += 1;
        entry.last_error = Some(error);
        Ok(())
    }
}

impl AssignmentRepository for InMemoryHiringStore {
    fn fetch_assignment(
        &self,
        position_id: &PositionId,
        stage_id: &StageId,
    ) -> Result<Option<PositionStageAssignment>, RepositoryError> {
        Ok(self
            .lock()?
            .assignments
            .get(&(position_id.clone(), stage_id.clone()))
            .cloned())
    }

    fn save_assignment(&self, assignment: PositionStageAssignment) -> Result<(), RepositoryError> {
        let key = (assignment.position_id.clone(), assignment.stage_id.clone());
        self.lock()?.assignments.insert(key, assignment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hiring::fields::FieldValues;

    fn application(version: u64) -> CandidateApplication {
        CandidateApplication {
            id: ApplicationId::new("app-1"),
            company_candidate_id: CompanyCandidateId::new("cc-1"),
            candidate_id: CandidateId::new("cand-1"),
            position_id: PositionId::new("pos-1"),
            phase_id: PhaseId::new("p1"),
            workflow_id: WorkflowId::new("wf-1"),
            stage_id: None,
            field_values: FieldValues::new(),
            version,
            history: Vec::new(),
        }
    }

    #[test]
    fn versioned_update_rejects_stale_writes() {
        let store = InMemoryHiringStore::new();
        store.insert_application(application(0)).expect("insert");

        let first = store
            .update_application(application(0), 0)
            .expect("first writer wins");
        assert_eq!(first.version, 1);

        assert_eq!(
            store.update_application(application(0), 0),
            Err(RepositoryError::StaleVersion {
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn duplicate_company_candidate_pair_conflicts() {
        use crate::hiring::candidates::{CandidateContact, CompanyCandidateDraft};

        let draft = CompanyCandidateDraft {
            candidate_id: CandidateId::new("cand-1"),
            company_id: CompanyId::new("acme"),
            contact: CandidateContact {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
            phase_id: None,
            cv_file: None,
        };
        let store = InMemoryHiringStore::new();
        store
            .insert_company_candidate(
                CompanyCandidate::create(CompanyCandidateId::new("cc-1"), draft.clone())
                    .expect("valid"),
            )
            .expect("insert");

        let second = CompanyCandidate::create(CompanyCandidateId::new("cc-2"), draft).expect("valid");
        assert_eq!(
            store.insert_company_candidate(second),
            Err(RepositoryError::Conflict)
        );
    }

    fn stage_change(application_id: &str) -> ApplicationStageChangedEvent {
        use crate::hiring::events::StageChangeDraft;

        ApplicationStageChangedEvent::new(StageChangeDraft {
            application_id: ApplicationId::new(application_id),
            candidate_id: CandidateId::new("cand-1"),
            workflow_id: WorkflowId::new("wf-1"),
            previous_stage_id: None,
            new_stage_id: StageId::new("s1"),
            new_stage_name: "Applied".to_string(),
            candidate_email: "ada@example.com".to_string(),
            candidate_name: "Ada".to_string(),
            position_title: "Backend Engineer".to_string(),
            company_name: "Acme".to_string(),
            changed_at: Utc::now(),
            changed_by_user_id: None,
        })
        .expect("valid event")
    }

    #[test]
    fn delivered_outbox_entries_leave_the_pending_set() {
        let store = InMemoryHiringStore::new();
        store.insert_application(application(0)).expect("insert");
        let first = store
            .commit_transition(application(0), 0, stage_change("app-1"), Utc::now())
            .expect("first commit");
        let second = store
            .commit_transition(application(1), 1, stage_change("app-1"), Utc::now())
            .expect("second commit");

        store
            .mark_delivered(first.outbox.id, Utc::now())
            .expect("delivered");
        store
            .record_failure(second.outbox.id, "broker offline".to_string())
            .expect("failure recorded");

        let pending = store.pending_events(10).expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.outbox.id);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(store.delivered_outbox_count().expect("count"), 1);
        assert_eq!(
            store.mark_delivered(first.outbox.id, Utc::now()),
            Err(RepositoryError::NotFound)
        );
    }

    #[test]
    fn dispatcher_works_over_trait_objects() {
        use crate::hiring::events::{
            BroadcastStageEventPublisher, OutboxDispatcher, StageEventPublisher,
        };
        use std::sync::Arc;

        let concrete = Arc::new(InMemoryHiringStore::new());
        concrete.insert_application(application(0)).expect("insert");
        concrete
            .commit_transition(application(0), 0, stage_change("app-1"), Utc::now())
            .expect("commit");

        let store: Arc<dyn OutboxRepository> = concrete.clone();
        let publisher: Arc<dyn StageEventPublisher> =
            Arc::new(BroadcastStageEventPublisher::default());
        let report = OutboxDispatcher::new(store, publisher, 10)
            .dispatch_pending()
            .expect("dispatch");

        assert_eq!(report.delivered, 1);
        assert!(concrete.pending_outbox().expect("pending").is_empty());
    }
}
