use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::config::HiringConfig;
use crate::hiring::applications::{
    hiring_router, CandidateApplication, HiringPipelineService, OpenApplicationRequest,
};
use crate::hiring::candidates::{CandidateContact, CompanyCandidateDraft};
use crate::hiring::events::{ApplicationStageChangedEvent, PublishError, StageEventPublisher};
use crate::hiring::fields::{
    CustomFieldDraft, FieldConfig, FieldConfiguration, FieldType, FieldVisibility,
};
use crate::hiring::ids::{CandidateId, CompanyCandidateId, CompanyId, PhaseId, PositionId, StageId};
use crate::hiring::memory::InMemoryHiringStore;
use crate::hiring::phases::{DefaultView, PhaseDraft, PhaseStatus};
use crate::hiring::positions::JobPosition;
use crate::hiring::stages::{Stage, StageType, Workflow};

pub(super) const COMPANY: &str = "acme";
pub(super) const WORKFLOW: &str = "wf-eng";
pub(super) const POSITION: &str = "pos-backend";

pub(super) type Service = HiringPipelineService<InMemoryHiringStore, RecordingPublisher>;

#[derive(Default)]
pub(super) struct RecordingPublisher {
    events: Mutex<Vec<ApplicationStageChangedEvent>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub(super) fn events(&self) -> Vec<ApplicationStageChangedEvent> {
        self.events.lock().expect("publisher mutex poisoned").clone()
    }

    pub(super) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl StageEventPublisher for RecordingPublisher {
    fn publish(&self, event: &ApplicationStageChangedEvent) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Transport("broker offline".to_string()));
        }
        self.events
            .lock()
            .expect("publisher mutex poisoned")
            .push(event.clone());
        Ok(())
    }
}

pub(super) struct Pipeline {
    pub(super) service: Arc<Service>,
    pub(super) store: Arc<InMemoryHiringStore>,
    pub(super) publisher: Arc<RecordingPublisher>,
    pub(super) phase_id: PhaseId,
    pub(super) company_candidate_id: CompanyCandidateId,
}

pub(super) fn stage(id: &str) -> StageId {
    StageId::new(id)
}

/// Applied → Interview → Hired, with Rejected last; no stage may be skipped.
pub(super) fn workflow() -> Workflow {
    Workflow::new(
        WORKFLOW,
        CompanyId::new(COMPANY),
        "Engineering",
        vec![
            Stage::new("a", WORKFLOW, "Applied", 1),
            Stage::new("b", WORKFLOW, "Interview", 2),
            Stage::new("c", WORKFLOW, "Hired", 3).with_type(StageType::Success),
            Stage::new("d", WORKFLOW, "Rejected", 4).with_type(StageType::Fail),
        ],
    )
    .expect("valid workflow")
}

pub(super) fn candidate_draft(candidate: &str, email: &str) -> CompanyCandidateDraft {
    CompanyCandidateDraft {
        candidate_id: CandidateId::new(candidate),
        company_id: CompanyId::new(COMPANY),
        contact: CandidateContact {
            name: "Ada Lovelace".to_string(),
            email: email.to_string(),
        },
        phase_id: None,
        cv_file: None,
    }
}

pub(super) fn pipeline() -> Pipeline {
    pipeline_with(HiringConfig::default())
}

/// Company, workflow, fields, an active phase, a mapped position, and one candidate.
///
/// `notes` is REQUIRED at `b`; `salary` is READ_ONLY at `a`.
pub(super) fn pipeline_with(config: HiringConfig) -> Pipeline {
    let store = Arc::new(InMemoryHiringStore::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let service = Arc::new(HiringPipelineService::new(
        store.clone(),
        publisher.clone(),
        config,
    ));
    let company_id = CompanyId::new(COMPANY);

    service
        .register_company(company_id.clone(), "Acme Corp")
        .expect("company registered");
    service
        .register_workflow(workflow())
        .expect("workflow registered");

    let notes = service
        .add_custom_field(CustomFieldDraft {
            workflow_id: WORKFLOW.into(),
            field_key: "notes".to_string(),
            field_name: "Interview notes".to_string(),
            field_type: FieldType::Textarea,
            order_index: 0,
            field_config: FieldConfig::default(),
        })
        .expect("notes field");
    let salary = service
        .add_custom_field(CustomFieldDraft {
            workflow_id: WORKFLOW.into(),
            field_key: "salary".to_string(),
            field_name: "Expected salary".to_string(),
            field_type: FieldType::Currency,
            order_index: 1,
            field_config: FieldConfig {
                min: Some(0.0),
                max: Some(500_000.0),
                currency: Some("EUR".to_string()),
                options: Vec::new(),
            },
        })
        .expect("salary field");
    service
        .configure_field(FieldConfiguration {
            stage_id: stage("b"),
            custom_field_id: notes.id,
            visibility: FieldVisibility::Required,
        })
        .expect("notes configured");
    service
        .configure_field(FieldConfiguration {
            stage_id: stage("a"),
            custom_field_id: salary.id,
            visibility: FieldVisibility::ReadOnly,
        })
        .expect("salary configured");

    let phase = service
        .create_phase(
            &company_id,
            PhaseDraft {
                name: "Interviewing".to_string(),
                sort_order: 10,
                default_view: DefaultView::Kanban,
                objective: "Technical loop".to_string(),
            },
        )
        .expect("phase created");
    service
        .change_phase_status(&phase.id, PhaseStatus::Active)
        .expect("phase activated");

    service
        .register_position(JobPosition::new(
            PositionId::new(POSITION),
            company_id,
            "Backend Engineer",
        ))
        .expect("position registered");
    service
        .assign_phase_workflow(&PositionId::new(POSITION), &phase.id, &WORKFLOW.into())
        .expect("workflow mapped");

    let company_candidate = service
        .add_company_candidate(candidate_draft("cand-ada", "ada@example.com"))
        .expect("candidate added");

    Pipeline {
        service,
        store,
        publisher,
        phase_id: phase.id,
        company_candidate_id: company_candidate.id,
    }
}

pub(super) fn open_request(pipeline: &Pipeline) -> OpenApplicationRequest {
    OpenApplicationRequest {
        company_candidate_id: pipeline.company_candidate_id.clone(),
        position_id: PositionId::new(POSITION),
        phase_id: pipeline.phase_id.clone(),
    }
}

pub(super) fn open_application(pipeline: &Pipeline) -> CandidateApplication {
    pipeline
        .service
        .open_application(open_request(pipeline))
        .expect("application opened")
}

/// Open an application and place it at stage `a`.
pub(super) fn placed_application(pipeline: &Pipeline) -> CandidateApplication {
    let application = open_application(pipeline);
    pipeline
        .service
        .move_to_stage(&application.id, &stage("a"), None)
        .expect("initial placement")
        .application
}

pub(super) fn router(pipeline: &Pipeline) -> axum::Router {
    hiring_router(pipeline.service.clone())
}

pub(super) fn json_request(method: &str, uri: &str, body: Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&body).expect("serialize body"),
        ))
        .expect("request")
}

pub(super) fn empty_request(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .expect("request")
}

pub(super) fn notes_value(text: &str) -> Value {
    json!({ "values": { "notes": text } })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
