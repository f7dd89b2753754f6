use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::domain::{
    CompanyRegistration, FieldValuesUpdate, FieldVisibilityUpdate, OpenApplicationRequest,
    PhaseWorkflowAssignment, StageMoveRequest, WorkflowRegistration,
};
use super::repository::HiringStore;
use super::service::{ErrorKind, HiringError, HiringPipelineService};
use crate::hiring::events::StageEventPublisher;
use crate::hiring::candidates::CompanyCandidateDraft;
use crate::hiring::fields::{CustomFieldDraft, FieldConfiguration};
use crate::hiring::ids::{
    ApplicationId, CompanyId, CustomFieldId, PhaseId, PositionId, StageId, WorkflowId,
};
use crate::hiring::phases::PhaseDraft;
use crate::hiring::positions::JobPosition;

type SharedService<S, P> = Arc<HiringPipelineService<S, P>>;

/// Router builder exposing the application, field, and phase endpoints plus the
/// administration routes that set up companies, workflows, positions, and candidates.
pub fn hiring_router<S, P>(service: SharedService<S, P>) -> Router
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/companies", post(register_company_handler::<S, P>))
        .route("/api/v1/workflows", post(register_workflow_handler::<S, P>))
        .route("/api/v1/custom-fields", post(add_custom_field_handler::<S, P>))
        .route(
            "/api/v1/stages/:stage_id/fields/:field_id",
            put(configure_field_handler::<S, P>),
        )
        .route("/api/v1/positions", post(register_position_handler::<S, P>))
        .route(
            "/api/v1/positions/:position_id/phases/:phase_id/workflow",
            put(assign_phase_workflow_handler::<S, P>),
        )
        .route(
            "/api/v1/company-candidates",
            post(add_company_candidate_handler::<S, P>),
        )
        .route("/api/v1/applications", post(open_handler::<S, P>))
        .route(
            "/api/v1/applications/:application_id",
            get(application_handler::<S, P>),
        )
        .route(
            "/api/v1/applications/:application_id/stage",
            post(move_handler::<S, P>),
        )
        .route(
            "/api/v1/applications/:application_id/fields",
            put(fields_handler::<S, P>),
        )
        .route(
            "/api/v1/workflows/:workflow_id/stages/:stage_id/fields",
            get(stage_fields_handler::<S, P>),
        )
        .route(
            "/api/v1/companies/:company_id/phases",
            get(list_phases_handler::<S, P>).post(create_phase_handler::<S, P>),
        )
        .with_state(service)
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation | ErrorKind::BusinessRule => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: HiringError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(error.kind()), axum::Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, HiringError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn open_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    axum::Json(request): axum::Json<OpenApplicationRequest>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    match service.open_application(request) {
        Ok(application) => {
            (StatusCode::CREATED, axum::Json(application.view(None))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    match service.application_view(&ApplicationId(application_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn move_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<StageMoveRequest>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service.move_to_stage(&id, &request.target_stage_id, request.changed_by) {
        Ok(outcome) => {
            let payload = json!({
                "application": outcome.application.view(Some(outcome.event.new_stage_name.clone())),
                "transition": outcome.transition,
                "event": outcome.event,
                "delivered": outcome.delivered,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fields_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(application_id): Path<String>,
    axum::Json(update): axum::Json<FieldValuesUpdate>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    let id = ApplicationId(application_id);
    match service
        .set_field_values(&id, update.values)
        .and_then(|_| service.application_view(&id))
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn stage_fields_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path((workflow_id, stage_id)): Path<(String, String)>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    let workflow_id = WorkflowId(workflow_id);
    let stage_id = StageId(stage_id);
    match service.stage_fields(&workflow_id, &stage_id) {
        Ok(fields) => {
            let fields: Vec<_> = fields
                .into_iter()
                .map(|resolved| {
                    json!({
                        "field_key": resolved.field.field_key,
                        "field_name": resolved.field.field_name,
                        "field_type": resolved.field.field_type,
                        "visibility": resolved.visibility,
                        "defaulted": resolved.defaulted,
                    })
                })
                .collect();
            let payload = json!({
                "workflow_id": workflow_id,
                "stage_id": stage_id,
                "fields": fields,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_phases_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(company_id): Path<String>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    match service.list_phases(&CompanyId(company_id)) {
        Ok(phases) => (StatusCode::OK, axum::Json(phases)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_phase_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path(company_id): Path<String>,
    axum::Json(draft): axum::Json<PhaseDraft>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    match service.create_phase(&CompanyId(company_id), draft) {
        Ok(phase) => (StatusCode::CREATED, axum::Json(phase)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_company_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    axum::Json(registration): axum::Json<CompanyRegistration>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    respond(
        StatusCode::CREATED,
        service.register_company(registration.id, registration.name),
    )
}

pub(crate) async fn register_workflow_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    axum::Json(registration): axum::Json<WorkflowRegistration>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    let result = registration
        .into_workflow()
        .map_err(HiringError::from)
        .and_then(|workflow| service.register_workflow(workflow));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn add_custom_field_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    axum::Json(draft): axum::Json<CustomFieldDraft>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    respond(StatusCode::CREATED, service.add_custom_field(draft))
}

pub(crate) async fn configure_field_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path((stage_id, field_id)): Path<(String, String)>,
    axum::Json(update): axum::Json<FieldVisibilityUpdate>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    let configuration = FieldConfiguration {
        stage_id: StageId(stage_id),
        custom_field_id: CustomFieldId(field_id),
        visibility: update.visibility,
    };
    respond(StatusCode::OK, service.configure_field(configuration))
}

pub(crate) async fn register_position_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    axum::Json(position): axum::Json<JobPosition>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    respond(StatusCode::CREATED, service.register_position(position))
}

pub(crate) async fn assign_phase_workflow_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    Path((position_id, phase_id)): Path<(String, String)>,
    axum::Json(assignment): axum::Json<PhaseWorkflowAssignment>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.assign_phase_workflow(
            &PositionId(position_id),
            &PhaseId(phase_id),
            &assignment.workflow_id,
        ),
    )
}

pub(crate) async fn add_company_candidate_handler<S, P>(
    State(service): State<SharedService<S, P>>,
    axum::Json(draft): axum::Json<CompanyCandidateDraft>,
) -> Response
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    respond(StatusCode::CREATED, service.add_company_candidate(draft))
}
