use clap::Args;
use recruit_flow::config::HiringConfig;
use recruit_flow::error::AppError;
use recruit_flow::hiring::applications::{OpenApplicationRequest, StageMoveOutcome};
use recruit_flow::hiring::candidates::{CandidateContact, CompanyCandidateDraft};
use recruit_flow::hiring::ids::{ApplicationId, CandidateId, CompanyId, PositionId, StageId, UserId};
use recruit_flow::hiring::phases::{DefaultView, PhaseDraft, PhaseStatus};
use recruit_flow::hiring::positions::JobPosition;
use recruit_flow::hiring::stages::{Stage, StageType, Workflow};
use recruit_flow::hiring::{BroadcastStageEventPublisher, HiringPipelineService, InMemoryHiringStore};
use std::sync::Arc;

type DemoPipeline = HiringPipelineService<InMemoryHiringStore, BroadcastStageEventPublisher>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Let candidates skip the screening stage.
    #[arg(long)]
    pub(crate) allow_skip: bool,
    /// Recruiter id recorded on each transition.
    #[arg(long, default_value = "u-recruiter")]
    pub(crate) recruiter: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        allow_skip,
        recruiter,
    } = args;

    println!("Hiring workflow demo");
    let (service, application_id) = seed_pipeline(allow_skip)?;
    let recruiter = Some(UserId::new(recruiter));

    let placed = service.move_to_stage(&application_id, &StageId::new("applied"), recruiter.clone())?;
    render_outcome("placed", &placed)?;

    println!("\nAttempting Applied -> Technical interview");
    match service.move_to_stage(&application_id, &StageId::new("interview"), recruiter.clone()) {
        Ok(outcome) => render_outcome("accepted", &outcome)?,
        Err(err) => println!("- rejected ({:?}): {err}", err.kind()),
    }

    let current = service.application_view(&application_id)?;
    if current.stage_id.as_ref().map(StageId::as_str) == Some("applied") {
        println!("\nAttempting Applied -> Screening");
        let screened =
            service.move_to_stage(&application_id, &StageId::new("screening"), recruiter)?;
        render_outcome("accepted", &screened)?;
    }

    let view = service.application_view(&application_id)?;
    println!(
        "\nApplication {} now at {} after {} transition(s)",
        view.application_id,
        view.stage_name.as_deref().unwrap_or("-"),
        view.transitions
    );
    Ok(())
}

fn seed_pipeline(allow_skip: bool) -> Result<(DemoPipeline, ApplicationId), AppError> {
    let service = HiringPipelineService::new(
        Arc::new(InMemoryHiringStore::new()),
        Arc::new(BroadcastStageEventPublisher::default()),
        HiringConfig::default(),
    );
    let company = CompanyId::new("demo-co");
    service.register_company(company.clone(), "Demo Co")?;

    let workflow = Workflow::new(
        "wf-demo",
        company.clone(),
        "Engineering",
        vec![
            Stage::new("applied", "wf-demo", "Applied", 1),
            Stage::new("screening", "wf-demo", "Screening", 2).skippable(allow_skip),
            Stage::new("interview", "wf-demo", "Technical interview", 3),
            Stage::new("hired", "wf-demo", "Hired", 4).with_type(StageType::Success),
            Stage::new("rejected", "wf-demo", "Rejected", 5).with_type(StageType::Fail),
        ],
    )
    .map_err(|err| AppError::Hiring(err.into()))?;
    let workflow = service.register_workflow(workflow)?;

    let phase = service.create_phase(
        &company,
        PhaseDraft {
            name: "Evaluation".to_string(),
            sort_order: 1,
            default_view: DefaultView::Kanban,
            objective: String::new(),
        },
    )?;
    service.change_phase_status(&phase.id, PhaseStatus::Active)?;

    let position_id = PositionId::new("pos-demo");
    service.register_position(JobPosition::new(
        position_id.clone(),
        company.clone(),
        "Platform Engineer",
    ))?;
    service.assign_phase_workflow(&position_id, &phase.id, &workflow.id)?;

    let candidate = service.add_company_candidate(CompanyCandidateDraft {
        candidate_id: CandidateId::new("cand-demo"),
        company_id: company,
        contact: CandidateContact {
            name: "Alan Turing".to_string(),
            email: "alan@example.com".to_string(),
        },
        phase_id: None,
        cv_file: None,
    })?;

    let application = service.open_application(OpenApplicationRequest {
        company_candidate_id: candidate.id,
        position_id,
        phase_id: phase.id,
    })?;
    Ok((service, application.id))
}

fn render_outcome(label: &str, outcome: &StageMoveOutcome) -> Result<(), AppError> {
    println!(
        "- {label} ({}) -> {}",
        outcome.transition.label(),
        outcome.event.new_stage_name
    );
    let payload = serde_json::to_string_pretty(&outcome.event)
        .map_err(|err| AppError::Io(err.into()))?;
    println!("{payload}");
    Ok(())
}
