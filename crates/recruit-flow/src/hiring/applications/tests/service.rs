use super::common::*;
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use crate::config::HiringConfig;
use crate::hiring::applications::repository::{ApplicationRepository, OutboxRepository};
use crate::hiring::applications::{ErrorKind, HiringError, RepositoryError};
use crate::hiring::assignments::StageAssignmentError;
use crate::hiring::candidates::{CompanyCandidateError, OwnershipStatus};
use crate::hiring::fields::{FieldError, FieldValues, FieldVisibility};
use crate::hiring::ids::{ApplicationId, CompanyId, PositionId, UserId, WorkflowId};
use crate::hiring::phases::{DefaultView, PhaseDraft, PhaseError, PhaseStatus};
use crate::hiring::positions::{JobPosition, ResolutionError};
use crate::hiring::stages::{Stage, StageType, Workflow};
use crate::hiring::transitions::{TransitionError, TransitionKind};

fn values(entries: &[(&str, serde_json::Value)]) -> FieldValues {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn skipping_a_non_skippable_stage_is_rejected_and_next_stage_emits_event() {
    let pipeline = pipeline();
    let application = placed_application(&pipeline);
    assert_eq!(application.stage_id, Some(stage("a")));

    match pipeline
        .service
        .move_to_stage(&application.id, &stage("c"), None)
    {
        Err(HiringError::Transition(TransitionError::SkipNotAllowed { blocking, .. })) => {
            assert_eq!(blocking, stage("b"));
        }
        other => panic!("expected skip rejection, got {other:?}"),
    }

    let outcome = pipeline
        .service
        .move_to_stage(&application.id, &stage("b"), Some(UserId::new("u-recruiter")))
        .expect("adjacent move permitted");
    assert_eq!(outcome.transition, TransitionKind::Advance);
    assert!(outcome.delivered);
    assert_eq!(outcome.event.previous_stage_id, Some(stage("a")));
    assert_eq!(outcome.event.new_stage_id, stage("b"));
    assert_eq!(outcome.event.new_stage_name, "Interview");
    assert_eq!(outcome.event.candidate_email, "ada@example.com");
    assert_eq!(outcome.event.position_title, "Backend Engineer");
    assert_eq!(outcome.event.company_name, "Acme Corp");
    assert_eq!(
        outcome.event.changed_by_user_id,
        Some(UserId::new("u-recruiter"))
    );

    let published = pipeline.publisher.events();
    assert_eq!(published.len(), 2, "initial placement and advance");
    assert_eq!(published[0].previous_stage_id, None);
    assert_eq!(published[1], outcome.event);

    let stored = pipeline
        .service
        .get_application(&application.id)
        .expect("application stored");
    assert_eq!(stored.stage_id, Some(stage("b")));
    assert_eq!(stored.history.len(), 2);
}

#[test]
fn rejected_move_leaves_application_untouched() {
    let pipeline = pipeline();
    let application = placed_application(&pipeline);

    assert!(pipeline
        .service
        .move_to_stage(&application.id, &stage("c"), None)
        .is_err());

    let stored = pipeline
        .service
        .get_application(&application.id)
        .expect("application stored");
    assert_eq!(stored.version, application.version);
    assert_eq!(pipeline.publisher.events().len(), 1);
    assert!(pipeline.store.pending_outbox().expect("outbox").is_empty());
    assert_eq!(pipeline.store.delivered_outbox_count().expect("outbox"), 1);
}

#[test]
fn required_field_must_be_set_before_leaving_stage() {
    let pipeline = pipeline();
    let application = placed_application(&pipeline);
    pipeline
        .service
        .move_to_stage(&application.id, &stage("b"), None)
        .expect("enter interview");

    match pipeline
        .service
        .move_to_stage(&application.id, &stage("c"), None)
    {
        Err(HiringError::Transition(TransitionError::RequiredFieldsMissing { stage_id, fields })) => {
            assert_eq!(stage_id, stage("b"));
            assert_eq!(fields, vec!["notes".to_string()]);
        }
        other => panic!("expected required field error, got {other:?}"),
    }

    // backward is free
    pipeline
        .service
        .move_to_stage(&application.id, &stage("a"), None)
        .expect("backward move");
    pipeline
        .service
        .move_to_stage(&application.id, &stage("b"), None)
        .expect("re-enter interview");

    pipeline
        .service
        .set_field_values(&application.id, values(&[("notes", json!("strong system design"))]))
        .expect("notes written");
    let outcome = pipeline
        .service
        .move_to_stage(&application.id, &stage("c"), None)
        .expect("hire");
    assert_eq!(outcome.application.stage_id, Some(stage("c")));
}

#[test]
fn publish_failure_does_not_roll_back_the_move() {
    let pipeline = pipeline();
    let application = placed_application(&pipeline);
    pipeline.publisher.set_failing(true);

    let outcome = pipeline
        .service
        .move_to_stage(&application.id, &stage("b"), None)
        .expect("move commits despite publish failure");
    assert!(!outcome.delivered);

    let stored = pipeline
        .service
        .get_application(&application.id)
        .expect("stored");
    assert_eq!(stored.stage_id, Some(stage("b")));

    let pending = pipeline.store.pending_events(10).expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
    assert!(pending[0].last_error.is_some());

    pipeline.publisher.set_failing(false);
    let report = pipeline
        .service
        .outbox_dispatcher()
        .dispatch_pending()
        .expect("dispatch");
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 0);
    assert!(pipeline.store.pending_events(10).expect("pending").is_empty());
    assert_eq!(
        pipeline.publisher.events().last().map(|event| &event.new_stage_id),
        Some(&stage("b"))
    );
}

#[test]
fn stale_version_is_a_conflict() {
    let pipeline = pipeline();
    let application = placed_application(&pipeline);
    let stale = application.clone();

    pipeline
        .service
        .move_to_stage(&application.id, &stage("b"), None)
        .expect("first writer");

    let error = pipeline
        .store
        .update_application(stale.clone(), stale.version)
        .expect_err("stale write rejected");
    assert!(matches!(error, RepositoryError::StaleVersion { .. }));
    assert_eq!(HiringError::from(error).kind(), ErrorKind::Conflict);
}

#[test]
fn field_writes_respect_visibility_and_type() {
    let pipeline = pipeline();
    let application = open_application(&pipeline);

    // no stage yet: every field is writable
    let updated = pipeline
        .service
        .set_field_values(&application.id, values(&[("salary", json!(85_000))]))
        .expect("salary before placement");
    assert_eq!(updated.field_values.get("salary"), Some(&json!(85_000)));
    assert_eq!(updated.version, application.version + 1);

    pipeline
        .service
        .move_to_stage(&application.id, &stage("a"), None)
        .expect("placement");

    match pipeline
        .service
        .set_field_values(&application.id, values(&[("salary", json!(90_000))]))
    {
        Err(HiringError::Field(FieldError::NotWritable { visibility, .. })) => {
            assert_eq!(visibility, FieldVisibility::ReadOnly);
        }
        other => panic!("expected read-only rejection, got {other:?}"),
    }

    let invalid = pipeline
        .service
        .set_field_values(&application.id, values(&[("notes", json!(42))]))
        .expect_err("notes must be text");
    assert_eq!(invalid.kind(), ErrorKind::Validation);

    let unknown = pipeline
        .service
        .set_field_values(&application.id, values(&[("shoe_size", json!(44))]))
        .expect_err("unknown field");
    assert!(matches!(
        unknown,
        HiringError::Field(FieldError::UnknownField { .. })
    ));

    pipeline
        .service
        .set_field_values(&application.id, values(&[("notes", json!("ok"))]))
        .expect("notes written");
    let cleared = pipeline
        .service
        .set_field_values(&application.id, values(&[("notes", json!(null))]))
        .expect("null clears");
    assert!(!cleared.field_values.contains_key("notes"));
}

#[test]
fn stage_fields_fall_back_to_configured_default() {
    let pipeline = pipeline_with(HiringConfig {
        default_field_visibility: FieldVisibility::Hidden,
        ..HiringConfig::default()
    });

    let at_c = pipeline
        .service
        .stage_fields(&WORKFLOW.into(), &stage("c"))
        .expect("fields resolved");
    assert!(at_c
        .iter()
        .all(|resolved| resolved.visibility == FieldVisibility::Hidden && resolved.defaulted));

    let at_b = pipeline
        .service
        .stage_fields(&WORKFLOW.into(), &stage("b"))
        .expect("fields resolved");
    assert_eq!(at_b[0].field.field_key, "notes");
    assert_eq!(at_b[0].visibility, FieldVisibility::Required);
    assert!(!at_b[0].defaulted);

    let missing = pipeline
        .service
        .stage_fields(&WORKFLOW.into(), &stage("zz"))
        .expect_err("unknown stage");
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[test]
fn duplicate_field_key_conflicts() {
    let pipeline = pipeline();
    let error = pipeline
        .service
        .add_custom_field(crate::hiring::fields::CustomFieldDraft {
            workflow_id: WORKFLOW.into(),
            field_key: " notes ".to_string(),
            field_name: "Notes again".to_string(),
            field_type: crate::hiring::fields::FieldType::Text,
            order_index: 9,
            field_config: Default::default(),
        })
        .expect_err("duplicate key");
    assert_eq!(error.kind(), ErrorKind::Conflict);
}

#[test]
fn stage_type_is_frozen_while_occupied() {
    let pipeline = pipeline();
    placed_application(&pipeline);

    let error = pipeline
        .service
        .update_stage(
            &WORKFLOW.into(),
            Stage::new("a", WORKFLOW, "Applied", 1).with_type(StageType::Review),
        )
        .expect_err("occupied stage");
    assert_eq!(error.kind(), ErrorKind::BusinessRule);

    let renamed = pipeline
        .service
        .update_stage(&WORKFLOW.into(), Stage::new("a", WORKFLOW, "Inbox", 1))
        .expect("rename allowed");
    assert_eq!(
        renamed.stage(&stage("a")).map(|s| s.name.as_str()),
        Some("Inbox")
    );

    let skippable = pipeline
        .service
        .update_stage(
            &WORKFLOW.into(),
            Stage::new("b", WORKFLOW, "Interview", 2)
                .with_type(StageType::Review)
                .skippable(true),
        )
        .expect("empty stage may change type");
    assert!(skippable.stage(&stage("b")).is_some_and(|s| s.allow_skip));
}

#[test]
fn workflow_without_terminal_stages_still_registers() {
    let pipeline = pipeline();
    let workflow = Workflow::new(
        "wf-lean",
        CompanyId::new(COMPANY),
        "Lean",
        vec![Stage::new("x", "wf-lean", "Only", 1)],
    )
    .expect("valid");
    assert_eq!(workflow.convention_warnings().len(), 2);
    assert!(pipeline.service.register_workflow(workflow).is_ok());

    let foreign = Workflow::new(
        "wf-ghost",
        CompanyId::new("ghost-co"),
        "Ghost",
        vec![Stage::new("g", "wf-ghost", "Only", 1)],
    )
    .expect("valid");
    assert_eq!(
        pipeline
            .service
            .register_workflow(foreign)
            .expect_err("unknown company")
            .kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn phases_list_in_sort_order_and_follow_lifecycle() {
    let pipeline = pipeline();
    let company = CompanyId::new(COMPANY);
    let draft = |name: &str, sort_order: u32| PhaseDraft {
        name: name.to_string(),
        sort_order,
        default_view: DefaultView::List,
        objective: String::new(),
    };

    pipeline
        .service
        .create_phase(&company, draft("Offer", 30))
        .expect("offer");
    let sourcing = pipeline
        .service
        .create_phase(&company, draft("Sourcing", 5))
        .expect("sourcing");

    let orders: Vec<u32> = pipeline
        .service
        .list_phases(&company)
        .expect("list")
        .iter()
        .map(|phase| phase.sort_order)
        .collect();
    assert_eq!(orders, vec![5, 10, 30]);

    let clash = pipeline
        .service
        .create_phase(&company, draft("Duplicate", 30))
        .expect_err("sort order taken");
    assert!(matches!(
        clash,
        HiringError::Phase(PhaseError::DuplicateSortOrder { .. })
    ));
    assert_eq!(clash.kind(), ErrorKind::Conflict);

    assert_eq!(sourcing.status, PhaseStatus::Draft);
    pipeline
        .service
        .change_phase_status(&sourcing.id, PhaseStatus::Archived)
        .expect("archive");
    let back_to_draft = pipeline
        .service
        .change_phase_status(&sourcing.id, PhaseStatus::Draft)
        .expect_err("draft is initial only");
    assert_eq!(back_to_draft.kind(), ErrorKind::BusinessRule);
}

#[test]
fn archived_phase_cannot_take_new_applications() {
    let pipeline = pipeline();
    pipeline
        .service
        .change_phase_status(&pipeline.phase_id, PhaseStatus::Archived)
        .expect("archive");

    match pipeline.service.open_application(open_request(&pipeline)) {
        Err(HiringError::Resolution(ResolutionError::ArchivedPhase { .. })) => {}
        other => panic!("expected archived phase error, got {other:?}"),
    }
}

#[test]
fn legacy_positions_fail_fast_until_migrated() {
    let pipeline = pipeline();
    let legacy = JobPosition {
        legacy_workflow_id: Some(WorkflowId::new(WORKFLOW)),
        ..JobPosition::new(
            PositionId::new("pos-legacy"),
            CompanyId::new(COMPANY),
            "Support Engineer",
        )
    };
    pipeline
        .service
        .register_position(legacy)
        .expect("legacy data accepted");

    let mut request = open_request(&pipeline);
    request.position_id = PositionId::new("pos-legacy");
    match pipeline.service.open_application(request.clone()) {
        Err(HiringError::Resolution(ResolutionError::UnmigratedPosition { .. })) => {}
        other => panic!("expected unmigrated position error, got {other:?}"),
    }

    let report = pipeline
        .service
        .run_legacy_migration()
        .expect("migration");
    assert_eq!(report.migrated, vec![PositionId::new("pos-legacy")]);
    assert_eq!(
        pipeline
            .service
            .resolve_workflow(&PositionId::new("pos-legacy"), &pipeline.phase_id)
            .expect("resolved"),
        Some(WorkflowId::new(WORKFLOW))
    );

    let application = pipeline
        .service
        .open_application(request)
        .expect("opens after migration");
    assert_eq!(application.workflow_id, WorkflowId::new(WORKFLOW));
}

fn legacy_position(id: &str, company: &str, workflow_id: &str) -> JobPosition {
    JobPosition {
        legacy_workflow_id: Some(WorkflowId::new(workflow_id)),
        ..JobPosition::new(PositionId::new(id), CompanyId::new(company), "Legacy opening")
    }
}

#[test]
fn migration_refuses_missing_and_foreign_workflows() {
    let pipeline = pipeline();
    let globex = CompanyId::new("globex");
    pipeline
        .service
        .register_company(globex.clone(), "Globex")
        .expect("company");
    pipeline
        .service
        .register_workflow(
            Workflow::new(
                "wf-globex",
                globex,
                "Globex hiring",
                vec![
                    Stage::new("g1", "wf-globex", "Applied", 1),
                    Stage::new("g2", "wf-globex", "Hired", 2).with_type(StageType::Success),
                    Stage::new("g3", "wf-globex", "Rejected", 3).with_type(StageType::Fail),
                ],
            )
            .expect("workflow"),
        )
        .expect("registered");
    for position in [
        legacy_position("pos-foreign", COMPANY, "wf-globex"),
        legacy_position("pos-missing", COMPANY, "wf-missing"),
    ] {
        pipeline
            .service
            .register_position(position)
            .expect("legacy data accepted");
    }

    let report = pipeline
        .service
        .run_legacy_migration()
        .expect("migration");

    assert!(report.migrated.is_empty());
    let failed: Vec<PositionId> = report
        .failed
        .iter()
        .map(|failure| failure.position_id.clone())
        .collect();
    assert_eq!(
        failed,
        vec![PositionId::new("pos-foreign"), PositionId::new("pos-missing")]
    );

    for position_id in ["pos-foreign", "pos-missing"] {
        match pipeline
            .service
            .resolve_workflow(&PositionId::new(position_id), &pipeline.phase_id)
        {
            Err(HiringError::Resolution(ResolutionError::UnmigratedPosition { .. })) => {}
            other => panic!("expected {position_id} to stay unmigrated, got {other:?}"),
        }
        let mut request = open_request(&pipeline);
        request.position_id = PositionId::new(position_id);
        assert!(pipeline.service.open_application(request).is_err());
    }
}

#[test]
fn migration_keeps_legacy_reference_without_eligible_phases() {
    let pipeline = pipeline();
    let initech = CompanyId::new("initech");
    pipeline
        .service
        .register_company(initech.clone(), "Initech")
        .expect("company");
    pipeline
        .service
        .register_workflow(
            Workflow::new(
                "wf-initech",
                initech,
                "Initech hiring",
                vec![
                    Stage::new("i1", "wf-initech", "Applied", 1),
                    Stage::new("i2", "wf-initech", "Hired", 2).with_type(StageType::Success),
                    Stage::new("i3", "wf-initech", "Rejected", 3).with_type(StageType::Fail),
                ],
            )
            .expect("workflow"),
        )
        .expect("registered");
    pipeline
        .service
        .register_position(legacy_position("pos-initech", "initech", "wf-initech"))
        .expect("legacy data accepted");

    let report = pipeline
        .service
        .run_legacy_migration()
        .expect("migration");
    assert_eq!(report.pending, vec![PositionId::new("pos-initech")]);
    assert!(report.failed.is_empty());

    let phase = pipeline
        .service
        .create_phase(
            &CompanyId::new("initech"),
            PhaseDraft {
                name: "Screening".to_string(),
                sort_order: 1,
                default_view: DefaultView::List,
                objective: String::new(),
            },
        )
        .expect("phase");
    let rerun = pipeline
        .service
        .run_legacy_migration()
        .expect("second migration");
    assert_eq!(rerun.migrated, vec![PositionId::new("pos-initech")]);
    assert_eq!(
        pipeline
            .service
            .resolve_workflow(&PositionId::new("pos-initech"), &phase.id)
            .expect("resolved"),
        Some(WorkflowId::new("wf-initech"))
    );
}

#[test]
fn unmapped_phase_has_no_workflow() {
    let pipeline = pipeline();
    let company = CompanyId::new(COMPANY);
    let screening = pipeline
        .service
        .create_phase(
            &company,
            PhaseDraft {
                name: "Screening".to_string(),
                sort_order: 20,
                default_view: DefaultView::Kanban,
                objective: String::new(),
            },
        )
        .expect("phase");

    assert_eq!(
        pipeline
            .service
            .resolve_workflow(&PositionId::new(POSITION), &screening.id)
            .expect("resolution"),
        None
    );

    let mut request = open_request(&pipeline);
    request.phase_id = screening.id;
    let error = pipeline
        .service
        .open_application(request)
        .expect_err("no workflow");
    assert_eq!(error.kind(), ErrorKind::BusinessRule);
}

#[test]
fn company_candidate_uniqueness_and_invitations() {
    let pipeline = pipeline();

    match pipeline
        .service
        .add_company_candidate(candidate_draft("cand-ada", "ada@other.example"))
    {
        Err(HiringError::Candidate(CompanyCandidateError::AlreadyExists { .. })) => {}
        other => panic!("expected duplicate candidate error, got {other:?}"),
    }
    assert_eq!(
        pipeline
            .service
            .add_company_candidate(candidate_draft("cand-bob", " "))
            .expect_err("email required")
            .kind(),
        ErrorKind::Validation
    );

    let now = Utc
        .with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
        .single()
        .expect("timestamp");
    let id = pipeline.company_candidate_id.clone();

    let invited = pipeline
        .service
        .invite_candidate(&id, now)
        .expect("invite");
    let invitation = invited.invitation.expect("invitation recorded");
    assert_eq!(invitation.expires_at, now + Duration::hours(168));

    let expired = pipeline
        .service
        .accept_invitation(&id, now + Duration::hours(169))
        .expect_err("expired");
    assert!(matches!(
        expired,
        HiringError::Candidate(CompanyCandidateError::InvitationExpired { .. })
    ));
    assert_eq!(expired.kind(), ErrorKind::BusinessRule);

    let accepted = pipeline
        .service
        .accept_invitation(&id, now + Duration::hours(1))
        .expect("accept in time");
    assert_eq!(accepted.ownership_status, OwnershipStatus::UserOwned);

    assert!(matches!(
        pipeline.service.reject_invitation(&id, now + Duration::hours(2)),
        Err(HiringError::Candidate(
            CompanyCandidateError::InvitationAlreadyProcessed
        ))
    ));

    let snapshot = pipeline
        .service
        .capture_snapshot(&id, "# Ada", json!({ "skills": ["rust"] }), now)
        .expect("snapshot");
    assert_eq!(
        snapshot.snapshot.map(|snapshot| snapshot.markdown),
        Some("# Ada".to_string())
    );

    let missing = pipeline
        .service
        .get_company_candidate(&"cc-missing".into())
        .expect_err("missing");
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[test]
fn opening_an_application_records_the_candidate_phase() {
    let pipeline = pipeline();
    let application = open_application(&pipeline);
    assert_eq!(application.stage_id, None);
    assert_eq!(application.version, 0);

    let company_candidate = pipeline
        .service
        .get_company_candidate(&pipeline.company_candidate_id)
        .expect("candidate");
    assert_eq!(company_candidate.phase_id, Some(pipeline.phase_id.clone()));

    let missing = pipeline
        .service
        .get_application(&ApplicationId::new("app-missing"))
        .expect_err("missing");
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[test]
fn stage_assignments_track_reviewers() {
    let pipeline = pipeline();
    let position = PositionId::new(POSITION);

    pipeline
        .service
        .assign_stage_user(&position, &stage("b"), UserId::new("u-1"))
        .expect("assign");
    pipeline
        .service
        .assign_stage_user(&position, &stage("b"), UserId::new("u-2"))
        .expect("assign");

    assert!(matches!(
        pipeline
            .service
            .assign_stage_user(&position, &stage("b"), UserId::new("u-1")),
        Err(HiringError::Assignment(StageAssignmentError::Duplicate { .. }))
    ));
    assert_eq!(
        pipeline
            .service
            .stage_assignees(&position, &stage("b"))
            .expect("assignees"),
        vec![UserId::new("u-1"), UserId::new("u-2")]
    );

    let not_assigned = pipeline
        .service
        .unassign_stage_user(&position, &stage("b"), &UserId::new("u-9"))
        .expect_err("not assigned");
    assert_eq!(not_assigned.kind(), ErrorKind::NotFound);

    pipeline
        .service
        .unassign_stage_user(&position, &stage("b"), &UserId::new("u-1"))
        .expect("unassign");
    assert_eq!(
        pipeline
            .service
            .stage_assignees(&position, &stage("b"))
            .expect("assignees"),
        vec![UserId::new("u-2")]
    );

    assert_eq!(
        pipeline
            .service
            .assign_stage_user(&position, &stage("nowhere"), UserId::new("u-1"))
            .expect_err("unknown stage")
            .kind(),
        ErrorKind::NotFound
    );
}
