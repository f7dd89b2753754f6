use metrics_exporter_prometheus::PrometheusHandle;
use recruit_flow::hiring::applications::HiringStore;
use recruit_flow::hiring::{ApplicationStageChangedEvent, HiringPipelineService, StageEventPublisher};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Periodically re-delivers stage change events whose first publish failed.
pub(crate) fn spawn_outbox_worker<S, P>(
    service: Arc<HiringPipelineService<S, P>>,
    every: Duration,
) -> JoinHandle<()>
where
    S: HiringStore + 'static,
    P: StageEventPublisher + 'static,
{
    tokio::spawn(async move {
        let dispatcher = service.outbox_dispatcher();
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match dispatcher.dispatch_pending() {
                Ok(report) if report.delivered + report.failed > 0 => {
                    info!(
                        delivered = report.delivered,
                        failed = report.failed,
                        "outbox dispatch"
                    );
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "outbox dispatch skipped"),
            }
        }
    })
}

/// Writes one activity log line per stage change received on the bus.
pub(crate) fn spawn_activity_log(
    mut events: broadcast::Receiver<ApplicationStageChangedEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_activity(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "activity log fell behind the event bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("event bus closed");
                    break;
                }
            }
        }
    })
}

fn log_activity(event: &ApplicationStageChangedEvent) {
    info!(
        application_id = %event.application_id,
        candidate = %event.candidate_name,
        position = %event.position_title,
        from = event.previous_stage_id.as_ref().map(|stage| stage.as_str()).unwrap_or("-"),
        to = %event.new_stage_id,
        changed_by = event.changed_by_user_id.as_ref().map(|user| user.as_str()).unwrap_or("system"),
        "candidate moved to {}",
        event.new_stage_name
    );
}
