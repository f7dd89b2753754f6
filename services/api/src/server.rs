use crate::cli::ServeArgs;
use crate::infra::{spawn_activity_log, spawn_outbox_worker, AppState};
use crate::routes::with_hiring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use recruit_flow::config::AppConfig;
use recruit_flow::error::AppError;
use recruit_flow::hiring::{
    BroadcastStageEventPublisher, HiringPipelineService, InMemoryHiringStore,
};
use recruit_flow::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryHiringStore::new());
    let publisher = Arc::new(BroadcastStageEventPublisher::default());
    spawn_activity_log(publisher.subscribe());

    let service = Arc::new(HiringPipelineService::new(
        store,
        publisher,
        config.hiring.clone(),
    ));
    spawn_outbox_worker(service.clone(), config.hiring.outbox_interval);

    let app = with_hiring_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hiring workflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
