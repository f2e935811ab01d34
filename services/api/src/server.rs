use crate::cli::ServeArgs;
use crate::infra::{AppState, FormStoreBackend, InMemorySubmissionGateway};
use crate::routes::with_assessment_routes;
use assessment_flow::config::AppConfig;
use assessment_flow::error::AppError;
use assessment_flow::telemetry;
use assessment_flow::workflows::assessment::AssessmentService;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = Arc::new(config.assessment.load_catalog()?);
    let store = FormStoreBackend::from_dir(config.assessment.store_dir.clone());
    info!(
        store = store.label(),
        default_type = %catalog.default_type(),
        assessment_types = catalog.assessment_types().len(),
        "assessment catalog loaded"
    );

    let service = Arc::new(AssessmentService::new(
        Arc::clone(&catalog),
        Arc::new(store),
        Arc::new(InMemorySubmissionGateway::default()),
        config.assessment.guidance,
    ));

    let app = with_assessment_routes(service, catalog)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
