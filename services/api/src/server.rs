use crate::cli::ServeArgs;
use crate::infra::{memory_service, AppState};
use crate::routes::with_pathway_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pathway_compliance::config::AppConfig;
use pathway_compliance::error::AppError;
use pathway_compliance::telemetry;
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

    let settings = config.compliance.engine_settings();
    let dashboard_source = settings.dashboard_source;
    let service = memory_service(settings);

    let app = with_pathway_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        dashboard_source = dashboard_source.label(),
        "pathway compliance service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
