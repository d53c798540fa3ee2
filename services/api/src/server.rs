use crate::cli::ServeArgs;
use crate::infra::{open_decision_log, AppState};
use crate::routes::with_decision_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use decision_desk::config::AppConfig;
use decision_desk::error::AppError;
use decision_desk::telemetry;
use decision_desk::workflows::decision::{DecisionService, TomApiClient};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let api_key = config.decision_api.require_api_key()?;
    let client = TomApiClient::new(&config.decision_api.base_url, api_key)?;

    let (decision_log, database) = open_decision_log(&config.database).await?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let decision_service = Arc::new(DecisionService::new(
        Arc::new(client),
        Arc::new(decision_log),
    ));

    let app = with_decision_routes(decision_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        upstream = %config.decision_api.base_url,
        persistent_log = database.is_some(),
        "decision desk ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness_flag))
        .await;

    if let Some(pool) = database {
        pool.close().await;
    }
    served?;
    Ok(())
}

async fn shutdown_signal(readiness: Arc<std::sync::atomic::AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    readiness.store(false, Ordering::Release);
    info!("shutdown requested; draining connections");
}
