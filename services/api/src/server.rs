use crate::cli::ServeArgs;
use crate::infra::{AppState, BackendClients};
use crate::routes::with_inspection_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use inspection_ai::config::AppConfig;
use inspection_ai::error::AppError;
use inspection_ai::telemetry;
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

    let clients = BackendClients::from_config(&config)?;
    info!(
        generator = clients.generator.endpoint(),
        store = %clients.store.table_url(),
        "inspection backend configured"
    );
    let sessions = Arc::new(clients.sessions().with_variant_switch(config.variant_switch));

    let app = with_inspection_routes(sessions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "inspection report service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
