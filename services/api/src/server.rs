use crate::cli::ServeArgs;
use crate::infra::{in_memory_service, AppState};
use crate::routes::with_nomination_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use training_nominations::config::AppConfig;
use training_nominations::error::AppError;
use training_nominations::telemetry;
use training_nominations::workflows::roster::RosterImporter;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    if config.seal.ephemeral {
        warn!("NOMINATION_SEAL_SECRET not set; using a development seal secret");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        development_seal: config.seal.ephemeral,
    };

    let (service, store) = in_memory_service(&config);
    if let Some(path) = args.roster.take() {
        let summary = RosterImporter::from_config(&config.roster).from_path(&path, store.as_ref())?;
        info!(
            path = %path.display(),
            created = summary.created,
            errors = summary.errors,
            "nominal roll preloaded"
        );
    }

    let app = with_nomination_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "training nomination desk ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
