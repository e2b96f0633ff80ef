use crate::infra::{AppState, DeskService};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use training_nominations::workflows::nomination::nomination_router;

pub(crate) fn with_nomination_routes(service: Arc<DeskService>) -> axum::Router {
    nomination_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "training-nominations" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let seal_secret = if state.development_seal {
        "development"
    } else {
        "configured"
    };

    if state.readiness.load(std::sync::atomic::Ordering::Acquire) {
        (
            StatusCode::OK,
            Json(json!({ "status": "ready", "seal_secret": seal_secret })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing", "seal_secret": seal_secret })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
