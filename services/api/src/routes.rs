use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use rentwise::occupancy::{occupancy_router, OccupancyService};
use rentwise::store::EntityStore;
use rentwise::tenancy::{tenancy_router, TenantNotifier, TenantProvisioningService};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) const API_PREFIX: &str = "/api/v1";

/// Ops endpoints at the root, lifecycle endpoints under [`API_PREFIX`]. Callers add the
/// session, state and metrics layers.
pub(crate) fn with_lifecycle_routes<S, N>(
    occupancy: Arc<OccupancyService<S>>,
    provisioning: Arc<TenantProvisioningService<S, N>>,
) -> Router
where
    S: EntityStore + 'static,
    N: TenantNotifier + 'static,
{
    let api = occupancy_router(occupancy).merge(tenancy_router(provisioning));

    Router::new()
        .nest(API_PREFIX, api)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
