use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::domain::{ProvisionTenantRequest, TenantId};
use super::notify::TenantNotifier;
use super::provisioning::TenantProvisioningService;
use crate::access::Actor;
use crate::error::LifecycleError;
use crate::extract::JsonBody;
use crate::store::EntityStore;

/// Router builder exposing tenant provisioning endpoints.
pub fn tenancy_router<S, N>(service: Arc<TenantProvisioningService<S, N>>) -> Router
where
    S: EntityStore + 'static,
    N: TenantNotifier + 'static,
{
    Router::new()
        .route("/tenants", post(provision_handler::<S, N>))
        .route("/tenants/:tenant_id", get(tenant_handler::<S, N>))
        .route(
            "/tenants/:tenant_id/occupancy",
            post(retry_occupancy_handler::<S, N>),
        )
        .with_state(service)
}

/// Provisioning hashes a temporary password, so it runs off the async workers.
pub(crate) async fn provision_handler<S, N>(
    State(service): State<Arc<TenantProvisioningService<S, N>>>,
    Actor(actor): Actor,
    JsonBody(request): JsonBody<ProvisionTenantRequest>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
    N: TenantNotifier + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.provision(&actor, request))
        .await
        .map_err(|error| LifecycleError::Internal(format!("provisioning task failed: {error}")))??;

    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

pub(crate) async fn tenant_handler<S, N>(
    State(service): State<Arc<TenantProvisioningService<S, N>>>,
    Actor(actor): Actor,
    Path(tenant_id): Path<String>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
    N: TenantNotifier + 'static,
{
    let tenant = service.get_tenant(&actor, &TenantId(tenant_id))?;
    Ok(Json(tenant).into_response())
}

pub(crate) async fn retry_occupancy_handler<S, N>(
    State(service): State<Arc<TenantProvisioningService<S, N>>>,
    Actor(actor): Actor,
    Path(tenant_id): Path<String>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
    N: TenantNotifier + 'static,
{
    let state = service.retry_occupancy(&actor, &TenantId(tenant_id))?;
    Ok(Json(state).into_response())
}
