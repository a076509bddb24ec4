use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{NewProperty, NewUnit, OccupancyTarget, OccupyRequest, PropertyId, UnitId};
use super::service::OccupancyService;
use crate::access::Actor;
use crate::error::LifecycleError;
use crate::extract::JsonBody;
use crate::store::EntityStore;

/// Body of `PATCH /properties/:id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPatch {
    #[serde(default)]
    pub has_units: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UnitBatch {
    pub units: Vec<NewUnit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequest {
    pub under_maintenance: bool,
}

/// Router builder exposing property, unit and occupancy endpoints. Paths are unprefixed so
/// the binary decides where to mount them.
pub fn occupancy_router<S>(service: Arc<OccupancyService<S>>) -> Router
where
    S: EntityStore + 'static,
{
    Router::new()
        .route("/properties", post(create_property_handler::<S>))
        .route(
            "/properties/:property_id",
            get(get_property_handler::<S>)
                .patch(patch_property_handler::<S>)
                .delete(delete_property_handler::<S>),
        )
        .route(
            "/properties/:property_id/occupy",
            patch(occupy_property_handler::<S>),
        )
        .route(
            "/properties/:property_id/vacate",
            patch(vacate_property_handler::<S>),
        )
        .route(
            "/properties/:property_id/maintenance",
            patch(property_maintenance_handler::<S>),
        )
        .route(
            "/properties/:property_id/units",
            get(list_units_handler::<S>).post(add_units_handler::<S>),
        )
        .route(
            "/properties/:property_id/units/import",
            post(import_units_handler::<S>),
        )
        .route(
            "/properties/:property_id/units/:unit_id/occupy",
            patch(occupy_unit_handler::<S>),
        )
        .route(
            "/properties/:property_id/units/:unit_id/vacate",
            patch(vacate_unit_handler::<S>),
        )
        .route(
            "/properties/:property_id/units/:unit_id/maintenance",
            patch(unit_maintenance_handler::<S>),
        )
        .with_state(service)
}

fn unit_target(property_id: String, unit_id: String) -> OccupancyTarget {
    OccupancyTarget::unit(PropertyId(property_id), UnitId(unit_id))
}

fn property_target(property_id: String) -> OccupancyTarget {
    OccupancyTarget::property(PropertyId(property_id))
}

pub(crate) async fn create_property_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    JsonBody(draft): JsonBody<NewProperty>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let property = service.create_property(&actor, draft)?;
    Ok((StatusCode::CREATED, Json(property)).into_response())
}

pub(crate) async fn get_property_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let view = service.get_property(&actor, &PropertyId(property_id))?;
    Ok(Json(view).into_response())
}

pub(crate) async fn patch_property_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
    JsonBody(patch): JsonBody<PropertyPatch>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let has_units = patch.has_units.ok_or_else(|| {
        LifecycleError::Validation("hasUnits is the only updatable field".to_string())
    })?;
    let property = service.set_unit_mode(&actor, &PropertyId(property_id), has_units)?;
    Ok(Json(property).into_response())
}

pub(crate) async fn delete_property_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let id = PropertyId(property_id);
    let removed_units = service.delete_property(&actor, &id)?;
    let payload = json!({
        "id": id,
        "removedUnits": removed_units,
    });
    Ok(Json(payload).into_response())
}

pub(crate) async fn occupy_property_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
    JsonBody(request): JsonBody<OccupyRequest>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let state = service.occupy(&actor, &property_target(property_id), &request)?;
    Ok(Json(state).into_response())
}

pub(crate) async fn vacate_property_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let release = service.vacate(&actor, &property_target(property_id))?;
    Ok(Json(release).into_response())
}

pub(crate) async fn property_maintenance_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
    JsonBody(request): JsonBody<MaintenanceRequest>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let state = service.set_maintenance(
        &actor,
        &property_target(property_id),
        request.under_maintenance,
    )?;
    Ok(Json(state).into_response())
}

pub(crate) async fn list_units_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let units = service.list_units(&actor, &PropertyId(property_id))?;
    Ok(Json(json!({ "units": units })).into_response())
}

pub(crate) async fn add_units_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
    JsonBody(batch): JsonBody<UnitBatch>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let units = service.add_units(&actor, &PropertyId(property_id), batch.units)?;
    Ok((StatusCode::CREATED, Json(json!({ "units": units }))).into_response())
}

pub(crate) async fn import_units_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path(property_id): Path<String>,
    roster: String,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let units = service.import_units(&actor, &PropertyId(property_id), &roster)?;
    Ok((StatusCode::CREATED, Json(json!({ "units": units }))).into_response())
}

pub(crate) async fn occupy_unit_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path((property_id, unit_id)): Path<(String, String)>,
    JsonBody(request): JsonBody<OccupyRequest>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let state = service.occupy(&actor, &unit_target(property_id, unit_id), &request)?;
    Ok(Json(state).into_response())
}

pub(crate) async fn vacate_unit_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path((property_id, unit_id)): Path<(String, String)>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let release = service.vacate(&actor, &unit_target(property_id, unit_id))?;
    Ok(Json(release).into_response())
}

pub(crate) async fn unit_maintenance_handler<S>(
    State(service): State<Arc<OccupancyService<S>>>,
    Actor(actor): Actor,
    Path((property_id, unit_id)): Path<(String, String)>,
    JsonBody(request): JsonBody<MaintenanceRequest>,
) -> Result<Response, LifecycleError>
where
    S: EntityStore + 'static,
{
    let state = service.set_maintenance(
        &actor,
        &unit_target(property_id, unit_id),
        request.under_maintenance,
    )?;
    Ok(Json(state).into_response())
}
