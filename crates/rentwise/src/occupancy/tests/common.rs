use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::{Extension, Router};
use chrono::NaiveDate;
use serde_json::Value;

use crate::access::{EmployeePermissions, NewUser, Role, SharedSessions, StaticSessions, User};
use crate::config::LeasePolicy;
use crate::occupancy::{
    occupancy_router, NewProperty, NewUnit, OccupancyService, OccupancyTarget, OccupyRequest,
    Property, Unit,
};
use crate::store::{EntityStore, MemoryStore, TenantRepository, UserRepository};
use crate::tenancy::{EmergencyContact, LeaseTerms, NewTenant, Tenant};

pub(super) fn user<S: UserRepository>(store: &S, email: &str, role: Role) -> User {
    store
        .insert_user(NewUser {
            name: email.split('@').next().unwrap_or("user").to_string(),
            email: email.to_string(),
            phone: None,
            role,
            password_hash: None,
            must_change_password: false,
        })
        .expect("user inserted")
}

pub(super) fn agent<S: UserRepository>(store: &S) -> User {
    user(store, "agent@example.com", Role::Agent)
}

pub(super) fn employee<S: UserRepository>(store: &S, permissions: EmployeePermissions) -> User {
    user(store, "staff@example.com", Role::Employee(permissions))
}

pub(super) fn service<S: EntityStore + 'static>(store: Arc<S>) -> OccupancyService<S> {
    OccupancyService::new(store, LeasePolicy::default())
}

pub(super) fn plain_property<S: EntityStore + 'static>(
    service: &OccupancyService<S>,
    actor: &User,
) -> Property {
    service
        .create_property(
            actor,
            NewProperty {
                title: "Cedar House".to_string(),
                address: "4 Cedar Rd".to_string(),
                has_units: false,
                rent: Some(1500),
                deposit: Some(1500),
                agent: None,
            },
        )
        .expect("plain property created")
}

pub(super) fn new_unit(number: &str) -> NewUnit {
    NewUnit {
        unit_number: number.to_string(),
        area: 48.0,
        rent: 15000,
        deposit: 15000,
        bedrooms: Some(2),
    }
}

pub(super) fn unit_property<S: EntityStore + 'static>(
    service: &OccupancyService<S>,
    actor: &User,
    numbers: &[&str],
) -> (Property, Vec<Unit>) {
    let property = service
        .create_property(
            actor,
            NewProperty {
                title: "Harbor Flats".to_string(),
                address: "90 Harbor Way".to_string(),
                has_units: true,
                rent: None,
                deposit: None,
                agent: None,
            },
        )
        .expect("unit property created");
    let units = service
        .add_units(
            actor,
            &property.id,
            numbers.iter().map(|number| new_unit(number)).collect(),
        )
        .expect("units added");
    (property, units)
}

pub(super) fn lease() -> LeaseTerms {
    LeaseTerms {
        move_in_date: date(2025, 2, 1),
        lease_start_date: date(2025, 2, 1),
        lease_end_date: date(2026, 1, 31),
        rent_amount: 15000,
        deposit_amount: 15000,
    }
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Draft for a fresh occupant account bound to `target`.
pub(super) fn tenant_draft<S: UserRepository>(
    store: &S,
    target: &OccupancyTarget,
    created_by: &User,
) -> NewTenant {
    let email = format!("{}@occupants.test", target.to_string().replace(' ', "-"));
    let occupant = user(store, &email, Role::Tenant);
    NewTenant {
        user_id: occupant.id,
        target: target.clone(),
        lease: lease(),
        emergency_contact: EmergencyContact {
            name: "Morgan".to_string(),
            phone: "555-0199".to_string(),
            relationship: Some("sibling".to_string()),
        },
        employment: None,
        references: Vec::new(),
        created_by: created_by.id.clone(),
    }
}

/// Inserts an active tenant bound to `target` without occupying it.
pub(super) fn bind_tenant<S>(store: &S, target: &OccupancyTarget, created_by: &User) -> Tenant
where
    S: TenantRepository + UserRepository,
{
    store
        .insert_tenant(tenant_draft(store, target, created_by))
        .expect("tenant inserted")
}

pub(super) fn occupy_request(tenant: &Tenant) -> OccupyRequest {
    OccupyRequest {
        tenant_id: tenant.id.clone(),
        lease_start: Some(tenant.lease.lease_start_date),
        lease_end: Some(tenant.lease.lease_end_date),
    }
}

/// Router with a session table granting `token` to each listed user.
pub(super) fn router_with_sessions(
    service: OccupancyService<MemoryStore>,
    grants: &[(&str, &User)],
) -> Router {
    let store = service.store().clone();
    let sessions = StaticSessions::new(store);
    for (token, user) in grants {
        sessions
            .grant(*token, user.id.clone())
            .expect("session granted");
    }
    let sessions: SharedSessions = Arc::new(sessions);

    occupancy_router(Arc::new(service)).layer(Extension(sessions))
}

pub(super) fn json_request(method: Method, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn bare_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
