use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::{Extension, Router};
use chrono::NaiveDate;
use serde_json::Value;

use crate::access::{
    EmployeePermissions, NewOccupant, NewUser, Role, SharedSessions, StaticSessions, User,
};
use crate::config::{LeasePolicy, SecurityConfig};
use crate::occupancy::{NewProperty, NewUnit, OccupancyService, Property, Unit};
use crate::store::testing::ScriptedStore;
use crate::store::{EntityStore, UserRepository};
use crate::tenancy::{
    tenancy_router, EmergencyContact, NotificationError, ProvisionTenantRequest,
    TenantNotifier, TenantProvisioningService, WelcomeNotice,
};

pub(super) type Provisioning = TenantProvisioningService<ScriptedStore, RecordingNotifier>;

#[derive(Default)]
pub(super) struct RecordingNotifier {
    notices: Mutex<Vec<WelcomeNotice>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(super) fn failing() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(super) fn notices(&self) -> Vec<WelcomeNotice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }
}

impl TenantNotifier for RecordingNotifier {
    fn welcome(&self, notice: &WelcomeNotice) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Delivery("mail relay offline".to_string()));
        }
        self.notices
            .lock()
            .expect("notice mutex poisoned")
            .push(notice.clone());
        Ok(())
    }
}

pub(super) struct Harness {
    pub(super) store: Arc<ScriptedStore>,
    pub(super) occupancy: Arc<OccupancyService<ScriptedStore>>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) service: Arc<Provisioning>,
    pub(super) agent: User,
}

pub(super) fn harness() -> Harness {
    harness_with(RecordingNotifier::default())
}

pub(super) fn harness_with(notifier: RecordingNotifier) -> Harness {
    let store = Arc::new(ScriptedStore::new());
    let occupancy = Arc::new(OccupancyService::new(store.clone(), LeasePolicy::default()));
    let notifier = Arc::new(notifier);
    let service = Arc::new(TenantProvisioningService::new(
        occupancy.clone(),
        notifier.clone(),
        &SecurityConfig {
            password_hash_cost: 4,
            temporary_password_length: 12,
        },
    ));
    let agent = user(store.as_ref(), "agent@example.com", Role::Agent);

    Harness {
        store,
        occupancy,
        notifier,
        service,
        agent,
    }
}

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

pub(super) fn employee<S: UserRepository>(store: &S, permissions: EmployeePermissions) -> User {
    user(store, "staff@example.com", Role::Employee(permissions))
}

pub(super) fn unit_property<S: EntityStore + 'static>(
    occupancy: &OccupancyService<S>,
    actor: &User,
    numbers: &[&str],
) -> (Property, Vec<Unit>) {
    let property = occupancy
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
    let units = occupancy
        .add_units(
            actor,
            &property.id,
            numbers
                .iter()
                .map(|number| NewUnit {
                    unit_number: number.to_string(),
                    area: 52.0,
                    rent: 15000,
                    deposit: 15000,
                    bedrooms: Some(2),
                })
                .collect(),
        )
        .expect("units added");
    (property, units)
}

pub(super) fn plain_property<S: EntityStore + 'static>(
    occupancy: &OccupancyService<S>,
    actor: &User,
) -> Property {
    occupancy
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

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Scenario B request: new occupant, twelve month lease at 15000/15000.
pub(super) fn request_for(
    property: &Property,
    unit: Option<&Unit>,
    email: &str,
) -> ProvisionTenantRequest {
    ProvisionTenantRequest {
        property: property.id.clone(),
        unit: unit.map(|unit| unit.id.clone()),
        user_id: None,
        user_data: Some(NewOccupant {
            name: "Jordan Reyes".to_string(),
            email: email.to_string(),
            phone: Some("555-0142".to_string()),
        }),
        move_in_date: None,
        lease_start_date: date(2025, 3, 1),
        lease_end_date: None,
        lease_duration_months: Some(12),
        rent_amount: Some(15000),
        deposit_amount: Some(15000),
        emergency_contact: EmergencyContact {
            name: "Casey Reyes".to_string(),
            phone: "555-0143".to_string(),
            relationship: Some("parent".to_string()),
        },
        employment: None,
        references: Vec::new(),
    }
}

pub(super) fn router_with_sessions(harness: &Harness, grants: &[(&str, &User)]) -> Router {
    let sessions = StaticSessions::new(harness.store.clone());
    for (token, user) in grants {
        sessions
            .grant(*token, user.id.clone())
            .expect("session granted");
    }
    let sessions: SharedSessions = Arc::new(sessions);

    tenancy_router(harness.service.clone()).layer(Extension(sessions))
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

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
