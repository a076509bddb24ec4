use super::common::*;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::access::{Capability, EmployeePermissions};

#[tokio::test]
async fn provisioning_route_returns_created_with_credential() {
    let h = harness();
    let (property, units) = unit_property(&h.occupancy, &h.agent, &["A-1"]);
    let router = router_with_sessions(&h, &[("agent-token", &h.agent)]);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/tenants",
            "agent-token",
            json!({
                "property": property.id,
                "unit": units[0].id,
                "userData": { "name": "Jordan Reyes", "email": "jordan@example.com" },
                "leaseStartDate": "2025-03-01",
                "leaseDurationMonths": 12,
                "rentAmount": 15000,
                "depositAmount": 15000,
                "emergencyContact": { "name": "Casey Reyes", "phone": "555-0143" }
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("warnings"), Some(&json!([])));
    assert_eq!(payload.pointer("/tenant/rentAmount"), Some(&json!(15000)));
    assert_eq!(
        payload.pointer("/tenant/leaseEndDate"),
        Some(&json!("2026-03-01"))
    );
    assert_eq!(
        payload.pointer("/credential/mustChangePassword"),
        Some(&json!(true))
    );
}

#[tokio::test]
async fn partial_failure_is_reported_as_created_with_warning() {
    let h = harness();
    let (property, units) = unit_property(&h.occupancy, &h.agent, &["A-1"]);
    h.store.fail_transitions(true);
    let router = router_with_sessions(&h, &[("agent-token", &h.agent)]);

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/tenants",
            "agent-token",
            serde_json::to_value(request_for(&property, Some(&units[0]), "jordan@example.com"))
                .expect("request serializes"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("warnings"),
        Some(&json!(["unit occupation failed — manual follow-up required"]))
    );
    let tenant_id = payload
        .pointer("/tenant/id")
        .and_then(|value| value.as_str())
        .expect("tenant id")
        .to_string();

    h.store.fail_transitions(false);
    let retried = router
        .oneshot(json_request(
            Method::POST,
            &format!("/tenants/{tenant_id}/occupancy"),
            "agent-token",
            json!({}),
        ))
        .await
        .expect("route executes");
    assert_eq!(retried.status(), StatusCode::OK);
    let payload = read_json_body(retried).await;
    assert_eq!(payload.get("availability"), Some(&json!("occupied")));
}

#[tokio::test]
async fn employee_without_create_flag_gets_forbidden() {
    let h = harness();
    let property = plain_property(&h.occupancy, &h.agent);
    let clerk = employee(
        h.store.as_ref(),
        EmployeePermissions::default().with(Capability::ManageProperties),
    );
    let router = router_with_sessions(&h, &[("clerk-token", &clerk)]);

    let response = router
        .oneshot(json_request(
            Method::POST,
            "/tenants",
            "clerk-token",
            serde_json::to_value(request_for(&property, None, "jordan@example.com"))
                .expect("request serializes"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_tenant_is_not_found() {
    let h = harness();
    let router = router_with_sessions(&h, &[("agent-token", &h.agent)]);

    let response = router
        .oneshot(
            axum::http::Request::builder()
                .method(Method::GET)
                .uri("/tenants/ten-999999")
                .header(axum::http::header::AUTHORIZATION, "Bearer agent-token")
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
