mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

// Ordering contract for mutating routes: identifier checks answer first,
// then body parsing, then field validation, and only then does anything
// touch the store. Every router here sits on a dead pool, so a test that
// accidentally reached the store would fail loudly instead of passing.

fn uuid() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::test]
async fn each_route_names_its_first_missing_identifier() -> Result<()> {
    let cases: &[(&str, String, &str)] = &[
        ("POST", "/api/projects".to_string(), "tenantId is required"),
        (
            "PUT",
            format!("/api/projects?tenantId={}", uuid()),
            "id is required",
        ),
        ("POST", "/api/members".to_string(), "tenantId is required"),
        (
            "DELETE",
            format!("/api/members?tenantId={}", uuid()),
            "id is required",
        ),
        ("PUT", "/api/tenants".to_string(), "id is required"),
        (
            "POST",
            format!("/api/audit-reports?tenantId={}", uuid()),
            "projectId is required",
        ),
        (
            "PUT",
            format!("/api/audit-reports?tenantId={}", uuid()),
            "id is required",
        ),
        (
            "DELETE",
            format!("/api/incident-reports?tenantId={}", uuid()),
            "id is required",
        ),
        ("POST", "/api/grievances".to_string(), "tenantId is required"),
        (
            "DELETE",
            "/api/grievances".to_string(),
            "tenantId is required",
        ),
    ];

    for (method, uri, expected) in cases {
        let router = common::offline_router();
        let (status, body) = common::request_json(router, method, uri, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert_eq!(body["error"], *expected, "{} {}", method, uri);
    }
    Ok(())
}

#[tokio::test]
async fn tenant_is_checked_before_project() -> Result<()> {
    let router = common::offline_router();
    let (status, body) = common::request_json(
        router,
        "POST",
        &format!("/api/incident-reports?projectId={}", uuid()),
        json!({ "title": "Spill", "severity": "high" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tenantId is required");
    Ok(())
}

#[tokio::test]
async fn malformed_identifiers_name_the_offending_field() -> Result<()> {
    let router = common::offline_router();
    let (status, body) = common::get(router, "/api/projects?tenantId=not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tenantId must be a UUID");

    let router = common::offline_router();
    let (status, body) = common::get(
        router,
        &format!("/api/audit-reports?tenantId={}&id=42", uuid()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "id must be a UUID");
    Ok(())
}

#[tokio::test]
async fn empty_identifier_reads_as_absent() -> Result<()> {
    let router = common::offline_router();
    let (status, body) = common::get(router, "/api/projects?tenantId=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tenantId is required");
    Ok(())
}

#[tokio::test]
async fn identifier_checks_beat_a_garbled_body() -> Result<()> {
    // Body is not even JSON, but the missing identifier answers first
    let router = common::offline_router();
    let (status, body) = common::request_raw(
        router,
        "POST",
        &format!("/api/audit-reports?projectId={}", uuid()),
        "this is not json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tenantId is required");
    Ok(())
}

#[tokio::test]
async fn body_parsing_follows_the_identifier_checks() -> Result<()> {
    let router = common::offline_router();
    let (status, body) = common::request_raw(
        router,
        "POST",
        &format!("/api/grievances?tenantId={}&projectId={}", uuid(), uuid()),
        "this is not json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap_or_default();
    assert!(
        message.starts_with("invalid request body"),
        "unexpected error: {}",
        message
    );
    Ok(())
}

#[tokio::test]
async fn validation_failures_carry_per_field_details() -> Result<()> {
    let router = common::offline_router();
    let (status, body) = common::request_json(
        router,
        "POST",
        &format!("/api/grievances?tenantId={}&projectId={}", uuid(), uuid()),
        json!({ "channel": "fax", "description": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation failed");
    assert!(body["details"]["channel"].is_array(), "details: {}", body);
    assert!(
        body["details"]["description"].is_array(),
        "details: {}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn child_collection_errors_are_indexed() -> Result<()> {
    let router = common::offline_router();
    let (status, body) = common::request_json(
        router,
        "POST",
        &format!("/api/audit-reports?tenantId={}&projectId={}", uuid(), uuid()),
        json!({
            "title": "Annual surveillance audit",
            "result": { "outcome": "compliant" },
            "nonConformities": [
                { "description": "Log missing", "severity": "minor" },
                { "description": "", "severity": "catastrophic" }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation failed");
    assert!(
        body["details"]["nonConformities[1].description"].is_array(),
        "details: {}",
        body
    );
    assert!(
        body["details"]["nonConformities[1].severity"].is_array(),
        "details: {}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn tenant_create_validates_its_body() -> Result<()> {
    let router = common::offline_router();
    let (status, body) =
        common::request_json(router, "POST", "/api/tenants", json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation failed");
    assert!(body["details"]["name"].is_array(), "details: {}", body);
    Ok(())
}

#[tokio::test]
async fn member_invite_validates_email_and_role() -> Result<()> {
    let router = common::offline_router();
    let (status, body) = common::request_json(
        router,
        "POST",
        &format!("/api/members?tenantId={}", uuid()),
        json!({ "email": "not-an-email", "role": "owner" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["email"].is_array(), "details: {}", body);
    assert!(body["details"]["role"].is_array(), "details: {}", body);
    Ok(())
}

#[tokio::test]
async fn absent_required_body_fields_read_as_a_parse_error() -> Result<()> {
    // CreateAuditReport requires a result object up front
    let router = common::offline_router();
    let (status, body) = common::request_json(
        router,
        "POST",
        &format!("/api/audit-reports?tenantId={}&projectId={}", uuid(), uuid()),
        json!({ "title": "No result attached" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap_or_default();
    assert!(
        message.starts_with("invalid request body"),
        "unexpected error: {}",
        message
    );
    Ok(())
}
