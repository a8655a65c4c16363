mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use esms_api::auth::{issue_token, Claims};
use esms_api::config::AuthConfig;

// The bearer gate runs before every other check on /api routes, so these
// tests never need a database: a request that gets past the gate hits the
// identifier checks and comes back 400 before any store access.

const SECRET: &str = "integration-test-secret";

fn enforced() -> AuthConfig {
    AuthConfig {
        required: true,
        jwt_secret: SECRET.to_string(),
        token_ttl_hours: 1,
    }
}

fn token_for(user_id: Uuid, email: &str) -> String {
    issue_token(&Claims::new(user_id, email, 1), SECRET).unwrap()
}

#[tokio::test]
async fn missing_token_is_rejected_before_anything_else() -> Result<()> {
    // No tenantId either; the 401 proves auth is checked first
    let router = common::offline_router_with_auth(enforced());
    let (status, body) = common::get(router, "/api/projects").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing authorization header");

    let router = common::offline_router_with_auth(enforced());
    let (status, _) = common::request_json(
        router,
        "POST",
        "/api/tenants",
        json!({ "name": "Delta Hydro" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn garbage_and_expired_tokens_are_rejected() -> Result<()> {
    let router = common::offline_router_with_auth(enforced());
    let (status, body) =
        common::request_authed(router, "GET", "/api/projects", "not.a.token", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid token");

    let expired = issue_token(&Claims::new(Uuid::new_v4(), "old@example.org", -2), SECRET).unwrap();
    let router = common::offline_router_with_auth(enforced());
    let (status, _) =
        common::request_authed(router, "GET", "/api/projects", &expired, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn valid_token_reaches_the_identifier_gate() -> Result<()> {
    let token = token_for(Uuid::new_v4(), "auditor@example.org");
    let router = common::offline_router_with_auth(enforced());
    let (status, body) = common::request_authed(router, "GET", "/api/projects", &token, json!({})).await;
    // Past the gate: the next check in line answers, not the store
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tenantId is required");
    Ok(())
}

#[tokio::test]
async fn wrong_secret_tokens_fail() -> Result<()> {
    let foreign = issue_token(
        &Claims::new(Uuid::new_v4(), "auditor@example.org", 1),
        "some-other-secret",
    )
    .unwrap();
    let router = common::offline_router_with_auth(enforced());
    let (status, _) = common::request_authed(router, "GET", "/api/members", &foreign, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn banner_and_health_stay_public() -> Result<()> {
    let router = common::offline_router_with_auth(enforced());
    let (status, body) = common::get(router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "esms-api");

    // Dead pool: degraded, but never 401
    let router = common::offline_router_with_auth(enforced());
    let (status, body) = common::get(router, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    Ok(())
}

#[tokio::test]
async fn disabled_enforcement_passes_requests_through() -> Result<()> {
    let router = common::offline_router();
    let (status, body) = common::get(router, "/api/projects").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "tenantId is required");
    Ok(())
}
