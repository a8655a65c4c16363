use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::AuthConfig;
use crate::db::Db;
use crate::handlers::{audit_reports, grievances, incident_reports, members, projects, tenants};
use crate::middleware::require_auth;

/// Everything a handler needs, cloned per request. The pool inside [`Db`]
/// is reference-counted, so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub auth: AuthConfig,
}

/// The full router: public banner and health endpoints, plus the `/api`
/// surface behind the bearer-token gate.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(tenant_routes())
        .merge(project_routes())
        .merge(member_routes())
        .merge(audit_report_routes())
        .merge(incident_report_routes())
        .merge(grievance_routes())
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(api)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn tenant_routes() -> Router<AppState> {
    Router::new().route(
        "/api/tenants",
        get(tenants::get).post(tenants::post).put(tenants::put),
    )
}

fn project_routes() -> Router<AppState> {
    Router::new().route(
        "/api/projects",
        get(projects::get).post(projects::post).put(projects::put),
    )
}

fn member_routes() -> Router<AppState> {
    Router::new().route(
        "/api/members",
        get(members::get)
            .post(members::post)
            .put(members::put)
            .delete(members::delete),
    )
}

fn audit_report_routes() -> Router<AppState> {
    Router::new().route(
        "/api/audit-reports",
        get(audit_reports::get)
            .post(audit_reports::post)
            .put(audit_reports::put)
            .delete(audit_reports::delete),
    )
}

fn incident_report_routes() -> Router<AppState> {
    Router::new().route(
        "/api/incident-reports",
        get(incident_reports::get)
            .post(incident_reports::post)
            .put(incident_reports::put)
            .delete(incident_reports::delete),
    )
}

fn grievance_routes() -> Router<AppState> {
    Router::new().route(
        "/api/grievances",
        get(grievances::get)
            .post(grievances::post)
            .put(grievances::put)
            .delete(grievances::delete),
    )
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health (public)",
            "tenants": "/api/tenants",
            "projects": "/api/projects?tenantId=",
            "members": "/api/members?tenantId=",
            "auditReports": "/api/audit-reports?tenantId=&projectId=",
            "incidentReports": "/api/incident-reports?tenantId=&projectId=",
            "grievances": "/api/grievances?tenantId=&projectId=",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "ok", "timestamp": now })),
        ),
        Err(e) => {
            warn!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable", "timestamp": now })),
            )
        }
    }
}
