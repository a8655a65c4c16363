use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::params::{parse_body, ScopeParams};
use crate::handlers::require_project_in_tenant;
use crate::models::{AuditReport, CreateAuditReport, UpdateAuditReport};
use crate::services;

/// GET /api/audit-reports?tenantId=[&projectId=] - scoped listing.
/// With `id`, a single report including its result and non-conformities.
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let scope = params.scope()?;
    let repo = state.db.scoped::<AuditReport>(scope);

    if let Some(id) = params.record_id()? {
        let report = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;
        let detail = services::audit::load_detail(&state.db, report).await?;
        return Ok(Json(detail).into_response());
    }

    let reports = repo.find_many(params.list_filter()).await?;
    Ok(Json(reports).into_response())
}

/// POST /api/audit-reports?tenantId=&projectId= - create a report with
/// its result row and children, atomically.
pub async fn post(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let project_id = params.require_project()?;
    let input = parse_body::<CreateAuditReport>(&body)?;

    require_project_in_tenant(&state.db, tenant_id, project_id).await?;

    let detail = services::audit::create(&state.db, tenant_id, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(detail)).into_response())
}

/// PUT /api/audit-reports?tenantId=&id= - partial update; a present
/// `nonConformities` array replaces the stored children wholesale.
pub async fn put(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let id = params.require_id()?;
    let input = parse_body::<UpdateAuditReport>(&body)?;

    let detail = services::audit::update(&state.db, params.scope()?, id, input).await?;
    Ok(Json(detail).into_response())
}

/// DELETE /api/audit-reports?tenantId=&id= - delete the report, its
/// children, and finally its result row, in one transaction.
pub async fn delete(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let id = params.require_id()?;

    services::audit::delete(&state.db, params.scope()?, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
