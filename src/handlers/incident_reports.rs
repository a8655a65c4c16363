use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::params::{parse_body, ScopeParams};
use crate::handlers::require_project_in_tenant;
use crate::models::{CreateIncidentReport, IncidentReport, UpdateIncidentReport};
use crate::services;

/// GET /api/incident-reports?tenantId=[&projectId=] - scoped listing.
/// With `id`, a single report including involved persons and corrective
/// actions.
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let scope = params.scope()?;
    let repo = state.db.scoped::<IncidentReport>(scope);

    if let Some(id) = params.record_id()? {
        let report = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;
        let detail = services::incident::load_detail(&state.db, report).await?;
        return Ok(Json(detail).into_response());
    }

    let reports = repo.find_many(params.list_filter()).await?;
    Ok(Json(reports).into_response())
}

/// POST /api/incident-reports?tenantId=&projectId= - create a report with
/// both child collections, atomically.
pub async fn post(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let project_id = params.require_project()?;
    let input = parse_body::<CreateIncidentReport>(&body)?;

    require_project_in_tenant(&state.db, tenant_id, project_id).await?;

    let detail = services::incident::create(&state.db, tenant_id, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(detail)).into_response())
}

/// PUT /api/incident-reports?tenantId=&id= - partial update; present
/// child arrays replace the stored collections wholesale.
pub async fn put(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let id = params.require_id()?;
    let input = parse_body::<UpdateIncidentReport>(&body)?;

    let detail = services::incident::update(&state.db, params.scope()?, id, input).await?;
    Ok(Json(detail).into_response())
}

/// DELETE /api/incident-reports?tenantId=&id= - delete the report and
/// both child collections in one transaction.
pub async fn delete(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let id = params.require_id()?;

    services::incident::delete(&state.db, params.scope()?, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
