use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::params::{parse_body, ScopeParams};
use crate::handlers::require_project_in_tenant;
use crate::models::{CreateGrievance, Grievance, UpdateGrievance};

/// GET /api/grievances?tenantId=[&projectId=] - scoped listing with
/// `status`/`order`/`limit`/`offset` passthrough. Optional `id` fetches
/// one grievance.
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let repo = state.db.scoped::<Grievance>(params.scope()?);

    if let Some(id) = params.record_id()? {
        let grievance = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;
        return Ok(Json(grievance).into_response());
    }

    let grievances = repo.find_many(params.list_filter()).await?;
    Ok(Json(grievances).into_response())
}

/// POST /api/grievances?tenantId=&projectId= - log a grievance. Single
/// row, no children, so the write happens right here.
pub async fn post(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let project_id = params.require_project()?;
    let input = parse_body::<CreateGrievance>(&body)?;

    require_project_in_tenant(&state.db, tenant_id, project_id).await?;

    let now = Utc::now();
    let grievance = sqlx::query_as::<_, Grievance>(
        "INSERT INTO \"grievances\" \
         (\"id\", \"tenant_id\", \"project_id\", \"complainant\", \"channel\", \"description\", \
          \"status\", \"received_at\", \"resolved_at\", \"created_at\", \"updated_at\") \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(project_id)
    .bind(&input.complainant)
    .bind(&input.channel)
    .bind(&input.description)
    .bind("received")
    .bind(input.received_at.unwrap_or(now))
    .bind(Option::<chrono::DateTime<Utc>>::None)
    .bind(now)
    .bind(now)
    .fetch_one(state.db.pool())
    .await?;

    Ok((StatusCode::CREATED, Json(grievance)).into_response())
}

/// PUT /api/grievances?tenantId=&id= - partial update, including the
/// status walk to resolved/closed.
pub async fn put(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let id = params.require_id()?;
    let input = parse_body::<UpdateGrievance>(&body)?;

    let repo = state.db.scoped::<Grievance>(params.scope()?);
    let mut grievance = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;

    if let Some(complainant) = input.complainant {
        grievance.complainant = Some(complainant);
    }
    if let Some(channel) = input.channel {
        grievance.channel = channel;
    }
    if let Some(description) = input.description {
        grievance.description = description;
    }
    if let Some(status) = input.status {
        grievance.status = status;
    }
    if let Some(resolved_at) = input.resolved_at {
        grievance.resolved_at = Some(resolved_at);
    }

    let updated = sqlx::query_as::<_, Grievance>(
        "UPDATE \"grievances\" SET \"complainant\" = $1, \"channel\" = $2, \"description\" = $3, \
         \"status\" = $4, \"resolved_at\" = $5, \"updated_at\" = $6 WHERE \"id\" = $7 RETURNING *",
    )
    .bind(&grievance.complainant)
    .bind(&grievance.channel)
    .bind(&grievance.description)
    .bind(&grievance.status)
    .bind(grievance.resolved_at)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(state.db.pool())
    .await?;

    Ok(Json(updated).into_response())
}

/// DELETE /api/grievances?tenantId=&id= - remove a grievance after the
/// scoped ownership check.
pub async fn delete(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    params.require_tenant()?;
    let id = params.require_id()?;

    let repo = state.db.scoped::<Grievance>(params.scope()?);
    let grievance = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;

    sqlx::query("DELETE FROM \"grievances\" WHERE \"id\" = $1")
        .bind(grievance.id)
        .execute(state.db.pool())
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
