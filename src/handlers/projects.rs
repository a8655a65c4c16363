use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::app::AppState;
use crate::db::AccessScope;
use crate::error::ApiError;
use crate::handlers::params::{parse_body, ScopeParams};
use crate::models::{CreateProject, Project, UpdateProject};

/// GET /api/projects?tenantId= - the tenant's projects. Optional `id`
/// fetches one project, 404 when it is not in scope.
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let repo = state.db.scoped::<Project>(AccessScope::tenant(tenant_id));

    if let Some(id) = params.record_id()? {
        let project = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;
        return Ok(Json(project).into_response());
    }

    let projects = repo.find_many(params.list_filter()).await?;
    Ok(Json(projects).into_response())
}

/// POST /api/projects?tenantId= - create a project under the tenant.
pub async fn post(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let input = parse_body::<CreateProject>(&body)?;

    // The tenant must exist; a made-up tenant id reads as a miss, not a
    // constraint failure
    sqlx::query_scalar::<_, Uuid>("SELECT \"id\" FROM \"tenants\" WHERE \"id\" = $1")
        .bind(tenant_id)
        .fetch_optional(state.db.pool())
        .await?
        .ok_or_else(ApiError::not_found)?;

    let now = Utc::now();
    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO \"projects\" \
         (\"id\", \"tenant_id\", \"name\", \"description\", \"status\", \"created_at\", \"updated_at\") \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.status.as_deref().unwrap_or("active"))
    .bind(now)
    .bind(now)
    .fetch_one(state.db.pool())
    .await?;

    Ok((StatusCode::CREATED, Json(project)).into_response())
}

/// PUT /api/projects?tenantId=&id= - update name, description or status.
/// The tenant reference is immutable.
pub async fn put(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let id = params.require_id()?;
    let input = parse_body::<UpdateProject>(&body)?;

    let repo = state.db.scoped::<Project>(AccessScope::tenant(tenant_id));
    let mut project = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;

    if let Some(name) = input.name {
        project.name = name;
    }
    if let Some(description) = input.description {
        project.description = Some(description);
    }
    if let Some(status) = input.status {
        project.status = status;
    }

    let updated = sqlx::query_as::<_, Project>(
        "UPDATE \"projects\" SET \"name\" = $1, \"description\" = $2, \"status\" = $3, \
         \"updated_at\" = $4 WHERE \"id\" = $5 RETURNING *",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(&project.status)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(state.db.pool())
    .await?;

    Ok(Json(updated).into_response())
}
