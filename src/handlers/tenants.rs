use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::params::{parse_body, ScopeParams};
use crate::middleware::AuthUser;
use crate::models::{CreateTenant, Tenant, UpdateTenant};
use crate::services;

/// GET /api/tenants - tenant-agnostic listing, used to pick an
/// organization to join. Optional `id` fetches a single tenant.
///
/// This is the one documented read that runs without a tenant scope.
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    if let Some(id) = params.record_id()? {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM \"tenants\" WHERE \"id\" = $1")
            .bind(id)
            .fetch_optional(state.db.pool())
            .await?
            .ok_or_else(ApiError::not_found)?;
        return Ok(Json(tenant).into_response());
    }

    let tenants = sqlx::query_as::<_, Tenant>("SELECT * FROM \"tenants\" ORDER BY \"name\"")
        .fetch_all(state.db.pool())
        .await?;
    Ok(Json(tenants).into_response())
}

/// POST /api/tenants - self-service creation. The slug is derived from the
/// name; an authenticated caller becomes the founding admin.
pub async fn post(
    State(state): State<AppState>,
    principal: Option<Extension<AuthUser>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let input = parse_body::<CreateTenant>(&body)?;
    let founder = principal.map(|Extension(user)| user);
    let tenant = services::tenant::create_tenant(&state.db, input, founder).await?;
    Ok((StatusCode::CREATED, Json(tenant)).into_response())
}

/// PUT /api/tenants?id= - rename or re-describe. The slug never changes,
/// and tenants are never deleted.
pub async fn put(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id = params.require_id()?;
    let input = parse_body::<UpdateTenant>(&body)?;

    let mut tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM \"tenants\" WHERE \"id\" = $1")
        .bind(id)
        .fetch_optional(state.db.pool())
        .await?
        .ok_or_else(ApiError::not_found)?;

    if let Some(name) = input.name {
        tenant.name = name;
    }
    if let Some(description) = input.description {
        tenant.description = Some(description);
    }

    let updated = sqlx::query_as::<_, Tenant>(
        "UPDATE \"tenants\" SET \"name\" = $1, \"description\" = $2, \"updated_at\" = $3 \
         WHERE \"id\" = $4 RETURNING *",
    )
    .bind(&tenant.name)
    .bind(&tenant.description)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(state.db.pool())
    .await?;

    Ok(Json(updated).into_response())
}
