use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::db::{AccessScope, Db};
use crate::error::ApiError;
use crate::filter::types::FilterData;
use crate::handlers::params::{parse_body, ScopeParams};
use crate::middleware::AuthUser;
use crate::models::{CreateMember, Membership, Role, UpdateMember};
use crate::services;

/// Role gate for the mutating member routes. With no principal (auth
/// enforcement off) it passes; otherwise the caller needs an admin or
/// manager membership in the target tenant. Denial is the same 404 as a
/// scope miss so outsiders learn nothing.
async fn require_member_manager(
    db: &Db,
    tenant_id: Uuid,
    principal: Option<&AuthUser>,
) -> Result<(), ApiError> {
    let Some(principal) = principal else {
        return Ok(());
    };

    let membership = db
        .scoped::<Membership>(AccessScope::tenant(tenant_id))
        .find_first(FilterData::with_where(json!({ "user_id": principal.id })))
        .await?
        .ok_or_else(ApiError::not_found)?;

    let role: Role = membership.role.parse().map_err(|_| {
        tracing::error!("membership {} carries unknown role '{}'", membership.id, membership.role);
        ApiError::internal()
    })?;

    if role.can_manage_members() {
        Ok(())
    } else {
        Err(ApiError::not_found())
    }
}

/// GET /api/members?tenantId= - the tenant's memberships. Optional `id`
/// fetches one.
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let repo = state.db.scoped::<Membership>(AccessScope::tenant(tenant_id));

    if let Some(id) = params.record_id()? {
        let membership = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;
        return Ok(Json(membership).into_response());
    }

    let memberships = repo.find_many(params.page_filter()).await?;
    Ok(Json(memberships).into_response())
}

/// POST /api/members?tenantId= - invite by email. Provisions the user row
/// when the address is new.
pub async fn post(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    principal: Option<Extension<AuthUser>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let input = parse_body::<CreateMember>(&body)?;
    require_member_manager(&state.db, tenant_id, principal.as_deref()).await?;

    let membership = services::member::invite(&state.db, tenant_id, input).await?;
    Ok((StatusCode::CREATED, Json(membership)).into_response())
}

/// PUT /api/members?tenantId=&id= - change role or project assignment.
pub async fn put(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    principal: Option<Extension<AuthUser>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let id = params.require_id()?;
    let input = parse_body::<UpdateMember>(&body)?;
    require_member_manager(&state.db, tenant_id, principal.as_deref()).await?;

    let repo = state.db.scoped::<Membership>(AccessScope::tenant(tenant_id));
    let mut membership = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;

    if let Some(role) = input.role {
        membership.role = role;
    }
    if let Some(project_ids) = input.project_ids {
        membership.project_ids = project_ids;
    }

    let updated = sqlx::query_as::<_, Membership>(
        "UPDATE \"memberships\" SET \"role\" = $1, \"project_ids\" = $2, \"updated_at\" = $3 \
         WHERE \"id\" = $4 RETURNING *",
    )
    .bind(&membership.role)
    .bind(&membership.project_ids)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(state.db.pool())
    .await?;

    Ok(Json(updated).into_response())
}

/// DELETE /api/members?tenantId=&id= - remove a member from the tenant.
/// The user row stays; only the membership goes.
pub async fn delete(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
    principal: Option<Extension<AuthUser>>,
) -> Result<Response, ApiError> {
    let tenant_id = params.require_tenant()?;
    let id = params.require_id()?;
    require_member_manager(&state.db, tenant_id, principal.as_deref()).await?;

    let repo = state.db.scoped::<Membership>(AccessScope::tenant(tenant_id));
    let membership = repo.find_by_id(id).await?.ok_or_else(ApiError::not_found)?;

    sqlx::query("DELETE FROM \"memberships\" WHERE \"id\" = $1")
        .bind(membership.id)
        .execute(state.db.pool())
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
