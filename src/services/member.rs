use chrono::Utc;
use sqlx::{Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::db::Db;
use crate::error::ApiError;
use crate::models::{CreateMember, Membership, User};
use crate::services::is_unique_violation;
use crate::services::tenant::display_name_from_email;
use crate::validate::FieldErrors;

/// Invite a user into a tenant by email address.
///
/// Lookup and insert share one transaction: the user row is provisioned
/// when the address is new, then the membership is written, and a failure
/// in either leaves nothing behind. A second invite for the same address
/// is caller input, surfaced on the `email` field.
pub async fn invite(
    db: &Db,
    tenant_id: Uuid,
    input: CreateMember,
) -> Result<Membership, ApiError> {
    let membership = db
        .transaction(move |tx| {
            Box::pin(async move {
                // The tenant must exist; a made-up tenant id reads as a
                // miss, not a constraint failure
                sqlx::query_scalar::<_, Uuid>("SELECT \"id\" FROM \"tenants\" WHERE \"id\" = $1")
                    .bind(tenant_id)
                    .fetch_optional(&mut **tx)
                    .await?
                    .ok_or_else(ApiError::not_found)?;

                let user = ensure_user(tx, &input.email, input.display_name.as_deref()).await?;

                let now = Utc::now();
                let membership = sqlx::query_as::<_, Membership>(
                    "INSERT INTO \"memberships\" \
                     (\"id\", \"tenant_id\", \"user_id\", \"role\", \"project_ids\", \
                      \"created_at\", \"updated_at\") \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(tenant_id)
                .bind(user.id)
                .bind(&input.role)
                .bind(input.project_ids.clone().unwrap_or_default())
                .bind(now)
                .bind(now)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e, "memberships_tenant_id_user_id_key") {
                        let mut errors = FieldErrors::new();
                        errors.add("email", "already a member of this tenant");
                        ApiError::from(errors)
                    } else {
                        ApiError::from(e)
                    }
                })?;

                Ok::<_, ApiError>(membership)
            })
        })
        .await?;

    info!(
        "added member {} to tenant {} as {}",
        membership.user_id, membership.tenant_id, membership.role
    );
    Ok(membership)
}

/// The user row for an email address, created on first sight. Email is
/// the identity key; the display name only matters at provisioning time.
async fn ensure_user(
    tx: &mut Transaction<'static, Postgres>,
    email: &str,
    display_name: Option<&str>,
) -> Result<User, ApiError> {
    let existing = sqlx::query_as::<_, User>("SELECT * FROM \"users\" WHERE \"email\" = $1")
        .bind(email)
        .fetch_optional(&mut **tx)
        .await?;
    if let Some(user) = existing {
        return Ok(user);
    }

    let now = Utc::now();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO \"users\" \
         (\"id\", \"email\", \"display_name\", \"created_at\", \"updated_at\") \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(match display_name {
        Some(name) => name.to_string(),
        None => display_name_from_email(email),
    })
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    Ok(user)
}
