use chrono::Utc;
use sqlx::{Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::db::Db;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{derive_slug, CreateTenant, Role, Tenant};
use crate::services::is_unique_violation;
use crate::validate::FieldErrors;

/// Create a tenant and, when the caller is authenticated, enroll them as
/// its founding admin. One transaction: a failed enrollment leaves no
/// orphan tenant behind.
///
/// The slug is derived from the name, and a collision is caller input
/// (pick another name), not a server fault.
pub async fn create_tenant(
    db: &Db,
    input: CreateTenant,
    founder: Option<AuthUser>,
) -> Result<Tenant, ApiError> {
    let slug = derive_slug(&input.name);

    let tenant = db
        .transaction(move |tx| {
            Box::pin(async move {
                let now = Utc::now();
                let tenant = sqlx::query_as::<_, Tenant>(
                    "INSERT INTO \"tenants\" \
                     (\"id\", \"name\", \"slug\", \"description\", \"created_at\", \"updated_at\") \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(input.name.trim())
                .bind(&slug)
                .bind(&input.description)
                .bind(now)
                .bind(now)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e, "tenants_slug_key") {
                        let mut errors = FieldErrors::new();
                        errors.add("slug", "already taken, pick a different name");
                        ApiError::from(errors)
                    } else {
                        ApiError::from(e)
                    }
                })?;

                if let Some(founder) = &founder {
                    enroll_founder(tx, tenant.id, founder).await?;
                }

                Ok::<_, ApiError>(tenant)
            })
        })
        .await?;

    info!("created tenant '{}' ({})", tenant.slug, tenant.id);
    Ok(tenant)
}

/// Admin membership for the creating caller. The user row is looked up by
/// email and provisioned under the token's subject id when the address is
/// new, so later tokens keep resolving to the same account.
async fn enroll_founder(
    tx: &mut Transaction<'static, Postgres>,
    tenant_id: Uuid,
    founder: &AuthUser,
) -> Result<(), ApiError> {
    let existing = sqlx::query_scalar::<_, Uuid>("SELECT \"id\" FROM \"users\" WHERE \"email\" = $1")
        .bind(&founder.email)
        .fetch_optional(&mut **tx)
        .await?;

    let user_id = match existing {
        Some(id) => id,
        None => {
            let now = Utc::now();
            sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO \"users\" \
                 (\"id\", \"email\", \"display_name\", \"created_at\", \"updated_at\") \
                 VALUES ($1, $2, $3, $4, $5) RETURNING \"id\"",
            )
            .bind(founder.id)
            .bind(&founder.email)
            .bind(display_name_from_email(&founder.email))
            .bind(now)
            .bind(now)
            .fetch_one(&mut **tx)
            .await?
        }
    };

    let now = Utc::now();
    sqlx::query(
        "INSERT INTO \"memberships\" \
         (\"id\", \"tenant_id\", \"user_id\", \"role\", \"project_ids\", \"created_at\", \"updated_at\") \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(user_id)
    .bind(Role::Admin.as_str())
    .bind(Vec::<Uuid>::new())
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Placeholder display name until the user sets one: the part of the
/// address before the '@'.
pub(crate) fn display_name_from_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, _)) => local.to_string(),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_the_local_part() {
        assert_eq!(display_name_from_email("ona@delta-hydro.example"), "ona");
        assert_eq!(display_name_from_email("no-at-sign"), "no-at-sign");
    }
}
