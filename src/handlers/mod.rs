// One module per resource; each exports get/post/put/delete route
// functions. Gate helpers shared by the record routes live in `params`.
pub mod audit_reports;
pub mod grievances;
pub mod incident_reports;
pub mod members;
pub mod params;
pub mod projects;
pub mod tenants;

use uuid::Uuid;

use crate::db::{AccessScope, Db};
use crate::error::ApiError;
use crate::models::Project;

/// Create-side ownership check: the target project must belong to the
/// caller's tenant, else the same 404 a scoped read would give. Keeps a
/// record from being filed under tenant A against tenant B's project.
pub(crate) async fn require_project_in_tenant(
    db: &Db,
    tenant_id: Uuid,
    project_id: Uuid,
) -> Result<(), ApiError> {
    db.scoped::<Project>(AccessScope::tenant(tenant_id))
        .find_by_id(project_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(())
}
