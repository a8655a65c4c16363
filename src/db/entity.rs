use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::FromRow;

/// A persisted entity type that reads through the tenant-scoping facade.
///
/// Implementing this trait IS the registration step for the isolation layer:
/// [`ScopedRepo`](crate::db::repo::ScopedRepo) only accepts `E: ScopedEntity`,
/// so an entity without an implementation cannot be reached through a scoped
/// read path at all. There is no reflective fallback that could silently skip
/// the tenant filter.
pub trait ScopedEntity: for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin {
    /// Backing table. Must survive the identifier check in
    /// [`Filter::new`](crate::filter::Filter::new).
    const TABLE: &'static str;

    /// Whether the table carries a `project_id` column the facade may
    /// additionally narrow by. Tables scoped only through their parent row
    /// (child collections) are not `ScopedEntity` at all; they are reached
    /// by parent id after the parent's ownership has been proven.
    const PROJECT_SCOPED: bool;
}
