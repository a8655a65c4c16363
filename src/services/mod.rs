//! Multi-statement write flows.
//!
//! Handlers stay thin; anything that must happen atomically (parent plus
//! children, lookup plus insert) lives here inside a [`Db::transaction`]
//! closure so a failure anywhere rolls the whole write back.
//!
//! [`Db::transaction`]: crate::db::Db::transaction

pub mod audit;
pub mod incident;
pub mod member;
pub mod tenant;

/// True when `err` is a unique-constraint violation on `constraint`.
///
/// Callers check this before letting the error decay into the generic
/// 500 conversion, so a duplicate key can come back as caller input
/// (400) instead of a server fault.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
