// Store access: one shared pool, scoped read facade, schema DDL.
pub mod entity;
pub mod pool;
pub mod repo;
pub mod schema;
pub mod scope;

pub use entity::ScopedEntity;
pub use pool::{Db, StoreError};
pub use repo::ScopedRepo;
pub use schema::ensure_schema;
pub use scope::{AccessScope, ScopeError};
