use std::marker::PhantomData;

use serde_json::{json, Value};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgExecutor, Postgres};
use uuid::Uuid;

use crate::db::entity::ScopedEntity;
use crate::db::pool::{Db, StoreError};
use crate::db::scope::AccessScope;
use crate::filter::types::{FilterData, ForcedFilter, SqlParam, SqlResult};
use crate::filter::Filter;

/// Tenant/project-scoping read facade for one entity type.
///
/// Every query it issues carries the scope's tenant (and, when present and
/// supported by the entity, project) as forced top-level conditions, so a
/// caller filter can narrow results but never widen them past the scope.
///
/// Writes deliberately stay on the unscoped client: each mutating call site
/// confirms ownership through this facade first, which keeps the "did I
/// check" step visible where the write happens instead of buried in a
/// write wrapper.
pub struct ScopedRepo<'a, E> {
    db: &'a Db,
    scope: AccessScope,
    _entity: PhantomData<E>,
}

impl<'a, E: ScopedEntity> ScopedRepo<'a, E> {
    pub fn new(db: &'a Db, scope: AccessScope) -> Self {
        Self {
            db,
            scope,
            _entity: PhantomData,
        }
    }

    pub fn scope(&self) -> AccessScope {
        self.scope
    }

    /// All rows in scope matching the caller's filter, in caller order.
    /// An empty result is an answer, not an error.
    pub async fn find_many(&self, query: FilterData) -> Result<Vec<E>, StoreError> {
        self.find_many_on(self.db.pool(), query).await
    }

    /// `find_many` on an explicit executor, for reads that must share a
    /// transaction with the write they guard.
    pub async fn find_many_on<'e, X>(
        &self,
        executor: X,
        query: FilterData,
    ) -> Result<Vec<E>, StoreError>
    where
        X: PgExecutor<'e>,
    {
        let sql = self.compile(query)?;
        let rows = bind_params(sqlx::query_as::<_, E>(&sql.query), &sql.params)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    /// At most one row in scope matching the caller's filter.
    pub async fn find_first(&self, query: FilterData) -> Result<Option<E>, StoreError> {
        self.find_first_on(self.db.pool(), query).await
    }

    pub async fn find_first_on<'e, X>(
        &self,
        executor: X,
        mut query: FilterData,
    ) -> Result<Option<E>, StoreError>
    where
        X: PgExecutor<'e>,
    {
        query.limit = Some(1);
        let sql = self.compile(query)?;
        let row = bind_params(sqlx::query_as::<_, E>(&sql.query), &sql.params)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Unique lookup by primary key, re-implemented as a scoped `find_first`.
    ///
    /// A raw unique lookup resolves the row by primary key alone, whatever
    /// tenant owns it, so the facade never delegates one to the underlying
    /// client: it extracts the id from the query and reads through the same
    /// forced-scope path as every other query. A query carrying no id value
    /// fails instead of silently widening.
    pub async fn find_unique(&self, query: FilterData) -> Result<Option<E>, StoreError> {
        self.find_unique_on(self.db.pool(), query).await
    }

    pub async fn find_unique_on<'e, X>(
        &self,
        executor: X,
        query: FilterData,
    ) -> Result<Option<E>, StoreError>
    where
        X: PgExecutor<'e>,
    {
        let id = unique_id(&query).ok_or(StoreError::IdentifierRequired)?;
        self.find_first_on(executor, FilterData::with_where(json!({ "id": id })))
            .await
    }

    /// Unique lookup for call sites that already hold a parsed id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, StoreError> {
        self.find_unique(FilterData::with_where(json!({ "id": id })))
            .await
    }

    pub async fn find_by_id_on<'e, X>(&self, executor: X, id: Uuid) -> Result<Option<E>, StoreError>
    where
        X: PgExecutor<'e>,
    {
        self.find_unique_on(executor, FilterData::with_where(json!({ "id": id })))
            .await
    }

    fn forced(&self) -> ForcedFilter {
        let mut forced = ForcedFilter::none();
        if let Some(tenant_id) = self.scope.tenant_id {
            forced = forced.equals("tenant_id", SqlParam::Uuid(tenant_id));
        }
        if E::PROJECT_SCOPED {
            if let Some(project_id) = self.scope.project_id {
                forced = forced.equals("project_id", SqlParam::Uuid(project_id));
            }
        }
        forced
    }

    fn compile(&self, query: FilterData) -> Result<SqlResult, StoreError> {
        let mut filter = Filter::new(E::TABLE)?.force(self.forced());
        filter.assign(query)?;
        Ok(filter.to_sql()?)
    }
}

/// The primary-key value of a unique query: a top-level `id` equality,
/// either bare or spelled `{"$eq": ...}`. Null or absent means the query
/// cannot be a unique lookup.
fn unique_id(query: &FilterData) -> Option<Value> {
    let where_clause = query.where_clause.as_ref()?;
    let id = where_clause.get("id")?;
    let value = match id {
        Value::Object(ops) => ops.get("$eq")?,
        scalar => scalar,
    };
    if value.is_null() {
        None
    } else {
        Some(value.clone())
    }
}

fn bind_params<'q, O>(
    mut q: QueryAs<'q, Postgres, O, PgArguments>,
    params: &[SqlParam],
) -> QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
{
    for p in params {
        q = match p {
            SqlParam::Uuid(v) => q.bind(*v),
            SqlParam::Text(v) => q.bind(v.clone()),
            SqlParam::Int(v) => q.bind(*v),
            SqlParam::Float(v) => q.bind(*v),
            SqlParam::Bool(v) => q.bind(*v),
            SqlParam::Timestamp(v) => q.bind(*v),
            SqlParam::Date(v) => q.bind(*v),
        };
    }
    q
}
