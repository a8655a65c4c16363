use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::db::scope::parse_raw_id;
use crate::db::AccessScope;
use crate::error::ApiError;
use crate::filter::types::FilterData;
use crate::validate::Validate;

/// Identifier and paging query parameters shared by every record route.
///
/// All identifiers arrive as query parameters, not path segments.
/// An empty string counts as absent; the `require_*` accessors implement
/// the first gate steps and run before anything touches the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeParams {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub limit: Option<i32>,
    #[serde(default)]
    pub offset: Option<i32>,
}

impl ScopeParams {
    /// The read scope for this request. Absent tenant means a deliberate
    /// tenant-agnostic query and is only legal where documented.
    pub fn scope(&self) -> Result<AccessScope, ApiError> {
        Ok(AccessScope::from_raw(
            self.tenant_id.as_deref(),
            self.project_id.as_deref(),
        )?)
    }

    pub fn require_tenant(&self) -> Result<Uuid, ApiError> {
        parse_raw_id(self.tenant_id.as_deref(), "tenantId")?
            .ok_or_else(|| ApiError::missing_param("tenantId"))
    }

    pub fn require_project(&self) -> Result<Uuid, ApiError> {
        parse_raw_id(self.project_id.as_deref(), "projectId")?
            .ok_or_else(|| ApiError::missing_param("projectId"))
    }

    pub fn require_id(&self) -> Result<Uuid, ApiError> {
        parse_raw_id(self.id.as_deref(), "id")?.ok_or_else(|| ApiError::missing_param("id"))
    }

    /// Optional single-record selector for collection GETs.
    pub fn record_id(&self) -> Result<Option<Uuid>, ApiError> {
        Ok(parse_raw_id(self.id.as_deref(), "id")?)
    }

    /// Collection filter assembled from the passthrough parameters:
    /// `status` equality, `order`, `limit`, `offset`.
    pub fn list_filter(&self) -> FilterData {
        let mut where_clause = Map::new();
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            where_clause.insert("status".to_string(), json!(status));
        }
        FilterData {
            where_clause: if where_clause.is_empty() {
                None
            } else {
                Some(Value::Object(where_clause))
            },
            ..self.page_filter()
        }
    }

    /// Ordering and paging only, for tables without a status column.
    pub fn page_filter(&self) -> FilterData {
        FilterData {
            where_clause: None,
            order: self
                .order
                .clone()
                .filter(|o| !o.is_empty())
                .map(Value::String),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Body parsing for mutating routes, deliberately late: handlers take the
/// body as raw bytes and call this after the identifier checks, so a
/// missing `tenantId` beats a garbled body whatever the caller sent.
pub fn parse_body<T>(body: &[u8]) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let input: T = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))?;
    input.validate()?;
    Ok(input)
}
