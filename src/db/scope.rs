use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("{0} must be a UUID")]
    InvalidUuid(&'static str),
}

/// The tenant (and optionally project) a request is allowed to see.
///
/// Built fresh per request from the raw query parameters and handed to
/// [`ScopedRepo`](crate::db::repo::ScopedRepo); never cached across requests.
/// An absent tenant means a deliberate cross-tenant query and is only legal
/// for operations documented as tenant-agnostic (listing tenants to join).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessScope {
    pub tenant_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

impl AccessScope {
    /// Explicitly tenant-agnostic. Spelled out so the intent is visible at
    /// the call site instead of hiding behind `Default`.
    pub fn unscoped() -> Self {
        Self::default()
    }

    pub fn tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            project_id: None,
        }
    }

    pub fn tenant_project(tenant_id: Uuid, project_id: Option<Uuid>) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            project_id,
        }
    }

    /// Parse raw query-parameter values. An empty string is treated the same
    /// as an absent parameter; anything else must be a well-formed UUID.
    pub fn from_raw(tenant: Option<&str>, project: Option<&str>) -> Result<Self, ScopeError> {
        Ok(Self {
            tenant_id: parse_raw_id(tenant, "tenantId")?,
            project_id: parse_raw_id(project, "projectId")?,
        })
    }
}

pub(crate) fn parse_raw_id(
    raw: Option<&str>,
    param: &'static str,
) -> Result<Option<Uuid>, ScopeError> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| ScopeError::InvalidUuid(param)),
    }
}
