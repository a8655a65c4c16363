use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::ScopedEntity;
use crate::validate::{require_email, require_non_empty, require_one_of, FieldErrors, Validate};

pub const ROLES: &[&str] = &["admin", "manager", "member"];

/// A global identity. Users exist outside any tenant; memberships tie
/// them in.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's standing inside one tenant: role plus the projects they are
/// assigned to. One row per (tenant, user).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub project_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedEntity for Membership {
    const TABLE: &'static str = "memberships";
    // Project assignment is the project_ids array, not a scalar column;
    // callers filter it with $any.
    const PROJECT_SCOPED: bool = false;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Manager,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    /// Member management (invite, role change, removal) is reserved to
    /// admins and managers.
    pub fn can_manage_members(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "member" => Ok(Role::Member),
            _ => Err(()),
        }
    }
}

/// Invite by email. Provisions the user row when no account exists yet.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMember {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub project_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMember {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub project_ids: Option<Vec<Uuid>>,
}

impl Validate for CreateMember {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_email(&mut errors, "email", &self.email);
        if let Some(display_name) = &self.display_name {
            require_non_empty(&mut errors, "displayName", display_name);
        }
        require_one_of(&mut errors, "role", &self.role, ROLES);
        errors.finish()
    }
}

impl Validate for UpdateMember {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(role) = &self.role {
            require_one_of(&mut errors, "role", role, ROLES);
        }
        errors.finish()
    }
}
