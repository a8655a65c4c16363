use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::ScopedEntity;
use crate::validate::{require_max_len, require_non_empty, require_one_of, FieldErrors, Validate};

pub const PROJECT_STATUSES: &[&str] = &["active", "on_hold", "closed"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedEntity for Project {
    const TABLE: &'static str = "projects";
    // A project row is its own project axis; only the tenant condition
    // applies when listing them.
    const PROJECT_SCOPED: bool = false;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Validate for CreateProject {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_non_empty(&mut errors, "name", &self.name);
        require_max_len(&mut errors, "name", &self.name, 200);
        if let Some(description) = &self.description {
            require_max_len(&mut errors, "description", description, 2000);
        }
        if let Some(status) = &self.status {
            require_one_of(&mut errors, "status", status, PROJECT_STATUSES);
        }
        errors.finish()
    }
}

impl Validate for UpdateProject {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            require_non_empty(&mut errors, "name", name);
            require_max_len(&mut errors, "name", name, 200);
        }
        if let Some(description) = &self.description {
            require_max_len(&mut errors, "description", description, 2000);
        }
        if let Some(status) = &self.status {
            require_one_of(&mut errors, "status", status, PROJECT_STATUSES);
        }
        errors.finish()
    }
}
