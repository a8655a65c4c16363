use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::ScopedEntity;
use crate::validate::{require_max_len, require_non_empty, require_one_of, FieldErrors, Validate};

pub const GRIEVANCE_CHANNELS: &[&str] = &["web", "phone", "mail", "in_person"];
pub const GRIEVANCE_STATUSES: &[&str] = &["received", "under_review", "resolved", "closed"];

/// A community grievance. Plain scoped record, no children; the
/// complainant may stay anonymous.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Grievance {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub complainant: Option<String>,
    pub channel: String,
    pub description: String,
    pub status: String,
    pub received_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedEntity for Grievance {
    const TABLE: &'static str = "grievances";
    const PROJECT_SCOPED: bool = true;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGrievance {
    #[serde(default)]
    pub complainant: Option<String>,
    pub channel: String,
    pub description: String,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGrievance {
    #[serde(default)]
    pub complainant: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Validate for CreateGrievance {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_one_of(&mut errors, "channel", &self.channel, GRIEVANCE_CHANNELS);
        require_non_empty(&mut errors, "description", &self.description);
        require_max_len(&mut errors, "description", &self.description, 4000);
        errors.finish()
    }
}

impl Validate for UpdateGrievance {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(channel) = &self.channel {
            require_one_of(&mut errors, "channel", channel, GRIEVANCE_CHANNELS);
        }
        if let Some(description) = &self.description {
            require_non_empty(&mut errors, "description", description);
            require_max_len(&mut errors, "description", description, 4000);
        }
        if let Some(status) = &self.status {
            require_one_of(&mut errors, "status", status, GRIEVANCE_STATUSES);
        }
        errors.finish()
    }
}
