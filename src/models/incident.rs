use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::ScopedEntity;
use crate::validate::{require_max_len, require_non_empty, require_one_of, FieldErrors, Validate};

pub const INCIDENT_SEVERITIES: &[&str] = &["low", "medium", "high", "critical"];
pub const INCIDENT_STATUSES: &[&str] = &["open", "investigating", "resolved", "closed"];
pub const ACTION_STATUSES: &[&str] = &["open", "in_progress", "done"];

/// An incident record. Owns two child collections: the people involved
/// and the corrective actions raised.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedEntity for IncidentReport {
    const TABLE: &'static str = "incident_reports";
    const PROJECT_SCOPED: bool = true;
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvolvedPerson {
    pub id: Uuid,
    pub incident_report_id: Uuid,
    pub name: String,
    pub role: Option<String>,
    pub organization: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CorrectiveAction {
    pub id: Uuid,
    pub incident_report_id: Uuid,
    pub description: String,
    pub owner: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReportDetail {
    #[serde(flatten)]
    pub report: IncidentReport,
    pub involved_persons: Vec<InvolvedPerson>,
    pub corrective_actions: Vec<CorrectiveAction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvolvedPersonInput {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectiveActionInput {
    pub description: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentReport {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub severity: String,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub involved_persons: Vec<InvolvedPersonInput>,
    #[serde(default)]
    pub corrective_actions: Vec<CorrectiveActionInput>,
}

/// Partial update; present child collections replace the stored ones
/// wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIncidentReport {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub involved_persons: Option<Vec<InvolvedPersonInput>>,
    #[serde(default)]
    pub corrective_actions: Option<Vec<CorrectiveActionInput>>,
}

fn check_involved(errors: &mut FieldErrors, inputs: &[InvolvedPersonInput]) {
    for (i, person) in inputs.iter().enumerate() {
        require_non_empty(errors, &format!("involvedPersons[{}].name", i), &person.name);
    }
}

fn check_actions(errors: &mut FieldErrors, inputs: &[CorrectiveActionInput]) {
    for (i, action) in inputs.iter().enumerate() {
        require_non_empty(
            errors,
            &format!("correctiveActions[{}].description", i),
            &action.description,
        );
        if let Some(status) = &action.status {
            require_one_of(
                errors,
                &format!("correctiveActions[{}].status", i),
                status,
                ACTION_STATUSES,
            );
        }
    }
}

impl Validate for CreateIncidentReport {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_non_empty(&mut errors, "title", &self.title);
        require_max_len(&mut errors, "title", &self.title, 200);
        require_one_of(&mut errors, "severity", &self.severity, INCIDENT_SEVERITIES);
        if let Some(status) = &self.status {
            require_one_of(&mut errors, "status", status, INCIDENT_STATUSES);
        }
        check_involved(&mut errors, &self.involved_persons);
        check_actions(&mut errors, &self.corrective_actions);
        errors.finish()
    }
}

impl Validate for UpdateIncidentReport {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            require_non_empty(&mut errors, "title", title);
            require_max_len(&mut errors, "title", title, 200);
        }
        if let Some(severity) = &self.severity {
            require_one_of(&mut errors, "severity", severity, INCIDENT_SEVERITIES);
        }
        if let Some(status) = &self.status {
            require_one_of(&mut errors, "status", status, INCIDENT_STATUSES);
        }
        if let Some(people) = &self.involved_persons {
            check_involved(&mut errors, people);
        }
        if let Some(actions) = &self.corrective_actions {
            check_actions(&mut errors, actions);
        }
        errors.finish()
    }
}
