use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::ScopedEntity;
use crate::validate::{require_max_len, require_non_empty, require_one_of, FieldErrors, Validate};

pub const AUDIT_OUTCOMES: &[&str] = &["compliant", "minor_nc", "major_nc"];
pub const AUDIT_STATUSES: &[&str] = &["draft", "submitted", "approved"];
pub const NC_SEVERITIES: &[&str] = &["minor", "major"];

/// An audit record. Owns exactly one result row (`result_id`, created
/// first) and any number of non-conformity children.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub result_id: Uuid,
    pub title: String,
    pub auditor: Option<String>,
    pub audit_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScopedEntity for AuditReport {
    const TABLE: &'static str = "audit_reports";
    const PROJECT_SCOPED: bool = true;
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub id: Uuid,
    pub outcome: String,
    pub score: Option<i32>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NonConformity {
    pub id: Uuid,
    pub audit_report_id: Uuid,
    pub description: String,
    pub severity: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single-record response: the report with its result and children.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReportDetail {
    #[serde(flatten)]
    pub report: AuditReport,
    pub result: AuditResult,
    pub non_conformities: Vec<NonConformity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResultInput {
    pub outcome: String,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonConformityInput {
    pub description: String,
    pub severity: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditReport {
    pub title: String,
    #[serde(default)]
    pub auditor: Option<String>,
    #[serde(default)]
    pub audit_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    pub result: AuditResultInput,
    #[serde(default)]
    pub non_conformities: Vec<NonConformityInput>,
}

/// Partial update. A present `result` overwrites the result row in place;
/// present `nonConformities` replace the child set wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuditReport {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub auditor: Option<String>,
    #[serde(default)]
    pub audit_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<AuditResultInput>,
    #[serde(default)]
    pub non_conformities: Option<Vec<NonConformityInput>>,
}

fn check_result(errors: &mut FieldErrors, input: &AuditResultInput) {
    require_one_of(errors, "result.outcome", &input.outcome, AUDIT_OUTCOMES);
    if let Some(score) = input.score {
        if !(0..=100).contains(&score) {
            errors.add("result.score", "must be between 0 and 100");
        }
    }
    if let Some(summary) = &input.summary {
        require_max_len(errors, "result.summary", summary, 4000);
    }
}

fn check_non_conformities(errors: &mut FieldErrors, inputs: &[NonConformityInput]) {
    for (i, nc) in inputs.iter().enumerate() {
        require_non_empty(
            errors,
            &format!("nonConformities[{}].description", i),
            &nc.description,
        );
        require_one_of(
            errors,
            &format!("nonConformities[{}].severity", i),
            &nc.severity,
            NC_SEVERITIES,
        );
    }
}

impl Validate for CreateAuditReport {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_non_empty(&mut errors, "title", &self.title);
        require_max_len(&mut errors, "title", &self.title, 200);
        if let Some(status) = &self.status {
            require_one_of(&mut errors, "status", status, AUDIT_STATUSES);
        }
        check_result(&mut errors, &self.result);
        check_non_conformities(&mut errors, &self.non_conformities);
        errors.finish()
    }
}

impl Validate for UpdateAuditReport {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            require_non_empty(&mut errors, "title", title);
            require_max_len(&mut errors, "title", title, 200);
        }
        if let Some(status) = &self.status {
            require_one_of(&mut errors, "status", status, AUDIT_STATUSES);
        }
        if let Some(result) = &self.result {
            check_result(&mut errors, result);
        }
        if let Some(ncs) = &self.non_conformities {
            check_non_conformities(&mut errors, ncs);
        }
        errors.finish()
    }
}
