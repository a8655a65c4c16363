use chrono::Utc;
use sqlx::{PgExecutor, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::db::{AccessScope, Db};
use crate::error::ApiError;
use crate::models::{
    CorrectiveAction, CorrectiveActionInput, CreateIncidentReport, IncidentReport,
    IncidentReportDetail, InvolvedPerson, InvolvedPersonInput, UpdateIncidentReport,
};

/// Create an incident with its involved persons and corrective actions in
/// one transaction.
pub async fn create(
    db: &Db,
    tenant_id: Uuid,
    project_id: Uuid,
    input: CreateIncidentReport,
) -> Result<IncidentReportDetail, ApiError> {
    let detail = db
        .transaction(move |tx| {
            Box::pin(async move {
                let now = Utc::now();
                let report = sqlx::query_as::<_, IncidentReport>(
                    "INSERT INTO \"incident_reports\" \
                     (\"id\", \"tenant_id\", \"project_id\", \"title\", \"description\", \
                      \"severity\", \"occurred_at\", \"location\", \"status\", \
                      \"created_at\", \"updated_at\") \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(tenant_id)
                .bind(project_id)
                .bind(input.title.trim())
                .bind(&input.description)
                .bind(&input.severity)
                .bind(input.occurred_at)
                .bind(&input.location)
                .bind(input.status.as_deref().unwrap_or("open"))
                .bind(now)
                .bind(now)
                .fetch_one(&mut **tx)
                .await?;

                let involved_persons =
                    insert_involved_persons(tx, report.id, &input.involved_persons).await?;
                let corrective_actions =
                    insert_corrective_actions(tx, report.id, &input.corrective_actions).await?;

                Ok::<_, ApiError>(IncidentReportDetail {
                    report,
                    involved_persons,
                    corrective_actions,
                })
            })
        })
        .await?;

    info!(
        "created incident report {} in project {}",
        detail.report.id, project_id
    );
    Ok(detail)
}

/// Partial update behind an in-transaction ownership check. Present child
/// collections replace the stored ones wholesale.
pub async fn update(
    db: &Db,
    scope: AccessScope,
    id: Uuid,
    input: UpdateIncidentReport,
) -> Result<IncidentReportDetail, ApiError> {
    let store = db.clone();
    db.transaction(move |tx| {
        Box::pin(async move {
            let mut report = store
                .scoped::<IncidentReport>(scope)
                .find_by_id_on(&mut **tx, id)
                .await?
                .ok_or_else(ApiError::not_found)?;

            if let Some(title) = &input.title {
                report.title = title.trim().to_string();
            }
            if let Some(description) = &input.description {
                report.description = Some(description.clone());
            }
            if let Some(severity) = &input.severity {
                report.severity = severity.clone();
            }
            if let Some(occurred_at) = input.occurred_at {
                report.occurred_at = Some(occurred_at);
            }
            if let Some(location) = &input.location {
                report.location = Some(location.clone());
            }
            if let Some(status) = &input.status {
                report.status = status.clone();
            }

            let report = sqlx::query_as::<_, IncidentReport>(
                "UPDATE \"incident_reports\" SET \"title\" = $1, \"description\" = $2, \
                 \"severity\" = $3, \"occurred_at\" = $4, \"location\" = $5, \"status\" = $6, \
                 \"updated_at\" = $7 WHERE \"id\" = $8 RETURNING *",
            )
            .bind(&report.title)
            .bind(&report.description)
            .bind(&report.severity)
            .bind(report.occurred_at)
            .bind(&report.location)
            .bind(&report.status)
            .bind(Utc::now())
            .bind(report.id)
            .fetch_one(&mut **tx)
            .await?;

            let involved_persons = match &input.involved_persons {
                Some(inputs) => {
                    sqlx::query("DELETE FROM \"involved_persons\" WHERE \"incident_report_id\" = $1")
                        .bind(report.id)
                        .execute(&mut **tx)
                        .await?;
                    insert_involved_persons(tx, report.id, inputs).await?
                }
                None => involved_persons_for(&mut **tx, report.id).await?,
            };

            let corrective_actions = match &input.corrective_actions {
                Some(inputs) => {
                    sqlx::query(
                        "DELETE FROM \"corrective_actions\" WHERE \"incident_report_id\" = $1",
                    )
                    .bind(report.id)
                    .execute(&mut **tx)
                    .await?;
                    insert_corrective_actions(tx, report.id, inputs).await?
                }
                None => corrective_actions_for(&mut **tx, report.id).await?,
            };

            Ok(IncidentReportDetail {
                report,
                involved_persons,
                corrective_actions,
            })
        })
    })
    .await
}

/// Delete an incident and both child collections, children first.
pub async fn delete(db: &Db, scope: AccessScope, id: Uuid) -> Result<(), ApiError> {
    let store = db.clone();
    db.transaction(move |tx| {
        Box::pin(async move {
            let report = store
                .scoped::<IncidentReport>(scope)
                .find_by_id_on(&mut **tx, id)
                .await?
                .ok_or_else(ApiError::not_found)?;

            sqlx::query("DELETE FROM \"involved_persons\" WHERE \"incident_report_id\" = $1")
                .bind(report.id)
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM \"corrective_actions\" WHERE \"incident_report_id\" = $1")
                .bind(report.id)
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM \"incident_reports\" WHERE \"id\" = $1")
                .bind(report.id)
                .execute(&mut **tx)
                .await?;

            Ok::<_, ApiError>(())
        })
    })
    .await?;

    info!("deleted incident report {}", id);
    Ok(())
}

/// Assemble the single-record response for a report already read through
/// the scoped facade.
pub async fn load_detail(db: &Db, report: IncidentReport) -> Result<IncidentReportDetail, ApiError> {
    let involved_persons = involved_persons_for(db.pool(), report.id).await?;
    let corrective_actions = corrective_actions_for(db.pool(), report.id).await?;
    Ok(IncidentReportDetail {
        report,
        involved_persons,
        corrective_actions,
    })
}

async fn insert_involved_persons(
    tx: &mut Transaction<'static, Postgres>,
    report_id: Uuid,
    inputs: &[InvolvedPersonInput],
) -> Result<Vec<InvolvedPerson>, ApiError> {
    let mut rows = Vec::with_capacity(inputs.len());
    for input in inputs {
        let now = Utc::now();
        let row = sqlx::query_as::<_, InvolvedPerson>(
            "INSERT INTO \"involved_persons\" \
             (\"id\", \"incident_report_id\", \"name\", \"role\", \"organization\", \
              \"created_at\", \"updated_at\") \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(report_id)
        .bind(input.name.trim())
        .bind(&input.role)
        .bind(&input.organization)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

async fn insert_corrective_actions(
    tx: &mut Transaction<'static, Postgres>,
    report_id: Uuid,
    inputs: &[CorrectiveActionInput],
) -> Result<Vec<CorrectiveAction>, ApiError> {
    let mut rows = Vec::with_capacity(inputs.len());
    for input in inputs {
        let now = Utc::now();
        let row = sqlx::query_as::<_, CorrectiveAction>(
            "INSERT INTO \"corrective_actions\" \
             (\"id\", \"incident_report_id\", \"description\", \"owner\", \"due_date\", \
              \"status\", \"created_at\", \"updated_at\") \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(report_id)
        .bind(input.description.trim())
        .bind(&input.owner)
        .bind(input.due_date)
        .bind(input.status.as_deref().unwrap_or("open"))
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

async fn involved_persons_for<'e, X>(
    executor: X,
    report_id: Uuid,
) -> Result<Vec<InvolvedPerson>, sqlx::Error>
where
    X: PgExecutor<'e>,
{
    sqlx::query_as::<_, InvolvedPerson>(
        "SELECT * FROM \"involved_persons\" WHERE \"incident_report_id\" = $1 \
         ORDER BY \"created_at\", \"id\"",
    )
    .bind(report_id)
    .fetch_all(executor)
    .await
}

async fn corrective_actions_for<'e, X>(
    executor: X,
    report_id: Uuid,
) -> Result<Vec<CorrectiveAction>, sqlx::Error>
where
    X: PgExecutor<'e>,
{
    sqlx::query_as::<_, CorrectiveAction>(
        "SELECT * FROM \"corrective_actions\" WHERE \"incident_report_id\" = $1 \
         ORDER BY \"created_at\", \"id\"",
    )
    .bind(report_id)
    .fetch_all(executor)
    .await
}
