use chrono::Utc;
use sqlx::{PgExecutor, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::db::{AccessScope, Db};
use crate::error::ApiError;
use crate::models::{
    AuditReport, AuditReportDetail, AuditResult, AuditResultInput, CreateAuditReport,
    NonConformity, NonConformityInput, UpdateAuditReport,
};

/// Create an audit report with its result and non-conformities in one
/// transaction. The result row goes in first because the report carries
/// the reference; a bad child anywhere rolls the whole thing back.
pub async fn create(
    db: &Db,
    tenant_id: Uuid,
    project_id: Uuid,
    input: CreateAuditReport,
) -> Result<AuditReportDetail, ApiError> {
    let detail = db
        .transaction(move |tx| {
            Box::pin(async move {
                let result = insert_result(tx, &input.result).await?;

                let now = Utc::now();
                let report = sqlx::query_as::<_, AuditReport>(
                    "INSERT INTO \"audit_reports\" \
                     (\"id\", \"tenant_id\", \"project_id\", \"result_id\", \"title\", \
                      \"auditor\", \"audit_date\", \"status\", \"created_at\", \"updated_at\") \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
                )
                .bind(Uuid::new_v4())
                .bind(tenant_id)
                .bind(project_id)
                .bind(result.id)
                .bind(input.title.trim())
                .bind(&input.auditor)
                .bind(input.audit_date)
                .bind(input.status.as_deref().unwrap_or("draft"))
                .bind(now)
                .bind(now)
                .fetch_one(&mut **tx)
                .await?;

                let non_conformities =
                    insert_non_conformities(tx, report.id, &input.non_conformities).await?;

                Ok::<_, ApiError>(AuditReportDetail {
                    report,
                    result,
                    non_conformities,
                })
            })
        })
        .await?;

    info!(
        "created audit report {} in project {}",
        detail.report.id, project_id
    );
    Ok(detail)
}

/// Partial update behind an in-transaction ownership check. Present
/// scalars overwrite, a present result overwrites the result row, and a
/// present non-conformity list replaces the stored set wholesale.
pub async fn update(
    db: &Db,
    scope: AccessScope,
    id: Uuid,
    input: UpdateAuditReport,
) -> Result<AuditReportDetail, ApiError> {
    let store = db.clone();
    db.transaction(move |tx| {
        Box::pin(async move {
            let mut report = store
                .scoped::<AuditReport>(scope)
                .find_by_id_on(&mut **tx, id)
                .await?
                .ok_or_else(ApiError::not_found)?;

            if let Some(title) = &input.title {
                report.title = title.trim().to_string();
            }
            if let Some(auditor) = &input.auditor {
                report.auditor = Some(auditor.clone());
            }
            if let Some(audit_date) = input.audit_date {
                report.audit_date = Some(audit_date);
            }
            if let Some(status) = &input.status {
                report.status = status.clone();
            }

            let report = sqlx::query_as::<_, AuditReport>(
                "UPDATE \"audit_reports\" SET \"title\" = $1, \"auditor\" = $2, \
                 \"audit_date\" = $3, \"status\" = $4, \"updated_at\" = $5 \
                 WHERE \"id\" = $6 RETURNING *",
            )
            .bind(&report.title)
            .bind(&report.auditor)
            .bind(report.audit_date)
            .bind(&report.status)
            .bind(Utc::now())
            .bind(report.id)
            .fetch_one(&mut **tx)
            .await?;

            let result = match &input.result {
                Some(result_input) => overwrite_result(tx, report.result_id, result_input).await?,
                None => {
                    sqlx::query_as::<_, AuditResult>(
                        "SELECT * FROM \"audit_results\" WHERE \"id\" = $1",
                    )
                    .bind(report.result_id)
                    .fetch_one(&mut **tx)
                    .await?
                }
            };

            let non_conformities = match &input.non_conformities {
                Some(inputs) => {
                    sqlx::query("DELETE FROM \"non_conformities\" WHERE \"audit_report_id\" = $1")
                        .bind(report.id)
                        .execute(&mut **tx)
                        .await?;
                    insert_non_conformities(tx, report.id, inputs).await?
                }
                None => non_conformities_for(&mut **tx, report.id).await?,
            };

            Ok(AuditReportDetail {
                report,
                result,
                non_conformities,
            })
        })
    })
    .await
}

/// Delete a report and everything it owns. Children first, then the
/// report, then the result row it references.
pub async fn delete(db: &Db, scope: AccessScope, id: Uuid) -> Result<(), ApiError> {
    let store = db.clone();
    db.transaction(move |tx| {
        Box::pin(async move {
            let report = store
                .scoped::<AuditReport>(scope)
                .find_by_id_on(&mut **tx, id)
                .await?
                .ok_or_else(ApiError::not_found)?;

            sqlx::query("DELETE FROM \"non_conformities\" WHERE \"audit_report_id\" = $1")
                .bind(report.id)
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM \"audit_reports\" WHERE \"id\" = $1")
                .bind(report.id)
                .execute(&mut **tx)
                .await?;
            sqlx::query("DELETE FROM \"audit_results\" WHERE \"id\" = $1")
                .bind(report.result_id)
                .execute(&mut **tx)
                .await?;

            Ok::<_, ApiError>(())
        })
    })
    .await?;

    info!("deleted audit report {}", id);
    Ok(())
}

/// Assemble the single-record response for a report already read through
/// the scoped facade.
pub async fn load_detail(db: &Db, report: AuditReport) -> Result<AuditReportDetail, ApiError> {
    let result =
        sqlx::query_as::<_, AuditResult>("SELECT * FROM \"audit_results\" WHERE \"id\" = $1")
            .bind(report.result_id)
            .fetch_one(db.pool())
            .await?;
    let non_conformities = non_conformities_for(db.pool(), report.id).await?;
    Ok(AuditReportDetail {
        report,
        result,
        non_conformities,
    })
}

async fn insert_result(
    tx: &mut Transaction<'static, Postgres>,
    input: &AuditResultInput,
) -> Result<AuditResult, ApiError> {
    let now = Utc::now();
    let result = sqlx::query_as::<_, AuditResult>(
        "INSERT INTO \"audit_results\" \
         (\"id\", \"outcome\", \"score\", \"summary\", \"created_at\", \"updated_at\") \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&input.outcome)
    .bind(input.score)
    .bind(&input.summary)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(result)
}

/// Overwrite the result row in place; all three columns come from the
/// input, so an absent score or summary clears the stored one.
async fn overwrite_result(
    tx: &mut Transaction<'static, Postgres>,
    result_id: Uuid,
    input: &AuditResultInput,
) -> Result<AuditResult, ApiError> {
    let result = sqlx::query_as::<_, AuditResult>(
        "UPDATE \"audit_results\" SET \"outcome\" = $1, \"score\" = $2, \"summary\" = $3, \
         \"updated_at\" = $4 WHERE \"id\" = $5 RETURNING *",
    )
    .bind(&input.outcome)
    .bind(input.score)
    .bind(&input.summary)
    .bind(Utc::now())
    .bind(result_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(result)
}

async fn insert_non_conformities(
    tx: &mut Transaction<'static, Postgres>,
    report_id: Uuid,
    inputs: &[NonConformityInput],
) -> Result<Vec<NonConformity>, ApiError> {
    let mut rows = Vec::with_capacity(inputs.len());
    for input in inputs {
        let now = Utc::now();
        let row = sqlx::query_as::<_, NonConformity>(
            "INSERT INTO \"non_conformities\" \
             (\"id\", \"audit_report_id\", \"description\", \"severity\", \
              \"created_at\", \"updated_at\") \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(report_id)
        .bind(input.description.trim())
        .bind(&input.severity)
        .bind(now)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

async fn non_conformities_for<'e, X>(
    executor: X,
    report_id: Uuid,
) -> Result<Vec<NonConformity>, sqlx::Error>
where
    X: PgExecutor<'e>,
{
    sqlx::query_as::<_, NonConformity>(
        "SELECT * FROM \"non_conformities\" WHERE \"audit_report_id\" = $1 \
         ORDER BY \"created_at\", \"id\"",
    )
    .bind(report_id)
    .fetch_all(executor)
    .await
}
