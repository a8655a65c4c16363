use tracing::info;

use crate::db::pool::{Db, StoreError};

/// Store DDL in dependency order. Closed vocabularies (role, outcome,
/// severity, channel) are CHECK-constrained so a bad value fails at the
/// store even when a write path skips input validation; free-form status
/// columns are left open on purpose.
///
/// No ON DELETE CASCADE anywhere: child rows are deleted by explicit
/// statements in the owning service so the order stays visible in code.
const TABLES: &[(&str, &str)] = &[
    (
        "tenants",
        r#"CREATE TABLE IF NOT EXISTS "tenants" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "name" TEXT NOT NULL,
            "slug" TEXT NOT NULL UNIQUE,
            "description" TEXT,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "users",
        r#"CREATE TABLE IF NOT EXISTS "users" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "email" TEXT NOT NULL UNIQUE,
            "display_name" TEXT NOT NULL,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "projects",
        r#"CREATE TABLE IF NOT EXISTS "projects" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "tenant_id" UUID NOT NULL REFERENCES "tenants"("id"),
            "name" TEXT NOT NULL,
            "description" TEXT,
            "status" TEXT NOT NULL DEFAULT 'active',
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "memberships",
        r#"CREATE TABLE IF NOT EXISTS "memberships" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "tenant_id" UUID NOT NULL REFERENCES "tenants"("id"),
            "user_id" UUID NOT NULL REFERENCES "users"("id"),
            "role" TEXT NOT NULL CHECK ("role" IN ('admin', 'manager', 'member')),
            "project_ids" UUID[] NOT NULL DEFAULT '{}',
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE ("tenant_id", "user_id")
        )"#,
    ),
    (
        "audit_results",
        r#"CREATE TABLE IF NOT EXISTS "audit_results" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "outcome" TEXT NOT NULL CHECK ("outcome" IN ('compliant', 'minor_nc', 'major_nc')),
            "score" INTEGER,
            "summary" TEXT,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "audit_reports",
        r#"CREATE TABLE IF NOT EXISTS "audit_reports" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "tenant_id" UUID NOT NULL REFERENCES "tenants"("id"),
            "project_id" UUID NOT NULL REFERENCES "projects"("id"),
            "result_id" UUID NOT NULL UNIQUE REFERENCES "audit_results"("id"),
            "title" TEXT NOT NULL,
            "auditor" TEXT,
            "audit_date" DATE,
            "status" TEXT NOT NULL DEFAULT 'draft',
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "non_conformities",
        r#"CREATE TABLE IF NOT EXISTS "non_conformities" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "audit_report_id" UUID NOT NULL REFERENCES "audit_reports"("id"),
            "description" TEXT NOT NULL,
            "severity" TEXT NOT NULL CHECK ("severity" IN ('minor', 'major')),
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "incident_reports",
        r#"CREATE TABLE IF NOT EXISTS "incident_reports" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "tenant_id" UUID NOT NULL REFERENCES "tenants"("id"),
            "project_id" UUID NOT NULL REFERENCES "projects"("id"),
            "title" TEXT NOT NULL,
            "description" TEXT,
            "severity" TEXT NOT NULL CHECK ("severity" IN ('low', 'medium', 'high', 'critical')),
            "occurred_at" TIMESTAMPTZ,
            "location" TEXT,
            "status" TEXT NOT NULL DEFAULT 'open',
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "involved_persons",
        r#"CREATE TABLE IF NOT EXISTS "involved_persons" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "incident_report_id" UUID NOT NULL REFERENCES "incident_reports"("id"),
            "name" TEXT NOT NULL,
            "role" TEXT,
            "organization" TEXT,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "corrective_actions",
        r#"CREATE TABLE IF NOT EXISTS "corrective_actions" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "incident_report_id" UUID NOT NULL REFERENCES "incident_reports"("id"),
            "description" TEXT NOT NULL,
            "owner" TEXT,
            "due_date" DATE,
            "status" TEXT NOT NULL DEFAULT 'open',
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
    (
        "grievances",
        r#"CREATE TABLE IF NOT EXISTS "grievances" (
            "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            "tenant_id" UUID NOT NULL REFERENCES "tenants"("id"),
            "project_id" UUID NOT NULL REFERENCES "projects"("id"),
            "complainant" TEXT,
            "channel" TEXT NOT NULL CHECK ("channel" IN ('web', 'phone', 'mail', 'in_person')),
            "description" TEXT NOT NULL,
            "status" TEXT NOT NULL DEFAULT 'received',
            "received_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "resolved_at" TIMESTAMPTZ,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT now(),
            "updated_at" TIMESTAMPTZ NOT NULL DEFAULT now()
        )"#,
    ),
];

const INDEXES: &[&str] = &[
    r#"CREATE INDEX IF NOT EXISTS "idx_projects_tenant" ON "projects" ("tenant_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_memberships_tenant" ON "memberships" ("tenant_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_memberships_user" ON "memberships" ("user_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_audit_reports_tenant" ON "audit_reports" ("tenant_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_audit_reports_project" ON "audit_reports" ("project_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_non_conformities_report" ON "non_conformities" ("audit_report_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_incident_reports_tenant" ON "incident_reports" ("tenant_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_incident_reports_project" ON "incident_reports" ("project_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_involved_persons_incident" ON "involved_persons" ("incident_report_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_corrective_actions_incident" ON "corrective_actions" ("incident_report_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_grievances_tenant" ON "grievances" ("tenant_id")"#,
    r#"CREATE INDEX IF NOT EXISTS "idx_grievances_project" ON "grievances" ("project_id")"#,
];

/// Applies the full DDL. Idempotent; run by `esms schema init`.
pub async fn ensure_schema(db: &Db) -> Result<(), StoreError> {
    for (name, ddl) in TABLES {
        sqlx::query(ddl).execute(db.pool()).await?;
        info!("ensured table '{}'", name);
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(db.pool()).await?;
    }
    info!("schema ready ({} tables)", TABLES.len());
    Ok(())
}
