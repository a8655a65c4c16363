mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use esms_api::app::{app, AppState};
use esms_api::auth::{issue_token, Claims};
use esms_api::config::AuthConfig;
use esms_api::db::{ensure_schema, Db};
use esms_api::models::{derive_slug, AuditResultInput, CreateAuditReport, NonConformityInput};
use esms_api::services;

// Live suite: needs Postgres at DATABASE_URL and the server binary built
// (cargo build) first. Run with: cargo test -- --ignored

async fn live_db() -> Result<Db> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set for live tests")?;
    let db = Db::connect(&url).await?;
    ensure_schema(&db).await?;
    Ok(db)
}

fn unique(name: &str) -> String {
    format!("{} {}", name, &Uuid::new_v4().to_string()[..8])
}

fn unique_email(tag: &str) -> String {
    format!("{}-{}@example.org", tag, &Uuid::new_v4().to_string()[..8])
}

async fn create_tenant(client: &reqwest::Client, base: &str, name: &str) -> Result<Value> {
    let res = client
        .post(format!("{}/api/tenants", base))
        .json(&json!({ "name": name }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED, "tenant create failed");
    Ok(res.json().await?)
}

async fn create_project(
    client: &reqwest::Client,
    base: &str,
    tenant_id: &str,
    name: &str,
) -> Result<Value> {
    let res = client
        .post(format!("{}/api/projects?tenantId={}", base, tenant_id))
        .json(&json!({ "name": name }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED, "project create failed");
    Ok(res.json().await?)
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("record id").to_string()
}

#[tokio::test]
#[ignore]
async fn cross_tenant_access_is_a_miss_everywhere() -> Result<()> {
    live_db().await?;
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let tenant_a = id_of(&create_tenant(&client, base, &unique("Alpha Mining")).await?);
    let tenant_b = id_of(&create_tenant(&client, base, &unique("Beta Rail")).await?);
    let project_a = id_of(&create_project(&client, base, &tenant_a, "Tailings dam").await?);

    let res = client
        .post(format!(
            "{}/api/audit-reports?tenantId={}&projectId={}",
            base, tenant_a, project_a
        ))
        .json(&json!({
            "title": "Initial certification audit",
            "result": { "outcome": "compliant", "score": 91 },
            "nonConformities": [
                { "description": "Spill kit log missing for Q2", "severity": "minor" }
            ]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let report: Value = res.json().await?;
    let report_id = id_of(&report);

    // Foreign-tenant list: an empty answer, not an error
    let res = client
        .get(format!("{}/api/audit-reports?tenantId={}", base, tenant_b))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let listed: Value = res.json().await?;
    assert_eq!(listed, json!([]));

    // Foreign-tenant single read, update, delete: the conflated 404
    let res = client
        .get(format!(
            "{}/api/audit-reports?tenantId={}&id={}",
            base, tenant_b, report_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let miss: Value = res.json().await?;
    assert_eq!(miss["error"], "not found or not permitted");

    let res = client
        .put(format!(
            "{}/api/audit-reports?tenantId={}&id={}",
            base, tenant_b, report_id
        ))
        .json(&json!({ "title": "hijacked" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(format!(
            "{}/api/audit-reports?tenantId={}&id={}",
            base, tenant_b, report_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // The owner still sees the record, untouched
    let res = client
        .get(format!(
            "{}/api/audit-reports?tenantId={}&id={}",
            base, tenant_a, report_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let intact: Value = res.json().await?;
    assert_eq!(intact["title"], "Initial certification audit");
    assert_eq!(intact["result"]["outcome"], "compliant");
    assert_eq!(intact["nonConformities"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn project_scope_narrows_reads_within_a_tenant() -> Result<()> {
    live_db().await?;
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let tenant = id_of(&create_tenant(&client, base, &unique("Gamma Agro")).await?);
    let project_one = id_of(&create_project(&client, base, &tenant, "Irrigation north").await?);
    let project_two = id_of(&create_project(&client, base, &tenant, "Irrigation south").await?);

    let res = client
        .post(format!(
            "{}/api/incident-reports?tenantId={}&projectId={}",
            base, tenant, project_one
        ))
        .json(&json!({ "title": "Pump failure", "severity": "medium" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let in_two: Value = client
        .get(format!(
            "{}/api/incident-reports?tenantId={}&projectId={}",
            base, tenant, project_two
        ))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(in_two, json!([]));

    let in_one: Value = client
        .get(format!(
            "{}/api/incident-reports?tenantId={}&projectId={}",
            base, tenant, project_one
        ))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(in_one.as_array().unwrap().len(), 1);

    // Tenant-wide read sees every project
    let tenant_wide: Value = client
        .get(format!("{}/api/incident-reports?tenantId={}", base, tenant))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(tenant_wide.as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn failed_child_insert_rolls_back_the_whole_create() -> Result<()> {
    let db = live_db().await?;
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let tenant = id_of(&create_tenant(&client, base, &unique("Rollback Co")).await?);
    let project = id_of(&create_project(&client, base, &tenant, "Probe site").await?);
    let marker = format!("rollback-probe-{}", Uuid::new_v4());

    // Driven through the service directly: the severity below passes no
    // HTTP gate but violates the store CHECK constraint, after the result,
    // the report and the first child are already written in the
    // transaction.
    let input = CreateAuditReport {
        title: "Doomed audit".to_string(),
        auditor: None,
        audit_date: None,
        status: None,
        result: AuditResultInput {
            outcome: "compliant".to_string(),
            score: Some(90),
            summary: Some(marker.clone()),
        },
        non_conformities: vec![
            NonConformityInput {
                description: "First finding, fine".to_string(),
                severity: "minor".to_string(),
            },
            NonConformityInput {
                description: "Second finding, not fine".to_string(),
                severity: "fatal".to_string(),
            },
        ],
    };

    let outcome = services::audit::create(
        &db,
        Uuid::parse_str(&tenant)?,
        Uuid::parse_str(&project)?,
        input,
    )
    .await;
    assert!(outcome.is_err(), "create should fail on the bad child");

    let leaked_results: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_results WHERE summary = $1")
            .bind(&marker)
            .fetch_one(db.pool())
            .await?;
    assert_eq!(leaked_results, 0, "result row survived the rollback");

    let leaked_reports: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_reports WHERE project_id = $1")
            .bind(Uuid::parse_str(&project)?)
            .fetch_one(db.pool())
            .await?;
    assert_eq!(leaked_reports, 0, "report row survived the rollback");
    Ok(())
}

#[tokio::test]
#[ignore]
async fn present_child_arrays_replace_the_stored_set_wholesale() -> Result<()> {
    live_db().await?;
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let tenant = id_of(&create_tenant(&client, base, &unique("Delta Build")).await?);
    let project = id_of(&create_project(&client, base, &tenant, "Bridge span").await?);

    let res = client
        .post(format!(
            "{}/api/incident-reports?tenantId={}&projectId={}",
            base, tenant, project
        ))
        .json(&json!({
            "title": "Scaffold collapse",
            "severity": "high",
            "involvedPersons": [ { "name": "Ana" }, { "name": "Bo" } ],
            "correctiveActions": [ { "description": "Re-certify supplier" } ]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let report: Value = res.json().await?;
    let report_id = id_of(&report);
    assert_eq!(report["involvedPersons"].as_array().unwrap().len(), 2);

    // A present array replaces; an absent one stays untouched
    let res = client
        .put(format!(
            "{}/api/incident-reports?tenantId={}&id={}",
            base, tenant, report_id
        ))
        .json(&json!({ "involvedPersons": [ { "name": "Cho" } ] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await?;
    let people = updated["involvedPersons"].as_array().unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0]["name"], "Cho");
    assert_eq!(updated["correctiveActions"].as_array().unwrap().len(), 1);

    // Scalar-only update leaves both collections alone
    let res = client
        .put(format!(
            "{}/api/incident-reports?tenantId={}&id={}",
            base, tenant, report_id
        ))
        .json(&json!({ "status": "investigating" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let settled: Value = res.json().await?;
    assert_eq!(settled["status"], "investigating");
    assert_eq!(settled["involvedPersons"].as_array().unwrap().len(), 1);
    assert_eq!(settled["correctiveActions"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn audit_result_follows_its_report_through_the_lifecycle() -> Result<()> {
    let db = live_db().await?;
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let tenant = id_of(&create_tenant(&client, base, &unique("Epsilon Power")).await?);
    let project = id_of(&create_project(&client, base, &tenant, "Substation").await?);

    let res = client
        .post(format!(
            "{}/api/audit-reports?tenantId={}&projectId={}",
            base, tenant, project
        ))
        .json(&json!({
            "title": "Surveillance audit",
            "result": { "outcome": "compliant", "score": 88, "summary": "clean" },
            "nonConformities": [ { "description": "Fence gap", "severity": "minor" } ]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let report: Value = res.json().await?;
    let report_id = id_of(&report);
    let result_id = report["resultId"].as_str().unwrap().to_string();
    assert_eq!(report["result"]["score"], 88);

    // The result is overwritten in place: absent score and summary clear
    let res = client
        .put(format!(
            "{}/api/audit-reports?tenantId={}&id={}",
            base, tenant, report_id
        ))
        .json(&json!({ "result": { "outcome": "minor_nc" } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await?;
    assert_eq!(updated["result"]["outcome"], "minor_nc");
    assert_eq!(updated["result"]["score"], Value::Null);
    assert_eq!(updated["resultId"], result_id, "result row is reused, not replaced");

    // Replacing the non-conformity set keeps only the new findings
    let res = client
        .put(format!(
            "{}/api/audit-reports?tenantId={}&id={}",
            base, tenant, report_id
        ))
        .json(&json!({
            "nonConformities": [ { "description": "New finding", "severity": "major" } ]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let replaced: Value = res.json().await?;
    let findings = replaced["nonConformities"].as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["severity"], "major");

    // Deleting the report takes the result row with it
    let res = client
        .delete(format!(
            "{}/api/audit-reports?tenantId={}&id={}",
            base, tenant, report_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!(
            "{}/api/audit-reports?tenantId={}&id={}",
            base, tenant, report_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_results WHERE id = $1")
        .bind(Uuid::parse_str(&result_id)?)
        .fetch_one(db.pool())
        .await?;
    assert_eq!(remaining, 0, "orphan result row after delete");
    Ok(())
}

#[tokio::test]
#[ignore]
async fn member_invites_provision_users_and_reject_duplicates() -> Result<()> {
    live_db().await?;
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let tenant = id_of(&create_tenant(&client, base, &unique("Zeta Port")).await?);
    let email = unique_email("surveyor");

    let res = client
        .post(format!("{}/api/members?tenantId={}", base, tenant))
        .json(&json!({ "email": email, "role": "manager" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let membership: Value = res.json().await?;
    assert_eq!(membership["role"], "manager");
    assert!(membership["userId"].is_string());

    // Same address again: caller input, named field
    let res = client
        .post(format!("{}/api/members?tenantId={}", base, tenant))
        .json(&json!({ "email": email, "role": "member" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let dup: Value = res.json().await?;
    assert_eq!(dup["error"], "validation failed");
    assert!(dup["details"]["email"].is_array(), "details: {}", dup);

    // Remove, then the listing no longer carries it
    let membership_id = id_of(&membership);
    let res = client
        .delete(format!(
            "{}/api/members?tenantId={}&id={}",
            base, tenant, membership_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!(
            "{}/api/members?tenantId={}&id={}",
            base, tenant, membership_id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn member_management_is_role_gated() -> Result<()> {
    let db = live_db().await?;
    let secret = "live-role-gate-secret";
    let state = AppState {
        db,
        auth: AuthConfig {
            required: true,
            jwt_secret: secret.to_string(),
            token_ttl_hours: 1,
        },
    };
    let mk = || app(state.clone());

    // The founder creates the tenant and becomes its admin
    let founder_id = Uuid::new_v4();
    let founder_email = unique_email("founder");
    let founder_token = issue_token(&Claims::new(founder_id, founder_email.as_str(), 1), secret)?;
    let (status, tenant) = common::request_authed(
        mk(),
        "POST",
        "/api/tenants",
        &founder_token,
        json!({ "name": unique("Gated Org") }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "tenant: {}", tenant);
    let tenant_id = id_of(&tenant);

    // Admin invites a plain member
    let member_email = unique_email("member");
    let (status, membership) = common::request_authed(
        mk(),
        "POST",
        &format!("/api/members?tenantId={}", tenant_id),
        &founder_token,
        json!({ "email": member_email, "role": "member" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "invite: {}", membership);
    let member_user_id = Uuid::parse_str(membership["userId"].as_str().unwrap())?;
    let membership_id = id_of(&membership);

    // Members read fine but cannot manage; denial is the conflated 404
    let member_token = issue_token(
        &Claims::new(member_user_id, member_email.as_str(), 1),
        secret,
    )?;
    let (status, _) = common::request_authed(
        mk(),
        "GET",
        &format!("/api/members?tenantId={}", tenant_id),
        &member_token,
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, denied) = common::request_authed(
        mk(),
        "POST",
        &format!("/api/members?tenantId={}", tenant_id),
        &member_token,
        json!({ "email": unique_email("blocked"), "role": "member" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(denied["error"], "not found or not permitted");

    // A stranger with a valid token but no membership sees the same miss
    let stranger_token = issue_token(
        &Claims::new(Uuid::new_v4(), unique_email("stranger").as_str(), 1),
        secret,
    )?;
    let (status, denied) = common::request_authed(
        mk(),
        "DELETE",
        &format!("/api/members?tenantId={}&id={}", tenant_id, membership_id),
        &stranger_token,
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(denied["error"], "not found or not permitted");

    // The admin can change roles
    let (status, updated) = common::request_authed(
        mk(),
        "PUT",
        &format!("/api/members?tenantId={}&id={}", tenant_id, membership_id),
        &founder_token,
        json!({ "role": "manager" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "role change: {}", updated);
    assert_eq!(updated["role"], "manager");
    Ok(())
}

#[tokio::test]
#[ignore]
async fn grievances_walk_their_status_and_allow_anonymity() -> Result<()> {
    live_db().await?;
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let tenant = id_of(&create_tenant(&client, base, &unique("Eta Wind")).await?);
    let project = id_of(&create_project(&client, base, &tenant, "Turbine row C").await?);

    // Anonymous: no complainant
    let res = client
        .post(format!(
            "{}/api/grievances?tenantId={}&projectId={}",
            base, tenant, project
        ))
        .json(&json!({ "channel": "web", "description": "Night-time noise" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let grievance: Value = res.json().await?;
    assert_eq!(grievance["status"], "received");
    assert_eq!(grievance["complainant"], Value::Null);
    assert!(grievance["receivedAt"].is_string());
    let grievance_id = id_of(&grievance);

    let res = client
        .put(format!(
            "{}/api/grievances?tenantId={}&id={}",
            base, tenant, grievance_id
        ))
        .json(&json!({ "status": "resolved", "resolvedAt": "2026-08-25T12:00:00Z" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let resolved: Value = res.json().await?;
    assert_eq!(resolved["status"], "resolved");
    assert!(resolved["resolvedAt"].is_string());

    // Status passthrough filter on the listing
    let listed: Value = client
        .get(format!(
            "{}/api/grievances?tenantId={}&status=resolved",
            base, tenant
        ))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let empty: Value = client
        .get(format!(
            "{}/api/grievances?tenantId={}&status=closed",
            base, tenant
        ))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(empty, json!([]));
    Ok(())
}

#[tokio::test]
#[ignore]
async fn tenant_slugs_are_derived_stable_and_unique() -> Result<()> {
    live_db().await?;
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let base = &server.base_url;

    let name = unique("Theta Hydro Ltd.");
    let tenant = create_tenant(&client, base, &name).await?;
    assert_eq!(tenant["slug"], derive_slug(&name));
    let tenant_id = id_of(&tenant);
    let original_slug = tenant["slug"].as_str().unwrap().to_string();

    // Renaming never moves the slug
    let res = client
        .put(format!("{}/api/tenants?id={}", base, tenant_id))
        .json(&json!({ "name": unique("Renamed Hydro") }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let renamed: Value = res.json().await?;
    assert_eq!(renamed["slug"], original_slug);

    // A second tenant with the original name collides on the slug
    let res = client
        .post(format!("{}/api/tenants", base))
        .json(&json!({ "name": name }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let collision: Value = res.json().await?;
    assert_eq!(collision["error"], "validation failed");
    assert!(collision["details"]["slug"].is_array(), "details: {}", collision);
    Ok(())
}
