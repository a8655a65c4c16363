// Shared between test binaries; not every binary uses every helper.
#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use esms_api::app::{app, AppState};
use esms_api::config::AuthConfig;
use esms_api::db::Db;

/// A router over a pool that cannot serve queries: any handler path that
/// reaches the store fails loudly instead of answering. The gate tests
/// use it to prove their 4xx happens before data access.
pub fn offline_router() -> Router {
    offline_router_with_auth(AuthConfig {
        required: false,
        jwt_secret: String::new(),
        token_ttl_hours: 1,
    })
}

pub fn offline_router_with_auth(auth: AuthConfig) -> Router {
    let db = Db::connect_lazy("postgres://nobody@127.0.0.1:1/nothing").expect("lazy pool");
    app(AppState { db, auth })
}

/// One in-process request; returns status plus the JSON body (Null for an
/// empty body).
pub async fn send(router: Router, request: Request<Body>) -> (axum::http::StatusCode, Value) {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

pub async fn get(router: Router, uri: &str) -> (axum::http::StatusCode, Value) {
    send(
        router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn request_json(
    router: Router,
    method: &str,
    uri: &str,
    body: Value,
) -> (axum::http::StatusCode, Value) {
    request_raw(router, method, uri, body.to_string()).await
}

pub async fn request_raw(
    router: Router,
    method: &str,
    uri: &str,
    body: impl Into<axum::body::Bytes>,
) -> (axum::http::StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.into()))
            .unwrap(),
    )
    .await
}

pub async fn request_authed(
    router: Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Value,
) -> (axum::http::StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests.
        // Auth is off so the live suite can drive the API without tokens;
        // the role-gate tests build their own in-process router instead.
        let mut cmd = Command::new("target/debug/esms-api");
        cmd.env("PORT", port.to_string())
            .env("ESMS_BIND", "127.0.0.1")
            .env("ESMS_AUTH_REQUIRED", "false")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit the rest of the environment so the server sees DATABASE_URL
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
