use esms_api::app::{app, AppState};
use esms_api::config;
use esms_api::db::Db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("starting esms-api in {:?} mode", config.environment);

    if config.auth.required && config.auth.jwt_secret.is_empty() {
        anyhow::bail!("auth is required but JWT_SECRET is not set");
    }

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let db = Db::connect(&database_url).await?;

    let state = AppState {
        db,
        auth: config.auth.clone(),
    };

    let bind_addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
