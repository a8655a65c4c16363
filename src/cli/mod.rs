use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::auth::{issue_token, Claims};
use crate::config;
use crate::db::{ensure_schema, Db};

#[derive(Parser)]
#[command(name = "esms")]
#[command(about = "ESMS operations CLI - schema, tokens, store health")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Store schema management")]
    Schema {
        #[command(subcommand)]
        cmd: SchemaCommands,
    },

    #[command(about = "Bearer token management")]
    Token {
        #[command(subcommand)]
        cmd: TokenCommands,
    },

    #[command(about = "Check that the store answers")]
    Health,
}

#[derive(Subcommand)]
pub enum SchemaCommands {
    #[command(about = "Create all tables and indexes (idempotent)")]
    Init,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a signed bearer token for a user")]
    Issue {
        #[arg(long, help = "User id (UUID) for the token subject")]
        user: Uuid,

        #[arg(long, help = "Email address carried in the token")]
        email: String,

        #[arg(long, help = "Validity in hours (defaults to the environment TTL)")]
        hours: Option<i64>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Schema { cmd } => match cmd {
            SchemaCommands::Init => schema_init().await,
        },
        Commands::Token { cmd } => match cmd {
            TokenCommands::Issue { user, email, hours } => token_issue(user, email, hours),
        },
        Commands::Health => health().await,
    }
}

async fn schema_init() -> anyhow::Result<()> {
    let db = connect().await?;
    ensure_schema(&db).await?;
    println!("schema ready");
    Ok(())
}

fn token_issue(user: Uuid, email: String, hours: Option<i64>) -> anyhow::Result<()> {
    let auth = &config::config().auth;
    if auth.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET is not set");
    }
    let claims = Claims::new(user, email, hours.unwrap_or(auth.token_ttl_hours));
    let token = issue_token(&claims, &auth.jwt_secret)?;
    println!("{}", token);
    Ok(())
}

async fn health() -> anyhow::Result<()> {
    let db = connect().await?;
    db.health_check().await?;
    println!("ok");
    Ok(())
}

async fn connect() -> anyhow::Result<Db> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    Ok(Db::connect(&database_url).await?)
}
