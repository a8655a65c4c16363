use std::env;

use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub filter: FilterConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Hard cap on rows per query; caller limits above it are clamped.
    pub max_limit: i32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// When false, requests without a bearer token pass through with no
    /// principal. Trusted-network deployments only.
    pub required: bool,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("ESMS_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("ESMS_BIND") {
            self.server.bind = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("ESMS_MAX_LIMIT") {
            self.filter.max_limit = v.parse().unwrap_or(self.filter.max_limit);
        }
        if let Ok(v) = env::var("ESMS_AUTH_REQUIRED") {
            self.auth.required = v.parse().unwrap_or(self.auth.required);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("ESMS_TOKEN_TTL_HOURS") {
            self.auth.token_ttl_hours = v.parse().unwrap_or(self.auth.token_ttl_hours);
        }
        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 30,
            },
            filter: FilterConfig { max_limit: 1000 },
            auth: AuthConfig {
                required: true,
                // Development fallback; real deployments set JWT_SECRET
                jwt_secret: "esms-dev-secret".to_string(),
                token_ttl_hours: 24 * 7,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                max_connections: 20,
                acquire_timeout_secs: 10,
            },
            filter: FilterConfig { max_limit: 500 },
            auth: AuthConfig {
                required: true,
                jwt_secret: String::new(),
                token_ttl_hours: 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                max_connections: 50,
                acquire_timeout_secs: 5,
            },
            filter: FilterConfig { max_limit: 100 },
            auth: AuthConfig {
                required: true,
                jwt_secret: String::new(),
                token_ttl_hours: 4,
            },
        }
    }
}

// Initialized once, on first access
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
