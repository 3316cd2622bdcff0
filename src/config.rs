use anyhow::{bail, Context};
use jsonwebtoken::Algorithm;

/// Which HTTP surface the binary serves.
///
/// `Local` is the on-device shape: opaque session tokens persisted in the
/// database, bound to localhost by default. `Remote` is the stateless shape:
/// signed bearer tokens, no server-side session rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_ttl_minutes: i64,
    pub session_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub mode: ServiceMode,
    pub token: TokenConfig,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// `DATABASE_URL` and `JWT_SECRET` are required: the service refuses to
    /// guess a storage location or fall back to a baked-in signing secret.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let mode = match std::env::var("APP_MODE")
            .unwrap_or_else(|_| "local".into())
            .to_lowercase()
            .as_str()
        {
            "local" => ServiceMode::Local,
            "remote" => ServiceMode::Remote,
            other => bail!("APP_MODE must be 'local' or 'remote', got '{other}'"),
        };

        let algorithm = match std::env::var("JWT_ALGORITHM")
            .unwrap_or_else(|_| "HS256".into())
            .as_str()
        {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                bail!("JWT_ALGORITHM must be one of HS256/HS384/HS512, got '{other}'")
            }
        };

        let token = TokenConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            algorithm,
            access_ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            session_ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            mode,
            token,
            allowed_origins,
        })
    }
}
