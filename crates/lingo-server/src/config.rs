use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub token_ttl_days: i64,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("LINGO_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("LINGO_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let port: u16 = get("LINGO_PORT")
            .unwrap_or_else(|| "4000".into())
            .parse()
            .context("LINGO_PORT must be a port number")?;
        let token_ttl_days: i64 = get("LINGO_TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "7".into())
            .parse()
            .context("LINGO_TOKEN_TTL_DAYS must be a whole number of days")?;
        if token_ttl_days <= 0 {
            bail!("LINGO_TOKEN_TTL_DAYS must be positive");
        }

        Ok(Self {
            jwt_secret,
            db_path: get("LINGO_DB_PATH").unwrap_or_else(|| "lingo.db".into()).into(),
            host: get("LINGO_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            token_ttl_days,
            cors_origin: get("LINGO_CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".into()),
        })
    }
}
