use anyhow::{Context, Result};

use crate::api_client::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::survey::notify::DEFAULT_NOTIFICATION_TTL_MS;
use crate::survey::store::DEFAULT_SESSION_IDLE_TTL_SECS;

/// Service configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub platform_api_url: String,
    pub port: u16,
    pub rust_log: String,
    pub request_timeout_secs: u64,
    pub submit_max_retries: u32,
    pub require_answer: bool,
    pub notification_ttl_ms: i64,
    pub session_idle_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            platform_api_url: require_env("PLATFORM_API_URL")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            submit_max_retries: parse_env("SUBMIT_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            require_answer: parse_env("REQUIRE_ANSWER", false)?,
            notification_ttl_ms: parse_env("NOTIFICATION_TTL_MS", DEFAULT_NOTIFICATION_TTL_MS)?,
            session_idle_ttl_secs: parse_env("SESSION_IDLE_TTL_SECS", DEFAULT_SESSION_IDLE_TTL_SECS)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
