use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// One year.
const MAX_SESSION_IDLE_TIMEOUT_SECS: u64 = 365 * 24 * 3600;

/// Application configuration loaded from environment variables once at start-up.
/// Fails start-up if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub embedding_api_key: String,
    pub embedding_api_url: String,
    pub embedding_model: String,
    pub jobs_path: PathBuf,
    pub retrieval_top_k: usize,
    pub session_idle_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding_api_key: require_env("EMBEDDING_API_KEY")?,
            embedding_api_url: env_or("EMBEDDING_API_URL", "https://api.openai.com/v1"),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
            jobs_path: PathBuf::from(env_or("JOBS_PATH", "data/jobs.json")),
            retrieval_top_k: parse_env("RETRIEVAL_TOP_K", 5)?,
            session_idle_timeout_secs: parse_env("SESSION_IDLE_TIMEOUT_SECS", 3600)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retrieval_top_k == 0 {
            bail!("RETRIEVAL_TOP_K must be at least 1");
        }
        if !(1..=MAX_SESSION_IDLE_TIMEOUT_SECS).contains(&self.session_idle_timeout_secs) {
            bail!(
                "SESSION_IDLE_TIMEOUT_SECS must be between 1 and {MAX_SESSION_IDLE_TIMEOUT_SECS}"
            );
        }
        Ok(())
    }

    pub fn session_idle_timeout(&self) -> Result<chrono::Duration> {
        i64::try_from(self.session_idle_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .context("SESSION_IDLE_TIMEOUT_SECS is out of range")
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => Ok(default),
    }
}
