use std::path::PathBuf;

use anyhow::{Context, Result};

/// Placeholder signing secrets that only make sense in development.
const PLACEHOLDER_SECRETS: &[&str] = &["secret", "dev-secret-change-me"];

/// Token lifetimes accepted from the environment: one hour up to ten years.
const TOKEN_TTL_HOURS: std::ops::RangeInclusive<i64> = 1..=87_600;

pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub work_factor: u32,
    pub token_ttl_hours: i64,
}

impl Config {
    /// Read configuration from the environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        let testing = std::env::var("MESSAGELY_ENV").is_ok_and(|v| v == "test");
        let default_db = if testing { "messagely_test.db" } else { "messagely.db" };

        let db_path = std::env::var("MESSAGELY_DB_PATH")
            .unwrap_or_else(|_| default_db.into())
            .into();
        let host = std::env::var("MESSAGELY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var("MESSAGELY_PORT", 3000)?;
        let secret_key = std::env::var("MESSAGELY_SECRET_KEY").unwrap_or_else(|_| "secret".into());
        let work_factor = parse_var("MESSAGELY_WORK_FACTOR", 12)?;
        let token_ttl_hours = parse_var("MESSAGELY_TOKEN_TTL_HOURS", 720)?;

        if work_factor == 0 {
            anyhow::bail!("MESSAGELY_WORK_FACTOR must be at least 1");
        }
        check_token_ttl(token_ttl_hours)?;

        Ok(Self {
            db_path,
            host,
            port,
            secret_key,
            work_factor,
            token_ttl_hours,
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        PLACEHOLDER_SECRETS.contains(&self.secret_key.as_str())
    }
}

fn check_token_ttl(hours: i64) -> Result<()> {
    if !TOKEN_TTL_HOURS.contains(&hours) {
        anyhow::bail!(
            "MESSAGELY_TOKEN_TTL_HOURS must be between {} and {}, got {}",
            TOKEN_TTL_HOURS.start(),
            TOKEN_TTL_HOURS.end(),
            hours
        );
    }
    Ok(())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} is not a valid number: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}
