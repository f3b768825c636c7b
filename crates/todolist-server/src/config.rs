use std::path::PathBuf;

use anyhow::Context;

/// Upper bound for every seconds-valued setting: ten years.
const MAX_SECS: i64 = 10 * 365 * 24 * 3600;

/// Runtime settings, read from `TODOLIST_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub session_ttl_secs: i64,
    pub secure_cookies: bool,
    pub cleanup_interval_secs: u64,
    /// `None` means any origin is allowed.
    pub cors_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("TODOLIST_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("TODOLIST_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("TODOLIST_PORT must be a port number")?;
        let db_path: PathBuf = var("TODOLIST_DB_PATH")
            .unwrap_or_else(|| "todolist.db".into())
            .into();
        let session_ttl_secs: i64 = var("TODOLIST_SESSION_TTL_SECS")
            .unwrap_or_else(|| "1209600".into()) // 2 weeks
            .parse()
            .context("TODOLIST_SESSION_TTL_SECS must be a number of seconds")?;
        let secure_cookies = match var("TODOLIST_SECURE_COOKIES") {
            Some(v) => parse_bool(&v).context("TODOLIST_SECURE_COOKIES must be true or false")?,
            None => false,
        };
        let cleanup_interval_secs: u64 = var("TODOLIST_CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|| "3600".into())
            .parse()
            .context("TODOLIST_CLEANUP_INTERVAL_SECS must be a number of seconds")?;
        let cors_origins = var("TODOLIST_CORS_ORIGINS").map(|v| {
            v.split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect::<Vec<_>>()
        });

        anyhow::ensure!(
            (1..=MAX_SECS).contains(&session_ttl_secs),
            "TODOLIST_SESSION_TTL_SECS must be between 1 and {}",
            MAX_SECS
        );
        anyhow::ensure!(
            (1..=MAX_SECS as u64).contains(&cleanup_interval_secs),
            "TODOLIST_CLEANUP_INTERVAL_SECS must be between 1 and {}",
            MAX_SECS
        );

        Ok(Self {
            host,
            port,
            db_path,
            session_ttl_secs,
            secure_cookies,
            cleanup_interval_secs,
            cors_origins,
        })
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("invalid boolean {:?}", other),
    }
}
