use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Result, bail};

/// Placeholder session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const MIN_SECRET_LEN: usize = 16;

const SESSION_DAYS: std::ops::RangeInclusive<i64> = 1..=365;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub picture_dir: PathBuf,
    pub session_secret: String,
    pub session_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_secret = var("GRAMS_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("GRAMS_SESSION_SECRET is unset or still a placeholder");
        }
        if session_secret.len() < MIN_SECRET_LEN {
            bail!("GRAMS_SESSION_SECRET must be at least {} bytes", MIN_SECRET_LEN);
        }

        let host = var("GRAMS_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("GRAMS_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()?;
        let session_days: i64 = var("GRAMS_SESSION_DAYS")
            .unwrap_or_else(|| "14".into())
            .parse()?;
        if !SESSION_DAYS.contains(&session_days) {
            bail!(
                "GRAMS_SESSION_DAYS must be between {} and {}",
                SESSION_DAYS.start(),
                SESSION_DAYS.end()
            );
        }

        Ok(Self {
            addr: format!("{}:{}", host, port).parse()?,
            db_path: var("GRAMS_DB_PATH").unwrap_or_else(|| "grams.db".into()).into(),
            picture_dir: var("GRAMS_PICTURE_DIR")
                .unwrap_or_else(|| "./pictures".into())
                .into(),
            session_secret,
            session_days,
        })
    }
}
