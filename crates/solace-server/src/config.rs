use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use chrono::Duration;

use solace_matching::MatchDefaults;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub defaults: MatchDefaults,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("SOLACE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SOLACE_JWT_SECRET is unset or still a placeholder; it must match the identity provider's signing secret");
        }

        let host = get("SOLACE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("SOLACE_PORT").unwrap_or_else(|| "3000".into()).parse()?;
        let db_path: PathBuf = get("SOLACE_DB_PATH").unwrap_or_else(|| "solace.db".into()).into();

        let mut defaults = MatchDefaults::default();
        if let Some(rating) = get("SOLACE_DEFAULT_RATING") {
            defaults.rating = rating.parse()?;
        }
        if let Some(raw) = get("SOLACE_ACTIVE_WINDOW_MINUTES") {
            let minutes: i64 = raw.parse()?;
            if minutes <= 0 {
                bail!("SOLACE_ACTIVE_WINDOW_MINUTES must be positive, got {}", minutes);
            }
            defaults.active_window = Duration::try_minutes(minutes)
                .ok_or_else(|| anyhow!("SOLACE_ACTIVE_WINDOW_MINUTES is out of range: {}", minutes))?;
        }

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            defaults,
        })
    }
}
