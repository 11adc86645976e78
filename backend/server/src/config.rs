use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{Context, Result, anyhow};
use axum::http::HeaderValue;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Redis,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown store {other:?}")),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub store: StoreKind,
    pub redis_url: String,
    pub cooldown_secs: i64,
    pub ip_window_secs: u64,
    pub ip_max_requests: u32,
    /// Admin login attempts per IP per `ip_window_secs`.
    pub login_max_attempts: u32,
    /// `None` allows any origin.
    pub allowed_origin: Option<HeaderValue>,
    /// Admin area is closed when unset.
    pub admin_password: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let allowed_origin = match try_load::<String>("ALLOWED_ORIGIN", "*")?.as_str() {
            "*" => None,
            origin => Some(
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid ALLOWED_ORIGIN value: {origin}"))?,
            ),
        };

        let config = Self {
            port: try_load("RUST_PORT", "8080")?,
            environment: try_load("APP_ENV", "development")?,
            store: try_load("STORE", "memory")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            cooldown_secs: try_load("CONTACT_COOLDOWN_SECS", "60")?,
            ip_window_secs: try_load("IP_WINDOW_SECS", "60")?,
            ip_max_requests: try_load("IP_MAX_REQUESTS", "60")?,
            login_max_attempts: try_load("LOGIN_MAX_ATTEMPTS", "5")?,
            allowed_origin,
            admin_password: read_secret("ADMIN_PASSWORD"),
        };

        if config.cooldown_secs < 0
            || config.ip_window_secs == 0
            || config.ip_max_requests == 0
            || config.login_max_attempts == 0
        {
            return Err(anyhow!("Rate limit windows and limits must be positive"));
        }

        Ok(config)
    }

    pub fn secure_cookies(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
        .filter(|secret| !secret.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!("production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(" Dev ".parse::<Environment>(), Ok(Environment::Development));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_store_parse() {
        assert_eq!("redis".parse::<StoreKind>(), Ok(StoreKind::Redis));
        assert_eq!("MEMORY".parse::<StoreKind>(), Ok(StoreKind::Memory));
        assert!("postgres".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_try_load_default() {
        let port: u16 = try_load("FOLIO_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);

        assert!(try_load::<u16>("FOLIO_TEST_UNSET_PORT", "not a port").is_err());
    }
}
