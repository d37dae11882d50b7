use std::net::SocketAddr;
use std::time::Duration;

use crate::dashboard::NOTIFICATION_TTL;
use crate::error::ConfigError;
use crate::status::DECAY_INTERVAL;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub battery_decay_interval: Duration,
    pub notification_ttl: Duration,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = match lookup("BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3003".to_string());

        Ok(Self {
            database_url,
            bind_addr,
            cors_origin,
            battery_decay_interval: seconds(&lookup, "BATTERY_DECAY_SECS", DECAY_INTERVAL)?,
            notification_ttl: seconds(&lookup, "NOTIFICATION_TTL_SECS", NOTIFICATION_TTL)?,
        })
    }
}

fn seconds<F>(lookup: &F, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid { name, value }),
        },
        None => Ok(default),
    }
}
