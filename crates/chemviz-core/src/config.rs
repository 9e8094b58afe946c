use std::net::SocketAddr;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Connection pool sizing for the Postgres history store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

/// Service configuration.
///
/// Layering, last one wins: built-in defaults, an optional TOML file, then
/// environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Postgres URL for the history store; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// IANA timezone used to render history dates.
    pub display_timezone: String,
    pub max_upload_bytes: usize,
    pub pool: PoolConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            display_timezone: "UTC".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pool: PoolConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(Into::into)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CHEMVIZ_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(url) = lookup("DATABASE_URL").or_else(|| lookup("CHEMVIZ_DATABASE_URL")) {
            self.database_url = Some(url);
        }
        if let Some(tz) = lookup("CHEMVIZ_DISPLAY_TZ") {
            self.display_timezone = tz;
        }
        if let Some(limit) = lookup("CHEMVIZ_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit
                .trim()
                .parse()
                .with_context(|| format!("CHEMVIZ_MAX_UPLOAD_BYTES must be an integer, got '{limit}'"))?;
        }
        if let Some(max) = lookup("CHEMVIZ_DB_MAX_CONNECTIONS") {
            self.pool.max_connections = max
                .trim()
                .parse()
                .with_context(|| format!("CHEMVIZ_DB_MAX_CONNECTIONS must be an integer, got '{max}'"))?;
        }
        if let Some(secs) = lookup("CHEMVIZ_DB_ACQUIRE_TIMEOUT_SECS") {
            self.pool.acquire_timeout_secs = secs.trim().parse().with_context(|| {
                format!("CHEMVIZ_DB_ACQUIRE_TIMEOUT_SECS must be an integer, got '{secs}'")
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.timezone()?;
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than zero"));
        }
        if self.pool.max_connections == 0 {
            return Err(anyhow!("pool.max_connections must be greater than zero"));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", self.bind_addr))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.display_timezone
            .parse::<Tz>()
            .map_err(|err| anyhow!("unknown timezone '{}': {err}", self.display_timezone))
    }
}
