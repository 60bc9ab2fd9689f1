//! Client configuration: pool sizing and timeouts, plus the TOML and
//! string-map front ends that produce it.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::{timeouts, DEFAULT_POOL_INIT_SIZE, DEFAULT_POOL_SIZE};

/// Settings shared by every pool a client creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub pool_size: usize,
    pub pool_init_size: usize,
    pub connect_timeout: Duration,
    pub idle_time: Duration,
    pub io_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            pool_init_size: DEFAULT_POOL_INIT_SIZE,
            connect_timeout: Duration::from_secs(timeouts::CONNECT_SECS),
            idle_time: Duration::from_secs(timeouts::IDLE_SECS),
            io_timeout: Duration::from_secs(timeouts::IO_SECS),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pool_size < 1 {
            return Err(Error::InvalidConfig("pool size must be at least 1".into()));
        }
        if self.pool_init_size > self.pool_size {
            return Err(Error::InvalidConfig(format!(
                "pool init size {} exceeds pool size {}",
                self.pool_init_size, self.pool_size
            )));
        }
        // zero would turn into a non-blocking socket / instant dial failure
        if self.connect_timeout.is_zero() || self.io_timeout.is_zero() {
            return Err(Error::InvalidConfig("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    22122
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub size: usize,
    pub init_size: usize,
    pub connect_timeout_secs: u64,
    pub idle_time_secs: u64,
    pub io_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            init_size: DEFAULT_POOL_INIT_SIZE,
            connect_timeout_secs: timeouts::CONNECT_SECS,
            idle_time_secs: timeouts::IDLE_SECS,
            io_timeout_secs: timeouts::IO_SECS,
        }
    }
}

impl From<&PoolSettings> for ClientConfig {
    fn from(p: &PoolSettings) -> Self {
        ClientConfig {
            pool_size: p.size,
            pool_init_size: p.init_size,
            connect_timeout: Duration::from_secs(p.connect_timeout_secs),
            idle_time: Duration::from_secs(p.idle_time_secs),
            io_timeout: Duration::from_secs(p.io_timeout_secs),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub tracker: TrackerSettings,
    #[serde(default)]
    pub pool: PoolSettings,
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.client_config()?;
        Ok(settings)
    }

    /// Flat string map as handed over by plugin loaders. Durations are in
    /// seconds.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let host = map
            .get("host")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidConfig("missing host".into()))?
            .clone();
        let defaults = PoolSettings::default();
        let settings = Settings {
            log_level: map.get("logLevel").cloned().unwrap_or_else(default_log_level),
            tracker: TrackerSettings {
                host,
                port: parse_num(map, "port", default_port())?,
            },
            pool: PoolSettings {
                size: parse_num(map, "socketPoolSize", defaults.size)?,
                init_size: parse_num(map, "socketInitSize", defaults.init_size)?,
                connect_timeout_secs: parse_num(map, "connectTimeout", defaults.connect_timeout_secs)?,
                idle_time_secs: parse_num(map, "socketIdleTime", defaults.idle_time_secs)?,
                io_timeout_secs: parse_num(map, "ioTimeout", defaults.io_timeout_secs)?,
            },
        };
        settings.client_config()?;
        Ok(settings)
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let config = ClientConfig::from(&self.pool);
        config.validate()?;
        Ok(config)
    }
}

fn parse_num<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> Result<T> {
    match map.get(key) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("{} has invalid value {:?}", key, v))),
    }
}
