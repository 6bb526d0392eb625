use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::schema::{PacketVersion, WireFormat};
use crate::subscriber::{ChannelConfig, OverflowPolicy};

pub const QUEUE_CAPACITY_VAR: &str = "EVENTCAST_QUEUE_CAPACITY";
pub const OVERFLOW_POLICY_VAR: &str = "EVENTCAST_OVERFLOW_POLICY";
pub const BIND_ADDR_VAR: &str = "EVENTCAST_BIND_ADDR";
pub const DEFAULT_VERSION_VAR: &str = "EVENTCAST_DEFAULT_VERSION";
pub const DEFAULT_FORMAT_VAR: &str = "EVENTCAST_DEFAULT_FORMAT";
pub const LANE_SWEEP_SECS_VAR: &str = "EVENTCAST_LANE_SWEEP_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Engine and demo server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Outbound queue capacity per subscriber
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub bind_addr: SocketAddr,
    /// Version assumed for connections that do not ask for one
    pub default_version: PacketVersion,
    pub default_format: WireFormat,
    /// How often lanes of abandoned topics are swept
    pub lane_sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: ChannelConfig::DEFAULT_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            default_version: PacketVersion::V1,
            default_format: WireFormat::default(),
            lane_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `EVENTCAST_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(capacity) = parse(&lookup, QUEUE_CAPACITY_VAR)? {
            if capacity == 0 {
                return Err(ConfigError::Invalid {
                    key: QUEUE_CAPACITY_VAR,
                    value: "0".to_string(),
                    reason: "capacity must be at least 1".to_string(),
                });
            }
            config.queue_capacity = capacity;
        }
        if let Some(policy) = parse(&lookup, OVERFLOW_POLICY_VAR)? {
            config.overflow_policy = policy;
        }
        if let Some(addr) = parse(&lookup, BIND_ADDR_VAR)? {
            config.bind_addr = addr;
        }
        if let Some(version) = parse(&lookup, DEFAULT_VERSION_VAR)? {
            config.default_version = version;
        }
        if let Some(format) = parse(&lookup, DEFAULT_FORMAT_VAR)? {
            config.default_format = format;
        }
        if let Some(secs) = parse::<u64>(&lookup, LANE_SWEEP_SECS_VAR)? {
            config.lane_sweep_interval = Duration::from_secs(secs.max(1));
        }

        Ok(config)
    }

    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig::new(self.queue_capacity, self.overflow_policy)
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    value.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
