//! Retry and timeout options for health-check execution.
//!
//! Durations are written as humantime strings (`"2s"`, `"30s"`, `"1m"`). Options are read
//! from an optional `config/depends_on` file and from `DEPENDS_ON__*` environment
//! variables, e.g. `DEPENDS_ON__RETRY__MAX_ATTEMPTS=5` or `DEPENDS_ON__TIMEOUT__TIMEOUT=2m`.

use crate::resiliency::BackoffType;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DependsOnOptions {
    pub retry: RetryOptions,
    pub timeout: TimeoutOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Total probe invocations per edge, the first one included.
    pub max_attempts: u32,
    pub backoff: BackoffType,
    #[serde(deserialize_with = "deserialize_duration")]
    pub delay: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffType::Exponential,
            delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutOptions {
    /// Upper bound for a single probe invocation.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for TimeoutOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl DependsOnOptions {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/depends_on").required(false))
            .add_source(Environment::with_prefix("DEPENDS_ON").separator("__"))
            .build()?
            .try_deserialize()
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}
