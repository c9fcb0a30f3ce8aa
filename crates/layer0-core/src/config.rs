//! layer0.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay for a dispatcher run when the caller does not say otherwise.
pub const DEFAULT_RUN_DELAY: Duration = Duration::from_secs(10);

/// Delay for the follow-up run scheduled after a placement failure.
pub const DEFAULT_CAPACITY_MISS_DELAY: Duration = Duration::from_secs(1);

/// Memory of a fresh container host, in bytes (8 GB).
pub const DEFAULT_INSTANCE_MEMORY_BYTES: u64 = 8_000_000_000;

/// Upper bound on cloud API eventual-consistency retries.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between cloud API retries.
pub const DEFAULT_API_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layer0Config {
    pub scaler: Option<ScalerConfig>,
    pub cluster: Option<ClusterConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScalerConfig {
    /// Delay before a scheduled scaler run fires (e.g. "10s").
    pub run_delay: Option<String>,
    /// Shorter delay used right after a placement failure (e.g. "1s").
    pub capacity_miss_delay: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Memory of a fresh container host, in bytes.
    pub instance_memory_bytes: Option<u64>,
    /// Ports bound on every fresh host (agent, SSH).
    pub reserved_ports: Option<Vec<u16>>,
    /// Upper bound on cloud API eventual-consistency retries (e.g. "30s").
    pub api_timeout: Option<String>,
    /// Delay between cloud API retries (e.g. "1s").
    pub api_retry_delay: Option<String>,
}

impl Layer0Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Layer0Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn run_delay(&self) -> Duration {
        self.scaler
            .as_ref()
            .and_then(|s| s.run_delay.as_deref())
            .and_then(parse_delay)
            .unwrap_or(DEFAULT_RUN_DELAY)
    }

    pub fn capacity_miss_delay(&self) -> Duration {
        self.scaler
            .as_ref()
            .and_then(|s| s.capacity_miss_delay.as_deref())
            .and_then(parse_delay)
            .unwrap_or(DEFAULT_CAPACITY_MISS_DELAY)
    }

    pub fn instance_memory_bytes(&self) -> u64 {
        self.cluster
            .as_ref()
            .and_then(|c| c.instance_memory_bytes)
            .unwrap_or(DEFAULT_INSTANCE_MEMORY_BYTES)
    }

    /// Ports a fresh host arrives with already bound.
    pub fn reserved_ports(&self) -> Vec<u16> {
        self.cluster
            .as_ref()
            .and_then(|c| c.reserved_ports.clone())
            .unwrap_or_else(|| vec![22])
    }

    pub fn api_timeout(&self) -> Duration {
        self.cluster
            .as_ref()
            .and_then(|c| c.api_timeout.as_deref())
            .and_then(parse_delay)
            .unwrap_or(DEFAULT_API_TIMEOUT)
    }

    pub fn api_retry_delay(&self) -> Duration {
        self.cluster
            .as_ref()
            .and_then(|c| c.api_retry_delay.as_deref())
            .and_then(parse_delay)
            .unwrap_or(DEFAULT_API_RETRY_DELAY)
    }
}

/// Parse a delay string like "500ms", "30s", "5m".
pub fn parse_delay(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
