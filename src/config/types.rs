use super::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub target: TargetConfig,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: Duration,

    /// Replication delay above which the target stops counting as failable
    #[serde(default = "default_max_replication_delay")]
    pub max_replication_delay: Duration,

    /// Where the SLA checkpoint is kept between restarts
    #[serde(default)]
    pub sla_checkpoint: Option<PathBuf>,

    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Label used in logs and metrics
    pub name: String,

    /// JSON status endpoint exposed by the monitored server
    pub status_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

fn default_metrics_address() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_max_replication_delay() -> Duration {
    Duration::from_secs(30)
}
