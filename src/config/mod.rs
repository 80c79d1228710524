pub mod duration;
mod types;

pub use duration::Duration;
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config =
            serde_yml::from_str(content).with_context(|| "Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.name.trim().is_empty() {
            anyhow::bail!("target.name must not be empty");
        }

        let url = url::Url::parse(&self.target.status_url)
            .with_context(|| format!("Invalid target.status_url: {}", self.target.status_url))?;
        if url.scheme() != "http" {
            anyhow::bail!(
                "target.status_url must use http, got '{}'",
                url.scheme()
            );
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than zero");
        }

        if self.probe_timeout.is_zero() {
            anyhow::bail!("probe_timeout must be greater than zero");
        }

        if self.probe_timeout > self.poll_interval {
            anyhow::bail!(
                "probe_timeout ({}) must not exceed poll_interval ({})",
                self.probe_timeout,
                self.poll_interval
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics
                .address
                .parse::<std::net::SocketAddr>()
                .with_context(|| format!("Invalid metrics.address: {}", metrics.address))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
target:
  name: db1
  status_url: http://127.0.0.1:8080/status
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.target.name, "db1");
        assert_eq!(config.poll_interval.as_secs(), 2);
        assert_eq!(config.probe_timeout.as_secs(), 1);
        assert_eq!(config.max_replication_delay.as_secs(), 30);
        assert!(config.sla_checkpoint.is_none());
        assert!(config.metrics.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_yaml(
            r#"
target:
  name: db1
  status_url: http://10.0.0.5:8080/status
poll_interval: 5s
probe_timeout: 1500ms
max_replication_delay: 1m
sla_checkpoint: /var/lib/replstate/db1.json
metrics: {}
"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval.as_secs(), 5);
        assert_eq!(config.probe_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_replication_delay.as_secs(), 60);
        assert_eq!(
            config.sla_checkpoint.as_deref(),
            Some(Path::new("/var/lib/replstate/db1.json"))
        );
        assert_eq!(config.metrics.unwrap().address, "0.0.0.0:9090");
    }

    #[test]
    fn test_rejects_empty_name() {
        let err = Config::from_yaml(
            r#"
target:
  name: "  "
  status_url: http://127.0.0.1:8080/status
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("target.name"));
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(Config::from_yaml(
            r#"
target:
  name: db1
  status_url: not a url
"#,
        )
        .is_err());

        assert!(Config::from_yaml(
            r#"
target:
  name: db1
  status_url: https://127.0.0.1/status
"#,
        )
        .is_err());
    }

    #[test]
    fn test_rejects_timeout_longer_than_interval() {
        let err = Config::from_yaml(
            r#"
target:
  name: db1
  status_url: http://127.0.0.1:8080/status
poll_interval: 1s
probe_timeout: 2s
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("probe_timeout"));
    }

    #[test]
    fn test_rejects_unknown_field() {
        assert!(Config::from_yaml(
            r#"
target:
  name: db1
  status_url: http://127.0.0.1:8080/status
polling: 2s
"#,
        )
        .is_err());
    }

    #[test]
    fn test_rejects_bad_metrics_address() {
        assert!(Config::from_yaml(
            r#"
target:
  name: db1
  status_url: http://127.0.0.1:8080/status
metrics:
  address: nowhere
"#,
        )
        .is_err());
    }
}
