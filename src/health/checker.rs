use super::{
    Probe, ProbeReport, ERR_BAD_STATUS, ERR_STATUS, ERR_UNREACHABLE, MONITOR_ORIGIN,
    TARGET_ORIGIN, WARN_DELAY,
};
use crate::state::Diagnostic;
use async_trait::async_trait;
use http_body_util::{BodyExt, Empty, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Largest status document accepted from the target
const MAX_STATUS_BYTES: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("{0}")]
    Unreachable(String),

    #[error("Status document exceeds {0} bytes")]
    TooLarge(usize),
}

type FetchResult = Result<(StatusCode, Bytes), FetchError>;

/// Status document served by the monitored target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetStatus {
    #[serde(default)]
    pub semi_sync: bool,
    #[serde(default)]
    pub delay_secs: u64,
    #[serde(default)]
    pub conditions: Vec<ReportedCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedCondition {
    pub code: String,
    pub kind: String,
    #[serde(default)]
    pub desc: String,
}

/// Polls the target's JSON status endpoint over plain HTTP
pub struct HttpStatusProbe {
    status_url: String,
    timeout: Duration,
    max_delay_secs: u64,
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl HttpStatusProbe {
    pub fn new(status_url: String, timeout: Duration, max_delay: Duration) -> Self {
        let connector = HttpConnector::new();
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .build(connector);

        Self {
            status_url,
            timeout,
            max_delay_secs: max_delay.as_secs(),
            client,
        }
    }

    async fn fetch(&self) -> FetchResult {
        let uri: hyper::Uri = self
            .status_url
            .parse()
            .map_err(|e| FetchError::Unreachable(format!("Invalid URL: {}", e)))?;

        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("user-agent", "replstate-monitor/1.0")
            .header("accept", "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| FetchError::Unreachable(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .request(req)
            .await
            .map_err(|e| FetchError::Unreachable(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = Limited::new(response.into_body(), MAX_STATUS_BYTES)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    FetchError::TooLarge(MAX_STATUS_BYTES)
                } else {
                    FetchError::Unreachable(format!("Failed to read body: {}", e))
                }
            })?
            .to_bytes();

        Ok((status, body))
    }

    /// Turn a fetch outcome into the cycle's diagnostics
    fn interpret(&self, outcome: FetchResult) -> ProbeReport {
        let (status, body) = match outcome {
            Ok(fetched) => fetched,
            Err(FetchError::Unreachable(e)) => {
                warn!("Target {} unreachable: {}", self.status_url, e);
                return ProbeReport::failed(ERR_UNREACHABLE, e);
            }
            Err(e @ FetchError::TooLarge(_)) => {
                warn!("Target {} sent an oversized status: {}", self.status_url, e);
                return ProbeReport::failed(ERR_BAD_STATUS, e.to_string());
            }
        };

        if !status.is_success() {
            warn!("Target {} answered {}", self.status_url, status);
            return ProbeReport::failed(ERR_STATUS, format!("Status endpoint returned {}", status));
        }

        let parsed: TargetStatus = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Target {} sent an unreadable status: {}", self.status_url, e);
                return ProbeReport::failed(ERR_BAD_STATUS, format!("Unreadable status document: {}", e));
            }
        };

        let mut conditions: Vec<(String, Diagnostic)> = parsed
            .conditions
            .into_iter()
            .map(|c| (c.code, Diagnostic::new(c.kind, c.desc, TARGET_ORIGIN)))
            .collect();

        let not_delayed = parsed.delay_secs <= self.max_delay_secs;
        if !not_delayed {
            conditions.push((
                WARN_DELAY.to_string(),
                Diagnostic::warning(
                    format!(
                        "Replication delay {}s exceeds {}s",
                        parsed.delay_secs, self.max_delay_secs
                    ),
                    MONITOR_ORIGIN,
                ),
            ));
        }

        debug!(
            "Target {}: semisync={} delay={}s conditions={}",
            self.status_url,
            parsed.semi_sync,
            parsed.delay_secs,
            conditions.len()
        );

        ProbeReport {
            conditions,
            semi_synced: parsed.semi_sync,
            not_delayed,
        }
    }
}

#[async_trait]
impl Probe for HttpStatusProbe {
    async fn probe(&self) -> ProbeReport {
        let outcome = match timeout(self.timeout, self.fetch()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Unreachable("Timeout".to_string())),
        };
        self.interpret(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn probe_for(url: &str) -> HttpStatusProbe {
        HttpStatusProbe::new(url.to_string(), Duration::from_secs(2), Duration::from_secs(30))
    }

    fn ok(body: &str) -> FetchResult {
        Ok((StatusCode::OK, Bytes::from(body.to_string())))
    }

    #[test]
    fn test_healthy_status() {
        let probe = probe_for("http://127.0.0.1:1/status");
        let report = probe.interpret(ok(r#"{"semi_sync": true, "delay_secs": 3}"#));

        assert!(report.conditions.is_empty());
        assert!(report.semi_synced);
        assert!(report.not_delayed);
    }

    #[test]
    fn test_reported_conditions_pass_through() {
        let probe = probe_for("http://127.0.0.1:1/status");
        let report = probe.interpret(ok(r#"{
            "semi_sync": false,
            "delay_secs": 0,
            "conditions": [
                {"code": "ERR00042", "kind": "ERROR", "desc": "no primary"},
                {"code": "WARN0023", "kind": "WARN", "desc": "slow query"}
            ]
        }"#));

        assert!(report.has_errors());
        assert!(!report.semi_synced);
        assert_eq!(report.conditions.len(), 2);
        assert_eq!(report.conditions[0].0, "ERR00042");
        assert_eq!(report.conditions[0].1.from, TARGET_ORIGIN);
        assert!(!report.conditions[1].1.is_error());
    }

    #[test]
    fn test_delay_over_limit_raises_warning() {
        let probe = probe_for("http://127.0.0.1:1/status");
        let report = probe.interpret(ok(r#"{"semi_sync": true, "delay_secs": 31}"#));

        assert!(!report.not_delayed);
        assert!(!report.has_errors());
        assert_eq!(report.conditions[0].0, WARN_DELAY);
        assert_eq!(report.conditions[0].1.from, MONITOR_ORIGIN);
    }

    #[test]
    fn test_failures_map_to_errors() {
        let probe = probe_for("http://127.0.0.1:1/status");

        let report = probe.interpret(Err(FetchError::Unreachable(
            "Request failed: refused".to_string(),
        )));
        assert_eq!(report.conditions[0].0, ERR_UNREACHABLE);

        let report = probe.interpret(Err(FetchError::TooLarge(MAX_STATUS_BYTES)));
        assert_eq!(report.conditions[0].0, ERR_BAD_STATUS);
        assert_eq!(report.conditions[0].1.desc, "Status document exceeds 65536 bytes");

        let report = probe.interpret(Ok((StatusCode::SERVICE_UNAVAILABLE, Bytes::new())));
        assert_eq!(report.conditions[0].0, ERR_STATUS);

        let report = probe.interpret(ok("not json"));
        assert_eq!(report.conditions[0].0, ERR_BAD_STATUS);
        assert!(report.has_errors());
    }

    #[tokio::test]
    async fn test_probe_reads_live_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = r#"{"semi_sync": true, "delay_secs": 1}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let probe = probe_for(&format!("http://{}/status", addr));
        let report = probe.probe().await;

        assert!(report.conditions.is_empty());
        assert!(report.semi_synced);
        assert!(report.not_delayed);
    }

    #[tokio::test]
    async fn test_oversized_status_document_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            // Valid JSON padded past the cap
            let body = format!(
                r#"{{"semi_sync": true, "delay_secs": 1, "pad": "{}"}}"#,
                "x".repeat(MAX_STATUS_BYTES)
            );
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
        });

        let probe = probe_for(&format!("http://{}/status", addr));
        let report = probe.probe().await;

        assert!(report.has_errors());
        assert_eq!(report.conditions.len(), 1);
        assert_eq!(report.conditions[0].0, ERR_BAD_STATUS);
        assert!(!report.semi_synced);
    }

    #[tokio::test]
    async fn test_probe_unreachable_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = probe_for(&format!("http://{}/status", addr));
        let report = probe.probe().await;

        assert!(report.has_errors());
        assert_eq!(report.conditions[0].0, ERR_UNREACHABLE);
    }
}
