use crate::state::StatusReport;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Duration;

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_gauge!("sla_uptime_percent", "Share of the SLA window the target was healthy");
    describe_gauge!(
        "sla_uptime_failable_percent",
        "Share of the SLA window the target was healthy and not delayed"
    );
    describe_gauge!(
        "sla_uptime_semisync_percent",
        "Share of the SLA window the target was healthy with semi-sync replication"
    );
    describe_counter!("monitor_heartbeats_total", "Total number of poll cycles accounted");
    describe_gauge!("open_errors", "ERROR conditions in the last finalized cycle");
    describe_gauge!("open_warnings", "Non-fatal conditions in the last finalized cycle");
    describe_gauge!("target_failable", "Target eligible for automated recovery (1=yes, 0=no)");
    describe_gauge!("target_in_failover", "Failover in progress (1=yes, 0=no)");
    describe_histogram!("probe_duration_seconds", "Time spent polling the target");
}

/// Start Prometheus metrics server on given address
pub fn start_metrics_server(addr: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: std::net::SocketAddr = addr.parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    init_metrics();

    Ok(())
}

pub struct Metrics;

impl Metrics {
    /// Publish the state of one target after a cycle
    pub fn record_status(target: &str, status: &StatusReport) {
        let labels = [("target", target.to_string())];

        gauge!("sla_uptime_percent", &labels).set(parse_percent(&status.uptime));
        gauge!("sla_uptime_failable_percent", &labels).set(parse_percent(&status.uptime_failable));
        gauge!("sla_uptime_semisync_percent", &labels).set(parse_percent(&status.uptime_semisync));
        gauge!("open_errors", &labels).set(status.errors.len() as f64);
        gauge!("open_warnings", &labels).set(status.warnings.len() as f64);
        gauge!("target_failable", &labels).set(if status.failable { 1.0 } else { 0.0 });
        gauge!("target_in_failover", &labels).set(if status.in_failover { 1.0 } else { 0.0 });
    }

    #[inline]
    pub fn record_heartbeat(target: &str) {
        let labels = [("target", target.to_string())];
        counter!("monitor_heartbeats_total", &labels).increment(1);
    }

    #[inline]
    pub fn record_probe(target: &str, failed: bool, duration: Duration) {
        let labels = [
            ("target", target.to_string()),
            ("outcome", if failed { "error" } else { "ok" }.to_string()),
        ];
        histogram!("probe_duration_seconds", &labels).record(duration.as_secs_f64());
    }
}

fn parse_percent(formatted: &str) -> f64 {
    formatted.parse().unwrap_or(0.0)
}

/// Timer for probe duration tracking
pub struct ProbeTimer {
    start: std::time::Instant,
    target: String,
}

impl ProbeTimer {
    pub fn new(target: &str) -> Self {
        Self {
            start: std::time::Instant::now(),
            target: target.to_string(),
        }
    }

    pub fn finish(self, failed: bool) {
        Metrics::record_probe(&self.target, failed, self.start.elapsed());
    }
}
