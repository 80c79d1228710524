//! Discovery of diagnostics about the monitored target.

mod checker;

pub use checker::{HttpStatusProbe, ReportedCondition, TargetStatus};

use crate::state::Diagnostic;
use async_trait::async_trait;

/// Origin recorded on diagnostics raised by the probe itself
pub const MONITOR_ORIGIN: &str = "monitor";
/// Origin recorded on diagnostics reported by the target
pub const TARGET_ORIGIN: &str = "target";

pub const ERR_UNREACHABLE: &str = "ERR_UNREACHABLE";
pub const ERR_STATUS: &str = "ERR_STATUS";
pub const ERR_BAD_STATUS: &str = "ERR_BAD_STATUS";
pub const WARN_DELAY: &str = "WARN_DELAY";

/// Outcome of one poll of the target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub conditions: Vec<(String, Diagnostic)>,
    pub semi_synced: bool,
    pub not_delayed: bool,
}

impl ProbeReport {
    /// Report for a target that could not be assessed at all
    pub fn failed(key: &str, desc: impl Into<String>) -> Self {
        Self {
            conditions: vec![(key.to_string(), Diagnostic::error(desc, MONITOR_ORIGIN))],
            semi_synced: false,
            not_delayed: false,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.conditions.iter().any(|(_, d)| d.is_error())
    }
}

/// Source of per-cycle diagnostics
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self) -> ProbeReport;
}
