//! Per-target health state: condition snapshots, health gates and SLA uptime.

mod conditions;
mod machine;
mod report;
mod sla;

pub use conditions::{ConditionSet, Diagnostic, ERROR_KIND, WARNING_KIND};
pub use machine::StateMachine;
pub use report::{StateChange, StateReport, StatusReport};
pub use sla::SlaCheckpoint;

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock in unix seconds
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
