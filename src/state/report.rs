use super::conditions::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Open condition as exposed to external reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReport {
    pub number: String,
    pub desc: String,
    pub from: String,
}

impl StateReport {
    pub(crate) fn project(key: &str, diagnostic: &Diagnostic) -> Self {
        Self {
            number: key.to_string(),
            desc: diagnostic.desc.clone(),
            from: diagnostic.from.clone(),
        }
    }
}

/// Difference between the finalized cycle and the one being populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "lowercase")]
pub enum StateChange {
    /// Present in the previous cycle, gone from the current one
    Closing { key: String, diagnostic: Diagnostic },
    /// Present in the current cycle only
    Opened { key: String, diagnostic: Diagnostic },
}

impl StateChange {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            StateChange::Closing { diagnostic, .. } | StateChange::Opened { diagnostic, .. } => {
                diagnostic
            }
        }
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateChange::Closing { key, diagnostic } => {
                write!(f, "{} CLOSING {}", key, diagnostic.desc)
            }
            StateChange::Opened { key, diagnostic } => write!(f, "{} {}", key, diagnostic.desc),
        }
    }
}

/// Everything a status endpoint needs, read under one lock acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub uptime: String,
    pub uptime_failable: String,
    pub uptime_semisync: String,
    pub heartbeats: u64,
    pub first_tick: i64,
    pub last_tick: i64,
    pub generation: u64,
    pub discovered: bool,
    pub in_failover: bool,
    /// No ERROR in the last finalized cycle
    pub failable: bool,
    pub errors: Vec<StateReport>,
    pub warnings: Vec<StateReport>,
}
