//! Poll loop driving one [`StateMachine`] through its per-cycle contract.

use crate::config::Config;
use crate::health::{HttpStatusProbe, Probe};
use crate::metrics::{Metrics, ProbeTimer};
use crate::state::{unix_now, StateChange, StateMachine};
use crate::store::CheckpointStore;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// What a single cycle observed
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub changes: Vec<StateChange>,
    /// Health of the cycle that gated this tick's uptime credit
    pub failable: bool,
    pub heartbeats: u64,
}

pub struct Monitor<P> {
    target: String,
    state: Arc<StateMachine>,
    probe: P,
    poll_interval: Duration,
    checkpoint: Option<CheckpointStore>,
    last_failable: Mutex<Option<bool>>,
}

impl Monitor<HttpStatusProbe> {
    pub fn from_config(config: &Config, state: Arc<StateMachine>) -> Self {
        let probe = HttpStatusProbe::new(
            config.target.status_url.clone(),
            config.probe_timeout.as_std(),
            config.max_replication_delay.as_std(),
        );

        let monitor = Self::new(
            config.target.name.clone(),
            state,
            probe,
            config.poll_interval.as_std(),
        );

        match &config.sla_checkpoint {
            Some(path) => monitor.with_checkpoint(CheckpointStore::new(path)),
            None => monitor,
        }
    }
}

impl<P: Probe> Monitor<P> {
    pub fn new(
        target: impl Into<String>,
        state: Arc<StateMachine>,
        probe: P,
        poll_interval: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            state,
            probe,
            poll_interval,
            checkpoint: None,
            last_failable: Mutex::new(None),
        }
    }

    pub fn with_checkpoint(mut self, store: CheckpointStore) -> Self {
        self.checkpoint = Some(store);
        self
    }

    pub fn state(&self) -> &Arc<StateMachine> {
        &self.state
    }

    /// Load a saved SLA window into the state machine. Returns true if one was applied.
    pub fn restore_checkpoint(&self) -> bool {
        let Some(store) = &self.checkpoint else {
            return false;
        };

        match store.load() {
            Ok(Some(checkpoint)) => {
                self.state.restore_sla(&checkpoint);
                true
            }
            Ok(None) => {
                info!("No SLA checkpoint at {:?}, starting a new window", store.path());
                false
            }
            Err(e) => {
                warn!("Ignoring unreadable SLA checkpoint: {}", e);
                false
            }
        }
    }

    pub fn save_checkpoint(&self) {
        if let Some(store) = &self.checkpoint {
            if let Err(e) = store.save(&self.state.snapshot_sla()) {
                warn!("Failed to save SLA checkpoint: {}", e);
            }
        }
    }

    pub async fn run_cycle(&self) -> CycleSummary {
        self.run_cycle_at(unix_now()).await
    }

    /// One poll cycle: collect conditions, decide on the finalized cycle,
    /// tick, then rotate.
    pub async fn run_cycle_at(&self, now: i64) -> CycleSummary {
        let timer = ProbeTimer::new(&self.target);
        let report = self.probe.probe().await;
        timer.finish(report.has_errors());

        for (key, diagnostic) in report.conditions {
            self.state.add_condition(key, diagnostic);
        }

        let failable = self.state.was_healthy_last_cycle();
        self.log_transition(failable);

        if !self.state.is_healthy_now() {
            warn!("{}: ERROR conditions raised this cycle", self.target);
        }

        self.state.tick_at(now, report.semi_synced, report.not_delayed);

        let changes = self.state.changes();
        for change in &changes {
            let opened = matches!(change, StateChange::Opened { .. });
            if opened && change.diagnostic().is_error() {
                warn!("{}: {}", self.target, change);
            } else {
                info!("{}: {}", self.target, change);
            }
        }

        self.state.rotate();

        let status = self.state.status();
        Metrics::record_status(&self.target, &status);
        Metrics::record_heartbeat(&self.target);
        self.save_checkpoint();

        CycleSummary {
            changes,
            failable,
            heartbeats: status.heartbeats,
        }
    }

    fn log_transition(&self, failable: bool) {
        let mut last = self.last_failable.lock();
        match (*last, failable) {
            (Some(true), false) => warn!("{} is no longer failable", self.target),
            (Some(false), true) => info!("{} is failable again", self.target),
            _ => {}
        }
        *last = Some(failable);
    }

    /// Poll until `shutdown` resolves, then persist the SLA window one last time
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Monitoring {} every {:?}",
            self.target, self.poll_interval
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        self.save_checkpoint();
        info!(
            "Stopped monitoring {} after {} cycles (uptime {}%)",
            self.target,
            self.state.heartbeats(),
            self.state.uptime_percent()
        );
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
