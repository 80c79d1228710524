use super::conditions::{ConditionSet, Diagnostic};
use super::report::{StateChange, StateReport, StatusReport};
use super::sla::{SlaCheckpoint, SlaCounters};
use super::unix_now;
use parking_lot::Mutex;
use tracing::{debug, info};

struct Inner {
    /// Conditions collected during the cycle in progress
    current: ConditionSet,
    /// Conditions of the last finalized cycle
    previous: ConditionSet,
    discovered: bool,
    in_failover: bool,
    generation: u64,
    sla: SlaCounters,
}

impl Inner {
    fn started_at(now: i64) -> Self {
        Self {
            current: ConditionSet::new(),
            previous: ConditionSet::new(),
            discovered: false,
            in_failover: false,
            generation: 0,
            sla: SlaCounters::started_at(now),
        }
    }

    fn gate(&mut self, healthy: bool) -> bool {
        if healthy {
            self.discovered = true;
        }
        healthy
    }

    fn project(&self, errors: bool) -> Vec<StateReport> {
        self.previous
            .iter()
            .filter(|(_, d)| d.is_error() == errors)
            .map(|(key, d)| StateReport::project(key, d))
            .collect()
    }
}

/// Health state and SLA bookkeeping for one monitored target.
///
/// Every field, condition sets and SLA counters alike, sits behind a single
/// mutex, so a reader never sees a half-applied rotation or tick. Share it
/// between tasks as `Arc<StateMachine>`.
///
/// The driver is expected to run, once per poll cycle: populate the current
/// set, take decisions against the previous set, [`tick`](Self::tick), then
/// [`rotate`](Self::rotate).
pub struct StateMachine {
    inner: Mutex<Inner>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::new_at(unix_now())
    }

    /// Create a machine whose SLA window starts at `now` (unix seconds)
    pub fn new_at(now: i64) -> Self {
        Self {
            inner: Mutex::new(Inner::started_at(now)),
        }
    }

    /// Drop all conditions, flags and counters and restart the window now
    pub fn init(&self) {
        self.init_at(unix_now());
    }

    pub fn init_at(&self, now: i64) {
        *self.inner.lock() = Inner::started_at(now);
        info!("State machine initialized at {}", now);
    }

    // --- conditions ---

    /// Record a condition for the cycle in progress; the first record for a key wins
    pub fn add_condition(&self, key: impl Into<String>, diagnostic: Diagnostic) {
        self.inner.lock().current.insert(key, diagnostic);
    }

    pub fn remove_condition(&self, key: &str) {
        self.inner.lock().current.remove(key);
    }

    /// Membership test against the last finalized cycle.
    ///
    /// The current set is still being filled and may be incomplete, so it is
    /// never consulted here.
    pub fn has_condition(&self, key: &str) -> bool {
        self.inner.lock().previous.contains(key)
    }

    /// Finalize the cycle: the current set becomes the previous one and a
    /// fresh current set starts empty.
    pub fn rotate(&self) {
        let mut inner = self.inner.lock();
        let finished = std::mem::take(&mut inner.current);
        inner.previous = finished;
        inner.generation += 1;
        debug!(
            "Rotated to generation {} with {} conditions",
            inner.generation,
            inner.previous.len()
        );
    }

    // --- health gates ---

    /// False if the cycle in progress has already seen an ERROR
    pub fn is_healthy_now(&self) -> bool {
        let mut inner = self.inner.lock();
        let healthy = !inner.current.has_errors();
        inner.gate(healthy)
    }

    /// False if the last finalized cycle holds an ERROR
    pub fn was_healthy_last_cycle(&self) -> bool {
        let mut inner = self.inner.lock();
        let healthy = !inner.previous.has_errors();
        inner.gate(healthy)
    }

    // --- SLA accounting ---

    /// Account the time elapsed since the previous tick.
    ///
    /// Credit is gated on the health of the last finalized cycle. Call once per
    /// cycle, after the cycle's diagnostics are known and before [`rotate`](Self::rotate).
    pub fn tick(&self, is_semi_synced: bool, is_not_delayed: bool) {
        self.tick_at(unix_now(), is_semi_synced, is_not_delayed);
    }

    pub fn tick_at(&self, now: i64, is_semi_synced: bool, is_not_delayed: bool) {
        let mut inner = self.inner.lock();
        let healthy = !inner.previous.has_errors();
        inner.gate(healthy);
        let elapsed = inner.sla.credit(now, healthy, is_semi_synced, is_not_delayed);
        debug!(
            "Tick {}: elapsed={}s healthy={} semisync={} not_delayed={} uptime={}s",
            inner.sla.heartbeats, elapsed, healthy, is_semi_synced, is_not_delayed, inner.sla.uptime
        );
    }

    pub fn uptime_percent(&self) -> String {
        self.inner.lock().sla.uptime_percent()
    }

    pub fn uptime_failable_percent(&self) -> String {
        self.inner.lock().sla.uptime_failable_percent()
    }

    pub fn uptime_semisync_percent(&self) -> String {
        self.inner.lock().sla.uptime_semisync_percent()
    }

    pub fn heartbeats(&self) -> u64 {
        self.inner.lock().sla.heartbeats
    }

    pub fn first_tick(&self) -> i64 {
        self.inner.lock().sla.first_tick
    }

    pub fn last_tick(&self) -> i64 {
        self.inner.lock().sla.last_tick
    }

    /// Number of rotations since the last init
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn snapshot_sla(&self) -> SlaCheckpoint {
        self.inner.lock().sla.checkpoint()
    }

    pub fn restore_sla(&self, checkpoint: &SlaCheckpoint) {
        self.inner.lock().sla.restore(checkpoint);
        info!(
            "Restored SLA window starting at {} (uptime={}s)",
            checkpoint.first_tick, checkpoint.uptime
        );
    }

    /// Restart the SLA window now; conditions and flags are left alone
    pub fn reset_uptime_window(&self) {
        self.reset_uptime_window_at(unix_now());
    }

    pub fn reset_uptime_window_at(&self, now: i64) {
        self.inner.lock().sla.reset(now);
        info!("SLA window reset at {}", now);
    }

    // --- reporting ---

    /// Conditions that closed or opened between the previous and current sets
    pub fn changes(&self) -> Vec<StateChange> {
        let inner = self.inner.lock();
        let mut changes = Vec::new();

        for (key, diagnostic) in inner.previous.iter() {
            if !inner.current.contains(key) {
                changes.push(StateChange::Closing {
                    key: key.to_string(),
                    diagnostic: diagnostic.clone(),
                });
            }
        }

        for (key, diagnostic) in inner.current.iter() {
            if !inner.previous.contains(key) {
                changes.push(StateChange::Opened {
                    key: key.to_string(),
                    diagnostic: diagnostic.clone(),
                });
            }
        }

        changes
    }

    /// Human-readable form of [`changes`](Self::changes)
    pub fn diff_since_last_cycle(&self) -> Vec<String> {
        self.changes().iter().map(ToString::to_string).collect()
    }

    pub fn open_errors(&self) -> Vec<StateReport> {
        self.inner.lock().project(true)
    }

    pub fn open_warnings(&self) -> Vec<StateReport> {
        self.inner.lock().project(false)
    }

    /// Consistent view of the whole aggregate. Does not touch the discovered flag.
    pub fn status(&self) -> StatusReport {
        let inner = self.inner.lock();
        StatusReport {
            uptime: inner.sla.uptime_percent(),
            uptime_failable: inner.sla.uptime_failable_percent(),
            uptime_semisync: inner.sla.uptime_semisync_percent(),
            heartbeats: inner.sla.heartbeats,
            first_tick: inner.sla.first_tick,
            last_tick: inner.sla.last_tick,
            generation: inner.generation,
            discovered: inner.discovered,
            in_failover: inner.in_failover,
            failable: !inner.previous.has_errors(),
            errors: inner.project(true),
            warnings: inner.project(false),
        }
    }

    // --- flags ---

    pub fn set_failover_state(&self) {
        self.inner.lock().in_failover = true;
        info!("Entering failover");
    }

    pub fn clear_failover_state(&self) {
        self.inner.lock().in_failover = false;
        info!("Leaving failover");
    }

    pub fn is_in_failover(&self) -> bool {
        self.inner.lock().in_failover
    }

    pub fn mark_undiscovered(&self) {
        self.inner.lock().discovered = false;
    }

    pub fn is_discovered(&self) -> bool {
        self.inner.lock().discovered
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
