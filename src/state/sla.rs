use serde::{Deserialize, Serialize};

/// Portable copy of the SLA window, meant to survive a process restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlaCheckpoint {
    /// Start of the observation window (unix seconds)
    pub first_tick: i64,
    pub uptime: i64,
    pub uptime_failable: i64,
    pub uptime_semisync: i64,
}

/// Time-weighted uptime accumulators, all in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlaCounters {
    pub first_tick: i64,
    pub last_tick: i64,
    pub uptime: i64,
    pub uptime_failable: i64,
    pub uptime_semisync: i64,
    pub heartbeats: u64,
}

impl SlaCounters {
    pub fn started_at(now: i64) -> Self {
        Self {
            first_tick: now,
            last_tick: now,
            uptime: 0,
            uptime_failable: 0,
            uptime_semisync: 0,
            heartbeats: 0,
        }
    }

    /// Credit the interval since the last tick and advance the window.
    ///
    /// Nothing is credited unless `healthy`; semisync and failable credit
    /// additionally need their own flag. Heartbeats always advance.
    ///
    /// `last_tick` is a high-water mark: a clock stepping backwards credits
    /// nothing and leaves the window where it was, so the accumulators can
    /// never outgrow the window. Arithmetic saturates, since counters may
    /// come from a restored checkpoint.
    pub fn credit(&mut self, now: i64, healthy: bool, semi_synced: bool, not_delayed: bool) -> i64 {
        let elapsed = now.saturating_sub(self.last_tick).max(0);

        if healthy {
            self.uptime = self.uptime.saturating_add(elapsed);
            if semi_synced {
                self.uptime_semisync = self.uptime_semisync.saturating_add(elapsed);
            }
            if not_delayed {
                self.uptime_failable = self.uptime_failable.saturating_add(elapsed);
            }
        }

        self.last_tick = self.last_tick.max(now);
        self.heartbeats = self.heartbeats.saturating_add(1);
        elapsed
    }

    /// Re-zero the window. Heartbeats are a lifetime count and survive.
    pub fn reset(&mut self, now: i64) {
        let heartbeats = self.heartbeats;
        *self = Self::started_at(now);
        self.heartbeats = heartbeats;
    }

    #[inline]
    pub fn window(&self) -> i64 {
        self.last_tick.saturating_sub(self.first_tick)
    }

    pub fn checkpoint(&self) -> SlaCheckpoint {
        SlaCheckpoint {
            first_tick: self.first_tick,
            uptime: self.uptime,
            uptime_failable: self.uptime_failable,
            uptime_semisync: self.uptime_semisync,
        }
    }

    pub fn restore(&mut self, checkpoint: &SlaCheckpoint) {
        self.first_tick = checkpoint.first_tick;
        self.uptime = checkpoint.uptime;
        self.uptime_failable = checkpoint.uptime_failable;
        self.uptime_semisync = checkpoint.uptime_semisync;
    }

    pub fn uptime_percent(&self) -> String {
        format_percent(self.uptime, self.window())
    }

    pub fn uptime_failable_percent(&self) -> String {
        format_percent(self.uptime_failable, self.window())
    }

    pub fn uptime_semisync_percent(&self) -> String {
        format_percent(self.uptime_semisync, self.window())
    }
}

const ZERO_PERCENT: &str = "0.00000";
const FULL_PERCENT: &str = "100.00000";
const CLAMPED_PERCENT: &str = "99.99999";

/// Format `accumulated / window` as a percentage with five decimals.
///
/// An empty or inverted window reports 0%. A result that formats to exactly
/// 100% is reported as 99.99999: a literal 100% SLA is never published.
pub(crate) fn format_percent(accumulated: i64, window: i64) -> String {
    if window <= 0 {
        return ZERO_PERCENT.to_string();
    }

    let formatted = format!("{:.5}", 100.0 * accumulated as f64 / window as f64);
    if formatted == FULL_PERCENT {
        CLAMPED_PERCENT.to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_requires_health() {
        let mut sla = SlaCounters::started_at(1_000);

        let elapsed = sla.credit(1_010, false, true, true);
        assert_eq!(elapsed, 10);
        assert_eq!(sla.uptime, 0);
        assert_eq!(sla.uptime_failable, 0);
        assert_eq!(sla.uptime_semisync, 0);
        assert_eq!(sla.last_tick, 1_010);
        assert_eq!(sla.heartbeats, 1);
    }

    #[test]
    fn test_credit_gates_are_independent() {
        let mut sla = SlaCounters::started_at(0);

        sla.credit(5, true, true, false);
        sla.credit(12, true, false, true);

        assert_eq!(sla.uptime, 12);
        assert_eq!(sla.uptime_semisync, 5);
        assert_eq!(sla.uptime_failable, 7);
        assert_eq!(sla.heartbeats, 2);
    }

    #[test]
    fn test_backwards_clock_credits_nothing() {
        let mut sla = SlaCounters::started_at(100);
        sla.credit(110, true, true, true);
        assert_eq!(sla.credit(90, true, true, true), 0);

        assert_eq!(sla.uptime, 10);
        assert_eq!(sla.last_tick, 110);
        assert_eq!(sla.heartbeats, 2);

        // Returning to the old high-water mark must not credit the interval twice
        assert_eq!(sla.credit(110, true, true, true), 0);
        assert_eq!(sla.uptime, 10);
        assert!(sla.uptime <= sla.window());
        assert!(sla.uptime_failable <= sla.window());
        assert!(sla.uptime_semisync <= sla.window());
        assert_eq!(sla.uptime_percent(), "99.99999");

        sla.credit(120, true, true, true);
        assert_eq!(sla.uptime, 20);
        assert_eq!(sla.window(), 20);
        assert_eq!(sla.heartbeats, 4);
    }

    #[test]
    fn test_extreme_restored_values_saturate() {
        let mut sla = SlaCounters::started_at(1_700_000_000);
        sla.restore(&SlaCheckpoint {
            first_tick: i64::MIN,
            uptime: i64::MAX,
            uptime_failable: i64::MAX,
            uptime_semisync: i64::MAX,
        });

        assert_eq!(sla.window(), i64::MAX);
        assert_eq!(sla.uptime_percent(), "99.99999");

        sla.credit(1_700_000_010, true, true, true);
        assert_eq!(sla.uptime, i64::MAX);
        assert_eq!(sla.uptime_failable, i64::MAX);
        assert_eq!(sla.uptime_semisync, i64::MAX);
        assert_eq!(sla.last_tick, 1_700_000_010);
    }

    #[test]
    fn test_far_future_first_tick_reports_zero() {
        let mut sla = SlaCounters::started_at(i64::MIN);
        sla.restore(&SlaCheckpoint {
            first_tick: i64::MAX,
            uptime: 5,
            uptime_failable: 5,
            uptime_semisync: 5,
        });

        assert_eq!(sla.window(), i64::MIN);
        assert_eq!(sla.uptime_percent(), "0.00000");
        assert_eq!(sla.credit(i64::MAX, true, true, true), i64::MAX);
    }

    #[test]
    fn test_format_percent_clamps_full_window() {
        assert_eq!(format_percent(10, 10), "99.99999");
        assert_eq!(format_percent(3_600, 3_600), "99.99999");
    }

    #[test]
    fn test_format_percent_rounding_to_full_is_clamped() {
        // 99.9999996% rounds to 100.00000 at five decimals
        assert_eq!(format_percent(249_999_999, 250_000_000), "99.99999");
    }

    #[test]
    fn test_format_percent_regular_values() {
        assert_eq!(format_percent(5, 10), "50.00000");
        assert_eq!(format_percent(1, 3), "33.33333");
        assert_eq!(format_percent(0, 10), "0.00000");
    }

    #[test]
    fn test_format_percent_empty_window() {
        assert_eq!(format_percent(0, 0), "0.00000");
        assert_eq!(format_percent(42, 0), "0.00000");
        assert_eq!(format_percent(42, -5), "0.00000");
    }

    #[test]
    fn test_reset_keeps_heartbeats() {
        let mut sla = SlaCounters::started_at(0);
        sla.credit(30, true, true, true);
        sla.reset(50);

        assert_eq!(sla.first_tick, 50);
        assert_eq!(sla.last_tick, 50);
        assert_eq!(sla.uptime, 0);
        assert_eq!(sla.uptime_failable, 0);
        assert_eq!(sla.uptime_semisync, 0);
        assert_eq!(sla.heartbeats, 1);
    }

    #[test]
    fn test_checkpoint_serde_field_names() {
        let checkpoint = SlaCheckpoint {
            first_tick: 1,
            uptime: 2,
            uptime_failable: 3,
            uptime_semisync: 4,
        };
        let json = serde_json::to_value(checkpoint).unwrap();
        assert_eq!(json["first_tick"], 1);
        assert_eq!(json["uptime_semisync"], 4);

        let back: SlaCheckpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, checkpoint);
    }
}
