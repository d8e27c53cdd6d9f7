//! What the engine exposes to a display: the last tick and running counters.

use crate::mapping::{OutputMode, PedalValues};
use crate::output::KeyId;
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};
use tracing::info;

/// Read-only record of the last completed tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickSnapshot {
    pub tick: u64,
    pub captured_at: Option<DateTime<Local>>,
    pub raw_steering: f32,
    pub conditioned_steering: f32,
    pub pedals: PedalValues,
    pub pressed_buttons: Vec<u32>,
    pub active_keys: Vec<KeyId>,
    /// Mode actually running, which differs from the configured one on fallback
    pub mode: OutputMode,
    pub focused: bool,
    pub faulted: bool,
}

/// How often the scheduler logs its counters
pub const STATS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TickStats {
    pub ticks: u64,
    pub faults: u64,
    window_ticks: u64,
    window_faults: u64,
    window_start: Instant,
}

impl TickStats {
    pub fn new(now: Instant) -> Self {
        Self {
            ticks: 0,
            faults: 0,
            window_ticks: 0,
            window_faults: 0,
            window_start: now,
        }
    }

    pub fn record(&mut self, faulted: bool) {
        self.ticks += 1;
        self.window_ticks += 1;
        if faulted {
            self.faults += 1;
            self.window_faults += 1;
        }
    }

    /// Logs and resets the window once it is older than [`STATS_INTERVAL`].
    /// Returns whether a line was logged.
    pub fn report_if_due(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < STATS_INTERVAL {
            return false;
        }
        let rate = self.window_ticks as f64 / elapsed.as_secs_f64();
        info!(
            "Engine stats: {} ticks ({:.1}/s), {} faults in the last {}s, {} ticks total",
            self.window_ticks,
            rate,
            self.window_faults,
            elapsed.as_secs(),
            self.ticks
        );
        self.window_ticks = 0;
        self.window_faults = 0;
        self.window_start = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_window_resets_after_report() {
        let start = Instant::now();
        let mut stats = TickStats::new(start);
        stats.record(false);
        stats.record(true);

        assert!(!stats.report_if_due(start + Duration::from_secs(3)));
        assert!(stats.report_if_due(start + STATS_INTERVAL));
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.faults, 1);
        assert!(!stats.report_if_due(start + STATS_INTERVAL + Duration::from_secs(1)));
    }
}
