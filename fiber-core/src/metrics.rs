//! Dispatch metrics
//!
//! Per-channel counters for pumps and deliveries, used to see which channels
//! are hot and how often reentrant churn made the dispatcher skip an entry.

use fiber_types::Channel;
use std::cell::Cell;

/// Counters for a single channel, shared between the dispatcher and its
/// in-flight batches on one thread
#[derive(Debug)]
pub struct ChannelMetrics {
    /// Channel being measured
    pub channel: Channel,

    /// Number of pumps (broadcast or node-scoped) on this channel
    pub pump_count: Cell<u64>,

    /// Number of handler invocations that ran
    pub delivered_count: Cell<u64>,

    /// Entries purged after the pump took its snapshot
    pub stale_count: Cell<u64>,

    /// Entries whose target was already borrowed further up the stack
    pub busy_count: Cell<u64>,
}

impl ChannelMetrics {
    pub fn new(channel: Channel) -> Self {
        ChannelMetrics {
            channel,
            pump_count: Cell::new(0),
            delivered_count: Cell::new(0),
            stale_count: Cell::new(0),
            busy_count: Cell::new(0),
        }
    }

    pub fn record_pump(&self) {
        self.pump_count.set(self.pump_count.get() + 1);
    }

    pub fn record_delivered(&self) {
        self.delivered_count.set(self.delivered_count.get() + 1);
    }

    pub fn record_stale(&self) {
        self.stale_count.set(self.stale_count.get() + 1);
    }

    pub fn record_busy(&self) {
        self.busy_count.set(self.busy_count.get() + 1);
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.pump_count.set(0);
        self.delivered_count.set(0);
        self.stale_count.set(0);
        self.busy_count.set(0);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            channel: self.channel,
            pumps: self.pump_count.get(),
            delivered: self.delivered_count.get(),
            skipped_stale: self.stale_count.get(),
            skipped_busy: self.busy_count.get(),
        }
    }
}

/// A point-in-time snapshot of one channel's counters
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub channel: Channel,
    pub pumps: u64,
    pub delivered: u64,
    pub skipped_stale: u64,
    pub skipped_busy: u64,
}

impl MetricsSnapshot {
    /// Average deliveries per pump
    pub fn fan_out(&self) -> f64 {
        if self.pumps == 0 {
            0.0
        } else {
            self.delivered as f64 / self.pumps as f64
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_stale + self.skipped_busy
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<20} pumps: {:>5} | delivered: {:>6} | fan-out: {:>5.1} | stale: {} | busy: {}",
            self.channel.name(),
            self.pumps,
            self.delivered,
            self.fan_out(),
            self.skipped_stale,
            self.skipped_busy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = ChannelMetrics::new(Channel::Tick);

        metrics.record_pump();
        metrics.record_delivered();
        metrics.record_delivered();
        metrics.record_stale();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pumps, 1);
        assert_eq!(snapshot.delivered, 2);
        assert_eq!(snapshot.skipped(), 1);
        assert_eq!(snapshot.fan_out(), 2.0);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = ChannelMetrics::new(Channel::Tick);

        metrics.record_pump();
        metrics.record_busy();
        metrics.reset();

        assert_eq!(metrics.pump_count.get(), 0);
        assert_eq!(metrics.busy_count.get(), 0);
    }

    #[test]
    fn test_snapshot_display() {
        let metrics = ChannelMetrics::new(Channel::LateTick);
        metrics.record_pump();
        metrics.record_delivered();

        let line = metrics.snapshot().to_string();
        assert!(line.starts_with("late_tick"));
        assert!(line.contains("delivered:      1"));
    }
}
