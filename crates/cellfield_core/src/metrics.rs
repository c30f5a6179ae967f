//! Run statistics and structured logging setup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Counters shared by the driver loop.
pub struct Metrics {
    step_count: AtomicU64,
    live_agents: AtomicU64,
    births: AtomicU64,
    removals: AtomicU64,
    log_interval: u64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::with_interval(1000)
    }

    /// Collector that logs a summary every `log_interval` steps.
    #[must_use]
    pub fn with_interval(log_interval: u64) -> Self {
        Self {
            step_count: AtomicU64::new(0),
            live_agents: AtomicU64::new(0),
            births: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            log_interval: log_interval.max(1),
            counters: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a completed step.
    pub fn record_step(&self, duration: Duration, time: f64, agents: usize) {
        self.step_count.fetch_add(1, Ordering::Relaxed);
        self.live_agents.store(agents as u64, Ordering::Relaxed);

        let step = self.step_count.load(Ordering::Relaxed);
        if step % self.log_interval == 0 {
            tracing::info!(
                step,
                time,
                agents,
                births = self.births(),
                removals = self.removals(),
                duration_us = duration.as_micros() as u64,
                "Simulation step"
            );
        }
    }

    pub fn record_births(&self, n: usize) {
        self.births.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_removals(&self, n: usize) {
        self.removals.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn live_agents(&self) -> u64 {
        self.live_agents.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn births(&self) -> u64 {
        self.births.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`. A subscriber that is already set wins.
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging("cellfield_core=debug");
        init_logging("off");
        tracing::debug!("still routed to the first subscriber");
    }

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.step_count(), 0);
        assert_eq!(metrics.births(), 0);
    }

    #[test]
    fn test_record_step() {
        let metrics = Metrics::with_interval(2);
        metrics.record_step(Duration::from_millis(3), 0.01, 10);
        metrics.record_step(Duration::from_millis(3), 0.02, 12);
        assert_eq!(metrics.step_count(), 2);
        assert_eq!(metrics.live_agents(), 12);
    }

    #[test]
    fn test_births_and_removals() {
        let metrics = Metrics::new();
        metrics.record_births(4);
        metrics.record_removals(1);
        metrics.record_births(2);
        assert_eq!(metrics.births(), 6);
        assert_eq!(metrics.removals(), 1);
    }

    #[test]
    fn test_increment_counter() {
        let metrics = Metrics::new();
        metrics.increment_counter("divisions");
        metrics.increment_counter("divisions");
        assert_eq!(metrics.counter("divisions"), 2);
        assert_eq!(metrics.counter("missing"), 0);
    }
}
