//! Statistics tracking for the query handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::handler::Outcome;

/// Atomic per-outcome counters.
#[derive(Default)]
pub struct Stats {
    hosts: AtomicU64,
    cached: AtomicU64,
    stale: AtomicU64,
    negative: AtomicU64,
    forwarded: AtomicU64,
    failed: AtomicU64,
    malformed: AtomicU64,
    /// Cumulative response time in microseconds for averaging.
    total_response_time_us: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: Outcome, elapsed: Duration) {
        let counter = match outcome {
            Outcome::Hosts => &self.hosts,
            Outcome::Cached => &self.cached,
            Outcome::Stale => &self.stale,
            Outcome::Negative => &self.negative,
            Outcome::Forwarded => &self.forwarded,
            Outcome::Failed => &self.failed,
            Outcome::Malformed => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        let hosts = self.hosts.swap(0, Ordering::Relaxed);
        let cached = self.cached.swap(0, Ordering::Relaxed);
        let stale = self.stale.swap(0, Ordering::Relaxed);
        let negative = self.negative.swap(0, Ordering::Relaxed);
        let forwarded = self.forwarded.swap(0, Ordering::Relaxed);
        let failed = self.failed.swap(0, Ordering::Relaxed);
        let malformed = self.malformed.swap(0, Ordering::Relaxed);
        let total_us = self.total_response_time_us.swap(0, Ordering::Relaxed);

        let requests = hosts + cached + stale + negative + forwarded + failed + malformed;
        let avg_response_ms = if requests > 0 {
            (total_us as f64 / requests as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            requests,
            hosts,
            cached,
            stale,
            negative,
            forwarded,
            failed,
            malformed,
            avg_response_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub hosts: u64,
    pub cached: u64,
    pub stale: u64,
    pub negative: u64,
    pub forwarded: u64,
    pub failed: u64,
    pub malformed: u64,
    pub avg_response_ms: f64,
}
