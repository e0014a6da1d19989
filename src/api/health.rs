//! Query counters for the /health endpoint. Updated by the query handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct HealthState {
    started_at: Instant,
    /// Queries that passed validation and were evaluated.
    queries_served: AtomicU64,
    /// Queries rejected for invalid criteria.
    queries_rejected: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            queries_served: AtomicU64::new(0),
            queries_rejected: AtomicU64::new(0),
        }
    }

    pub fn inc_served(&self) {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queries_served(&self) -> u64 {
        self.queries_served.load(Ordering::Relaxed)
    }

    pub fn queries_rejected(&self) -> u64 {
        self.queries_rejected.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}
