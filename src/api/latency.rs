//! Filter evaluation latency, recorded per `/transactions` query.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// Microsecond histogram shared between the query handler and `/stats/latency`.
pub struct QueryLatency {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySnapshot {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub max_us: Option<u64>,
}

impl QueryLatency {
    /// 1us to 60s at 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 60_000_000, 3)
            .expect("valid histogram bounds");
        Self { inner: Mutex::new(histogram) }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().clamp(1, 60_000_000) as u64;
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us);
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let empty = LatencySnapshot { samples: 0, p50_us: None, p95_us: None, p99_us: None, max_us: None };
        let Ok(h) = self.inner.lock() else {
            return empty;
        };
        if h.len() == 0 {
            return empty;
        }
        LatencySnapshot {
            samples: h.len(),
            p50_us: Some(h.value_at_quantile(0.5)),
            p95_us: Some(h.value_at_quantile(0.95)),
            p99_us: Some(h.value_at_quantile(0.99)),
            max_us: Some(h.max()),
        }
    }
}

impl Default for QueryLatency {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_reports_no_percentiles() {
        let snap = QueryLatency::new().snapshot();
        assert_eq!(snap.samples, 0);
        assert_eq!(snap.p50_us, None);
    }

    #[test]
    fn records_are_counted_and_clamped() {
        let lat = QueryLatency::new();
        lat.record(Duration::from_micros(250));
        lat.record(Duration::ZERO);
        lat.record(Duration::from_secs(600));
        let snap = lat.snapshot();
        assert_eq!(snap.samples, 3);
        assert!(snap.max_us.unwrap() >= 59_000_000);
    }
}
