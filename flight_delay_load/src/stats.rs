use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Request counters shared by all virtual users.
#[derive(Debug)]
pub struct Stats {
    requests: AtomicU64,
    failures: AtomicU64,
    latency_sum_us: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
        }
    }

    pub fn record(&self, latency: Duration, ok: bool) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_us.fetch_add(us, Ordering::Relaxed);
        self.latency_min_us.fetch_min(us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Summary {
        let requests = self.requests.load(Ordering::Relaxed);
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let (avg_ms, min_ms, max_ms) = if requests == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (
                (sum as f64 / requests as f64) / 1000.0,
                self.latency_min_us.load(Ordering::Relaxed) as f64 / 1000.0,
                self.latency_max_us.load(Ordering::Relaxed) as f64 / 1000.0,
            )
        };
        Summary {
            requests,
            failures: self.failures.load(Ordering::Relaxed),
            avg_ms,
            min_ms,
            max_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub requests: u64,
    pub failures: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={} failures={} avg={:.2}ms min={:.2}ms max={:.2}ms",
            self.requests, self.failures, self.avg_ms, self.min_ms, self.max_ms
        )
    }
}
