//! Request metrics for the gateway
//!
//! - Counters only, monotonic, reset on process start
//! - Totals are atomics; the keyed breakdowns sit behind short mutexes
//! - Held as an `Arc` in router state, never as a global

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

/// Request and error counters
#[derive(Debug)]
pub struct GatewayMetrics {
    started: Instant,
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    /// Keyed by `"<METHOD> <route pattern>"`
    requests_by_endpoint: Mutex<BTreeMap<String, u64>>,
    /// Keyed by status code, for statuses >= 400
    errors_by_type: Mutex<BTreeMap<String, u64>>,
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            requests_by_endpoint: Mutex::new(BTreeMap::new()),
            errors_by_type: Mutex::new(BTreeMap::new()),
        }
    }
}

impl GatewayMetrics {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished request.
    pub fn record(&self, endpoint: &str, status: u16) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        bump(&self.requests_by_endpoint, endpoint);

        if status >= 400 {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
            bump(&self.errors_by_type, &status.to_string());
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_seconds: self.started.elapsed().as_secs_f64(),
            total_requests: self.total_requests(),
            total_errors: self.total_errors(),
            requests_by_endpoint: copy(&self.requests_by_endpoint),
            errors_by_type: copy(&self.errors_by_type),
        }
    }
}

// A poisoned counter map is still a valid counter map.
fn bump(map: &Mutex<BTreeMap<String, u64>>, key: &str) {
    let mut guard = map.lock().unwrap_or_else(|p| p.into_inner());
    *guard.entry(key.to_string()).or_insert(0) += 1;
}

fn copy(map: &Mutex<BTreeMap<String, u64>>) -> BTreeMap<String, u64> {
    map.lock().unwrap_or_else(|p| p.into_inner()).clone()
}

/// Point-in-time copy of the gateway counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_seconds: f64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub requests_by_endpoint: BTreeMap<String, u64>,
    pub errors_by_type: BTreeMap<String, u64>,
}
