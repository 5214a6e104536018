//! Per-client-IP sliding-window admission control.
//!
//! One entry per distinct source IP, shared across all connections from
//! that IP. The window is approximate: timestamps older than the window
//! are evicted lazily on each admission check rather than on a timer,
//! which is sufficient for bounding request rates.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::config::Limits;

/// Lifetime statistics for one client IP, as reported by `GET_INFO`.
#[derive(Debug, Clone)]
pub struct ConnectionStats {
    pub ip: IpAddr,
    pub first_seen: SystemTime,
    pub total_requests: u64,
    pub last_request: SystemTime,
    pub current_window_requests: usize,
}

#[derive(Debug)]
struct Entry {
    /// Admitted-request timestamps within the trailing window,
    /// non-decreasing; rejected attempts are not recorded here.
    window: Vec<SystemTime>,
    first_seen: SystemTime,
    last_request: SystemTime,
    /// Counts every attempt, including rejected ones.
    total_requests: u64,
}

/// Process-wide rate limiter.
///
/// Shared as `Arc<RateLimiter>` between connection tasks and the idle
/// sweeper; the entry map lives behind an async `RwLock`. The clock is a
/// constructor dependency so tests can drive time manually.
pub struct RateLimiter {
    entries: RwLock<HashMap<IpAddr, Entry>>,
    max_requests: usize,
    window: Duration,
    idle_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(limits: Limits, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_requests: limits.max_requests,
            window: limits.window(),
            idle_ttl: limits.idle_ttl(),
            clock,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    /// Decides whether a request from `ip` may proceed.
    ///
    /// Updates the lifetime counters either way; only admitted requests
    /// are recorded in the window. Never fails — an unknown IP starts
    /// from zero usage.
    pub async fn admit(&self, ip: IpAddr) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        let entry = entries.entry(ip).or_insert_with(|| Entry {
            window: Vec::new(),
            first_seen: now,
            last_request: now,
            total_requests: 0,
        });

        entry.total_requests += 1;
        entry.last_request = now;

        let window = self.window;
        entry.window.retain(|ts| in_window(now, *ts, window));

        if entry.window.len() >= self.max_requests {
            tracing::warn!(ip = %ip, window_requests = entry.window.len(), "rate limit exceeded");
            return false;
        }

        entry.window.push(now);
        true
    }

    /// Read-only snapshot of the statistics for `ip`.
    ///
    /// The current-window count is computed against `now` without
    /// mutating the entry.
    pub async fn stats(&self, ip: IpAddr) -> Option<ConnectionStats> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let entry = entries.get(&ip)?;

        let current_window_requests = entry
            .window
            .iter()
            .filter(|ts| in_window(now, **ts, self.window))
            .count();

        Some(ConnectionStats {
            ip,
            first_seen: entry.first_seen,
            total_requests: entry.total_requests,
            last_request: entry.last_request,
            current_window_requests,
        })
    }

    /// Removes entries whose last request is older than the idle TTL.
    ///
    /// Returns how many were removed. Run periodically to bound memory
    /// for abandoned IPs; the entries are advisory state, so removal is
    /// safe even while connections from that IP are still open.
    pub async fn sweep_idle(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();

        let idle_ttl = self.idle_ttl;
        entries.retain(|_, entry| match now.duration_since(entry.last_request) {
            Ok(age) => age <= idle_ttl,
            // last_request ahead of now: clock went backwards, keep
            Err(_) => true,
        });

        before - entries.len()
    }

    /// Number of tracked IPs, for monitoring.
    pub async fn tracked_ips(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn in_window(now: SystemTime, ts: SystemTime, window: Duration) -> bool {
    match now.duration_since(ts) {
        Ok(age) => age < window,
        Err(_) => true,
    }
}
