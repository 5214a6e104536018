use chrono::{DateTime, SecondsFormat, Utc};
use std::time::SystemTime;

/// Time source for the rate limiter.
///
/// Production code uses [`SystemClock`]; tests inject a manual clock to
/// drive window eviction deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Renders a timestamp as ISO-8601 (UTC, second precision).
pub fn format_timestamp(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)
}
