//! Clock abstraction so battle timestamps are reproducible in tests.

use chrono::{DateTime, Utc};

/// Source of the current time, stamped onto sessions and log entries.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used by the running service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
