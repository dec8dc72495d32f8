//! Wall clock abstraction
//!
//! Cache staleness and token expiry are both evaluated against a [`Clock`] so
//! that time-dependent behavior can be driven deterministically in tests.

use chrono::{DateTime, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
