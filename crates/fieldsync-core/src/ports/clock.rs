//! Clock port
//!
//! Time is injected so tests can pin timestamps and token expiry instead of
//! sleeping. Everything time-dependent (record `last_modified`, queue audit
//! fields, token validity) goes through this trait.

use chrono::{DateTime, Utc};

/// Port trait for the current time
pub trait IClock: Send + Sync {
    /// Returns the current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl IClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
