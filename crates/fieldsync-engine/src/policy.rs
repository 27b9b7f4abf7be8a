//! Retry policy for mutation uploads
//!
//! Controls how many failed round trips a queue entry is allowed before it
//! becomes permanently failed, and whether the engine re-attempts an entry
//! within a single pass.
//!
//! The default policy has no in-pass backoff: a failed entry simply returns
//! to pending and is retried on the next sync pass. A backoff hook turns on
//! bounded in-pass retries with caller-defined delays.

use std::time::Duration;

use fieldsync_core::domain::DEFAULT_RETRY_CEILING;

/// Retry behaviour for the upload phase
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// Failed-attempt ceiling; at this count an entry becomes `Failed`
    pub max_attempts: u32,
    /// Optional delay schedule for in-pass retries, indexed by attempt
    pub backoff: Option<fn(u32) -> Duration>,
}

impl RetryPolicy {
    /// Policy with a custom ceiling and no in-pass backoff
    pub fn with_ceiling(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: None,
        }
    }

    /// Delay before re-attempting within the same pass, if any
    pub fn backoff_for(&self, attempt: u32) -> Option<Duration> {
        self.backoff.map(|f| f(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_CEILING,
            backoff: None,
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff.map(|_| "<fn>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert!(policy.backoff_for(0).is_none());
    }

    #[test]
    fn test_custom_ceiling() {
        let policy = RetryPolicy::with_ceiling(5);
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn test_backoff_hook() {
        fn doubling(attempt: u32) -> Duration {
            Duration::from_secs(1 << attempt)
        }
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Some(doubling),
        };
        assert_eq!(policy.backoff_for(0), Some(Duration::from_secs(1)));
        assert_eq!(policy.backoff_for(2), Some(Duration::from_secs(4)));
    }
}
