//! Wall-clock deadline arithmetic for supervised runs.
//!
//! Uses `tokio::time::Instant` so paused-time tests drive deadlines deterministically.

use std::time::Duration;
use tokio::time::Instant;

/// A single-shot deadline. `None` means the run is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
    timeout_secs: u64,
}

impl Deadline {
    /// Deadline `timeout_secs` from now; `0` disables it.
    pub fn after_secs(timeout_secs: u64) -> Self {
        Self::starting_at(Instant::now(), timeout_secs)
    }

    pub fn starting_at(start: Instant, timeout_secs: u64) -> Self {
        let at = if timeout_secs == 0 {
            None
        } else {
            start.checked_add(Duration::from_secs(timeout_secs))
        };
        Self { at, timeout_secs }
    }

    pub fn unbounded() -> Self {
        Self {
            at: None,
            timeout_secs: 0,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.at.is_none()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// True once the current time is strictly past the deadline.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.at {
            Some(at) => now > at,
            None => false,
        }
    }

    /// Time left before expiry; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Milliseconds since the Unix epoch, the unit the reporting service expects in URLs.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_never_expires() {
        let start = Instant::now();
        let d = Deadline::starting_at(start, 0);
        assert!(d.is_unbounded());
        assert!(!d.is_expired_at(start + Duration::from_secs(86_400 * 365)));
        assert_eq!(d.remaining(), None);
    }

    #[test]
    fn expires_strictly_after_timeout() {
        let start = Instant::now();
        let d = Deadline::starting_at(start, 10);
        assert!(!d.is_expired_at(start + Duration::from_secs(10)));
        assert!(d.is_expired_at(start + Duration::from_millis(10_001)));
        assert_eq!(d.timeout_secs(), 10);
    }
}
