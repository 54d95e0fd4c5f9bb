//! Time and randomness used for Message-ID, Date and boundary generation.

use chrono::{DateTime, Utc};
use std::fmt;

/// Source of the current time and of random values.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns a random value.
    fn random(&self) -> u64;
}

/// Wall clock plus the thread-local `fastrand` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn random(&self) -> u64 {
        fastrand::u64(..)
    }
}

/// Clock frozen at one instant with a constant random value.
///
/// Makes generated headers reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    /// Instant returned by [`Clock::now`].
    pub at: DateTime<Utc>,
    /// Value returned by [`Clock::random`].
    pub random: u64,
}

impl FixedClock {
    /// Creates a fixed clock.
    #[must_use]
    pub const fn new(at: DateTime<Utc>, random: u64) -> Self {
        Self { at, random }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }

    fn random(&self) -> u64 {
        self.random
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let clock = FixedClock::new(at, 42);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.random(), 42);
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
