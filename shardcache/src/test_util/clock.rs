//! A controllable [Clock] for deterministic expiration tests.

use crate::util::clock::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use std::cell::Cell;
use std::rc::Rc;

/// A [Clock] returning a pinned instant that only changes when told to.
///
/// Clones share the same instant, so a clone handed to a cache can be advanced from the test.
///
/// # Examples
///
/// ```rust
/// use chrono::TimeDelta;
/// use shardcache::test_util::clock::ControlledClock;
/// use shardcache::util::clock::Clock;
///
/// let mut clock = ControlledClock::default();
/// let start = clock.now();
/// clock.advance_by(TimeDelta::hours(1));
/// assert_eq!(clock.now() - start, TimeDelta::hours(1));
/// ```
#[derive(Debug, Clone)]
pub struct ControlledClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ControlledClock {
    /// Creates a clock pinned to `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        ControlledClock {
            now: Rc::new(Cell::new(now)),
        }
    }

    /// Moves the pinned instant forward (or backward, for negative durations).
    pub fn advance_by(&mut self, duration: TimeDelta) {
        self.now.replace(self.now.get() + duration);
    }

    /// Pins the clock to the given instant.
    pub fn set(&mut self, now: DateTime<Utc>) {
        self.now.set(now);
    }
}

impl Default for ControlledClock {
    fn default() -> Self {
        Self::new(
            DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
                .map(|date| date.to_utc())
                .unwrap_or_default(),
        )
    }
}

impl Clock for ControlledClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_pinned_instant() {
        let mut clock = ControlledClock::default();
        let clone = clock.clone();
        clock.advance_by(TimeDelta::days(1));
        assert_eq!(clone.now(), clock.now());
    }

    #[test]
    fn test_set_pins_the_instant() {
        let mut clock = ControlledClock::default();
        let instant = DateTime::from_timestamp(1_000_000, 0).unwrap();
        clock.set(instant);
        assert_eq!(clock.now(), instant);
    }
}
