//! Source of the current time used to evaluate entry expiration.

use chrono::{DateTime, Utc};

/// Provides the instant against which expirations are evaluated.
///
/// The cache never reads the system time directly, so that tests can pin "now" with
/// [ControlledClock](crate::test_util::clock::ControlledClock).
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// A [Clock] reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
