//! Wall-clock timestamps for sessions.
//!
//! The per-question countdown lives in [`crate::countdown`] and never reads the wall
//! clock. Everything here answers "when": session start and completion, when an item was
//! shown and answered, and the `now` handed to the review scheduler.

use chrono::{DateTime, Duration, Utc};

/// Where a session reads the current time from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeSource {
    #[default]
    System,
    /// Pinned instant, moved only by [`TimeSource::advance`].
    Fixed(DateTime<Utc>),
}

impl TimeSource {
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            TimeSource::System => Utc::now(),
            TimeSource::Fixed(t) => *t,
        }
    }

    /// Move a pinned source forward, e.g. to simulate a user thinking before answering.
    /// No effect on `System`.
    pub fn advance(&mut self, delta: Duration) {
        if let TimeSource::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Whole seconds from `shown` to `answered`, clamped to `u32`.
///
/// An answer stamped before the item was shown (wall clock stepped backwards) counts as 0.
#[must_use]
pub fn seconds_between(shown: DateTime<Utc>, answered: DateTime<Utc>) -> u32 {
    let secs = answered.signed_duration_since(shown).num_seconds();
    u32::try_from(secs.max(0)).unwrap_or(u32::MAX)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_time_source() -> TimeSource {
    TimeSource::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_source_moves_only_when_advanced() {
        let mut source = fixed_time_source();
        assert_eq!(source.now(), source.now());
        source.advance(Duration::seconds(5));
        assert_eq!(source.now(), fixed_now() + Duration::seconds(5));
    }

    #[test]
    fn system_source_ignores_advance() {
        let mut source = TimeSource::System;
        source.advance(Duration::days(1));
        assert!(source.now() > fixed_now());
        assert!(source.now() < Utc::now() + Duration::hours(1));
    }

    #[test]
    fn seconds_between_truncates_and_clamps() {
        let shown = fixed_now();
        assert_eq!(seconds_between(shown, shown + Duration::milliseconds(41_900)), 41);
        assert_eq!(seconds_between(shown, shown - Duration::seconds(3)), 0);
        assert_eq!(
            seconds_between(shown, shown + Duration::seconds(i64::from(u32::MAX) + 10)),
            u32::MAX
        );
    }
}
