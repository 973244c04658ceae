use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("cannot schedule a review for a session with zero questions")]
    DivisionByZero,
    #[error("correct count {correct} exceeds total questions {total}")]
    CountOverflow { correct: u32, total: u32 },
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Accuracy thresholds and review offsets for untimed sessions.
///
/// Defaults: accuracy >= 0.8 advances the stage and reviews in 7 days,
/// accuracy >= 0.6 holds the stage and reviews in 1 day, anything lower resets to
/// stage 1 and reviews in 12 hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulePolicy {
    advance_threshold: f64,
    hold_threshold: f64,
    advance_after_hours: u32,
    hold_after_hours: u32,
    reset_after_hours: u32,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            advance_threshold: 0.8,
            hold_threshold: 0.6,
            advance_after_hours: 7 * 24,
            hold_after_hours: 24,
            reset_after_hours: 12,
        }
    }
}

impl SchedulePolicy {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidThreshold` if a threshold is outside `[0, 1]`, and
    /// `ConfigError::ThresholdOrder` if the hold threshold exceeds the advance threshold.
    pub fn new(
        advance_threshold: f64,
        hold_threshold: f64,
        advance_after_hours: u32,
        hold_after_hours: u32,
        reset_after_hours: u32,
    ) -> Result<Self, ConfigError> {
        let policy = Self {
            advance_threshold,
            hold_threshold,
            advance_after_hours,
            hold_after_hours,
            reset_after_hours,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for threshold in [self.advance_threshold, self.hold_threshold] {
            if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidThreshold(threshold));
            }
        }
        if self.hold_threshold > self.advance_threshold {
            return Err(ConfigError::ThresholdOrder {
                hold: self.hold_threshold,
                advance: self.advance_threshold,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn advance_threshold(&self) -> f64 {
        self.advance_threshold
    }

    #[must_use]
    pub fn hold_threshold(&self) -> f64 {
        self.hold_threshold
    }

    #[must_use]
    pub fn advance_after(&self) -> Duration {
        Duration::hours(i64::from(self.advance_after_hours))
    }

    #[must_use]
    pub fn hold_after(&self) -> Duration {
        Duration::hours(i64::from(self.hold_after_hours))
    }

    #[must_use]
    pub fn reset_after(&self) -> Duration {
        Duration::hours(i64::from(self.reset_after_hours))
    }
}

//
// ─── SCHEDULE ──────────────────────────────────────────────────────────────────
//

/// Which accuracy band a session fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageChange {
    Advanced,
    Held,
    Reset,
}

/// When to review next and at which stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSchedule {
    pub next_review_at: DateTime<Utc>,
    pub stage: u32,
    pub change: StageChange,
}

/// Maps a finished untimed session's accuracy to the next review.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReviewScheduler {
    policy: SchedulePolicy,
}

impl ReviewScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: SchedulePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    /// Schedule a set reviewed for the first time (prior stage 1).
    ///
    /// # Errors
    ///
    /// See [`ReviewScheduler::reschedule`].
    pub fn schedule(
        &self,
        correct_count: u32,
        total_questions: u32,
        now: DateTime<Utc>,
    ) -> Result<ReviewSchedule, SchedulerError> {
        self.reschedule(1, correct_count, total_questions, now)
    }

    /// Schedule the next review from the stage the set was at before this session.
    ///
    /// - accuracy >= advance threshold: stage `max(prior + 1, 2)`
    /// - accuracy >= hold threshold: stage `max(prior, 1)`
    /// - otherwise: stage 1
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::DivisionByZero` if `total_questions` is 0 and
    /// `SchedulerError::CountOverflow` if `correct_count > total_questions`.
    pub fn reschedule(
        &self,
        prior_stage: u32,
        correct_count: u32,
        total_questions: u32,
        now: DateTime<Utc>,
    ) -> Result<ReviewSchedule, SchedulerError> {
        if total_questions == 0 {
            return Err(SchedulerError::DivisionByZero);
        }
        if correct_count > total_questions {
            return Err(SchedulerError::CountOverflow {
                correct: correct_count,
                total: total_questions,
            });
        }

        let accuracy = f64::from(correct_count) / f64::from(total_questions);
        let (stage, change, offset) = if accuracy >= self.policy.advance_threshold {
            (
                prior_stage.saturating_add(1).max(2),
                StageChange::Advanced,
                self.policy.advance_after(),
            )
        } else if accuracy >= self.policy.hold_threshold {
            (prior_stage.max(1), StageChange::Held, self.policy.hold_after())
        } else {
            (1, StageChange::Reset, self.policy.reset_after())
        };

        tracing::debug!(
            correct_count,
            total_questions,
            accuracy,
            prior_stage,
            stage,
            ?change,
            "review scheduled"
        );

        Ok(ReviewSchedule {
            next_review_at: now + offset,
            stage,
            change,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn eighty_percent_advances_and_waits_a_week() {
        let now = fixed_now();
        let schedule = ReviewScheduler::new().schedule(8, 10, now).unwrap();
        assert_eq!(schedule.change, StageChange::Advanced);
        assert_eq!(schedule.stage, 2);
        assert_eq!(schedule.next_review_at, now + Duration::days(7));
    }

    #[test]
    fn fifty_percent_resets_and_waits_twelve_hours() {
        let now = fixed_now();
        let schedule = ReviewScheduler::new().reschedule(4, 5, 10, now).unwrap();
        assert_eq!(schedule.change, StageChange::Reset);
        assert_eq!(schedule.stage, 1);
        assert_eq!(schedule.next_review_at, now + Duration::hours(12));
    }

    #[test]
    fn middle_band_holds_stage_for_a_day() {
        let now = fixed_now();
        let scheduler = ReviewScheduler::new();

        let held = scheduler.reschedule(3, 6, 10, now).unwrap();
        assert_eq!(held.change, StageChange::Held);
        assert_eq!(held.stage, 3);
        assert_eq!(held.next_review_at, now + Duration::days(1));

        // 0.79 is still below the advance threshold
        let almost = scheduler.reschedule(0, 79, 100, now).unwrap();
        assert_eq!(almost.change, StageChange::Held);
        assert_eq!(almost.stage, 1);
    }

    #[test]
    fn advancing_builds_on_prior_stage() {
        let schedule = ReviewScheduler::new()
            .reschedule(4, 10, 10, fixed_now())
            .unwrap();
        assert_eq!(schedule.stage, 5);
    }

    #[test]
    fn zero_questions_is_division_by_zero() {
        let err = ReviewScheduler::new().schedule(0, 0, fixed_now()).unwrap_err();
        assert_eq!(err, SchedulerError::DivisionByZero);
    }

    #[test]
    fn more_correct_than_total_is_rejected() {
        let err = ReviewScheduler::new().schedule(3, 2, fixed_now()).unwrap_err();
        assert!(matches!(err, SchedulerError::CountOverflow { correct: 3, total: 2 }));
    }

    #[test]
    fn custom_policy_changes_offsets() {
        let policy = SchedulePolicy::new(0.9, 0.5, 48, 6, 1).unwrap();
        let now = fixed_now();
        let schedule = ReviewScheduler::with_policy(policy)
            .schedule(8, 10, now)
            .unwrap();
        assert_eq!(schedule.change, StageChange::Held);
        assert_eq!(schedule.next_review_at, now + Duration::hours(6));
    }

    #[test]
    fn policy_rejects_inverted_thresholds() {
        assert!(matches!(
            SchedulePolicy::new(0.5, 0.7, 1, 1, 1),
            Err(ConfigError::ThresholdOrder { .. })
        ));
        assert!(matches!(
            SchedulePolicy::new(1.5, 0.7, 1, 1, 1),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }
}
