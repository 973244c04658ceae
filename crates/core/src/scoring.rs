use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Largest accepted `base_points` / `max_time_bonus`.
pub const MAX_POLICY_POINTS: u32 = 1_000_000;

/// Largest accepted combo multiplier.
pub const MAX_COMBO_MULTIPLIER: f64 = 100.0;

/// Scoring constants for timed sessions.
///
/// Defaults: 100 base points, up to 100 time-bonus points, combo multiplier 0.1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringPolicy {
    base_points: u32,
    max_time_bonus: u32,
    combo_multiplier: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_points: 100,
            max_time_bonus: 100,
            combo_multiplier: 0.1,
        }
    }
}

impl ScoringPolicy {
    /// # Errors
    ///
    /// Returns `ConfigError::PointsOutOfRange` if a point value exceeds
    /// [`MAX_POLICY_POINTS`] and `ConfigError::InvalidComboMultiplier` if the multiplier is
    /// not in `[0, MAX_COMBO_MULTIPLIER]`.
    pub fn new(
        base_points: u32,
        max_time_bonus: u32,
        combo_multiplier: f64,
    ) -> Result<Self, ConfigError> {
        let policy = Self {
            base_points,
            max_time_bonus,
            combo_multiplier,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("base_points", self.base_points),
            ("max_time_bonus", self.max_time_bonus),
        ] {
            if value > MAX_POLICY_POINTS {
                return Err(ConfigError::PointsOutOfRange { field, value });
            }
        }
        if !(0.0..=MAX_COMBO_MULTIPLIER).contains(&self.combo_multiplier) {
            return Err(ConfigError::InvalidComboMultiplier(self.combo_multiplier));
        }
        Ok(())
    }

    #[must_use]
    pub fn base_points(&self) -> u32 {
        self.base_points
    }

    #[must_use]
    pub fn max_time_bonus(&self) -> u32 {
        self.max_time_bonus
    }

    #[must_use]
    pub fn combo_multiplier(&self) -> f64 {
        self.combo_multiplier
    }

    /// Time bonus for a correct answer, rounded half-up. `time_remaining` is clamped to
    /// `[0, time_limit]`; a zero limit yields no bonus.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn time_bonus(&self, time_remaining: u32, time_limit: u32) -> u32 {
        if time_limit == 0 {
            return 0;
        }
        let remaining = time_remaining.min(time_limit);
        let raw = f64::from(self.max_time_bonus) * f64::from(remaining) / f64::from(time_limit);
        raw.round() as u32
    }

    /// Combo bonus for a correct answer that brings the streak to `combo`.
    /// A streak of 1 earns nothing.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn combo_bonus(&self, combo: u32) -> u32 {
        if combo < 2 {
            return 0;
        }
        let raw = f64::from(self.base_points) * f64::from(combo) * self.combo_multiplier;
        raw.round() as u32
    }
}

//
// ─── SCORE STATE ───────────────────────────────────────────────────────────────
//

/// Points gained by a single outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomePoints {
    pub base: u32,
    pub time_bonus: u32,
    pub combo_bonus: u32,
}

impl OutcomePoints {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.base
            .saturating_add(self.time_bonus)
            .saturating_add(self.combo_bonus)
    }

    /// Trim these points so that adding them to `total` cannot pass `u32::MAX`.
    fn capped(self, total: u32) -> Self {
        let mut headroom = u32::MAX - total;
        let base = self.base.min(headroom);
        headroom -= base;
        let time_bonus = self.time_bonus.min(headroom);
        headroom -= time_bonus;
        Self {
            base,
            time_bonus,
            combo_bonus: self.combo_bonus.min(headroom),
        }
    }
}

/// A decoded score record that no sequence of outcomes could have produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreRecordError {
    #[error("total score {total} does not equal the sum of its parts {parts}")]
    TotalMismatch { total: u32, parts: u64 },

    #[error("current combo {current} exceeds max combo {max}")]
    ComboAboveMax { current: u32, max: u32 },

    #[error("{correct} correct answers out of {answered} answered")]
    CorrectAboveAnswered { correct: u32, answered: u32 },
}

/// Running score of a timed session.
///
/// Only [`ScoreState::apply_outcome`] mutates it, which keeps
/// `total_score == base_points + time_bonus + combo_bonus` and
/// `max_combo >= current_combo` after every call. Decoding checks the same
/// invariants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ScoreRecord")]
pub struct ScoreState {
    base_points: u32,
    time_bonus: u32,
    combo_bonus: u32,
    total_score: u32,
    current_combo: u32,
    max_combo: u32,
    correct_count: u32,
    total_answered: u32,
}

/// Wire shape of [`ScoreState`], checked on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreRecord {
    base_points: u32,
    time_bonus: u32,
    combo_bonus: u32,
    total_score: u32,
    current_combo: u32,
    max_combo: u32,
    correct_count: u32,
    total_answered: u32,
}

impl TryFrom<ScoreRecord> for ScoreState {
    type Error = ScoreRecordError;

    fn try_from(record: ScoreRecord) -> Result<Self, Self::Error> {
        let parts = u64::from(record.base_points)
            + u64::from(record.time_bonus)
            + u64::from(record.combo_bonus);
        if parts != u64::from(record.total_score) {
            return Err(ScoreRecordError::TotalMismatch {
                total: record.total_score,
                parts,
            });
        }
        if record.current_combo > record.max_combo {
            return Err(ScoreRecordError::ComboAboveMax {
                current: record.current_combo,
                max: record.max_combo,
            });
        }
        if record.correct_count > record.total_answered {
            return Err(ScoreRecordError::CorrectAboveAnswered {
                correct: record.correct_count,
                answered: record.total_answered,
            });
        }

        Ok(Self {
            base_points: record.base_points,
            time_bonus: record.time_bonus,
            combo_bonus: record.combo_bonus,
            total_score: record.total_score,
            current_combo: record.current_combo,
            max_combo: record.max_combo,
            correct_count: record.correct_count,
            total_answered: record.total_answered,
        })
    }
}

impl ScoreState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one answered (or expired) question into the score.
    ///
    /// Bonuses are rounded per question before being added, so running totals stay
    /// integral. An expired question is passed as `is_correct = false`. Points that
    /// would carry the total past `u32::MAX` are dropped; the returned points are the
    /// ones actually added.
    pub fn apply_outcome(
        &mut self,
        policy: &ScoringPolicy,
        is_correct: bool,
        time_remaining: u32,
        time_limit: u32,
    ) -> OutcomePoints {
        let earned = if is_correct {
            let combo = self.current_combo.saturating_add(1);
            self.current_combo = combo;
            OutcomePoints {
                base: policy.base_points(),
                time_bonus: policy.time_bonus(time_remaining, time_limit),
                combo_bonus: policy.combo_bonus(combo),
            }
        } else {
            self.current_combo = 0;
            OutcomePoints::default()
        };
        let points = earned.capped(self.total_score);

        // capped above, so none of these sums can overflow
        self.base_points += points.base;
        self.time_bonus += points.time_bonus;
        self.combo_bonus += points.combo_bonus;
        self.total_score = self.base_points + self.time_bonus + self.combo_bonus;
        self.max_combo = self.max_combo.max(self.current_combo);
        self.correct_count = self.correct_count.saturating_add(u32::from(is_correct));
        self.total_answered = self.total_answered.saturating_add(1);
        points
    }

    /// Rebuild a score from `(is_correct, time_remaining)` pairs in answer order.
    #[must_use]
    pub fn replay(
        policy: &ScoringPolicy,
        outcomes: impl IntoIterator<Item = (bool, u32)>,
        time_limit: u32,
    ) -> Self {
        let mut state = Self::new();
        for (is_correct, time_remaining) in outcomes {
            state.apply_outcome(policy, is_correct, time_remaining, time_limit);
        }
        state
    }

    #[must_use]
    pub fn base_points(&self) -> u32 {
        self.base_points
    }

    #[must_use]
    pub fn time_bonus(&self) -> u32 {
        self.time_bonus
    }

    #[must_use]
    pub fn combo_bonus(&self) -> u32 {
        self.combo_bonus
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    #[must_use]
    pub fn current_combo(&self) -> u32 {
        self.current_combo
    }

    #[must_use]
    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_answered(&self) -> u32 {
        self.total_answered
    }

    /// Share of answered questions that were correct, in `[0, 1]`. Zero before any answer.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total_answered == 0 {
            0.0
        } else {
            f64::from(self.correct_count) / f64::from(self.total_answered)
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
