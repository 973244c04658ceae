use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scheduler::SchedulePolicy;
use crate::scoring::ScoringPolicy;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("question time limit must be > 0 seconds")]
    InvalidTimeLimit,

    #[error("combo multiplier must be in [0, 100], got {0}")]
    InvalidComboMultiplier(f64),

    #[error("{field} must be at most 1000000 points, got {value}")]
    PointsOutOfRange { field: &'static str, value: u32 },

    #[error("accuracy threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("hold threshold {hold} must not exceed advance threshold {advance}")]
    ThresholdOrder { hold: f64, advance: f64 },

    #[error("invalid engine config: {0}")]
    Parse(String),
}

//
// ─── ENGINE CONFIG ─────────────────────────────────────────────────────────────
//

/// Tunables for a session engine. `Default` reproduces the reference behavior:
/// 30 s per question, default [`ScoringPolicy`] and [`SchedulePolicy`].
///
/// ```
/// # use quiz_core::config::EngineConfig;
/// let config = EngineConfig::from_toml_str(
///     r#"
///     question_time_limit_secs = 20
///
///     [scoring]
///     combo_multiplier = 0.2
///     "#,
/// )?;
/// assert_eq!(config.question_time_limit_secs(), 20);
/// assert_eq!(config.scoring().base_points(), 100);
/// # Ok::<(), quiz_core::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    question_time_limit_secs: u32,
    scoring: ScoringPolicy,
    schedule: SchedulePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            question_time_limit_secs: 30,
            scoring: ScoringPolicy::default(),
            schedule: SchedulePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTimeLimit` for a zero time limit, or the first
    /// policy validation error.
    pub fn new(
        question_time_limit_secs: u32,
        scoring: ScoringPolicy,
        schedule: SchedulePolicy,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            question_time_limit_secs,
            scoring,
            schedule,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML or unknown keys, and validation
    /// errors for out-of-range values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.question_time_limit_secs == 0 {
            return Err(ConfigError::InvalidTimeLimit);
        }
        self.scoring.validate()?;
        self.schedule.validate()
    }

    #[must_use]
    pub fn question_time_limit_secs(&self) -> u32 {
        self.question_time_limit_secs
    }

    #[must_use]
    pub fn scoring(&self) -> &ScoringPolicy {
        &self.scoring
    }

    #[must_use]
    pub fn schedule(&self) -> &SchedulePolicy {
        &self.schedule
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.question_time_limit_secs(), 30);
        assert!((config.scoring().combo_multiplier() - 0.1).abs() < f64::EPSILON);
        assert!((config.schedule().advance_threshold() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [schedule]
            reset_after_hours = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.schedule().reset_after(), chrono::Duration::hours(6));
        assert_eq!(config.schedule().hold_after(), chrono::Duration::hours(24));
    }

    #[test]
    fn zero_time_limit_is_rejected() {
        let err = EngineConfig::from_toml_str("question_time_limit_secs = 0").unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeLimit);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("time_limit = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn oversized_point_values_are_rejected() {
        let err = EngineConfig::from_toml_str(
            r#"
            [scoring]
            base_points = 3000000000
            "#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::PointsOutOfRange {
                field: "base_points",
                value: 3_000_000_000,
            }
        );

        let err = EngineConfig::from_toml_str(
            r#"
            [scoring]
            combo_multiplier = 1e9
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidComboMultiplier(_)));
    }

    #[test]
    fn invalid_threshold_fails_validation() {
        let err = EngineConfig::from_toml_str(
            r#"
            [schedule]
            hold_threshold = 0.9
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOrder { .. }));
    }
}
