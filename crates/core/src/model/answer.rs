use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ItemId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("difficulty rating must be between 1 and 5, got {0}")]
    OutOfRange(u8),
}

//
// ─── DIFFICULTY RATING ────────────────────────────────────────────────────────
//

/// Self-reported difficulty of an item in untimed review, 1 (trivial) to 5 (very hard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DifficultyRating(u8);

impl DifficultyRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` if `value` is not in `1..=5`.
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingError::OutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DifficultyRating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DifficultyRating> for u8 {
    fn from(rating: DifficultyRating) -> Self {
        rating.0
    }
}

//
// ─── ANSWER ───────────────────────────────────────────────────────────────────
//

/// The single recorded response for an item.
///
/// `chosen_option` is `None` when the countdown ran out before the user answered.
/// `time_remaining` is 0 in untimed sessions and for expired items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub item_id: ItemId,
    pub chosen_option: Option<String>,
    pub time_remaining: u32,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

impl Answer {
    #[must_use]
    pub fn chosen(
        item_id: ItemId,
        option: impl Into<String>,
        is_correct: bool,
        time_remaining: u32,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id,
            chosen_option: Some(option.into()),
            time_remaining,
            is_correct,
            answered_at,
        }
    }

    /// Answer synthesized when the countdown expires: no option, no time, incorrect.
    #[must_use]
    pub fn expired(item_id: ItemId, answered_at: DateTime<Utc>) -> Self {
        Self {
            item_id,
            chosen_option: None,
            time_remaining: 0,
            is_correct: false,
            answered_at,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.chosen_option.is_none()
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
    fn rating_accepts_one_through_five() {
        for value in 1..=5 {
            assert_eq!(DifficultyRating::new(value).unwrap().value(), value);
        }
        assert_eq!(DifficultyRating::new(0), Err(RatingError::OutOfRange(0)));
        assert_eq!(DifficultyRating::new(6), Err(RatingError::OutOfRange(6)));
    }

    #[test]
    fn rating_deserialization_is_range_checked() {
        assert!(serde_json::from_str::<DifficultyRating>("3").is_ok());
        assert!(serde_json::from_str::<DifficultyRating>("9").is_err());
    }

    #[test]
    fn expired_answer_has_no_option() {
        let answer = Answer::expired(ItemId::new(1), fixed_now());
        assert!(answer.is_expired());
        assert!(!answer.is_correct);
        assert_eq!(answer.time_remaining, 0);
    }
}
