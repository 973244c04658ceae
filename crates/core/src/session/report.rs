use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{DifficultyRating, ItemId};
use crate::scheduler::ReviewSchedule;
use crate::scoring::{ScoreState, ScoringPolicy};

use super::engine::SessionMode;

//
// ─── PER-ITEM ROW ──────────────────────────────────────────────────────────────
//

/// One question's line in the final report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub item_id: ItemId,
    pub question: String,
    /// `None` means the countdown ran out: shown as "no answer".
    pub chosen_option: Option<String>,
    pub correct_option: String,
    pub is_correct: bool,
    pub time_remaining: u32,
    pub time_taken: u32,
    pub rating: Option<DifficultyRating>,
    pub explanation: Option<String>,
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

/// Read-only summary of a completed session, ready to serialize for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport {
    pub mode: SessionMode,
    pub total_items: u32,
    pub answered_count: u32,
    pub correct_count: u32,
    /// Correct answers as a whole percentage, rounded half-up.
    pub percentage: u32,
    pub total_score: Option<u32>,
    pub score: Option<ScoreState>,
    pub time_limit_secs: Option<u32>,
    pub schedule: Option<ReviewSchedule>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub items: Vec<ItemResult>,
}

impl ResultReport {
    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.chosen_option.is_none())
            .count()
    }

    /// Rebuild the score from the per-item rows. `None` for untimed reports.
    #[must_use]
    pub fn replay_score(&self, policy: &ScoringPolicy) -> Option<ScoreState> {
        let time_limit = self.time_limit_secs?;
        Some(ScoreState::replay(
            policy,
            self.items
                .iter()
                .map(|item| (item.is_correct, item.time_remaining)),
            time_limit,
        ))
    }

    /// Serialize to the camelCase JSON shape the backend expects.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; in practice this cannot fail for this type.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// `correct * 100 / total`, rounded half-up. Zero when `total` is zero.
#[must_use]
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct);
    let total = u64::from(total);
    let rounded = (correct * 200 + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
        assert_eq!(percentage(0, 0), 0);
    }
}
