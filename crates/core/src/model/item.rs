use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ItemId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("item {id}: prompt cannot be empty")]
    EmptyPrompt { id: ItemId },

    #[error("item {id}: needs at least 2 options, got {len}")]
    TooFewOptions { id: ItemId, len: usize },

    #[error("item {id}: option {option:?} is empty or repeated")]
    InvalidOption { id: ItemId, option: String },

    #[error("item {id}: correct option {option:?} is not one of the options")]
    CorrectOptionMissing { id: ItemId, option: String },

    #[error("item id {id} appears more than once in the session")]
    DuplicateItemId { id: ItemId },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated item as handed over by the item source.
///
/// Call [`SessionItemDraft::validate`] once when building a session; the engine
/// only ever sees validated [`SessionItem`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItemDraft {
    pub id: ItemId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl SessionItemDraft {
    #[must_use]
    pub fn new(
        id: ItemId,
        prompt: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
        correct_option: impl Into<String>,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct_option: correct_option.into(),
            explanation: None,
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Validate the draft into an immutable [`SessionItem`].
    ///
    /// Options are compared verbatim; the prompt is trimmed and must be non-empty.
    /// A blank explanation is dropped.
    ///
    /// # Errors
    ///
    /// Returns `ItemError` if the prompt is empty, fewer than two options are given,
    /// an option is blank or repeated, or the correct option is not an option.
    pub fn validate(self) -> Result<SessionItem, ItemError> {
        let id = self.id;
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(ItemError::EmptyPrompt { id });
        }
        if self.options.len() < 2 {
            return Err(ItemError::TooFewOptions {
                id,
                len: self.options.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        for option in &self.options {
            if option.trim().is_empty() || !seen.insert(option.as_str()) {
                return Err(ItemError::InvalidOption {
                    id,
                    option: option.clone(),
                });
            }
        }

        if !seen.contains(self.correct_option.as_str()) {
            return Err(ItemError::CorrectOptionMissing {
                id,
                option: self.correct_option,
            });
        }

        let explanation = self
            .explanation
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        Ok(SessionItem {
            id,
            prompt,
            options: self.options,
            correct_option: self.correct_option,
            explanation,
        })
    }
}

//
// ─── SESSION ITEM ──────────────────────────────────────────────────────────────
//

/// One validated question of a session. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    id: ItemId,
    prompt: String,
    options: Vec<String>,
    correct_option: String,
    explanation: Option<String>,
}

impl SessionItem {
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }

    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_option == option
    }
}

/// Validate a batch of drafts, rejecting repeated item ids.
///
/// # Errors
///
/// Returns the first `ItemError` encountered, in input order.
pub fn validate_items(
    drafts: impl IntoIterator<Item = SessionItemDraft>,
) -> Result<Vec<SessionItem>, ItemError> {
    let mut ids = HashSet::new();
    let mut items = Vec::new();
    for draft in drafts {
        let item = draft.validate()?;
        if !ids.insert(item.id()) {
            return Err(ItemError::DuplicateItemId { id: item.id() });
        }
        items.push(item);
    }
    Ok(items)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: u64) -> SessionItemDraft {
        SessionItemDraft::new(ItemId::new(id), "2 + 2?", ["3", "4", "5"], "4")
    }

    #[test]
    fn valid_draft_produces_item() {
        let item = draft(1).with_explanation("  basic sum ").validate().unwrap();
        assert_eq!(item.id(), ItemId::new(1));
        assert_eq!(item.options().len(), 3);
        assert!(item.is_correct("4"));
        assert!(!item.is_correct("3"));
        assert!(item.has_option("5"));
        assert_eq!(item.explanation(), Some("basic sum"));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut d = draft(1);
        d.prompt = "   ".into();
        assert_eq!(
            d.validate().unwrap_err(),
            ItemError::EmptyPrompt { id: ItemId::new(1) }
        );
    }

    #[test]
    fn single_option_is_rejected() {
        let d = SessionItemDraft::new(ItemId::new(2), "Q", ["only"], "only");
        assert!(matches!(
            d.validate(),
            Err(ItemError::TooFewOptions { len: 1, .. })
        ));
    }

    #[test]
    fn repeated_option_is_rejected() {
        let d = SessionItemDraft::new(ItemId::new(3), "Q", ["a", "b", "a"], "a");
        assert!(matches!(d.validate(), Err(ItemError::InvalidOption { .. })));
    }

    #[test]
    fn correct_option_must_be_listed() {
        let d = SessionItemDraft::new(ItemId::new(4), "Q", ["a", "b"], "c");
        assert!(matches!(
            d.validate(),
            Err(ItemError::CorrectOptionMissing { .. })
        ));
    }

    #[test]
    fn batch_rejects_duplicate_ids() {
        let err = validate_items([draft(1), draft(2), draft(1)]).unwrap_err();
        assert_eq!(err, ItemError::DuplicateItemId { id: ItemId::new(1) });
    }

    #[test]
    fn draft_deserializes_from_camel_case_json() {
        let json = r#"{"id":7,"prompt":"Capital of France?","options":["Paris","Rome"],"correctOption":"Paris"}"#;
        let item = serde_json::from_str::<SessionItemDraft>(json)
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(item.correct_option(), "Paris");
        assert_eq!(item.explanation(), None);
    }
}
