/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub cursor: usize,
    pub is_complete: bool,
    /// Seconds left on the current question; `None` in untimed sessions or between runs.
    pub time_remaining: Option<u32>,
}
