use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::countdown::{Clock, ClockEvent, RunId};
use crate::error::{Operation, Rejection, SessionError};
use crate::model::{
    Answer, DifficultyRating, ItemError, ItemId, SessionItem, SessionItemDraft, validate_items,
};
use crate::scheduler::{ReviewSchedule, ReviewScheduler};
use crate::scoring::{OutcomePoints, ScoreState};
use crate::time::{TimeSource, seconds_between};

use super::progress::SessionProgress;
use super::report::{ItemResult, ResultReport, percentage};

//
// ─── STATES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Challenge: per-question countdown, scored with time and combo bonuses.
    Timed,
    /// Review: no countdown, each item is rated 1–5 and the set is rescheduled.
    Untimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Built but not started.
    Ready,
    Active,
    /// Terminal. State is frozen and the report is available.
    Completed,
    /// Terminal. Abandoned before completion; no report.
    Cancelled,
}

/// Sub-state of the current item while the session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPhase {
    Answering,
    /// Answered by the user. Resolved in timed mode.
    Answered,
    /// Answered and rated. Untimed mode only.
    Rated,
    /// Countdown ran out. Timed mode only; the engine advances on its own.
    Expired,
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of recording an answer, user-chosen or synthesized on expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub answer: Answer,
    pub correct_option: String,
    /// Points gained by this answer and the running score after it (timed mode).
    pub points: Option<OutcomePoints>,
    pub score: Option<ScoreState>,
}

/// Result of moving past a resolved item.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next {
        cursor: usize,
        item_id: ItemId,
        /// Countdown run for the new item (timed mode).
        run: Option<RunId>,
    },
    Completed(Box<ResultReport>),
}

/// Result of the countdown running out.
#[derive(Debug, Clone, PartialEq)]
pub enum Expiry {
    /// The current item was unanswered: it was recorded as "no answer" and the
    /// session moved on.
    Expired {
        outcome: AnswerOutcome,
        advance: Advance,
    },
    /// The item was already resolved or the session is no longer active.
    NoOp,
}

/// Result of feeding one tick from the tick source into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockTick {
    Tick { remaining: u32 },
    Expired(Box<Expiry>),
    Ignored,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Drives one user through an ordered list of items.
///
/// All mutation goes through the named operations below. Each one checks every
/// precondition before touching state, so a rejected call leaves the engine exactly as
/// it was.
pub struct SessionEngine {
    mode: SessionMode,
    config: EngineConfig,
    time: TimeSource,
    items: Vec<SessionItem>,
    cursor: usize,
    answers: HashMap<ItemId, Answer>,
    ratings: HashMap<ItemId, DifficultyRating>,
    presented_at: HashMap<ItemId, DateTime<Utc>>,
    score: Option<ScoreState>,
    clock: Clock,
    phase: SessionPhase,
    prior_stage: u32,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    report: Option<ResultReport>,
}

impl SessionEngine {
    /// Build a session over validated items.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for an empty list, `SessionError::Item` for a
    /// repeated item id, and `SessionError::Config` for an invalid config.
    pub fn new(
        mode: SessionMode,
        items: Vec<SessionItem>,
        config: EngineConfig,
    ) -> Result<Self, SessionError> {
        if items.is_empty() {
            return Err(SessionError::Empty);
        }
        if u32::try_from(items.len()).is_err() {
            return Err(SessionError::TooManyItems { len: items.len() });
        }
        let mut ids = HashSet::with_capacity(items.len());
        if let Some(dup) = items.iter().find(|item| !ids.insert(item.id())) {
            return Err(ItemError::DuplicateItemId { id: dup.id() }.into());
        }
        config.validate()?;

        Ok(Self {
            mode,
            config,
            time: TimeSource::default(),
            score: (mode == SessionMode::Timed).then(ScoreState::new),
            items,
            cursor: 0,
            answers: HashMap::new(),
            ratings: HashMap::new(),
            presented_at: HashMap::new(),
            clock: Clock::new(),
            phase: SessionPhase::Ready,
            prior_stage: 1,
            started_at: None,
            completed_at: None,
            report: None,
        })
    }

    /// Validate raw drafts and build a session from them.
    ///
    /// # Errors
    ///
    /// Same as [`SessionEngine::new`], plus any draft validation error.
    pub fn from_drafts(
        mode: SessionMode,
        drafts: impl IntoIterator<Item = SessionItemDraft>,
        config: EngineConfig,
    ) -> Result<Self, SessionError> {
        let items = validate_items(drafts)?;
        Self::new(mode, items, config)
    }

    #[must_use]
    pub fn with_time_source(mut self, time: TimeSource) -> Self {
        self.time = time;
        self
    }

    /// Stage the item set was at before this session; used when rescheduling.
    #[must_use]
    pub fn with_prior_stage(mut self, stage: u32) -> Self {
        self.prior_stage = stage.max(1);
        self
    }

    //
    // ─── OPERATIONS ────────────────────────────────────────────────────────────
    //

    /// Activate the session on the first item. In timed mode this starts the
    /// countdown and returns its run id.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the session is still `Ready`; starting twice is
    /// rejected rather than restarting the countdown.
    pub fn start(&mut self) -> Result<Option<RunId>, SessionError> {
        match self.phase {
            SessionPhase::Ready => {}
            SessionPhase::Active => {
                return Err(self.reject(Operation::Start, Rejection::AlreadyStarted));
            }
            SessionPhase::Completed | SessionPhase::Cancelled => {
                return Err(self.reject(Operation::Start, Rejection::NotActive));
            }
        }

        let now = self.time.now();
        self.phase = SessionPhase::Active;
        self.started_at = Some(now);
        self.cursor = 0;
        info!(mode = ?self.mode, items = self.items.len(), "session started");
        Ok(self.present_current(now))
    }

    /// Record the user's choice for the current item.
    ///
    /// In timed mode the countdown is stopped before scoring, so a tick racing this call
    /// can no longer expire the item.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the session is not active, `item_id` is not the current
    /// item, the item already has an answer, or `option` is not one of its options.
    pub fn submit_answer(
        &mut self,
        item_id: ItemId,
        option: &str,
    ) -> Result<AnswerOutcome, SessionError> {
        const OP: Operation = Operation::SubmitAnswer;
        let item = self.current_for(OP, item_id)?;
        if self.answers.contains_key(&item_id) {
            return Err(self.reject(OP, Rejection::AlreadyAnswered));
        }
        if !item.has_option(option) {
            return Err(self.reject(OP, Rejection::UnknownOption));
        }
        let is_correct = item.is_correct(option);

        let time_remaining = match self.mode {
            SessionMode::Timed => self.clock.remaining().unwrap_or(0),
            SessionMode::Untimed => 0,
        };
        self.clock.cancel();

        let answer = Answer::chosen(item_id, option, is_correct, time_remaining, self.time.now());
        Ok(self.record(answer))
    }

    /// Record the 1–5 difficulty rating for the current, already answered item.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` in timed mode, when the session is not active, for an item
    /// other than the current one, before the item is answered, or when it is already
    /// rated.
    pub fn submit_rating(
        &mut self,
        item_id: ItemId,
        rating: DifficultyRating,
    ) -> Result<(), SessionError> {
        const OP: Operation = Operation::SubmitRating;
        if self.mode != SessionMode::Untimed {
            return Err(self.reject(OP, Rejection::WrongMode));
        }
        self.current_for(OP, item_id)?;
        if !self.answers.contains_key(&item_id) {
            return Err(self.reject(OP, Rejection::NotAnswered));
        }
        if self.ratings.contains_key(&item_id) {
            return Err(self.reject(OP, Rejection::AlreadyRated));
        }

        self.ratings.insert(item_id, rating);
        debug!(%item_id, rating = rating.value(), "rating recorded");
        Ok(())
    }

    /// Feed one tick for `run`. Ticks for a retired run, or arriving after the session
    /// ended, are ignored.
    pub fn on_clock_tick(&mut self, run: RunId) -> ClockTick {
        if self.phase != SessionPhase::Active {
            return ClockTick::Ignored;
        }
        match self.clock.tick(run) {
            ClockEvent::Ignored => ClockTick::Ignored,
            ClockEvent::Tick { remaining, .. } => ClockTick::Tick { remaining },
            ClockEvent::Expired { .. } => match self.on_clock_expire() {
                Ok(expiry) => ClockTick::Expired(Box::new(expiry)),
                Err(err) => {
                    warn!(error = %err, "expiry failed after final tick");
                    ClockTick::Ignored
                }
            },
        }
    }

    /// The countdown for the current item ran out.
    ///
    /// An unanswered item gets a "no answer" record scored as incorrect with no time
    /// left, and the session advances on its own. An already resolved item, or a
    /// session that is no longer active, makes this a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` in untimed mode. Propagates completion errors.
    pub fn on_clock_expire(&mut self) -> Result<Expiry, SessionError> {
        if self.mode != SessionMode::Timed {
            return Err(self.reject(Operation::ClockExpire, Rejection::WrongMode));
        }
        let Some(item_id) = self.current_item().map(SessionItem::id) else {
            return Ok(Expiry::NoOp);
        };
        if self.answers.contains_key(&item_id) {
            debug!(%item_id, "expiry after answer ignored");
            return Ok(Expiry::NoOp);
        }

        // the report is built before any state changes
        let expired = Answer::expired(item_id, self.time.now());
        let pending_report = if self.cursor + 1 == self.items.len() {
            Some(self.preview_report_with(&expired)?)
        } else {
            None
        };

        self.clock.cancel();
        let outcome = self.record(expired);
        info!(%item_id, "question expired without an answer");
        let advance = match pending_report {
            Some(report) => self.complete(report),
            None => self.move_next(),
        };
        Ok(Expiry::Expired { outcome, advance })
    }

    /// Move past the current item once it is resolved. On the last item the session
    /// completes and the report is produced.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the session is not active or the current item is not
    /// resolved. `Scheduler` if the untimed review schedule cannot be computed.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        const OP: Operation = Operation::Advance;
        if self.phase != SessionPhase::Active {
            return Err(self.reject(OP, Rejection::NotActive));
        }
        if !self.current_resolved() {
            return Err(self.reject(OP, Rejection::NotResolved));
        }

        if self.cursor + 1 == self.items.len() {
            let report = self.build_report(self.time.now())?;
            Ok(self.complete(report))
        } else {
            Ok(self.move_next())
        }
    }

    /// Abandon the session. Stops the countdown; later ticks are ignored and later
    /// operations are rejected. Returns whether anything was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.phase {
            SessionPhase::Ready | SessionPhase::Active => {
                self.clock.cancel();
                self.phase = SessionPhase::Cancelled;
                info!(cursor = self.cursor, "session cancelled");
                true
            }
            SessionPhase::Completed | SessionPhase::Cancelled => false,
        }
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn items(&self) -> &[SessionItem] {
        &self.items
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    /// The item being worked on; `None` unless the session is active.
    #[must_use]
    pub fn current_item(&self) -> Option<&SessionItem> {
        if self.phase == SessionPhase::Active {
            self.items.get(self.cursor)
        } else {
            None
        }
    }

    #[must_use]
    pub fn current_item_phase(&self) -> Option<ItemPhase> {
        let item = self.current_item()?;
        let phase = match self.answers.get(&item.id()) {
            None => ItemPhase::Answering,
            Some(answer) if answer.is_expired() => ItemPhase::Expired,
            Some(_) if self.ratings.contains_key(&item.id()) => ItemPhase::Rated,
            Some(_) => ItemPhase::Answered,
        };
        Some(phase)
    }

    #[must_use]
    pub fn answer(&self, item_id: ItemId) -> Option<&Answer> {
        self.answers.get(&item_id)
    }

    /// Recorded answers in item order.
    pub fn answers(&self) -> impl Iterator<Item = &Answer> {
        self.items
            .iter()
            .filter_map(|item| self.answers.get(&item.id()))
    }

    #[must_use]
    pub fn rating(&self, item_id: ItemId) -> Option<DifficultyRating> {
        self.ratings.get(&item_id).copied()
    }

    /// Running score; `None` in untimed mode.
    #[must_use]
    pub fn score(&self) -> Option<&ScoreState> {
        self.score.as_ref()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.answers.values().filter(|answer| answer.is_correct).count()
    }

    #[must_use]
    pub fn active_run(&self) -> Option<RunId> {
        self.clock.active_run()
    }

    #[must_use]
    pub fn time_remaining(&self) -> Option<u32> {
        self.clock.remaining()
    }

    /// Mutable access to the wall-clock source, e.g. to advance a fixed source.
    pub fn time_source_mut(&mut self) -> &mut TimeSource {
        &mut self.time
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The final report, available once the session is completed.
    #[must_use]
    pub fn report(&self) -> Option<&ResultReport> {
        self.report.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.items.len();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            remaining: total - answered,
            cursor: self.cursor,
            is_complete: self.is_complete(),
            time_remaining: self.clock.remaining(),
        }
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn reject(&self, operation: Operation, reason: Rejection) -> SessionError {
        warn!(%operation, %reason, cursor = self.cursor, phase = ?self.phase, "transition rejected");
        SessionError::InvalidTransition { operation, reason }
    }

    fn current_for(
        &self,
        operation: Operation,
        item_id: ItemId,
    ) -> Result<&SessionItem, SessionError> {
        let Some(item) = self.current_item() else {
            return Err(self.reject(operation, Rejection::NotActive));
        };
        if item.id() != item_id {
            return Err(self.reject(operation, Rejection::NotCurrentItem));
        }
        Ok(item)
    }

    fn current_resolved(&self) -> bool {
        let Some(item) = self.current_item() else {
            return false;
        };
        let answered = self.answers.contains_key(&item.id());
        match self.mode {
            SessionMode::Timed => answered,
            SessionMode::Untimed => answered && self.ratings.contains_key(&item.id()),
        }
    }

    fn present_current(&mut self, now: DateTime<Utc>) -> Option<RunId> {
        let item_id = self.items[self.cursor].id();
        self.presented_at.insert(item_id, now);
        match self.mode {
            SessionMode::Timed => {
                let run = self.clock.start(self.config.question_time_limit_secs());
                debug!(%item_id, ?run, cursor = self.cursor, "countdown started");
                Some(run)
            }
            SessionMode::Untimed => None,
        }
    }

    fn record(&mut self, answer: Answer) -> AnswerOutcome {
        let item = &self.items[self.cursor];
        let correct_option = item.correct_option().to_owned();
        let time_limit = self.config.question_time_limit_secs();
        let policy = *self.config.scoring();

        let points = self.score.as_mut().map(|score| {
            score.apply_outcome(&policy, answer.is_correct, answer.time_remaining, time_limit)
        });

        debug!(
            item_id = %answer.item_id,
            is_correct = answer.is_correct,
            time_remaining = answer.time_remaining,
            points = points.map(|p| p.total()),
            "answer recorded"
        );

        self.answers.insert(answer.item_id, answer.clone());
        AnswerOutcome {
            answer,
            correct_option,
            points,
            score: self.score,
        }
    }

    fn move_next(&mut self) -> Advance {
        self.cursor += 1;
        let now = self.time.now();
        let run = self.present_current(now);
        Advance::Next {
            cursor: self.cursor,
            item_id: self.items[self.cursor].id(),
            run,
        }
    }

    fn complete(&mut self, report: ResultReport) -> Advance {
        self.clock.cancel();
        self.cursor = self.items.len();
        self.completed_at = Some(report.completed_at);
        self.phase = SessionPhase::Completed;
        info!(
            correct = report.correct_count,
            total = report.total_items,
            score = report.total_score,
            "session completed"
        );
        self.report = Some(report.clone());
        Advance::Completed(Box::new(report))
    }

    /// Report as it would look if `pending` were recorded for the current item.
    fn preview_report_with(&self, pending: &Answer) -> Result<ResultReport, SessionError> {
        let mut answers = self.answers.clone();
        answers.insert(pending.item_id, pending.clone());
        let score = self.score.map(|mut score| {
            score.apply_outcome(
                self.config.scoring(),
                pending.is_correct,
                pending.time_remaining,
                self.config.question_time_limit_secs(),
            );
            score
        });
        self.report_from(&answers, score, pending.answered_at)
    }

    fn build_report(&self, completed_at: DateTime<Utc>) -> Result<ResultReport, SessionError> {
        self.report_from(&self.answers, self.score, completed_at)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn report_from(
        &self,
        answers: &HashMap<ItemId, Answer>,
        score: Option<ScoreState>,
        completed_at: DateTime<Utc>,
    ) -> Result<ResultReport, SessionError> {
        // item count was checked to fit in u32 at construction
        let total_items = self.items.len() as u32;
        let time_limit = self.config.question_time_limit_secs();

        let items: Vec<ItemResult> = self
            .items
            .iter()
            .filter_map(|item| {
                let answer = answers.get(&item.id())?;
                let time_taken = match self.mode {
                    SessionMode::Timed => time_limit.saturating_sub(answer.time_remaining),
                    SessionMode::Untimed => self
                        .presented_at
                        .get(&item.id())
                        .map_or(0, |shown| seconds_between(*shown, answer.answered_at)),
                };
                Some(ItemResult {
                    item_id: item.id(),
                    question: item.prompt().to_owned(),
                    chosen_option: answer.chosen_option.clone(),
                    correct_option: item.correct_option().to_owned(),
                    is_correct: answer.is_correct,
                    time_remaining: answer.time_remaining,
                    time_taken,
                    rating: self.ratings.get(&item.id()).copied(),
                    explanation: item.explanation().map(str::to_owned),
                })
            })
            .collect();

        let answered_count = items.len() as u32;
        let correct_count = items.iter().filter(|item| item.is_correct).count() as u32;

        let schedule: Option<ReviewSchedule> = match self.mode {
            SessionMode::Timed => None,
            SessionMode::Untimed => Some(
                ReviewScheduler::with_policy(*self.config.schedule()).reschedule(
                    self.prior_stage,
                    correct_count,
                    total_items,
                    completed_at,
                )?,
            ),
        };

        Ok(ResultReport {
            mode: self.mode,
            total_items,
            answered_count,
            correct_count,
            percentage: percentage(correct_count, total_items),
            total_score: score.map(|s| s.total_score()),
            score,
            time_limit_secs: (self.mode == SessionMode::Timed).then_some(time_limit),
            schedule,
            started_at: self.started_at.unwrap_or(completed_at),
            completed_at,
            items,
        })
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("mode", &self.mode)
            .field("phase", &self.phase)
            .field("items_len", &self.items.len())
            .field("cursor", &self.cursor)
            .field("answers_len", &self.answers.len())
            .field("ratings_len", &self.ratings.len())
            .field("score", &self.score)
            .field("active_run", &self.clock.active_run())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
