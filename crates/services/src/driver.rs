use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use quiz_core::countdown::RunId;
use quiz_core::model::{DifficultyRating, ItemId};
use quiz_core::session::{Advance, AnswerOutcome, ClockTick, Expiry, SessionEngine};
use quiz_core::ResultReport;

use crate::error::DriverError;
use crate::report_sink::{ReportSink, SubmissionId};
use crate::ticker::{TICK_PERIOD, Ticker};

/// What happened when a tick arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    Tick {
        remaining: u32,
    },
    /// The current question ran out and the session moved on (or completed).
    Expired {
        outcome: AnswerOutcome,
        advance: Advance,
    },
    /// Stale tick from a retired run.
    Ignored,
}

/// Runs one [`SessionEngine`] against real time.
///
/// The driver owns the engine, the tick source, and the tick channel. Everything that
/// mutates the engine runs on the caller's task: user operations through the methods
/// below, ticks through [`SessionDriver::next_event`]. After each mutation the ticker
/// is re-synced to the engine's live countdown run.
pub struct SessionDriver {
    engine: SessionEngine,
    period: Duration,
    ticks_tx: UnboundedSender<RunId>,
    ticks_rx: UnboundedReceiver<RunId>,
    ticker: Option<Ticker>,
    submission: Option<SubmissionId>,
}

impl SessionDriver {
    #[must_use]
    pub fn new(engine: SessionEngine) -> Self {
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            period: TICK_PERIOD,
            ticks_tx,
            ticks_rx,
            ticker: None,
            submission: None,
        }
    }

    /// Override the tick period (the engine still counts one second per tick).
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    #[must_use]
    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    #[must_use]
    pub fn submission_id(&self) -> Option<SubmissionId> {
        self.submission
    }

    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// # Errors
    ///
    /// Propagates `SessionError` from the engine.
    pub fn start(&mut self) -> Result<Option<RunId>, DriverError> {
        let run = self.engine.start()?;
        self.sync_ticker();
        Ok(run)
    }

    /// # Errors
    ///
    /// Propagates `SessionError` from the engine.
    pub fn submit_answer(
        &mut self,
        item_id: ItemId,
        option: &str,
    ) -> Result<AnswerOutcome, DriverError> {
        let outcome = self.engine.submit_answer(item_id, option);
        self.sync_ticker();
        Ok(outcome?)
    }

    /// # Errors
    ///
    /// Propagates `SessionError` from the engine.
    pub fn submit_rating(
        &mut self,
        item_id: ItemId,
        rating: DifficultyRating,
    ) -> Result<(), DriverError> {
        Ok(self.engine.submit_rating(item_id, rating)?)
    }

    /// # Errors
    ///
    /// Propagates `SessionError` from the engine.
    pub fn advance(&mut self) -> Result<Advance, DriverError> {
        let advance = self.engine.advance();
        self.sync_ticker();
        Ok(advance?)
    }

    /// Wait for the next countdown tick and apply it.
    ///
    /// Returns `None` when no countdown is live (untimed session, answered item awaiting
    /// `advance`, or a finished session), since no tick would ever arrive.
    pub async fn next_event(&mut self) -> Option<DriverEvent> {
        self.ticker.as_ref()?;
        let run = self.ticks_rx.recv().await?;

        let event = match self.engine.on_clock_tick(run) {
            ClockTick::Tick { remaining } => DriverEvent::Tick { remaining },
            ClockTick::Expired(expiry) => match *expiry {
                Expiry::Expired { outcome, advance } => DriverEvent::Expired { outcome, advance },
                Expiry::NoOp => DriverEvent::Ignored,
            },
            ClockTick::Ignored => {
                debug!(?run, "stale tick dropped");
                DriverEvent::Ignored
            }
        };
        self.sync_ticker();
        Some(event)
    }

    /// Wait until the session completes on its own, answering nothing. Useful for
    /// letting the remaining questions expire after a user walks away.
    pub async fn run_out(&mut self) -> Option<&ResultReport> {
        while self.next_event().await.is_some() {}
        self.engine.report()
    }

    /// Abandon the session and stop the tick source. Idempotent.
    pub fn cancel(&mut self) -> bool {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        self.engine.cancel()
    }

    /// Submit the completed report once. Calling again after a success returns the
    /// stored id without resubmitting; calling again after a failure retries.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::NotComplete` before completion and `DriverError::Sink`
    /// when the sink fails.
    pub async fn finalize(&mut self, sink: &dyn ReportSink) -> Result<SubmissionId, DriverError> {
        if let Some(id) = self.submission {
            return Ok(id);
        }
        let report = self.engine.report().ok_or(DriverError::NotComplete)?;

        match sink.submit(report).await {
            Ok(id) => {
                info!(submission = %id, "session report submitted");
                self.submission = Some(id);
                Ok(id)
            }
            Err(err) => {
                warn!(error = %err, "session report submission failed");
                Err(err.into())
            }
        }
    }

    fn sync_ticker(&mut self) {
        let wanted = self.engine.active_run();
        let current = self.ticker.as_ref().map(Ticker::run);
        if wanted == current {
            return;
        }
        if let Some(old) = self.ticker.take() {
            old.cancel();
        }
        self.ticker = wanted.map(|run| Ticker::spawn(run, self.period, self.ticks_tx.clone()));
    }
}

impl fmt::Debug for SessionDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionDriver")
            .field("engine", &self.engine)
            .field("period", &self.period)
            .field("ticker_run", &self.ticker.as_ref().map(Ticker::run))
            .field("submission", &self.submission)
            .finish_non_exhaustive()
    }
}
