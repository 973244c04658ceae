//! Per-question countdown.
//!
//! The clock itself never sleeps. Some tick source (a tokio interval in
//! `quiz-services`, a loop in tests) calls [`Clock::tick`] once per second with the
//! [`RunId`] it was started for. Every `start` and `cancel` retires the previous run, so
//! a tick that was already in flight when the run was cancelled is ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one countdown run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(u64);

impl RunId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunId({})", self.0)
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One second elapsed; `remaining` is strictly smaller than on the previous tick.
    Tick { run: RunId, remaining: u32 },
    /// The run reached zero. Emitted once per run; the run is finished afterwards.
    Expired { run: RunId },
    /// Tick for a cancelled, replaced, or finished run. Nothing changed.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveRun {
    id: RunId,
    duration: u32,
    remaining: u32,
}

/// A restartable 1 Hz countdown with at most one live run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clock {
    last_run: u64,
    active: Option<ActiveRun>,
}

impl Clock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run of `duration_secs`, cancelling any live run first.
    ///
    /// A zero duration expires on the first tick.
    pub fn start(&mut self, duration_secs: u32) -> RunId {
        self.cancel();
        self.last_run += 1;
        let id = RunId(self.last_run);
        self.active = Some(ActiveRun {
            id,
            duration: duration_secs,
            remaining: duration_secs,
        });
        id
    }

    /// Apply one elapsed second to `run`.
    pub fn tick(&mut self, run: RunId) -> ClockEvent {
        let Some(active) = self.active.as_mut().filter(|active| active.id == run) else {
            return ClockEvent::Ignored;
        };

        active.remaining = active.remaining.saturating_sub(1);
        if active.remaining == 0 {
            self.active = None;
            ClockEvent::Expired { run }
        } else {
            ClockEvent::Tick {
                run,
                remaining: active.remaining,
            }
        }
    }

    /// Stop the live run, if any. Returns whether a run was stopped.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }

    #[must_use]
    pub fn active_run(&self) -> Option<RunId> {
        self.active.map(|active| active.id)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Seconds left on the live run; `None` when nothing is running.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.active.map(|active| active.remaining)
    }

    /// Seconds elapsed on the live run; `None` when nothing is running.
    #[must_use]
    pub fn elapsed(&self) -> Option<u32> {
        self.active.map(|active| active.duration - active.remaining)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
