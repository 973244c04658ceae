mod engine;
mod progress;
mod report;

pub use engine::{
    Advance, AnswerOutcome, ClockTick, Expiry, ItemPhase, SessionEngine, SessionMode,
    SessionPhase,
};
pub use progress::SessionProgress;
pub use report::{ItemResult, ResultReport, percentage};
