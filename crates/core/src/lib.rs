#![forbid(unsafe_code)]

//! Timed challenge and untimed review sessions over multiple-choice items.
//!
//! [`session::SessionEngine`] owns the item cursor, the recorded answers and ratings,
//! and the per-question [`countdown::Clock`]. Timed sessions are scored by
//! [`scoring::ScoreState`]; untimed sessions are rescheduled by
//! [`scheduler::ReviewScheduler`]. Nothing here spawns tasks or sleeps: a tick source
//! such as `quiz-services` feeds the clock.

pub mod config;
pub mod countdown;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod scoring;
pub mod session;
pub mod time;

pub use config::{ConfigError, EngineConfig};
pub use error::{Operation, Rejection, SessionError};
pub use session::{ResultReport, SessionEngine, SessionMode};
pub use time::TimeSource;
