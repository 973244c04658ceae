#![forbid(unsafe_code)]

pub mod driver;
pub mod error;
pub mod report_sink;
pub mod settings;
pub mod ticker;

pub use quiz_core::TimeSource;

pub use driver::{DriverEvent, SessionDriver};
pub use error::{DriverError, SettingsError, SinkError};
pub use report_sink::{InMemoryReportSink, ReportSink, SubmissionId};
pub use settings::load_config;
pub use ticker::{TICK_PERIOD, Ticker};
