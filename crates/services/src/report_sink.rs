use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quiz_core::ResultReport;

use crate::error::SinkError;

/// Identifier the submission layer assigns to an accepted report.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(u64);

impl SubmissionId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubmissionId({})", self.0)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where completed session reports go (backend API, local queue, ...).
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, report: &ResultReport) -> Result<SubmissionId, SinkError>;
}

/// Sink that keeps serialized reports in memory. Intended for tests and demos.
#[derive(Clone, Default)]
pub struct InMemoryReportSink {
    reports: Arc<Mutex<Vec<String>>>,
    failures_left: Arc<AtomicU32>,
}

impl InMemoryReportSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` submissions fail with `SinkError::Unavailable`.
    #[must_use]
    pub fn failing_next(self, count: u32) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Stored reports as JSON, in submission order.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Unavailable` if the store lock is poisoned.
    pub fn raw_reports(&self) -> Result<Vec<String>, SinkError> {
        let guard = self
            .reports
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        Ok(guard.clone())
    }

    /// Stored reports decoded back from JSON.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the lock is poisoned or a stored document fails to decode.
    pub fn reports(&self) -> Result<Vec<ResultReport>, SinkError> {
        self.raw_reports()?
            .iter()
            .map(|raw| serde_json::from_str(raw).map_err(SinkError::from))
            .collect()
    }
}

#[async_trait]
impl ReportSink for InMemoryReportSink {
    async fn submit(&self, report: &ResultReport) -> Result<SubmissionId, SinkError> {
        let pending_failure = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if pending_failure {
            return Err(SinkError::Unavailable("simulated outage".into()));
        }

        let json = report.to_json()?;
        let mut guard = self
            .reports
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        guard.push(json);
        Ok(SubmissionId::new(guard.len() as u64))
    }
}
