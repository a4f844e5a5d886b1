//! Capture clients.

use async_trait::async_trait;
use skillwatch_core::{CaptureClient, EventId, ExceptionReport, ReportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Keeps every report in memory.
///
/// Used by tests and by the replay command. Can be switched into a failing
/// mode to exercise transport errors.
#[derive(Default)]
pub struct MemoryClient {
    reports: Mutex<Vec<ExceptionReport>>,
    failing: AtomicBool,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All reports delivered so far, oldest first.
    pub fn reports(&self) -> Vec<ExceptionReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CaptureClient for MemoryClient {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, report: ExceptionReport) -> Result<EventId, ReportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReportError::Transport {
                client: self.name().into(),
                reason: "client is in failing mode".into(),
            });
        }
        let event_id = report.event_id.clone();
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
        Ok(event_id)
    }
}

/// Writes each report as one JSON line through `tracing`.
///
/// Reports go to target `skillwatch::report` at info level, so any
/// subscriber (or log shipper reading its output) acts as the backend.
#[derive(Debug, Default)]
pub struct LogClient;

impl LogClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CaptureClient for LogClient {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, report: ExceptionReport) -> Result<EventId, ReportError> {
        let line = serde_json::to_string(&report)
            .map_err(|e| ReportError::Serialization(e.to_string()))?;
        tracing::info!(
            target: "skillwatch::report",
            event_id = %report.event_id,
            report = %line,
            "{}",
            report.exception.value
        );
        Ok(report.event_id)
    }
}
