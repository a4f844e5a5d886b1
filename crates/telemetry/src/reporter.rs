//! The error reporter: a scope in front of a capture client.

use async_trait::async_trait;
use skillwatch_core::{
    Breadcrumb, CaptureClient, CapturedError, ContextPatch, ErrorReporter, EventId, ExceptionReport,
    ReportError,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::scope::Scope;

/// Static attributes stamped on every report.
#[derive(Debug, Clone)]
pub struct ReporterOptions {
    pub environment: Option<String>,
    pub release: Option<String>,
    pub server_name: Option<String>,
    pub max_breadcrumbs: usize,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            environment: None,
            release: None,
            server_name: None,
            max_breadcrumbs: 100,
        }
    }
}

/// Reporter over a shared [`CaptureClient`].
///
/// The client is shared by every fork; the scope is not. A process keeps
/// one root reporter and forks it per request.
pub struct Reporter {
    client: Arc<dyn CaptureClient>,
    options: Arc<ReporterOptions>,
    scope: Mutex<Scope>,
}

impl Reporter {
    pub fn new(client: Arc<dyn CaptureClient>, options: ReporterOptions) -> Self {
        let scope = Scope::new(options.max_breadcrumbs);
        Self {
            client,
            options: Arc::new(options),
            scope: Mutex::new(scope),
        }
    }

    /// A reporter with default options.
    pub fn with_client(client: Arc<dyn CaptureClient>) -> Self {
        Self::new(client, ReporterOptions::default())
    }

    pub fn options(&self) -> &ReporterOptions {
        &self.options
    }

    /// Copy of the current scope.
    pub fn scope(&self) -> Scope {
        self.lock_scope().clone()
    }

    /// Id of the last report this reporter delivered.
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_scope().last_event_id().cloned()
    }

    /// A sibling reporter sharing the client, with a copy of this scope.
    pub fn fork_reporter(&self) -> Reporter {
        Reporter {
            client: self.client.clone(),
            options: self.options.clone(),
            scope: Mutex::new(self.scope()),
        }
    }

    fn lock_scope(&self) -> MutexGuard<'_, Scope> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ErrorReporter for Reporter {
    fn merge_context(&self, patch: ContextPatch) {
        self.lock_scope().merge(patch);
    }

    fn capture_breadcrumb(&self, breadcrumb: Breadcrumb) {
        self.lock_scope().push_breadcrumb(breadcrumb);
    }

    async fn capture_exception(&self, error: &CapturedError) -> Result<EventId, ReportError> {
        let report = self.prepare_report(error);
        match self.client.send(report).await {
            Ok(event_id) => {
                tracing::debug!(
                    event_id = %event_id,
                    client = self.client.name(),
                    "Captured exception and sent to backend"
                );
                self.lock_scope().set_last_event_id(event_id.clone());
                Ok(event_id)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    client = self.client.name(),
                    exception = %error.value,
                    "Failed to deliver exception report"
                );
                Err(e)
            }
        }
    }

    fn fork(&self) -> Arc<dyn ErrorReporter> {
        Arc::new(self.fork_reporter())
    }

    fn prepare_report(&self, error: &CapturedError) -> ExceptionReport {
        let mut report = ExceptionReport::new(error.clone());
        report.environment = self.options.environment.clone();
        report.release = self.options.release.clone();
        report.server_name = self.options.server_name.clone();
        self.lock_scope().apply_to(&mut report);
        report
    }

    fn client(&self) -> Arc<dyn CaptureClient> {
        self.client.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryClient;

    fn make_reporter() -> (Arc<MemoryClient>, Reporter) {
        let client = Arc::new(MemoryClient::new());
        let reporter = Reporter::new(
            client.clone(),
            ReporterOptions {
                environment: Some("test".into()),
                release: Some("skill@0.1.0".into()),
                ..Default::default()
            },
        );
        (client, reporter)
    }

    #[tokio::test]
    async fn capture_sends_context_and_trail() {
        let (client, reporter) = make_reporter();
        reporter.merge_context(ContextPatch::new().extra("request", serde_json::json!({"a": 1})));
        reporter.capture_breadcrumb(Breadcrumb::state_flow("Start state", "entry"));

        let event_id = reporter
            .capture_exception(&CapturedError::message("boom"))
            .await
            .unwrap();

        let reports = client.reports();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.event_id, event_id);
        assert_eq!(report.exception.value, "boom");
        assert_eq!(report.environment.as_deref(), Some("test"));
        assert_eq!(report.release.as_deref(), Some("skill@0.1.0"));
        assert_eq!(report.request_snapshot().unwrap()["a"], 1);
        assert_eq!(report.breadcrumbs.len(), 1);
        assert_eq!(reporter.last_event_id(), Some(event_id));
    }

    #[tokio::test]
    async fn transport_failure_is_returned_not_recorded() {
        let (client, reporter) = make_reporter();
        client.set_failing(true);

        let result = reporter.capture_exception(&CapturedError::message("boom")).await;
        assert!(matches!(result, Err(ReportError::Transport { .. })));
        assert!(client.reports().is_empty());
        assert!(reporter.last_event_id().is_none());
    }

    #[test]
    fn forks_do_not_share_trails() {
        let (_client, root) = make_reporter();
        root.merge_context(ContextPatch::new().tag("service", "skill"));

        let first = root.fork_reporter();
        let second = root.fork_reporter();
        first.capture_breadcrumb(Breadcrumb::state_flow("Start state", "entry"));

        assert_eq!(first.scope().breadcrumbs().count(), 1);
        assert_eq!(second.scope().breadcrumbs().count(), 0);
        assert_eq!(root.scope().breadcrumbs().count(), 0);
        assert_eq!(second.scope().tags()["service"], "skill");
    }

    #[test]
    fn prepare_report_does_not_send() {
        let (client, reporter) = make_reporter();
        reporter.capture_breadcrumb(Breadcrumb::new("tapped", "ui"));
        let report = reporter.prepare_report(&CapturedError::message("boom"));
        assert_eq!(report.breadcrumbs.len(), 1);
        assert!(client.reports().is_empty());
    }
}
