//! Per-request instrumentation state and static environment tags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::report::EventId;
use crate::reporter::ErrorReporter;
use crate::request::ENTRY_STATE;

/// Dedup state of one request's exception reporting.
///
/// `Idle -> Reporting -> Reported`. There is no way back to `Idle`; a
/// failed delivery leaves the request in `Reporting` so the fallback error
/// hook still gets its chance to report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportState {
    #[default]
    Idle,
    Reporting,
    Reported(EventId),
}

impl ReportState {
    /// Enter `Reporting`. Returns `false` if the request is already reported.
    pub fn begin(&mut self) -> bool {
        match self {
            Self::Reported(_) => false,
            _ => {
                *self = Self::Reporting;
                true
            }
        }
    }

    /// Record a successful acknowledgment.
    pub fn acknowledge(&mut self, event_id: EventId) {
        *self = Self::Reported(event_id);
    }

    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Reported(_))
    }

    pub fn event_id(&self) -> Option<&EventId> {
        match self {
            Self::Reported(id) => Some(id),
            _ => None,
        }
    }
}

/// Identity of the serverless function hosting the skill.
///
/// Resolved once at startup by whoever owns environment access and handed
/// to the instrumentation; `None` there means "not running serverless".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentTags {
    pub function_name: String,
    pub function_version: String,
    pub log_stream: String,
}

impl EnvironmentTags {
    /// The tags as merged into report context.
    pub fn to_tags(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Lambda".to_string(), self.function_name.clone()),
            ("Version".to_string(), self.function_version.clone()),
            ("LogStream".to_string(), self.log_stream.clone()),
        ])
    }
}

/// Instrumentation state owned by a single request.
///
/// The host creates one per request and passes it to every hook for that
/// request, then drops it when the request is done.
#[derive(Clone, Default)]
pub struct RequestContext {
    report_state: ReportState,
    request_snapshot: Option<serde_json::Value>,
    current_state: Option<String>,
    environment: Option<EnvironmentTags>,
    reporter: Option<Arc<dyn ErrorReporter>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_state(&self) -> &ReportState {
        &self.report_state
    }

    pub fn report_state_mut(&mut self) -> &mut ReportState {
        &mut self.report_state
    }

    pub fn is_reported(&self) -> bool {
        self.report_state.is_reported()
    }

    /// The request as it looked when the request started.
    pub fn request_snapshot(&self) -> Option<&serde_json::Value> {
        self.request_snapshot.as_ref()
    }

    pub fn set_request_snapshot(&mut self, snapshot: serde_json::Value) {
        self.request_snapshot = Some(snapshot);
    }

    /// The state the skill is currently in, `entry` before any start hook.
    pub fn current_state(&self) -> &str {
        self.current_state.as_deref().unwrap_or(ENTRY_STATE)
    }

    pub fn set_current_state(&mut self, state: impl Into<String>) {
        self.current_state = Some(state.into());
    }

    pub fn environment(&self) -> Option<&EnvironmentTags> {
        self.environment.as_ref()
    }

    pub fn set_environment(&mut self, tags: EnvironmentTags) {
        self.environment = Some(tags);
    }

    /// The reporter attached at request start, for ad hoc breadcrumbs and
    /// context from application code.
    pub fn reporter(&self) -> Option<&Arc<dyn ErrorReporter>> {
        self.reporter.as_ref()
    }

    pub fn attach_reporter(&mut self, reporter: Arc<dyn ErrorReporter>) {
        self.reporter = Some(reporter);
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("report_state", &self.report_state)
            .field("current_state", &self.current_state())
            .field("environment", &self.environment)
            .field("has_reporter", &self.reporter.is_some())
            .finish()
    }
}
