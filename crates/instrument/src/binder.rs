//! Lifecycle hooks that turn skill occurrences into reports.

use async_trait::async_trait;
use futures::future::BoxFuture;
use skillwatch_config::CaptureMode;
use skillwatch_core::{
    Breadcrumb, CapturedError, ContextPatch, EnvironmentTags, ErrorReporter, LifecycleHooks, Reply,
    RequestContext, SkillError, SkillLifecycle, SkillRequest, Transition,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::execute::TracedExecute;

/// Breadcrumb message recorded when a request starts.
pub const START_STATE_MESSAGE: &str = "Start state";

/// Breadcrumb message recorded after each transition.
pub const STATE_CHANGED_MESSAGE: &str = "State changed";

/// Register error reporting on `skill`.
///
/// `environment` is the serverless identity resolved at startup, if any.
/// Calling this twice registers every hook twice.
pub fn bind<S>(
    skill: &mut S,
    reporter: Arc<dyn ErrorReporter>,
    environment: Option<EnvironmentTags>,
) -> Arc<Instrumentation>
where
    S: SkillLifecycle + ?Sized,
{
    Instrumentation::new(reporter, environment).register(skill)
}

/// The hook set registered by [`bind`].
///
/// In [`CaptureMode::Detached`] captures run as tasks owned by this value;
/// [`flush`](Self::flush) waits for them. Dropping the last handle aborts
/// any still in flight.
pub struct Instrumentation {
    reporter: Arc<dyn ErrorReporter>,
    environment: Option<EnvironmentTags>,
    capture_mode: CaptureMode,
    pending: Mutex<JoinSet<()>>,
}

impl Instrumentation {
    pub fn new(reporter: Arc<dyn ErrorReporter>, environment: Option<EnvironmentTags>) -> Self {
        Self {
            reporter,
            environment,
            capture_mode: CaptureMode::default(),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    /// How session-ended and fallback captures are run.
    ///
    /// The state-machine capture is always awaited: the dedup state can
    /// only move to reported once the backend has acknowledged.
    pub fn with_capture_mode(mut self, mode: CaptureMode) -> Self {
        self.capture_mode = mode;
        self
    }

    /// Wrap the skill's execute entry point and register the hooks.
    ///
    /// Returns the registered hook set so the caller can [`flush`](Self::flush) it.
    pub fn register<S>(self, skill: &mut S) -> Arc<Self>
    where
        S: SkillLifecycle + ?Sized,
    {
        info!(
            serverless = self.environment.is_some(),
            capture_mode = %self.capture_mode,
            "Binding error reporting to skill lifecycle"
        );
        let hooks = Arc::new(self);
        skill.wrap_execute(&TracedExecute);
        skill.add_hooks(hooks.clone());
        hooks
    }

    /// Wait for every detached capture started so far.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.lock_pending());
        if pending.is_empty() {
            return;
        }
        debug!(count = pending.len(), "Flushing detached captures");
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Detached capture task did not complete");
            }
        }
    }

    /// The reporter attached at request start, or the root one when the
    /// host never ran `request_started` for this request.
    fn reporter_for(&self, ctx: &RequestContext) -> Arc<dyn ErrorReporter> {
        ctx.reporter()
            .cloned()
            .unwrap_or_else(|| self.reporter.clone())
    }

    async fn run_capture(&self, capture: BoxFuture<'static, ()>) {
        match self.capture_mode {
            CaptureMode::Detached => {
                if let Err(capture) = self.spawn_capture(capture) {
                    capture.await;
                }
            }
            CaptureMode::Await => capture.await,
        }
    }

    /// Hand `capture` to the runtime, or give it back when there is none.
    fn spawn_capture(&self, capture: BoxFuture<'static, ()>) -> Result<(), BoxFuture<'static, ()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return Err(capture);
        };
        let mut pending = self.lock_pending();
        while pending.try_join_next().is_some() {}
        pending.spawn_on(capture, &handle);
        Ok(())
    }

    fn lock_pending(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Capture through the reporter; it logs the outcome itself.
fn scoped_capture(reporter: Arc<dyn ErrorReporter>, error: CapturedError) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if let Err(e) = reporter.capture_exception(&error).await {
            debug!(error = %e, "Scoped capture dropped");
        }
    })
}

/// Capture straight through the backend client.
fn raw_capture(reporter: Arc<dyn ErrorReporter>, error: CapturedError) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let client = reporter.client();
        let report = reporter.prepare_report(&error);
        match client.send(report).await {
            Ok(event_id) => debug!(
                event_id = %event_id,
                client = client.name(),
                "Captured exception and sent to backend"
            ),
            Err(e) => warn!(
                error = %e,
                client = client.name(),
                exception = %error.value,
                "Failed to deliver exception report"
            ),
        }
    })
}

fn request_snapshot(request: &SkillRequest) -> serde_json::Value {
    serde_json::to_value(request).unwrap_or_else(|e| {
        warn!(error = %e, "Could not snapshot request for report context");
        serde_json::Value::Null
    })
}

#[async_trait]
impl LifecycleHooks for Instrumentation {
    async fn request_started(&self, ctx: &mut RequestContext, request: &SkillRequest) {
        let from_state = request.from_state().to_string();
        let reporter = self.reporter.fork();

        // Taken now so later mutation of the request cannot change what gets reported.
        let snapshot = request_snapshot(request);
        reporter.merge_context(ContextPatch::new().extra("request", snapshot.clone()));
        ctx.set_request_snapshot(snapshot);

        if let Some(environment) = &self.environment {
            reporter.merge_context(ContextPatch::new().tags(environment.to_tags()));
            ctx.set_environment(environment.clone());
        }

        reporter.capture_breadcrumb(Breadcrumb::state_flow(START_STATE_MESSAGE, from_state.as_str()));
        ctx.set_current_state(from_state);
        ctx.attach_reporter(reporter);
    }

    async fn session_ended(&self, ctx: &mut RequestContext, request: &SkillRequest) {
        if !request.ended_with_error() {
            return;
        }

        // Not deduplicated against the other error hooks.
        if ctx.is_reported() {
            debug!("Session ended with error after the request was already reported");
        }

        let error = CapturedError::message(request.error_message());
        self.run_capture(scoped_capture(self.reporter_for(ctx), error))
            .await;
    }

    async fn after_state_changed(
        &self,
        ctx: &mut RequestContext,
        _request: &SkillRequest,
        _reply: &Reply,
        transition: &Transition,
    ) {
        debug!(to = %transition.to, "Recording state transition");
        self.reporter_for(ctx)
            .capture_breadcrumb(Breadcrumb::state_flow(STATE_CHANGED_MESSAGE, transition.to.as_str()));
        ctx.set_current_state(transition.to.clone());
    }

    async fn state_machine_error(
        &self,
        ctx: &mut RequestContext,
        _request: &SkillRequest,
        _reply: &Reply,
        error: &SkillError,
    ) {
        if !ctx.report_state_mut().begin() {
            debug!("State machine error for an already reported request");
            return;
        }

        let reporter = self.reporter_for(ctx);
        match reporter.capture_exception(&CapturedError::from(error)).await {
            Ok(event_id) => ctx.report_state_mut().acknowledge(event_id),
            Err(_) => debug!("State machine error not acknowledged; error hook will retry"),
        }
    }

    async fn error(&self, ctx: &mut RequestContext, _request: &SkillRequest, error: &SkillError) {
        if let Some(event_id) = ctx.report_state().event_id() {
            debug!(event_id = %event_id, "Error already reported");
            return;
        }

        self.run_capture(raw_capture(self.reporter_for(ctx), CapturedError::from(error)))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillwatch_core::{HookRegistry, execute_fn};
    use skillwatch_telemetry::{MemoryClient, Reporter};

    fn setup(environment: Option<EnvironmentTags>) -> (Arc<MemoryClient>, Arc<Reporter>, HookRegistry) {
        let client = Arc::new(MemoryClient::new());
        let reporter = Arc::new(Reporter::with_client(client.clone()));
        let mut skill = HookRegistry::new(execute_fn(|_request: SkillRequest| async move {
            Ok(Reply::say("hello"))
        }));
        bind(&mut skill, reporter.clone(), environment);
        (client, reporter, skill)
    }

    fn lambda() -> EnvironmentTags {
        EnvironmentTags {
            function_name: "skill-fn".into(),
            function_version: "3".into(),
            log_stream: "2026/10/17/[3]abc".into(),
        }
    }

    fn trail(ctx: &RequestContext) -> Vec<(String, String)> {
        let reporter = ctx.reporter().unwrap();
        reporter
            .prepare_report(&CapturedError::message("sample"))
            .breadcrumbs
            .into_iter()
            .map(|b| (b.message, b.data["currentState"].as_str().unwrap().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn new_session_starts_at_entry() {
        let (_client, _reporter, skill) = setup(None);
        let mut ctx = RequestContext::new();
        skill
            .request_started(&mut ctx, &SkillRequest::new_session("LaunchRequest"))
            .await;

        assert_eq!(trail(&ctx), vec![("Start state".to_string(), "entry".to_string())]);
        assert_eq!(ctx.current_state(), "entry");
        assert!(ctx.environment().is_none());
    }

    #[tokio::test]
    async fn resumed_session_starts_at_saved_state() {
        let (_client, _reporter, skill) = setup(None);
        let mut ctx = RequestContext::new();
        skill
            .request_started(&mut ctx, &SkillRequest::resumed("IntentRequest", Some("askName")))
            .await;
        assert_eq!(trail(&ctx)[0].1, "askName");

        let mut ctx = RequestContext::new();
        skill
            .request_started(&mut ctx, &SkillRequest::resumed("IntentRequest", None))
            .await;
        assert_eq!(trail(&ctx)[0].1, "entry");
    }

    #[tokio::test]
    async fn request_snapshot_is_taken_at_start() {
        let (_client, _reporter, skill) = setup(None);
        let mut request = SkillRequest::new_session("LaunchRequest");
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;

        request.request.kind = "Mutated".into();
        let report = ctx
            .reporter()
            .unwrap()
            .prepare_report(&CapturedError::message("sample"));
        assert_eq!(report.request_snapshot().unwrap()["request"]["type"], "LaunchRequest");
        assert_eq!(ctx.request_snapshot().unwrap()["request"]["type"], "LaunchRequest");
    }

    #[tokio::test]
    async fn environment_tags_merged_only_when_present() {
        let (_client, _reporter, skill) = setup(Some(lambda()));
        let mut ctx = RequestContext::new();
        skill
            .request_started(&mut ctx, &SkillRequest::new_session("LaunchRequest"))
            .await;
        let report = ctx
            .reporter()
            .unwrap()
            .prepare_report(&CapturedError::message("sample"));
        assert_eq!(report.tags["Lambda"], "skill-fn");
        assert_eq!(report.tags["Version"], "3");
        assert_eq!(report.tags["LogStream"], "2026/10/17/[3]abc");
        assert_eq!(ctx.environment(), Some(&lambda()));

        let (_client, _reporter, skill) = setup(None);
        let mut ctx = RequestContext::new();
        skill
            .request_started(&mut ctx, &SkillRequest::new_session("LaunchRequest"))
            .await;
        let report = ctx
            .reporter()
            .unwrap()
            .prepare_report(&CapturedError::message("sample"));
        assert!(report.tags.is_empty());
    }

    #[tokio::test]
    async fn transition_appends_state_changed() {
        let (_client, _reporter, skill) = setup(None);
        let request = SkillRequest::new_session("LaunchRequest");
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;
        skill
            .after_state_changed(&mut ctx, &request, &Reply::default(), &Transition::to("greeting"))
            .await;

        assert_eq!(
            trail(&ctx),
            vec![
                ("Start state".to_string(), "entry".to_string()),
                ("State changed".to_string(), "greeting".to_string()),
            ]
        );
        assert_eq!(ctx.current_state(), "greeting");
    }

    #[tokio::test]
    async fn state_machine_error_reports_once() {
        let (client, _reporter, skill) = setup(None);
        let request = SkillRequest::new_session("LaunchRequest");
        let error = SkillError::StateMachine {
            state: "entry".into(),
            message: "boom".into(),
        };
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;
        skill
            .state_machine_failure(&mut ctx, &request, &Reply::default(), &error)
            .await;

        assert_eq!(client.len(), 1);
        assert!(ctx.is_reported());
        assert_eq!(ctx.report_state().event_id(), Some(&client.reports()[0].event_id));

        // A later catch-all for the same request stays silent.
        skill.error(&mut ctx, &request, &error).await;
        assert_eq!(client.len(), 1);
    }

    #[tokio::test]
    async fn error_hook_alone_reports_once() {
        let (client, _reporter, skill) = setup(None);
        let request = SkillRequest::new_session("LaunchRequest");
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;
        skill
            .error(&mut ctx, &request, &SkillError::Handler("unhandled".into()))
            .await;

        let reports = client.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].exception.kind, "HandlerError");
        assert_eq!(reports[0].breadcrumbs.len(), 1);
        // The fallback path does not touch the dedup state.
        assert!(!ctx.is_reported());
    }

    #[tokio::test]
    async fn failed_state_machine_capture_falls_back_to_error_hook() {
        let (client, _reporter, skill) = setup(None);
        let request = SkillRequest::new_session("LaunchRequest");
        let error = SkillError::Handler("boom".into());
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;

        client.set_failing(true);
        skill
            .state_machine_error(&mut ctx, &request, &Reply::default(), &error)
            .await;
        assert!(!ctx.is_reported());
        assert!(client.is_empty());

        client.set_failing(false);
        skill.error(&mut ctx, &request, &error).await;
        assert_eq!(client.len(), 1);
    }

    #[tokio::test]
    async fn session_ended_with_error_reports_message() {
        let (client, _reporter, skill) = setup(None);
        let request = SkillRequest::session_ended("ERROR", Some("timeout"));
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;
        skill.session_ended(&mut ctx, &request).await;

        let reports = client.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].exception.kind, "Error");
        assert_eq!(reports[0].exception.value, "timeout");
        assert!(!ctx.is_reported());
    }

    #[tokio::test]
    async fn session_ended_capture_failure_is_swallowed() {
        let (client, _reporter, skill) = setup(None);
        let request = SkillRequest::session_ended("ERROR", Some("timeout"));
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;

        client.set_failing(true);
        skill.session_ended(&mut ctx, &request).await;

        assert!(client.is_empty());
        assert!(!ctx.is_reported());
    }

    #[tokio::test]
    async fn session_ended_normally_reports_nothing() {
        let (client, _reporter, skill) = setup(None);
        let request = SkillRequest::session_ended("USER_INITIATED", None);
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;
        skill.session_ended(&mut ctx, &request).await;
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn hooks_without_request_start_use_root_reporter() {
        let (client, reporter, skill) = setup(None);
        let request = SkillRequest::new_session("LaunchRequest");
        let mut ctx = RequestContext::new();
        skill
            .after_state_changed(&mut ctx, &request, &Reply::default(), &Transition::to("greeting"))
            .await;
        assert_eq!(reporter.scope().breadcrumbs().count(), 1);

        skill
            .error(&mut ctx, &request, &SkillError::Handler("x".into()))
            .await;
        assert_eq!(client.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_keep_separate_trails() {
        let (client, reporter, skill) = setup(None);
        let first = SkillRequest::new_session("LaunchRequest");
        let second = SkillRequest::resumed("IntentRequest", Some("askName"));
        let mut first_ctx = RequestContext::new();
        let mut second_ctx = RequestContext::new();

        skill.request_started(&mut first_ctx, &first).await;
        skill.request_started(&mut second_ctx, &second).await;
        skill
            .after_state_changed(&mut first_ctx, &first, &Reply::default(), &Transition::to("greeting"))
            .await;
        skill
            .error(&mut second_ctx, &second, &SkillError::Handler("x".into()))
            .await;

        let reports = client.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].breadcrumbs.len(), 1);
        assert_eq!(reports[0].breadcrumbs[0].data["currentState"], "askName");
        assert_eq!(trail(&first_ctx).len(), 2);
        assert_eq!(reporter.scope().breadcrumbs().count(), 0);
    }

    #[tokio::test]
    async fn detached_captures_complete_after_flush() {
        let client = Arc::new(MemoryClient::new());
        let reporter = Arc::new(Reporter::with_client(client.clone()));
        let mut skill = HookRegistry::new(execute_fn(|_request: SkillRequest| async move {
            Ok(Reply::default())
        }));
        let hooks = Instrumentation::new(reporter, None)
            .with_capture_mode(CaptureMode::Detached)
            .register(&mut skill);

        let request = SkillRequest::session_ended("ERROR", Some("timeout"));
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;
        skill.session_ended(&mut ctx, &request).await;
        skill
            .error(&mut ctx, &request, &SkillError::Handler("late".into()))
            .await;

        hooks.flush().await;
        let values: Vec<_> = client.reports().into_iter().map(|r| r.exception.value).collect();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&"timeout".to_string()));
        assert!(values.iter().any(|v| v.contains("late")));
    }

    #[tokio::test]
    async fn awaited_captures_leave_nothing_to_flush() {
        let client = Arc::new(MemoryClient::new());
        let reporter = Arc::new(Reporter::with_client(client.clone()));
        let mut skill = HookRegistry::new(execute_fn(|_request: SkillRequest| async move {
            Ok(Reply::default())
        }));
        let hooks = bind(&mut skill, reporter, None);

        let request = SkillRequest::session_ended("ERROR", Some("timeout"));
        let mut ctx = RequestContext::new();
        skill.request_started(&mut ctx, &request).await;
        skill.session_ended(&mut ctx, &request).await;

        assert_eq!(client.len(), 1);
        hooks.flush().await;
        assert_eq!(client.len(), 1);
    }

    #[tokio::test]
    async fn binding_twice_duplicates_hooks() {
        let client = Arc::new(MemoryClient::new());
        let reporter = Arc::new(Reporter::with_client(client.clone()));
        let mut skill = HookRegistry::new(execute_fn(|_request: SkillRequest| async move {
            Ok(Reply::default())
        }));
        bind(&mut skill, reporter.clone(), None);
        bind(&mut skill, reporter, None);
        assert_eq!(skill.hook_count(), 2);
    }
}
