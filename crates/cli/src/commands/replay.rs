//! `skillwatch replay`: Replay a recorded skill lifecycle.
//!
//! The script is a JSON document listing requests and, per request, the
//! lifecycle events the skill went through. Each request is run through a
//! [`HookRegistry`] bound with the instrumentation, so the reports printed
//! at the end are exactly what a live skill would have sent.

use serde::{Deserialize, Serialize};
use skillwatch_config::{AppConfig, CaptureMode, detect_environment};
use skillwatch_core::{
    CaptureClient, Error, ErrorReporter, HookRegistry, Reply, RequestContext, Result, SkillError,
    SkillRequest, Transition, execute_fn,
};
use skillwatch_instrument::Instrumentation;
use skillwatch_telemetry::{LogClient, MemoryClient, Reporter, ReporterOptions};
use std::path::Path;
use std::sync::Arc;

/// A recorded lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    pub requests: Vec<ScriptedRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedRequest {
    pub request: SkillRequest,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

/// One lifecycle occurrence after the request started.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    StateChanged {
        to: String,
    },
    /// Transition logic failed; dispatches the state-machine hook, then
    /// the catch-all.
    StateMachineError {
        message: String,
    },
    /// A failure outside the state machine; dispatches only the catch-all.
    Error {
        message: String,
    },
    SessionEnded,
}

impl ReplayScript {
    pub fn load(path: &Path) -> Result<Self> {
        let script_error = |message: String| Error::Script {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path)
            .map_err(|e| script_error(format!("Failed to read script: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| script_error(format!("Failed to parse script: {e}")))
    }
}

/// Drive every scripted request through `skill`'s hooks.
pub async fn replay(
    skill: &HookRegistry,
    script: &ReplayScript,
) -> std::result::Result<(), SkillError> {
    for scripted in &script.requests {
        let request = &scripted.request;
        let mut ctx = RequestContext::new();

        skill.request_started(&mut ctx, request).await;
        let reply = skill.execute(request.clone()).await?;

        for event in &scripted.events {
            match event {
                ScriptEvent::StateChanged { to } => {
                    let transition = Transition::between(ctx.current_state(), to.as_str());
                    skill
                        .after_state_changed(&mut ctx, request, &reply, &transition)
                        .await;
                }
                ScriptEvent::StateMachineError { message } => {
                    let error = SkillError::StateMachine {
                        state: ctx.current_state().to_string(),
                        message: message.clone(),
                    };
                    skill
                        .state_machine_failure(&mut ctx, request, &reply, &error)
                        .await;
                }
                ScriptEvent::Error { message } => {
                    let error = SkillError::Handler(message.clone());
                    skill.error(&mut ctx, request, &error).await;
                }
                ScriptEvent::SessionEnded => skill.session_ended(&mut ctx, request).await,
            }
        }

        tracing::debug!(
            state = ctx.current_state(),
            reported = ctx.is_reported(),
            "Replayed request"
        );
    }
    Ok(())
}

fn reporter_options(config: &AppConfig) -> ReporterOptions {
    ReporterOptions {
        environment: config.reporter.environment.clone(),
        release: config.reporter.release.clone(),
        server_name: config.reporter.server_name.clone(),
        max_breadcrumbs: config.reporter.max_breadcrumbs,
    }
}

/// A no-op skill with the instrumentation registered on it.
fn instrumented_skill(
    reporter: Arc<dyn ErrorReporter>,
    capture_mode: CaptureMode,
) -> (HookRegistry, Arc<Instrumentation>) {
    let mut skill = HookRegistry::new(execute_fn(|_request: SkillRequest| async move {
        Ok(Reply::default())
    }));
    let hooks = Instrumentation::new(reporter, detect_environment())
        .with_capture_mode(capture_mode)
        .register(&mut skill);
    (skill, hooks)
}

pub async fn run(config: &AppConfig, script_path: &Path, client_override: Option<String>) -> Result<()> {
    let script = ReplayScript::load(script_path)?;
    let client_name = client_override.unwrap_or_else(|| config.reporter.client.clone());

    let memory = Arc::new(MemoryClient::new());
    let client: Arc<dyn CaptureClient> = match client_name.as_str() {
        "memory" => memory.clone(),
        "log" => Arc::new(LogClient::new()),
        other => {
            return Err(Error::Config {
                message: format!("Unknown client '{other}' (expected 'memory' or 'log')"),
            });
        }
    };

    let reporter = Arc::new(Reporter::new(client, reporter_options(config)));
    let (skill, hooks) = instrumented_skill(reporter, config.reporter.capture_mode);

    let outcome = replay(&skill, &script).await;
    // Detached captures must land before reports are printed or the runtime exits.
    hooks.flush().await;
    outcome?;

    if client_name == "memory" {
        println!("{}", serde_json::to_string_pretty(&memory.reports())?);
    }
    Ok(())
}
