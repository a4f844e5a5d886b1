//! Skill lifecycle extension points.
//!
//! A host skill framework exposes five hook points plus a way to wrap its
//! execute entry point. Hook ordering is the host's job:
//!
//! - `request_started` runs first for every request;
//! - `after_state_changed` runs after each completed transition;
//! - `state_machine_error` runs when transition logic fails, and always
//!   before `error` for the same failure;
//! - `error` is the catch-all, run after any other error path;
//! - `session_ended` runs for the platform's session-ended request.
//!
//! Hooks may suspend (they are async) and may mutate the request's
//! [`RequestContext`]. They must not fail the turn: there is no error
//! return, so anything a hook cannot handle it logs and drops.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::SkillError;
use crate::request::{Reply, SkillRequest, Transition};

/// The callbacks a host invokes over a request's lifecycle.
///
/// Every method defaults to a no-op so implementors only override the
/// points they care about.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// A request arrived, before any state handler ran.
    async fn request_started(&self, _ctx: &mut RequestContext, _request: &SkillRequest) {}

    /// The platform reported the end of the session.
    async fn session_ended(&self, _ctx: &mut RequestContext, _request: &SkillRequest) {}

    /// A state transition completed.
    async fn after_state_changed(
        &self,
        _ctx: &mut RequestContext,
        _request: &SkillRequest,
        _reply: &Reply,
        _transition: &Transition,
    ) {
    }

    /// The transition logic itself raised an error.
    async fn state_machine_error(
        &self,
        _ctx: &mut RequestContext,
        _request: &SkillRequest,
        _reply: &Reply,
        _error: &SkillError,
    ) {
    }

    /// Catch-all error hook, invoked after any other error path.
    async fn error(&self, _ctx: &mut RequestContext, _request: &SkillRequest, _error: &SkillError) {}
}

/// The skill's primary execution entry point.
pub type ExecuteFn =
    Arc<dyn Fn(SkillRequest) -> BoxFuture<'static, Result<Reply, SkillError>> + Send + Sync>;

/// Box a plain async function into an [`ExecuteFn`].
pub fn execute_fn<F, Fut>(f: F) -> ExecuteFn
where
    F: Fn(SkillRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, SkillError>> + Send + 'static,
{
    Arc::new(move |request| -> BoxFuture<'static, Result<Reply, SkillError>> {
        Box::pin(f(request))
    })
}

/// Decorates an execute entry point.
pub trait ExecuteWrapper: Send + Sync {
    fn wrap(&self, execute: ExecuteFn) -> ExecuteFn;
}

/// Hook registration contract a host framework implements.
pub trait SkillLifecycle {
    /// Register a hook set. Registering the same set twice runs it twice.
    fn add_hooks(&mut self, hooks: Arc<dyn LifecycleHooks>);

    /// Replace the execute entry point with `wrapper`'s decoration of it.
    fn wrap_execute(&mut self, wrapper: &dyn ExecuteWrapper);
}

/// A reusable hook dispatcher hosts can embed.
///
/// Hooks run in registration order; each is awaited before the next.
pub struct HookRegistry {
    hooks: Vec<Arc<dyn LifecycleHooks>>,
    execute: ExecuteFn,
}

impl HookRegistry {
    pub fn new(execute: ExecuteFn) -> Self {
        Self {
            hooks: Vec::new(),
            execute,
        }
    }

    /// Number of registered hook sets.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Run the (possibly wrapped) execute entry point.
    pub async fn execute(&self, request: SkillRequest) -> Result<Reply, SkillError> {
        (self.execute)(request).await
    }

    pub async fn request_started(&self, ctx: &mut RequestContext, request: &SkillRequest) {
        for hooks in &self.hooks {
            hooks.request_started(ctx, request).await;
        }
    }

    pub async fn session_ended(&self, ctx: &mut RequestContext, request: &SkillRequest) {
        for hooks in &self.hooks {
            hooks.session_ended(ctx, request).await;
        }
    }

    pub async fn after_state_changed(
        &self,
        ctx: &mut RequestContext,
        request: &SkillRequest,
        reply: &Reply,
        transition: &Transition,
    ) {
        for hooks in &self.hooks {
            hooks.after_state_changed(ctx, request, reply, transition).await;
        }
    }

    pub async fn state_machine_error(
        &self,
        ctx: &mut RequestContext,
        request: &SkillRequest,
        reply: &Reply,
        error: &SkillError,
    ) {
        for hooks in &self.hooks {
            hooks.state_machine_error(ctx, request, reply, error).await;
        }
    }

    pub async fn error(&self, ctx: &mut RequestContext, request: &SkillRequest, error: &SkillError) {
        for hooks in &self.hooks {
            hooks.error(ctx, request, error).await;
        }
    }

    /// Dispatch a transition failure: `state_machine_error`, then `error`.
    pub async fn state_machine_failure(
        &self,
        ctx: &mut RequestContext,
        request: &SkillRequest,
        reply: &Reply,
        error: &SkillError,
    ) {
        self.state_machine_error(ctx, request, reply, error).await;
        self.error(ctx, request, error).await;
    }
}

impl SkillLifecycle for HookRegistry {
    fn add_hooks(&mut self, hooks: Arc<dyn LifecycleHooks>) {
        self.hooks.push(hooks);
    }

    fn wrap_execute(&mut self, wrapper: &dyn ExecuteWrapper) {
        self.execute = wrapper.wrap(self.execute.clone());
    }
}
