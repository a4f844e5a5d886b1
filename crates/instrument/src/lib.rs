//! Error reporting for a skill's lifecycle.
//!
//! [`bind`] registers one hook set on a [`SkillLifecycle`](skillwatch_core::SkillLifecycle)
//! host and wraps its execute entry point:
//!
//! - request start: snapshot the request into `extra.request`, merge the
//!   serverless tags if any, record a `Start state` breadcrumb, attach a
//!   per-request reporter to the [`RequestContext`](skillwatch_core::RequestContext)
//! - state change: record a `State changed` breadcrumb
//! - state-machine error: capture once and mark the request reported
//! - catch-all error: capture unless already reported
//! - session end with reason `ERROR`: capture the platform's message
//!
//! Backend failures are logged and swallowed; no hook ever fails the turn.
//! In detached capture mode, call [`Instrumentation::flush`] before shutdown.

pub mod binder;
pub mod execute;

pub use binder::{Instrumentation, START_STATE_MESSAGE, STATE_CHANGED_MESSAGE, bind};
pub use execute::TracedExecute;
