//! # SkillWatch Core
//!
//! Domain types, contracts, and error definitions for instrumenting a
//! conversational skill with an error-tracking backend.
//!
//! ## Design Philosophy
//!
//! The host skill framework and the backend transport are both external.
//! This crate defines the seams to them as traits:
//! - [`LifecycleHooks`] / [`SkillLifecycle`] for the host's hook points
//! - [`CaptureClient`] for the backend's capture-and-acknowledge call
//! - [`ErrorReporter`] for the context/breadcrumb scope in front of a client
//!
//! Implementations live in their respective crates.

pub mod context;
pub mod error;
pub mod lifecycle;
pub mod report;
pub mod reporter;
pub mod request;

// Re-export key types at crate root for ergonomics
pub use context::{EnvironmentTags, ReportState, RequestContext};
pub use error::{Error, ReportError, Result, SkillError};
pub use lifecycle::{
    ExecuteFn, ExecuteWrapper, HookRegistry, LifecycleHooks, SkillLifecycle, execute_fn,
};
pub use report::{Breadcrumb, CapturedError, ContextPatch, EventId, ExceptionReport, Level};
pub use reporter::{CaptureClient, ErrorReporter};
pub use request::{Reply, SkillRequest, Transition};
