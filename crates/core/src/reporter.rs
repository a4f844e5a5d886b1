//! Reporting contracts: the backend client and the error reporter over it.
//!
//! The backend transport lives outside this workspace; it is consumed only
//! through [`CaptureClient`]. [`ErrorReporter`] is what the instrumentation
//! talks to: a scope of context and breadcrumbs in front of a client.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ReportError;
use crate::report::{Breadcrumb, CapturedError, ContextPatch, EventId, ExceptionReport};

/// The capture-and-acknowledge contract of an error-tracking backend.
#[async_trait]
pub trait CaptureClient: Send + Sync {
    /// Short client name used in diagnostics (e.g. "memory", "log").
    fn name(&self) -> &str;

    /// Deliver a report and return the backend's acknowledgment id.
    async fn send(&self, report: ExceptionReport) -> Result<EventId, ReportError>;
}

/// An error reporter: context store, breadcrumb trail and capture.
///
/// `merge_context` and `capture_breadcrumb` never fail and never block on
/// I/O. `capture_exception` fails only when the transport does; callers on
/// the host's lifecycle path swallow that failure.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Merge tags, extra fields and user data into this reporter's context.
    fn merge_context(&self, patch: ContextPatch);

    /// Append a breadcrumb to the trail.
    fn capture_breadcrumb(&self, breadcrumb: Breadcrumb);

    /// Send `error` with the current context and trail.
    async fn capture_exception(&self, error: &CapturedError) -> Result<EventId, ReportError>;

    /// A reporter for a single request. It starts with a copy of this
    /// reporter's context and trail; later changes on either side do not
    /// leak into the other.
    fn fork(&self) -> Arc<dyn ErrorReporter>;

    /// Build the report `capture_exception` would send, without sending it.
    fn prepare_report(&self, error: &CapturedError) -> ExceptionReport;

    /// The unwrapped backend client.
    fn client(&self) -> Arc<dyn CaptureClient>;
}
