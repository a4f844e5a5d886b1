//! Error reporting for SkillWatch.
//!
//! A [`Reporter`] keeps request-scoped context and an ordered breadcrumb
//! trail in front of a shared [`CaptureClient`](skillwatch_core::CaptureClient),
//! and turns captured errors into [`ExceptionReport`](skillwatch_core::ExceptionReport)s.
//! Transport failures are logged and returned, never panicked on.

pub mod client;
pub mod reporter;
pub mod scope;

pub use client::{LogClient, MemoryClient};
pub use reporter::{Reporter, ReporterOptions};
pub use scope::Scope;
