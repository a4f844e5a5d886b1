//! Serverless host discovery.
//!
//! The only place that reads the process environment for the instrumentation.
//! Resolved once at startup and handed to the binder as plain data.

use skillwatch_core::EnvironmentTags;

/// Set by the serverless runtime to the function's code root.
pub const SERVERLESS_MARKER_VAR: &str = "LAMBDA_TASK_ROOT";
pub const FUNCTION_NAME_VAR: &str = "AWS_LAMBDA_FUNCTION_NAME";
pub const FUNCTION_VERSION_VAR: &str = "AWS_LAMBDA_FUNCTION_VERSION";
pub const LOG_STREAM_VAR: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

/// Detect the serverless host from the process environment.
pub fn detect_environment() -> Option<EnvironmentTags> {
    detect_environment_with(|key| std::env::var(key).ok())
}

/// Detect the serverless host from an arbitrary key-value lookup.
///
/// Returns `None` unless the marker is set to a non-empty value. Missing
/// identifiers under a present marker resolve to empty strings.
pub fn detect_environment_with<F>(lookup: F) -> Option<EnvironmentTags>
where
    F: Fn(&str) -> Option<String>,
{
    let marker = lookup(SERVERLESS_MARKER_VAR)?;
    if marker.is_empty() {
        return None;
    }

    let tags = EnvironmentTags {
        function_name: lookup(FUNCTION_NAME_VAR).unwrap_or_default(),
        function_version: lookup(FUNCTION_VERSION_VAR).unwrap_or_default(),
        log_stream: lookup(LOG_STREAM_VAR).unwrap_or_default(),
    };
    tracing::debug!(function = %tags.function_name, "Serverless host detected");
    Some(tags)
}
