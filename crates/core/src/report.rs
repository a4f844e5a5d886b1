//! Telemetry records: breadcrumbs, context patches, and exception reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::SkillError;

/// Breadcrumb category used for state-machine flow.
pub const STATE_FLOW_CATEGORY: &str = "stateFlow";

/// Severity attached to breadcrumbs and reports.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Info,
    Error,
}

/// A categorized diagnostic note attached to later reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Breadcrumb {
    pub message: String,
    pub category: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub level: Level,
    pub timestamp: DateTime<Utc>,
}

impl Breadcrumb {
    pub fn new(message: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: category.into(),
            data: serde_json::Map::new(),
            level: Level::Info,
            timestamp: Utc::now(),
        }
    }

    /// A `stateFlow` breadcrumb recording the current state.
    pub fn state_flow(message: impl Into<String>, current_state: impl Into<String>) -> Self {
        let state: String = current_state.into();
        Self::new(message, STATE_FLOW_CATEGORY).with_data("currentState", state)
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Backend acknowledgment for a delivered report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// A fresh random id in the backend's 32-hex-digit format.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An error value ready to be captured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapturedError {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl CapturedError {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// A plain `Error` carrying only a message.
    pub fn message(value: impl Into<String>) -> Self {
        Self::new("Error", value)
    }
}

impl From<&SkillError> for CapturedError {
    fn from(err: &SkillError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

/// A partial context merged into a reporting scope.
///
/// Tags are flat strings indexed by the backend; `extra` holds arbitrary
/// JSON (the cloned request lives under `extra.request`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextPatch {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
}

impl ContextPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = (String, String)>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn user(mut self, user: serde_json::Value) -> Self {
        self.user = Some(user);
        self
    }
}

/// Everything sent to the backend for one captured exception.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExceptionReport {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub exception: CapturedError,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub breadcrumbs: Vec<Breadcrumb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

impl ExceptionReport {
    /// A report for `exception` with empty context.
    pub fn new(exception: CapturedError) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: Utc::now(),
            level: Level::Error,
            exception,
            tags: BTreeMap::new(),
            extra: serde_json::Map::new(),
            user: None,
            breadcrumbs: Vec::new(),
            environment: None,
            release: None,
            server_name: None,
        }
    }

    /// The `extra.request` snapshot, if one was merged.
    pub fn request_snapshot(&self) -> Option<&serde_json::Value> {
        self.extra.get("request")
    }
}
