//! Inbound skill requests, replies, and state transitions.
//!
//! These mirror the payload a voice platform delivers to a skill. Only the
//! fields the instrumentation reads are typed; everything else rides along
//! in `context` so deep copies stay faithful.

use serde::{Deserialize, Serialize};

/// Session attribute key holding the state the previous turn ended in.
pub const STATE_ATTRIBUTE: &str = "state";

/// The state a request starts in when there is no prior state.
pub const ENTRY_STATE: &str = "entry";

/// Termination reason a platform uses when a session ended on an error.
pub const ERROR_REASON: &str = "ERROR";

/// A request delivered to the skill by the host platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SkillRequest {
    /// Session the request belongs to
    #[serde(default)]
    pub session: Session,

    /// The request body (type, intent, termination reason)
    #[serde(default)]
    pub request: RequestBody,

    /// Platform context, carried through untouched
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub context: serde_json::Value,
}

/// Session information attached to every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Whether this request opened the session
    #[serde(default)]
    pub new: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Attributes persisted between turns
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// The body of a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestBody {
    /// Request type, e.g. `LaunchRequest`, `IntentRequest`, `SessionEndedRequest`
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Why the session ended (only on session-ended requests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Error details reported by the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RequestError>,
}

/// Error details attached to a session-ended request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestError {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub message: String,
}

impl SkillRequest {
    /// Create a request for a fresh session.
    pub fn new_session(kind: impl Into<String>) -> Self {
        Self {
            session: Session {
                new: true,
                ..Default::default()
            },
            request: RequestBody {
                kind: kind.into(),
                ..Default::default()
            },
            context: serde_json::Value::Null,
        }
    }

    /// Create a request continuing a session that last ended in `state`.
    pub fn resumed(kind: impl Into<String>, state: Option<&str>) -> Self {
        let mut request = Self::new_session(kind);
        request.session.new = false;
        if let Some(state) = state {
            request
                .session
                .attributes
                .insert(STATE_ATTRIBUTE.into(), serde_json::Value::String(state.into()));
        }
        request
    }

    /// Create a session-ended request.
    pub fn session_ended(reason: impl Into<String>, error_message: Option<&str>) -> Self {
        let mut request = Self::resumed("SessionEndedRequest", None);
        request.request.reason = Some(reason.into());
        request.request.error = error_message.map(|message| RequestError {
            kind: "INTERNAL_ERROR".into(),
            message: message.into(),
        });
        request
    }

    /// The state this request starts from.
    ///
    /// `entry` for new sessions; otherwise the persisted `state` attribute,
    /// falling back to `entry` when it is missing or not a string.
    pub fn from_state(&self) -> &str {
        if self.session.new {
            return ENTRY_STATE;
        }
        self.session
            .attributes
            .get(STATE_ATTRIBUTE)
            .and_then(|v| v.as_str())
            .unwrap_or(ENTRY_STATE)
    }

    /// Whether the platform ended the session because of an error.
    pub fn ended_with_error(&self) -> bool {
        self.request.reason.as_deref() == Some(ERROR_REASON)
    }

    /// The platform's error message, empty if none was sent.
    pub fn error_message(&self) -> &str {
        self.request
            .error
            .as_ref()
            .map(|e| e.message.as_str())
            .unwrap_or_default()
    }
}

/// The skill's response to a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech: Option<String>,

    #[serde(default)]
    pub should_end_session: bool,

    #[serde(default)]
    pub session_attributes: serde_json::Map<String, serde_json::Value>,
}

impl Reply {
    pub fn say(speech: impl Into<String>) -> Self {
        Self {
            speech: Some(speech.into()),
            ..Default::default()
        }
    }
}

/// A completed state transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    pub to: String,
}

impl Transition {
    pub fn to(state: impl Into<String>) -> Self {
        Self {
            from: None,
            to: state.into(),
        }
    }

    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
        }
    }
}
