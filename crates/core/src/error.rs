//! Error types for the SkillWatch domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all SkillWatch operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Skill errors ---
    #[error("Skill error: {0}")]
    Skill(#[from] SkillError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Replay scripts ---
    #[error("Script {path}: {message}")]
    Script { path: String, message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised by the conversational logic of a skill.
#[derive(Debug, Clone, Error)]
pub enum SkillError {
    #[error("State machine failed in state '{state}': {message}")]
    StateMachine { state: String, message: String },

    #[error("Unknown state: {0}")]
    UnknownState(String),

    #[error("Handler failed: {0}")]
    Handler(String),
}

impl SkillError {
    /// The variant name, used as the exception type in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateMachine { .. } => "StateMachineError",
            Self::UnknownState(_) => "UnknownStateError",
            Self::Handler(_) => "HandlerError",
        }
    }
}

/// Errors from delivering a report to the backend.
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Transport failed ({client}): {reason}")]
    Transport { client: String, reason: String },

    #[error("Report could not be serialized: {0}")]
    Serialization(String),
}
