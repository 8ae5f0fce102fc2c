//! Core error types.

use crate::engine::EngineKind;
use thiserror::Error;

/// Errors from table loading and the tokenizer/extractor engines.
///
/// The acceptance matcher never fails: a rejection is a plain `false`.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("{engine} stalled: start state '{state}' has no transition for {symbol:?} at position {position}")]
    Stalled {
        engine: EngineKind,
        state: String,
        position: usize,
        symbol: String,
    },

    #[error("{engine} exceeded its step limit of {limit}")]
    StepLimitExceeded { engine: EngineKind, limit: u64 },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid machine definition: {reason}")]
    InvalidDefinition { reason: String },

    #[error("invalid token event for '{label}': {reason}")]
    InvalidEvent { label: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FsmError {
    /// Returns whether the error comes from a table that cannot make progress,
    /// as opposed to a malformed definition.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            FsmError::Stalled { .. } | FsmError::StepLimitExceeded { .. }
        )
    }

    /// Returns a stable error code suitable for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            FsmError::Stalled { .. } => "STALLED",
            FsmError::StepLimitExceeded { .. } => "STEP_LIMIT",
            FsmError::InvalidPattern { .. } => "INVALID_PATTERN",
            FsmError::InvalidDefinition { .. } => "INVALID_DEFINITION",
            FsmError::InvalidEvent { .. } => "INVALID_EVENT",
            FsmError::Io(_) => "IO_ERROR",
            FsmError::Json(_) => "PARSE_ERROR",
            FsmError::Yaml(_) => "PARSE_ERROR",
        }
    }
}
