// ABOUTME: Error types for shorthand message compilation
// ABOUTME: Reports unrecognized constructs and malformed shorthand with their position

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Unrecognized block at {path}: no shorthand key or 'type' field (keys: {})", keys.join(", "))]
    UnrecognizedBlock { path: String, keys: Vec<String> },

    #[error("Unrecognized element at {path}: no shorthand key or 'type' field (keys: {})", keys.join(", "))]
    UnrecognizedElement { path: String, keys: Vec<String> },

    #[error("Invalid '{construct}' shorthand at {path}: {reason}")]
    InvalidShorthand {
        construct: String,
        path: String,
        reason: String,
    },
}

impl CompileError {
    pub fn invalid(construct: &str, path: &str, reason: impl Into<String>) -> Self {
        CompileError::InvalidShorthand {
            construct: construct.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
