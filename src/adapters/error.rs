// ABOUTME: Error types for service adapters
// ABOUTME: Covers payload validation, destination problems and delivery failures

use std::path::PathBuf;
use thiserror::Error;

use crate::compiler::CompileError;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Unknown service '{service}' (available: {})", available.join(", "))]
    UnknownService {
        service: String,
        available: Vec<String>,
    },

    #[error("{service} payload is invalid:\n  - {}", errors.join("\n  - "))]
    ValidationInvalid {
        service: String,
        errors: Vec<String>,
    },

    #[error("{service} destination is missing '{field}'")]
    MissingDestination { service: String, field: String },

    #[error("Missing credential '{key}' for {service}")]
    MissingCredential { service: String, key: String },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Delivery to {service} failed: {reason}")]
    DeliveryFailed {
        service: String,
        reason: String,
        raw: Option<String>,
    },

    #[error("Failed to read {service} attachment {path}: {source}")]
    Attachment {
        service: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AdapterError {
    pub fn delivery(service: &str, reason: impl Into<String>, raw: Option<String>) -> Self {
        AdapterError::DeliveryFailed {
            service: service.to_string(),
            reason: reason.into(),
            raw,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
