// ABOUTME: Error types for token resolution and tree interpolation
// ABOUTME: Distinguishes unresolved tokens from circular default chains

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing variable(s) in template '{template}': {}", names.join(", "))]
    MissingVariables { template: String, names: Vec<String> },

    #[error("Circular variable default in template '{template}': {}", chain.join(" -> "))]
    CircularDefault { template: String, chain: Vec<String> },
}

impl TemplateError {
    /// Names of the unresolved tokens, empty for non-missing errors
    pub fn missing_names(&self) -> &[String] {
        match self {
            TemplateError::MissingVariables { names, .. } => names,
            TemplateError::CircularDefault { .. } => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;
