// ABOUTME: Error type for the send pipeline
// ABOUTME: Folds every stage failure into one enum with a stable machine-readable kind

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::adapters::AdapterError;
use crate::compiler::CompileError;
use crate::credentials::CredentialError;
use crate::parser::{ParserError, SchemaViolation};
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Template not found: {}", path.display())]
    TemplateNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template {}: {message}", path.display())]
    TemplateParse { path: PathBuf, message: String },

    #[error("Template schema invalid:\n  - {}", join_violations(.violations))]
    SchemaInvalid { violations: Vec<SchemaViolation> },

    #[error("Template '{template}' is missing variables: {}", names.join(", "))]
    MissingVariable { template: String, names: Vec<String> },

    #[error("Template '{template}' has circular defaults: {}", chain.join(" -> "))]
    CircularDefault { template: String, chain: Vec<String> },

    #[error("Unknown service '{service}' (available: {})", available.join(", "))]
    UnknownService {
        service: String,
        available: Vec<String>,
    },

    #[error("{service} rejected the payload:\n  - {}", errors.join("\n  - "))]
    ValidationInvalid {
        service: String,
        errors: Vec<String>,
    },

    #[error("Missing credential '{key}' for {service}{}", hint(.env_var))]
    MissingCredentials {
        service: String,
        key: String,
        env_var: Option<String>,
    },

    #[error("Delivery to {service} failed: {reason}{}", raw_suffix(.raw))]
    DeliveryFailed {
        service: String,
        reason: String,
        raw: Option<String>,
    },

    #[error("{0}")]
    UnrecognizedConstruct(#[from] CompileError),
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n  - ")
}

fn hint(env_var: &Option<String>) -> String {
    env_var
        .as_ref()
        .map(|var| format!(" (set {} or pass --token)", var))
        .unwrap_or_default()
}

fn raw_suffix(raw: &Option<String>) -> String {
    raw.as_ref()
        .map(|raw| format!("\nresponse: {}", raw))
        .unwrap_or_default()
}

impl PipelineError {
    /// Stable identifier for scripts and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::TemplateNotFound { .. } => "template_not_found",
            PipelineError::TemplateParse { .. } => "template_parse",
            PipelineError::SchemaInvalid { .. } => "schema_invalid",
            PipelineError::MissingVariable { .. } => "missing_variable",
            PipelineError::CircularDefault { .. } => "circular_default",
            PipelineError::UnknownService { .. } => "unknown_service",
            PipelineError::ValidationInvalid { .. } => "validation_invalid",
            PipelineError::MissingCredentials { .. } => "missing_credentials",
            PipelineError::DeliveryFailed { .. } => "delivery_failed",
            PipelineError::UnrecognizedConstruct(_) => "unrecognized_construct",
        }
    }

    /// Attach the template path to a loader failure
    pub fn from_parser(path: &Path, error: ParserError) -> Self {
        match error {
            ParserError::NotFound { path, source } => {
                PipelineError::TemplateNotFound { path, source }
            }
            ParserError::YamlError(e) => PipelineError::TemplateParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            ParserError::JsonError(e) => PipelineError::TemplateParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            ParserError::SchemaInvalid { violations } => {
                PipelineError::SchemaInvalid { violations }
            }
        }
    }
}

impl From<ParserError> for PipelineError {
    fn from(error: ParserError) -> Self {
        PipelineError::from_parser(Path::new("<inline>"), error)
    }
}

impl From<TemplateError> for PipelineError {
    fn from(error: TemplateError) -> Self {
        match error {
            TemplateError::MissingVariables { template, names } => {
                PipelineError::MissingVariable { template, names }
            }
            TemplateError::CircularDefault { template, chain } => {
                PipelineError::CircularDefault { template, chain }
            }
        }
    }
}

impl From<CredentialError> for PipelineError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::UnknownService { service } => PipelineError::UnknownService {
                service,
                available: Vec::new(),
            },
            CredentialError::MissingCredentials {
                service,
                key,
                env_var,
            } => PipelineError::MissingCredentials {
                service,
                key,
                env_var,
            },
        }
    }
}

impl From<AdapterError> for PipelineError {
    fn from(error: AdapterError) -> Self {
        match error {
            AdapterError::UnknownService { service, available } => {
                PipelineError::UnknownService { service, available }
            }
            AdapterError::ValidationInvalid { service, errors } => {
                PipelineError::ValidationInvalid { service, errors }
            }
            AdapterError::MissingDestination { service, field } => {
                PipelineError::ValidationInvalid {
                    errors: vec![format!("destination.{} is required", field)],
                    service,
                }
            }
            AdapterError::MissingCredential { service, key } => {
                PipelineError::MissingCredentials {
                    service,
                    key,
                    env_var: None,
                }
            }
            AdapterError::Compile(e) => PipelineError::UnrecognizedConstruct(e),
            AdapterError::DeliveryFailed {
                service,
                reason,
                raw,
            } => PipelineError::DeliveryFailed {
                service,
                reason,
                raw,
            },
            AdapterError::Attachment {
                service,
                path,
                source,
            } => PipelineError::DeliveryFailed {
                service,
                reason: format!("cannot read attachment {}: {}", path.display(), source),
                raw: None,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        let missing: PipelineError = TemplateError::MissingVariables {
            template: "t".to_string(),
            names: vec!["a".to_string(), "b".to_string()],
        }
        .into();
        assert_eq!(missing.kind(), "missing_variable");
        assert_eq!(
            missing.to_string(),
            "Template 't' is missing variables: a, b"
        );

        let circular: PipelineError = TemplateError::CircularDefault {
            template: "t".to_string(),
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        }
        .into();
        assert_eq!(circular.kind(), "circular_default");
        assert!(circular.to_string().contains("a -> b -> a"));

        let unknown: PipelineError = AdapterError::UnknownService {
            service: "teams".to_string(),
            available: vec!["slack".to_string()],
        }
        .into();
        assert_eq!(unknown.kind(), "unknown_service");
        assert!(unknown.to_string().contains("available: slack"));
    }

    #[test]
    fn test_delivery_failure_keeps_raw_body() {
        let failed: PipelineError = AdapterError::delivery(
            "slack",
            "chat.postMessage returned error 'not_in_channel'",
            Some(r#"{"ok":false,"error":"not_in_channel"}"#.to_string()),
        )
        .into();
        assert_eq!(failed.kind(), "delivery_failed");
        assert!(failed.to_string().contains(r#""error":"not_in_channel""#));
    }

    #[test]
    fn test_unreadable_attachment_names_service() {
        let failed: PipelineError = AdapterError::Attachment {
            service: "slack".to_string(),
            path: PathBuf::from("out/report.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        }
        .into();
        assert_eq!(failed.kind(), "delivery_failed");
        let message = failed.to_string();
        assert!(message.starts_with("Delivery to slack failed"), "{}", message);
        assert!(message.contains("out/report.csv"));
    }

    #[test]
    fn test_parse_errors_carry_path() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        let error = PipelineError::from_parser(Path::new("notify.yaml"), ParserError::YamlError(yaml_error));
        assert_eq!(error.kind(), "template_parse");
        assert!(error.to_string().contains("notify.yaml"));
    }
}
