// ABOUTME: Parser module for YAML and JSON message templates
// ABOUTME: Exports template loading, schema validation and data structures

pub mod error;
pub mod template;
pub mod validation;

pub use error::{ParserError, SchemaViolation};
pub use template::{DocumentFormat, MessageTemplate, TemplateParser, VariableDeclaration};
pub use validation::{SchemaValidator, ValidationReport, TEMPLATE_VERSION};
