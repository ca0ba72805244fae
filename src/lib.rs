// ABOUTME: Main library module for the herald message template pipeline
// ABOUTME: Exports all core modules and provides the public API

pub mod adapters;
pub mod cli;
pub mod compiler;
pub mod credentials;
pub mod parser;
pub mod pipeline;
pub mod template;

// Re-export commonly used types
pub use adapters::{AdapterRegistry, DeliveryResponse, MessageAdapter};
pub use cli::{App, Args, Config};
pub use credentials::{CredentialResolver, Credentials};
pub use parser::{MessageTemplate, SchemaValidator, TemplateParser};
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome, RunOptions};
pub use template::{interpolate, ResolvedTemplate};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
