// ABOUTME: Token resolution and interpolation for message templates
// ABOUTME: Exports the resolver, the tree interpolation engine and the resolved template type

pub mod context;
pub mod engine;
pub mod error;
pub mod resolved;
pub mod resolver;

pub use context::{is_env_name, process_env, Builtin, ResolveContext};
pub use engine::{collect_tokens, interpolate, resolve_tree};
pub use error::{Result, TemplateError};
pub use resolved::ResolvedTemplate;
pub use resolver::TokenResolver;
