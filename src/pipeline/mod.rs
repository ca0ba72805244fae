// ABOUTME: Pipeline orchestrating template loading through delivery
// ABOUTME: Runs each stage in order and stops at the first failure

pub mod error;

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::adapters::{AdapterRegistry, DeliveryResponse};
use crate::credentials::CredentialResolver;
use crate::parser::{MessageTemplate, TemplateParser};
use crate::template::{interpolate, process_env};

pub use error::{PipelineError, Result};

/// Inputs for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub variables: HashMap<String, String>,
    pub env: HashMap<String, String>,
    pub dry_run: bool,
}

impl RunOptions {
    /// Options reading the live process environment
    pub fn new(variables: HashMap<String, String>) -> Self {
        Self {
            variables,
            env: process_env(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    DryRun {
        template: String,
        service: String,
        destination: Value,
        payload: Value,
    },
    Sent {
        template: String,
        response: DeliveryResponse,
    },
}

impl PipelineOutcome {
    pub fn template(&self) -> &str {
        match self {
            PipelineOutcome::DryRun { template, .. } | PipelineOutcome::Sent { template, .. } => {
                template
            }
        }
    }
}

pub struct Pipeline<'a> {
    parser: TemplateParser,
    registry: &'a AdapterRegistry,
    credentials: &'a CredentialResolver,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a AdapterRegistry, credentials: &'a CredentialResolver) -> Self {
        Self {
            parser: TemplateParser::new(),
            registry,
            credentials,
        }
    }

    /// Load a template file and run it through every stage
    pub async fn run<P: AsRef<Path>>(&self, path: P, options: &RunOptions) -> Result<PipelineOutcome> {
        let path = path.as_ref();
        info!("Loading template {}", path.display());
        let document = self
            .parser
            .load(path)
            .await
            .map_err(|e| PipelineError::from_parser(path, e))?;
        self.run_document(document, options).await
    }

    /// Run an already parsed template document
    pub async fn run_document(&self, document: Value, options: &RunOptions) -> Result<PipelineOutcome> {
        let template = MessageTemplate::from_value(document)?;
        info!("Template '{}' passed schema validation", template.name);

        let missing = template.missing_required(&options.variables);
        if !missing.is_empty() {
            return Err(PipelineError::MissingVariable {
                template: template.name.clone(),
                names: missing,
            });
        }

        let service = template.service().to_string();
        let credentials = self.credentials.resolve(&service).map_err(|e| {
            match PipelineError::from(e) {
                PipelineError::UnknownService { service, .. } => PipelineError::UnknownService {
                    service,
                    available: self.available(),
                },
                other => other,
            }
        })?;
        debug!("Credentials resolved for {}: {:?}", service, credentials);

        let resolved = interpolate(&template, &options.variables, &options.env)?;
        info!("Interpolated template '{}'", resolved.name());

        let adapter = self.registry.get(&service)?;
        let name = resolved.name().to_string();
        let (destination, message) = resolved.into_parts();

        let payload = if adapter.supports_compile() {
            let compiled = adapter.compile(&message)?;
            debug!("Compiled message for {}", service);
            compiled
        } else {
            message
        };

        adapter.validate(&payload)?;
        adapter.validate_destination(&destination)?;
        info!("Payload accepted by {} validation", service);

        if options.dry_run {
            info!("Dry run: skipping delivery of '{}'", name);
            return Ok(PipelineOutcome::DryRun {
                template: name,
                service,
                destination,
                payload,
            });
        }

        let response = adapter.send(&payload, &destination, &credentials).await?;
        info!(
            "Delivered '{}' via {} (ts: {})",
            name,
            service,
            response.ts.as_deref().unwrap_or("-")
        );

        Ok(PipelineOutcome::Sent {
            template: name,
            response,
        })
    }

    fn available(&self) -> Vec<String> {
        self.registry.list().into_iter().map(str::to_string).collect()
    }
}
