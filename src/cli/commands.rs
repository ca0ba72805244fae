// ABOUTME: Command implementations for the herald CLI
// ABOUTME: Handles send, validate, tokens, init and services commands

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::args::StarterKind;
use super::config::Config;
use crate::adapters::AdapterRegistry;
use crate::parser::{MessageTemplate, SchemaValidator, TemplateParser};
use crate::pipeline::{Pipeline, PipelineError, PipelineOutcome, RunOptions};
use crate::template::{is_env_name, process_env, Builtin};

/// Prefix an error with its stable kind so scripts can match on it
fn pipeline_error(error: PipelineError) -> anyhow::Error {
    anyhow::anyhow!("[{}] {}", error.kind(), error)
}

async fn load_template(path: &Path) -> Result<MessageTemplate> {
    let document = TemplateParser::new()
        .load(path)
        .await
        .map_err(|e| pipeline_error(PipelineError::from_parser(path, e)))?;
    MessageTemplate::from_value(document).map_err(|e| pipeline_error(e.into()))
}

/// Render a template and deliver it, or print the payload on a dry run
pub async fn send_template(
    template_path: PathBuf,
    variables: HashMap<String, String>,
    dry_run: bool,
    token: Option<String>,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    info!("Sending template: {}", template_path.display());

    let env = process_env();
    let registry = AdapterRegistry::with_defaults(config.slack_options());
    let credentials = config.credential_resolver(env.clone(), token);
    let pipeline = Pipeline::new(&registry, &credentials);
    let options = RunOptions {
        variables,
        env,
        dry_run,
    };

    let outcome = pipeline
        .run(&template_path, &options)
        .await
        .map_err(pipeline_error)?;

    let rendered = match &outcome {
        PipelineOutcome::DryRun { payload, .. } => serde_json::to_string_pretty(payload)?,
        PipelineOutcome::Sent { response, .. } => serde_json::to_string_pretty(response)?,
    };

    if let Some(output_path) = output {
        std::fs::write(&output_path, &rendered).map_err(|e| {
            anyhow::anyhow!(
                "Failed to write output file '{}': {}",
                output_path.display(),
                e
            )
        })?;
        info!("Payload written to: {}", output_path.display());
    }

    match outcome {
        PipelineOutcome::DryRun { .. } => {
            println!("{}", rendered);
        }
        PipelineOutcome::Sent { template, response } => {
            println!(
                "✓ Sent '{}' to {} {} (ts: {})",
                template,
                response.service,
                response.channel.as_deref().unwrap_or("-"),
                response.ts.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}

/// Check schema, undeclared tokens and required variables without rendering
pub async fn validate_template(
    template_path: PathBuf,
    variables: HashMap<String, String>,
    strict: bool,
) -> Result<()> {
    info!("Validating template: {}", template_path.display());

    let document = TemplateParser::new()
        .load(&template_path)
        .await
        .map_err(|e| pipeline_error(PipelineError::from_parser(&template_path, e)))?;

    let report = SchemaValidator::new()
        .with_strict_mode(strict)
        .validate(&document);
    for warning in &report.warnings {
        println!("⚠ {}", warning);
    }
    if !report.is_valid {
        for violation in &report.errors {
            println!("✗ {}", violation);
        }
        return Err(pipeline_error(PipelineError::SchemaInvalid {
            violations: report.errors,
        }));
    }

    let template = MessageTemplate::from_value(document).map_err(|e| pipeline_error(e.into()))?;

    for token in template.undeclared_tokens() {
        warn!("Token '{}' is not declared", token);
        println!("⚠ token '{}' is not declared and has no default", token);
    }

    let missing = template.missing_required(&variables);
    if !missing.is_empty() {
        return Err(pipeline_error(PipelineError::MissingVariable {
            template: template.name.clone(),
            names: missing,
        }));
    }

    println!("✓ Template '{}' is valid", template.name);
    println!("  Service: {}", template.service());
    println!("  Variables: {}", template.variables.len());
    println!("  Tokens: {}", template.tokens().len());

    Ok(())
}

/// Print every token with where its value would come from
pub async fn list_tokens(template_path: PathBuf) -> Result<()> {
    let template = load_template(&template_path).await?;

    for token in template.tokens() {
        let source = if Builtin::from_name(&token).is_some() {
            "built-in"
        } else if let Some(declaration) = template.variables.get(&token) {
            if declaration.is_required() {
                "required"
            } else {
                "declared"
            }
        } else if is_env_name(&token) {
            "environment"
        } else {
            "undeclared"
        };
        println!("{}\t{}", token, source);
    }

    Ok(())
}

/// Write a starter template
pub async fn init_template(name: String, output_dir: PathBuf, kind: StarterKind) -> Result<()> {
    info!(
        "Initializing template '{}' in {}",
        name,
        output_dir.display()
    );

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir)?;
    }

    let template_file = output_dir.join(format!("{}.yaml", name));
    if template_file.exists() {
        return Err(anyhow::anyhow!(
            "Template file already exists: {}",
            template_file.display()
        ));
    }

    let content = match kind {
        StarterKind::Basic => basic_starter(&name),
        StarterKind::Blocks => blocks_starter(&name),
    };
    std::fs::write(&template_file, content)?;

    println!("✓ Created {}", template_file.display());
    Ok(())
}

/// Print the registered services and what each needs
pub fn list_services(config: &Config) -> Result<()> {
    let registry = AdapterRegistry::with_defaults(config.slack_options());

    for service in registry.list() {
        let adapter = registry.get(service)?;
        let credentials = adapter.required_credentials().join(", ");
        println!(
            "{}\tshorthand: {}\tcredentials: {}",
            service,
            if adapter.supports_compile() { "yes" } else { "no" },
            if credentials.is_empty() { "-" } else { credentials.as_str() }
        );
    }

    Ok(())
}

fn basic_starter(name: &str) -> String {
    format!(
        r##"version: "1"
name: {}
description: Plain text notification

destination:
  service: slack
  channel: "{{{{channel}}}}"

variables:
  channel:
    description: Channel to post into
    default: "#general"
  subject:
    description: What the message is about

message:
  text: "{{{{subject}}}} at {{{{now}}}}"
"##,
        name
    )
}

fn blocks_starter(name: &str) -> String {
    format!(
        r##"version: "1"
name: {}
description: Block layout notification

destination:
  service: slack
  channel: "{{{{channel}}}}"

variables:
  channel:
    description: Channel to post into
    default: "#general"
  title:
    description: Header text
  status:
    default: succeeded
  link:
    description: Where the button points

message:
  text: "{{{{title}}}}: {{{{status}}}}"
  blocks:
    - header: "{{{{title}}}}"
    - section:
        fields:
          - "*Status*\n{{{{status}}}}"
          - "*When*\n{{{{now}}}}"
    - divider: true
    - actions:
        - button:
            text: Open
            url: "{{{{link}}}}"
            style: primary
    - context:
        - "Sent by herald"
"##,
        name
    )
}
