// ABOUTME: Core template data structures and loading from YAML or JSON
// ABOUTME: Defines MessageTemplate, variable declarations and the file-backed parser

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use super::error::{ParserError, Result};
use super::validation::{SchemaValidator, TEMPLATE_VERSION};
use crate::template::{collect_tokens, is_env_name, Builtin};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub destination: Value,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, VariableDeclaration>,
    pub message: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl VariableDeclaration {
    /// A default always satisfies a variable, even one marked required
    pub fn is_required(&self) -> bool {
        self.required != Some(false) && self.default.is_none()
    }
}

impl MessageTemplate {
    /// Validate a raw document and convert it into a typed template
    pub fn from_value(mut document: Value) -> Result<Self> {
        for warning in SchemaValidator::new().validate(&document).into_result()? {
            warn!("{}", warning);
        }

        if let Some(root) = document.as_object_mut() {
            if root.get("version").is_some_and(Value::is_number) {
                root.insert(
                    "version".to_string(),
                    Value::String(TEMPLATE_VERSION.to_string()),
                );
            }
            // An empty `variables:` key in YAML parses as null
            if root.get("variables").is_some_and(Value::is_null) {
                root.remove("variables");
            }
        }

        Ok(serde_json::from_value(document)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::from_value(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(content)?)
    }

    pub fn service(&self) -> &str {
        self.destination
            .get("service")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Names of declared variables the caller must supply
    pub fn required_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(_, declaration)| declaration.is_required())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Required declared variables absent from the supplied set
    pub fn missing_required(&self, variables: &HashMap<String, String>) -> Vec<String> {
        self.required_variables()
            .into_iter()
            .filter(|name| !variables.contains_key(*name))
            .map(str::to_string)
            .collect()
    }

    /// Every token used in the destination and message, in first-seen order
    pub fn tokens(&self) -> IndexSet<String> {
        let mut tokens = collect_tokens(&self.destination);
        tokens.extend(collect_tokens(&self.message));
        tokens
    }

    /// Tokens that are neither declared, built-in, nor environment-style names
    pub fn undeclared_tokens(&self) -> Vec<String> {
        self.tokens()
            .into_iter()
            .filter(|name| {
                !self.variables.contains_key(name)
                    && Builtin::from_name(name).is_none()
                    && !is_env_name(name)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` files parse as JSON, everything else as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateParser;

impl TemplateParser {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a template file into a raw document
    pub async fn load<P: AsRef<Path>>(&self, path: P) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ParserError::NotFound {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Read {} bytes from {}", content.len(), path.display());
        self.parse_str(&content, DocumentFormat::from_path(path))
    }

    pub fn parse_str(&self, content: &str, format: DocumentFormat) -> Result<Value> {
        match format {
            DocumentFormat::Json => Ok(serde_json::from_str(content)?),
            DocumentFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        }
    }

    /// Load, validate and type a template file
    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<MessageTemplate> {
        let document = self.load(path).await?;
        MessageTemplate::from_value(document)
    }
}

impl Default for TemplateParser {
    fn default() -> Self {
        Self::new()
    }
}
