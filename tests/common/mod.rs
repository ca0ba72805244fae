// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides a template builder, temp directories and a recording fake adapter

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::fs;

use herald::adapters::{AdapterError, DeliveryResponse, MessageAdapter};
use herald::credentials::Credentials;

pub struct TestTemplateBuilder {
    name: String,
    description: Option<String>,
    destination: Map<String, Value>,
    variables: Map<String, Value>,
    message: Value,
}

impl TestTemplateBuilder {
    pub fn new(name: &str) -> Self {
        let mut destination = Map::new();
        destination.insert("service".to_string(), json!("slack"));
        destination.insert("channel".to_string(), json!("#test"));

        Self {
            name: name.to_string(),
            description: None,
            destination,
            variables: Map::new(),
            message: json!({"text": format!("Test message from {}", name)}),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_service(self, service: &str) -> Self {
        self.with_destination("service", json!(service))
    }

    pub fn with_destination(mut self, key: &str, value: Value) -> Self {
        self.destination.insert(key.to_string(), value);
        self
    }

    /// Declare a variable the caller must supply
    pub fn with_required(mut self, name: &str) -> Self {
        self.variables
            .insert(name.to_string(), json!({"description": format!("{} value", name)}));
        self
    }

    pub fn with_default(mut self, name: &str, default: &str) -> Self {
        self.variables
            .insert(name.to_string(), json!({"default": default}));
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        self.with_message(json!({"text": text}))
    }

    pub fn with_message(mut self, message: Value) -> Self {
        self.message = message;
        self
    }

    pub fn build(&self) -> Value {
        let mut document = Map::new();
        document.insert("version".to_string(), json!("1"));
        document.insert("name".to_string(), json!(self.name));
        if let Some(description) = &self.description {
            document.insert("description".to_string(), json!(description));
        }
        document.insert(
            "destination".to_string(),
            Value::Object(self.destination.clone()),
        );
        if !self.variables.is_empty() {
            document.insert("variables".to_string(), Value::Object(self.variables.clone()));
        }
        document.insert("message".to_string(), self.message.clone());
        Value::Object(document)
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(&self.build()).expect("template serializes to YAML")
    }

    pub async fn write_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(&self.build())?,
            _ => self.to_yaml(),
        };
        fs::write(path, content).await?;
        Ok(())
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn template_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.yaml", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_output.json", name))
    }

    pub async fn create_template_file(&self, name: &str, builder: &TestTemplateBuilder) -> PathBuf {
        let template_file = self.template_file(name);
        builder
            .write_to_file(&template_file)
            .await
            .expect("Failed to write template file");
        template_file
    }

    pub async fn write_raw(&self, file_name: &str, content: &str) -> PathBuf {
        let path = self.path().join(file_name);
        fs::write(&path, content)
            .await
            .expect("Failed to write file");
        path
    }
}

/// A message sent through the fake adapter
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Value,
    pub destination: Value,
    pub credential_keys: Vec<String>,
}

/// Adapter that records sends instead of calling a service
#[derive(Clone, Default)]
pub struct RecordingAdapter {
    pub compiles: bool,
    pub fail_with: Option<String>,
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compiling() -> Self {
        Self {
            compiles: true,
            ..Self::default()
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            fail_with: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait]
impl MessageAdapter for RecordingAdapter {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn supports_compile(&self) -> bool {
        self.compiles
    }

    fn compile(&self, message: &Value) -> herald::adapters::Result<Value> {
        Ok(herald::compiler::compile(message)?)
    }

    fn validate(&self, message: &Value) -> herald::adapters::Result<()> {
        if message.get("text").is_none() && message.get("blocks").is_none() {
            return Err(AdapterError::ValidationInvalid {
                service: "recording".to_string(),
                errors: vec!["text or blocks required".to_string()],
            });
        }
        Ok(())
    }

    async fn send(
        &self,
        message: &Value,
        destination: &Value,
        credentials: &Credentials,
    ) -> herald::adapters::Result<DeliveryResponse> {
        if let Some(error) = &self.fail_with {
            let raw = json!({"ok": false, "error": error}).to_string();
            return Err(AdapterError::delivery(
                "recording",
                format!("returned error '{}'", error),
                Some(raw),
            ));
        }

        self.sent.lock().expect("sent lock").push(SentMessage {
            message: message.clone(),
            destination: destination.clone(),
            credential_keys: credentials.keys().map(str::to_string).collect(),
        });

        Ok(DeliveryResponse {
            service: "recording".to_string(),
            channel: destination
                .get("channel")
                .and_then(Value::as_str)
                .map(str::to_string),
            ts: Some("1700000000.000100".to_string()),
            raw: json!({"ok": true}),
        })
    }
}
