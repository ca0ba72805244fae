// ABOUTME: Service adapters that validate and deliver native message payloads
// ABOUTME: Defines the adapter trait and the registry keyed by service name

pub mod error;
pub mod slack;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::Credentials;

pub use error::{AdapterError, Result};
pub use slack::{SlackAdapter, SlackOptions};

/// What a service reported back after accepting a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    pub raw: Value,
}

#[async_trait]
pub trait MessageAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `compile` should run on interpolated messages
    fn supports_compile(&self) -> bool {
        false
    }

    fn compile(&self, message: &Value) -> Result<Value> {
        Ok(message.clone())
    }

    /// Credential keys `send` expects to find
    fn required_credentials(&self) -> &'static [&'static str] {
        &[]
    }

    fn validate(&self, message: &Value) -> Result<()>;

    /// Check addressing before anything is sent; dry runs go through this too
    fn validate_destination(&self, _destination: &Value) -> Result<()> {
        Ok(())
    }

    async fn send(
        &self,
        message: &Value,
        destination: &Value,
        credentials: &Credentials,
    ) -> Result<DeliveryResponse>;
}

pub struct AdapterRegistry {
    adapters: IndexMap<String, Box<dyn MessageAdapter>>,
}

impl AdapterRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            adapters: IndexMap::new(),
        }
    }

    /// Registry with every built-in adapter
    pub fn with_defaults(slack: SlackOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SlackAdapter::new(slack)));
        registry
    }

    pub fn register(&mut self, adapter: Box<dyn MessageAdapter>) {
        let name = adapter.name().to_string();
        self.adapters.insert(name, adapter);
    }

    pub fn get(&self, service: &str) -> Result<&dyn MessageAdapter> {
        self.adapters
            .get(service)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| AdapterError::UnknownService {
                service: service.to_string(),
                available: self.list().into_iter().map(str::to_string).collect(),
            })
    }

    pub fn list(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults(SlackOptions::default())
    }
}
