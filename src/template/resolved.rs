// ABOUTME: Fully interpolated template, safe to compile and send
// ABOUTME: Only the interpolation engine can construct one, so raw input never reaches an adapter

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTemplate {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    destination: Value,
    message: Value,
}

impl ResolvedTemplate {
    pub(super) fn new(
        name: String,
        description: Option<String>,
        destination: Value,
        message: Value,
    ) -> Self {
        Self {
            name,
            description,
            destination,
            message,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Target service named by the resolved destination
    pub fn service(&self) -> &str {
        self.destination
            .get("service")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn destination(&self) -> &Value {
        &self.destination
    }

    pub fn message(&self) -> &Value {
        &self.message
    }

    pub fn into_parts(self) -> (Value, Value) {
        (self.destination, self.message)
    }
}
