// ABOUTME: Helpers for building native payload objects
// ABOUTME: Text object wrapping and an ordered builder for typed native fragments

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::{CompileError, Result};

/// A text field written either as a bare string or as a native text object
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextSpec {
    Text(String),
    Native(Map<String, Value>),
}

impl TextSpec {
    pub fn plain(self) -> Value {
        self.wrap("plain_text")
    }

    pub fn markdown(self) -> Value {
        self.wrap("mrkdwn")
    }

    /// The literal string, when written as one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TextSpec::Text(text) => Some(text),
            TextSpec::Native(object) => object.get("text").and_then(Value::as_str),
        }
    }

    fn wrap(self, kind: &str) -> Value {
        match self {
            TextSpec::Text(text) => NativeBuilder::new(kind).field("text", text).build(),
            TextSpec::Native(object) => Value::Object(object),
        }
    }
}

/// Builds a native object starting with its `type` field
pub struct NativeBuilder(Map<String, Value>);

impl NativeBuilder {
    pub fn new(kind: &str) -> Self {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(kind.to_string()));
        Self(object)
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn optional<T: Into<Value>>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.0.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.0)
    }
}

/// Deserialize a shorthand payload, mapping failures to an invalid-shorthand error
pub fn parse_spec<T: DeserializeOwned>(construct: &str, path: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CompileError::invalid(construct, path, e.to_string()))
}

/// First keyword, in vocabulary order, that the object carries
pub fn find_keyword<'a>(object: &Map<String, Value>, keywords: &[&'a str]) -> Option<&'a str> {
    keywords
        .iter()
        .copied()
        .find(|keyword| object.contains_key(*keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_wrapping() {
        let plain = TextSpec::Text("Hi".to_string()).plain();
        assert_eq!(plain, json!({"type": "plain_text", "text": "Hi"}));

        let markdown = TextSpec::Text("*bold*".to_string()).markdown();
        assert_eq!(markdown, json!({"type": "mrkdwn", "text": "*bold*"}));
    }

    #[test]
    fn test_native_text_untouched() {
        let native: TextSpec =
            serde_json::from_value(json!({"type": "plain_text", "text": "Hi", "emoji": true}))
                .unwrap();
        assert_eq!(native.as_str(), Some("Hi"));
        assert_eq!(
            native.markdown(),
            json!({"type": "plain_text", "text": "Hi", "emoji": true})
        );
    }

    #[test]
    fn test_builder_orders_and_skips() {
        let built = NativeBuilder::new("divider")
            .optional::<String>("block_id", None)
            .optional("style", Some("primary"))
            .build();
        assert_eq!(built, json!({"type": "divider", "style": "primary"}));
        let keys: Vec<&String> = built.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["type", "style"]);
    }
}
