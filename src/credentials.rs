// ABOUTME: Credential resolution for delivery services
// ABOUTME: Merges command line overrides, environment variables and configured secrets per service

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No credentials are known for service '{service}'")]
    UnknownService { service: String },

    #[error("Missing credential '{key}' for service '{service}'{}", hint(.env_var))]
    MissingCredentials {
        service: String,
        key: String,
        env_var: Option<String>,
    },
}

fn hint(env_var: &Option<String>) -> String {
    env_var
        .as_ref()
        .map(|var| format!(" (set {} or pass it on the command line)", var))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Resolved secrets for one service, keyed by credential name
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Where one credential of a service may come from
#[derive(Debug, Clone, Default)]
pub struct CredentialKey {
    pub name: String,
    pub env_var: Option<String>,
    pub configured: Option<String>,
}

impl CredentialKey {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn env(mut self, env_var: &str) -> Self {
        self.env_var = Some(env_var.to_string());
        self
    }

    pub fn configured(mut self, value: Option<String>) -> Self {
        self.configured = value;
        self
    }
}

/// Resolves credentials with precedence: command line, then environment, then configuration
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    services: IndexMap<String, Vec<CredentialKey>>,
    overrides: HashMap<(String, String), String>,
    env: HashMap<String, String>,
}

impl CredentialResolver {
    pub fn new(env: HashMap<String, String>) -> Self {
        Self {
            env,
            ..Default::default()
        }
    }

    /// Declare a service, optionally with no credentials at all
    pub fn register_service(mut self, service: &str) -> Self {
        self.services.entry(service.to_string()).or_default();
        self
    }

    pub fn register(mut self, service: &str, key: CredentialKey) -> Self {
        self.services
            .entry(service.to_string())
            .or_default()
            .push(key);
        self
    }

    /// Value supplied on the command line; wins over every other source
    pub fn with_override(mut self, service: &str, key: &str, value: impl Into<String>) -> Self {
        self.overrides
            .insert((service.to_string(), key.to_string()), value.into());
        self
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn resolve(&self, service: &str) -> Result<Credentials> {
        let keys = self
            .services
            .get(service)
            .ok_or_else(|| CredentialError::UnknownService {
                service: service.to_string(),
            })?;

        let mut values = BTreeMap::new();
        for key in keys {
            let value = self.lookup(service, key).ok_or_else(|| {
                CredentialError::MissingCredentials {
                    service: service.to_string(),
                    key: key.name.clone(),
                    env_var: key.env_var.clone(),
                }
            })?;
            values.insert(key.name.clone(), value);
        }

        debug!("Resolved {} credential(s) for {}", values.len(), service);
        Ok(Credentials::from_map(values))
    }

    fn lookup(&self, service: &str, key: &CredentialKey) -> Option<String> {
        let from_cli = self
            .overrides
            .get(&(service.to_string(), key.name.clone()))
            .cloned();
        let from_env = || {
            key.env_var
                .as_ref()
                .and_then(|var| self.env.get(var))
                .cloned()
        };

        from_cli
            .or_else(from_env)
            .or_else(|| key.configured.clone())
            .filter(|value| !value.trim().is_empty())
    }
}
