// ABOUTME: Resolution context and built-in token definitions
// ABOUTME: Bundles caller variables, environment and declared defaults for the token resolver

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::parser::VariableDeclaration;

static ENV_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").unwrap());

/// Token names the system resolves itself. Caller variables cannot shadow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Now,
    Timestamp,
    Uuid,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "now" => Some(Builtin::Now),
            "timestamp" => Some(Builtin::Timestamp),
            "uuid" => Some(Builtin::Uuid),
            _ => None,
        }
    }

    /// Produce a fresh value. Nothing is cached between calls.
    pub fn evaluate(self) -> String {
        match self {
            Builtin::Now => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            Builtin::Timestamp => Utc::now().timestamp_millis().to_string(),
            Builtin::Uuid => Uuid::new_v4().to_string(),
        }
    }
}

/// Whether a token name follows the environment variable convention
pub fn is_env_name(name: &str) -> bool {
    ENV_NAME_RE.is_match(name)
}

/// Snapshot of the process environment
pub fn process_env() -> HashMap<String, String> {
    env::vars().collect()
}

/// Everything a token can resolve against for one render
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub template_name: &'a str,
    pub variables: &'a HashMap<String, String>,
    pub env: &'a HashMap<String, String>,
    pub declared: &'a IndexMap<String, VariableDeclaration>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        template_name: &'a str,
        variables: &'a HashMap<String, String>,
        env: &'a HashMap<String, String>,
        declared: &'a IndexMap<String, VariableDeclaration>,
    ) -> Self {
        Self {
            template_name,
            variables,
            env,
            declared,
        }
    }

    /// Declared default for a variable, if any
    pub fn default_for(&self, name: &str) -> Option<&'a str> {
        self.declared
            .get(name)
            .and_then(|declaration| declaration.default.as_deref())
    }
}
