// ABOUTME: Configuration management for the herald application
// ABOUTME: Loads YAML settings, applies environment overrides and builds service settings

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::slack::DEFAULT_API_BASE;
use crate::adapters::SlackOptions;
use crate::credentials::{CredentialKey, CredentialResolver};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Default template variables; command line values win
    #[serde(default)]
    pub variables: HashMap<String, String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    pub bot_token: Option<String>,
    pub api_base: Option<String>,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Config::default()
        };

        let env: HashMap<String, String> = std::env::vars().collect();
        config.merge_env(&env)?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> PathBuf {
        let local = ["herald.yaml", "herald.yml", ".herald.yaml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists());
        if let Some(path) = local {
            return path;
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".herald").join("config.yaml");
            if home_config.exists() {
                return home_config;
            }
        }

        // Default path (may not exist)
        PathBuf::from("herald.yaml")
    }

    /// Apply environment overrides
    pub fn merge_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        if let Some(token) = env.get("SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(token.clone());
        }
        if let Some(api_base) = env.get("SLACK_API_BASE") {
            self.slack.api_base = Some(api_base.clone());
        }

        if let Some(level) = env.get("HERALD_LOG_LEVEL") {
            self.logging.level = level.clone();
        }
        if let Some(format) = env.get("HERALD_LOG_FORMAT") {
            self.logging.format = format.clone();
        }

        if let Some(timeout) = env.get("HERALD_HTTP_TIMEOUT") {
            self.http.timeout_seconds = timeout.parse().map_err(|e| {
                anyhow::anyhow!("Invalid HERALD_HTTP_TIMEOUT '{}': {}", timeout, e)
            })?;
        }

        Ok(())
    }

    /// Configured defaults overlaid with command line variables
    pub fn merged_variables(&self, vars: HashMap<String, String>) -> HashMap<String, String> {
        let mut merged = self.variables.clone();
        merged.extend(vars);
        merged
    }

    pub fn slack_options(&self) -> SlackOptions {
        SlackOptions {
            api_base: self
                .slack
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            timeout: Duration::from_secs(self.http.timeout_seconds),
        }
    }

    /// Credential sources for every built-in service
    pub fn credential_resolver(
        &self,
        env: HashMap<String, String>,
        token: Option<String>,
    ) -> CredentialResolver {
        let resolver = CredentialResolver::new(env).register(
            "slack",
            CredentialKey::new("token")
                .env("SLACK_BOT_TOKEN")
                .configured(self.slack.bot_token.clone()),
        );

        match token {
            Some(token) => resolver.with_override("slack", "token", token),
            None => resolver,
        }
    }
}
