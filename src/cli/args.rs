// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for herald

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Render chat message templates and deliver them to messaging services")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a template and deliver it
    Send {
        #[arg(help = "Path to template YAML or JSON file")]
        template: PathBuf,

        #[arg(short = 'V', long = "var", help = "Template variables (key=value)")]
        vars: Vec<String>,

        #[arg(long, help = "Render and validate without sending")]
        dry_run: bool,

        #[arg(long, help = "Service token, overriding environment and config")]
        token: Option<String>,

        #[arg(short, long, help = "Write the rendered payload to a file")]
        output: Option<PathBuf>,
    },

    /// Check a template's schema, tokens and required variables
    Validate {
        #[arg(help = "Path to template YAML or JSON file")]
        template: PathBuf,

        #[arg(short = 'V', long = "var", help = "Template variables (key=value)")]
        vars: Vec<String>,

        #[arg(long, help = "Treat unknown top-level fields as errors")]
        strict: bool,
    },

    /// List every token a template uses
    Tokens {
        #[arg(help = "Path to template YAML or JSON file")]
        template: PathBuf,
    },

    /// Create a starter template
    Init {
        #[arg(help = "Name of the template to create")]
        name: String,

        #[arg(short, long, help = "Output directory", default_value = ".")]
        output_dir: PathBuf,

        #[arg(long, value_enum, help = "Starter layout", default_value = "basic")]
        kind: StarterKind,
    },

    /// List the services messages can be delivered to
    Services,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StarterKind {
    /// Plain text message
    Basic,
    /// Shorthand blocks with a header, fields and a button
    Blocks,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse variables from key=value format
    pub fn parse_variables(vars: &[String]) -> anyhow::Result<HashMap<String, String>> {
        let mut variables = HashMap::new();

        for var in vars {
            match var.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    variables.insert(key.trim().to_string(), value.to_string());
                }
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid variable format '{}'. Expected 'key=value'",
                        var
                    ))
                }
            }
        }

        Ok(variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variables() {
        let vars = vec![
            "env=production".to_string(),
            "query=a=b".to_string(),
            "empty=".to_string(),
        ];

        let parsed = Args::parse_variables(&vars).unwrap();

        assert_eq!(parsed.get("env"), Some(&"production".to_string()));
        assert_eq!(parsed.get("query"), Some(&"a=b".to_string()));
        assert_eq!(parsed.get("empty"), Some(&String::new()));
    }

    #[test]
    fn test_parse_variables_invalid() {
        assert!(Args::parse_variables(&["invalid_format".to_string()]).is_err());
        assert!(Args::parse_variables(&["=value".to_string()]).is_err());
    }

    #[test]
    fn test_send_arguments() {
        let args = Args::try_parse_from([
            "herald",
            "send",
            "deploy.yaml",
            "-V",
            "env=prod",
            "--var",
            "who=ops",
            "--dry-run",
            "--token",
            "xoxb-1",
        ])
        .unwrap();

        match args.command {
            Commands::Send {
                template,
                vars,
                dry_run,
                token,
                output,
            } => {
                assert_eq!(template, PathBuf::from("deploy.yaml"));
                assert_eq!(vars, vec!["env=prod", "who=ops"]);
                assert!(dry_run);
                assert_eq!(token.as_deref(), Some("xoxb-1"));
                assert!(output.is_none());
            }
            _ => panic!("expected send command"),
        }
    }

    #[test]
    fn test_validate_strict_flag() {
        let args = Args::try_parse_from(["herald", "validate", "deploy.yaml", "--strict"]).unwrap();
        assert!(matches!(args.command, Commands::Validate { strict: true, .. }));

        let args = Args::try_parse_from(["herald", "validate", "deploy.yaml"]).unwrap();
        assert!(matches!(args.command, Commands::Validate { strict: false, .. }));
    }

    #[test]
    fn test_init_kind() {
        let args = Args::try_parse_from(["herald", "init", "release", "--kind", "blocks"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Init {
                kind: StarterKind::Blocks,
                ..
            }
        ));
    }
}
