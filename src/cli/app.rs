// ABOUTME: Main application orchestration for the herald CLI
// ABOUTME: Sets up logging from configuration and dispatches subcommands

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands;
use super::{Args, Commands, Config};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration; output goes to stderr
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level = if verbose {
            "debug"
        } else {
            &self.config.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        match self.config.logging.format.as_str() {
            "json" => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            "compact" => {
                tracing_subscriber::fmt()
                    .compact()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .init();
            }
            _ => {
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Run the application with parsed arguments
    pub async fn run(&self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color)?;

        info!("Starting herald v{}", env!("CARGO_PKG_VERSION"));
        debug!("Configuration: {:?}", self.config);

        match args.command {
            Commands::Send {
                template,
                vars,
                dry_run,
                token,
                output,
            } => {
                let variables = self.config.merged_variables(Args::parse_variables(&vars)?);
                commands::send_template(template, variables, dry_run, token, output, &self.config)
                    .await
            }

            Commands::Validate {
                template,
                vars,
                strict,
            } => {
                let variables = self.config.merged_variables(Args::parse_variables(&vars)?);
                commands::validate_template(template, variables, strict).await
            }

            Commands::Tokens { template } => commands::list_tokens(template).await,

            Commands::Init {
                name,
                output_dir,
                kind,
            } => commands::init_template(name, output_dir, kind).await,

            Commands::Services => commands::list_services(&self.config),
        }
    }

    /// Create application from command line arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Config::load(args.config.clone())?;
        Ok(Self::new(config))
    }
}
