//! Command-line interface for chanlog
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI overrides
//! - The `version`, `completion` and `config` subcommands
//!
//! The `export` subcommand is executed by the binary, which owns the
//! runtime and the Ctrl+C handling.

pub mod completion;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{Config, LogLevel};
use crate::error::{ConfigError, Result};
use crate::export::ExportOptions;
use crate::export::naming::is_valid_channel_id;

/// Export chat channel history to CSV
#[derive(Parser, Debug)]
#[command(
    name = "chanlog",
    version,
    about = "Export chat channel history to CSV",
    long_about = "Streams a channel's message history, oldest first, into a CSV file.
Bot and empty messages can be filtered, long exports are throttled, and
existing exports are never overwritten."
)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only, no progress display)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for chanlog
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a channel dump to CSV
    Export(ExportArgs),

    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// Arguments of the `export` subcommand
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// JSON Lines dump of the channel, oldest message first
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Channel identifier used in the output file name
    #[arg(long, value_name = "ID")]
    pub channel_id: String,

    /// Channel name written into every row (defaults to the id)
    #[arg(long, value_name = "NAME")]
    pub channel_name: Option<String>,

    /// Leave out messages written by bots
    #[arg(long)]
    pub exclude_bots: bool,

    /// Leave the attachments column empty
    #[arg(long)]
    pub exclude_attachments: bool,

    /// Stop after this many rows
    #[arg(short, long, value_name = "N")]
    pub limit: Option<u64>,

    /// Directory for the export file
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not draw a progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

impl ExportArgs {
    /// Export options selected by the flags
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            exclude_bots: self.exclude_bots,
            exclude_attachments: self.exclude_attachments,
            limit: self.limit,
        }
    }

    /// Reject arguments that cannot produce a destination file
    pub fn validate(&self) -> Result<()> {
        if !is_valid_channel_id(&self.channel_id) {
            return Err(ConfigError::InvalidValue {
                field: "channel_id".to_string(),
                value: self.channel_id.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Name written into the `channel_name` column
    pub fn channel_name(&self) -> &str {
        self.channel_name.as_deref().unwrap_or(&self.channel_id)
    }
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        if let Commands::Export(ref export) = args.command {
            export.validate()?;
        }
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and environment, then apply arguments
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        config.apply_env()?;

        if let Err(e) = config.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            config = Config::default();
        }

        Self::apply_args_to_config(&mut config, args);
        Ok(config)
    }

    /// Apply CLI arguments to configuration
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };

        if let Some(ref path) = args.log_file {
            config.logging.file_path = Some(path.clone());
        }

        if let Commands::Export(ref export) = args.command {
            if let Some(ref dir) = export.output_dir {
                config.export.output_dir = dir.clone();
            }
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Arguments of the export subcommand, if that is what was requested
    pub fn export_args(&self) -> Option<&ExportArgs> {
        match &self.args.command {
            Commands::Export(args) => Some(args),
            _ => None,
        }
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Commands::Version => {
                self.show_version();
                Ok(true)
            }
            Commands::Completion { shell } => {
                completion::generate_completion(shell, &mut std::io::stdout())?;
                Ok(true)
            }
            Commands::Config { show, validate } => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            Commands::Export(_) => Ok(false),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("chanlog version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    /// Path of the configuration file in use
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_path)
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist, defaults apply");
            return;
        }

        match Config::from_file(&path) {
            Ok(config) => match config.validate() {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => println!("Configuration validation failed: {}", e),
            },
            Err(e) => println!("Failed to load configuration: {}", e),
        }
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        println!("# Configuration file: {}", display_path(&self.get_config_path()));
        println!();
        print!("{}", self.config.to_toml()?);
        Ok(())
    }
}

fn display_path(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    }
}
