//! CLI module for Rotor
//!
//! Command-line interface definitions and handlers for the delivery
//! rotation engine.
//!
//! # Commands
//!
//! - `run` - Start the rotation engine
//! - `servers` - Inspect the configured proxy and relay pools
//! - `config` - Configuration utilities (init, validate)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start the engine with default config
//! rotor run
//!
//! # List relays as JSON
//! rotor servers list --kind relay --json
//!
//! # Generate shell completions
//! rotor completions bash > ~/.bash_completion.d/rotor
//! ```

pub mod completions;
pub mod config;
pub mod output;
pub mod run;
pub mod servers;

pub use completions::handle_completions;
pub use config::{handle_config_init, handle_config_validate};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Rotor - Adaptive delivery rotation engine
#[derive(Parser, Debug)]
#[command(
    name = "rotor",
    version,
    about = "Adaptive server rotation and retry engine for SMS delivery"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the rotation engine
    Run(RunArgs),
    /// Inspect server pools
    #[command(subcommand)]
    Servers(ServersCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "rotor.toml")]
    pub config: PathBuf,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "ROTOR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Override the rotation strategy
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Disable health checks
    #[arg(long)]
    pub no_health_check: bool,
}

#[derive(Subcommand, Debug)]
pub enum ServersCommands {
    /// List configured servers with their health state
    List(ServersListArgs),
}

#[derive(Args, Debug)]
pub struct ServersListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Filter by pool (proxy, relay)
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "rotor.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
    /// Validate a configuration file
    Validate(ConfigValidateArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "rotor.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "rotor.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
