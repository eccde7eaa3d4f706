//! CLI module for fortisync
//!
//! Argument parsing and subcommand dispatch. Device commands (`show`, `diff`,
//! `commit`) talk to the appliance; `render` and `compare` work on local
//! files only.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use fortisync::config::LogFormat;
use std::path::PathBuf;

/// fortisync - diff and commit appliance configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "fortisync")]
#[command(author = "Fortisync Contributors")]
#[command(version)]
#[command(about = "Load, diff and transactionally commit appliance configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "FORTISYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device hostname or address
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// SSH port
    #[arg(short = 'p', long, global = true)]
    pub port: Option<u16>,

    /// Login user
    #[arg(short = 'u', long, global = true)]
    pub user: Option<String>,

    /// Login password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Private key file
    #[arg(short = 'k', long, global = true)]
    pub keyfile: Option<String>,

    /// Vdom to scope commands to ("global" for the global scope)
    #[arg(long, global = true)]
    pub vdom: Option<String>,

    /// Log output format (pretty or json)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the device configuration under a path
    Show(commands::show::ShowArgs),

    /// Print the commands that turn the device configuration into a file
    Diff(commands::diff::DiffArgs),

    /// Push a candidate file to the device
    Commit(commands::commit::CommitArgs),

    /// Parse a local file and print it normalized
    Render(commands::render::RenderArgs),

    /// Diff two local files
    Compare(commands::compare::CompareArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}
