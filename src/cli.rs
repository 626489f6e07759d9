//! Command-line interface parsing for raidsheet
//!
//! This module handles parsing of CLI arguments using clap and resolving
//! them into the options a run needs, including the default config path.

use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use thiserror::Error;

/// File looked up in the platform config directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// No config path was given and the platform has no config directory
    #[error("No configuration file given and no config directory could be determined; pass a CONFIG path")]
    NoConfigDir,
}

/// raidsheet - Turn a raid assignment spreadsheet into a plain-text listing
#[derive(Parser, Debug)]
#[command(name = "raidsheet")]
#[command(about = "Generate raid assignment listings from a Google Sheets spreadsheet")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    ///
    /// Defaults to config.toml in the platform config directory
    /// (e.g. ~/.config/raidsheet/config.toml on Linux).
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the report here instead of <RAID>_assignments.txt
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Always download the sheet, bypassing the local cache
    #[arg(long)]
    pub no_cache: bool,

    /// Print the report to stdout instead of writing a file
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,
}

/// Options for a single run, resolved from CLI arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Configuration file to load
    pub config_path: PathBuf,
    /// Output path overriding the configured one
    pub output: Option<PathBuf>,
    /// Whether to read and write the export cache
    pub use_cache: bool,
    /// Whether to print the report instead of saving it
    pub to_stdout: bool,
}

/// The platform-specific default configuration path.
///
/// # Returns
/// * `Ok(PathBuf)` pointing at `config.toml` in the raidsheet config directory
/// * `Err(CliError::NoConfigDir)` if no home directory can be determined
pub fn default_config_path() -> Result<PathBuf, CliError> {
    ProjectDirs::from("", "", "raidsheet")
        .map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
        .ok_or(CliError::NoConfigDir)
}

impl RunOptions {
    /// Creates RunOptions from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(RunOptions)` with the config path resolved
    /// * `Err(CliError)` if no config path was given and none can be derived
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };

        Ok(RunOptions {
            config_path,
            output: cli.output.clone(),
            use_cache: !cli.no_cache,
            to_stdout: cli.stdout,
        })
    }
}
