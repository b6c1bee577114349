// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{ArgGroup, Parser, ValueEnum};

use crate::types::{ChecksumPolicy, RunMode};

/// Command-line arguments for `taskchain`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskchain",
    version,
    about = "Rebuild missing file targets along source -> target task chains.",
    long_about = None
)]
#[command(group(ArgGroup::new("mode").args(["validate", "visualize"])))]
#[command(group(ArgGroup::new("checksum").args(["overwrite_checksum", "ignore_checksum"])))]
pub struct CliArgs {
    /// Path to the declaration file (TOML).
    #[arg(short, long, value_name = "PATH")]
    pub config: String,

    /// Validate the declarations and stop.
    #[arg(long)]
    pub validate: bool,

    /// Validate, then write an HTML overview of the task paths to the run
    /// root and print them.
    #[arg(long)]
    pub visualize: bool,

    /// Accept changed declarations and record their new checksum.
    #[arg(long)]
    pub overwrite_checksum: bool,

    /// Run despite changed declarations, keeping the old checksum.
    #[arg(long)]
    pub ignore_checksum: bool,

    /// Placeholder value for `{{name}}` in the declarations (repeatable).
    #[arg(short = 'p', long = "placeholder", value_name = "NAME=VALUE")]
    pub placeholders: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKCHAIN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    pub fn mode(&self) -> RunMode {
        if self.validate {
            RunMode::Validate
        } else if self.visualize {
            RunMode::Visualize
        } else {
            RunMode::Execute
        }
    }

    pub fn checksum_policy(&self) -> ChecksumPolicy {
        if self.overwrite_checksum {
            ChecksumPolicy::Overwrite
        } else if self.ignore_checksum {
            ChecksumPolicy::Ignore
        } else {
            ChecksumPolicy::Enforce
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
