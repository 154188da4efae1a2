//! Command-line interface for skyguard.
//!
//! This module provides the CLI structure for the `skyguard` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, ConfigCommand, ListCommand, OutputFormat, RemoveCommand, SeverityArg, StageArg,
    StatsCommand, StatusArg, StatusCommand, SuggestCommand,
};

/// skyguard - Safety risk register for instrument flight procedure design
///
/// Records hazards identified during procedure design, classifies them on the
/// 5x5 likelihood/severity matrix and tracks their mitigation.
#[derive(Debug, Parser)]
#[command(name = "skyguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors (command output is still printed)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a new hazard
    Add(AddCommand),

    /// List recorded hazards, newest first
    List(ListCommand),

    /// Change the lifecycle status of a hazard
    Status(StatusCommand),

    /// Delete a hazard from the register
    Remove(RemoveCommand),

    /// Show dashboard statistics
    Stats(StatsCommand),

    /// Show the 5x5 risk matrix
    Matrix,

    /// Ask for a suggested mitigation without recording anything
    Suggest(SuggestCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
