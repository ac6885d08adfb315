//! CLI module for eddit
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;
pub mod render;

pub use args::{InspectArgs, PlanArgs, ProcessArgs, SessionArgs};

/// eddit segment processor
///
/// Trims a source video into named segments, optionally prepends an intro to
/// each and re-encodes every segment with the chosen compression settings.
#[derive(Parser, Debug)]
#[command(name = "eddit")]
#[command(about = "eddit - Cut, intro and compress video segments in one pass")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file
    #[arg(long, global = true, env = "EDDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show source video information
    Inspect(args::InspectArgs),
    /// Print the job plan without processing anything
    Plan(args::PlanArgs),
    /// Process every segment
    Process(args::ProcessArgs),
}
