//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the dambru voice companion.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "dambru")]
#[command(about = "Talk to an AI companion in real time")]
#[command(version)]
pub struct Cli {
    /// Additional dotenv file (real environment variables take precedence)
    #[arg(long = "env-file", global = true, env = "DAMBRU_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
