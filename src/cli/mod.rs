//! CLI module for Gemelo
//!
//! Provides command-line parsing and the maintenance commands of the
//! gemelo-server binary. Uses clap for argument parsing and owo-colors for
//! colored terminal output.

pub mod check_env;
pub mod init_data;
pub mod output;
pub mod show_metadata;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gemelo - Digital Twin Server
///
/// A chat API that answers as a person, grounded in that person's documents.
#[derive(Parser, Debug)]
#[command(
    name = "gemelo-server",
    version,
    about = "Gemelo - Digital Twin Server",
    long_about = "A chat API that answers questions as a specific person, grounded in\n\
                  that person's documents through retrieval-augmented generation.\n\n\
                  Run without arguments to start the server.",
    after_help = "EXAMPLES:\n    \
                  gemelo-server                       # Start the server\n    \
                  gemelo-server init-data             # Ingest the seed document if missing\n    \
                  gemelo-server show-metadata         # Summarize the stored documents\n    \
                  gemelo-server check-env             # Validate environment variables\n    \
                  gemelo-server --config my.toml      # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        default_value = "gemelo.toml",
        env = "GEMELO_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Ingest the seed document when the collection does not hold it yet
    InitData {
        /// File name inside the uploads directory (defaults to the configured seed)
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Print the stored documents grouped by file name
    ShowMetadata,

    /// Check the environment variables the server needs
    CheckEnv,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Output helper honoring `--no-color`
    pub fn output(&self) -> output::Output {
        if self.no_color {
            output::Output::no_color()
        } else {
            output::Output::new()
        }
    }
}
