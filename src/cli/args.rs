//! Command-line argument parsing for fixbuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fixbuddy - Find repair guides and forum threads for a device problem
#[derive(Parser, Debug)]
#[command(name = "fixbuddy")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Retrieve and fuse repair knowledge for a troubleshooting question", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Guides JSON file (overrides the configuration)
    #[arg(long, global = true)]
    pub guides: Option<PathBuf>,

    /// Forum posts JSON file (overrides the configuration)
    #[arg(long, global = true)]
    pub posts: Option<PathBuf>,

    /// Offline mode: hashing embedder, no query expansion, no guide enrichment
    #[arg(long, global = true)]
    pub offline: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only print results)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the assembled context for a question
    Context {
        /// Problem description
        question: String,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recommend repair guides for a question
    Recommend {
        /// Problem description
        question: String,

        /// Number of guides (defaults to the configured value)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Minimum similarity
        #[arg(short, long)]
        threshold: Option<f32>,
    },

    /// Show corpus and index sizes
    Stats,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Reject arguments clap cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Commands::Context { question, .. } | Commands::Recommend { question, .. }
                if question.trim().is_empty() =>
            {
                Err("Question must not be empty.".to_string())
            }
            Commands::Recommend { top_n: Some(0), .. } => Err("--top-n must be at least 1.".to_string()),
            Commands::Recommend {
                threshold: Some(t), ..
            } if !(-1.0..=1.0).contains(t) => Err("--threshold must be within [-1, 1].".to_string()),
            _ => Ok(()),
        }
    }

    /// Whether the index has to be built for this command
    pub fn needs_index(&self) -> bool {
        !matches!(self.command, Commands::Config)
    }
}

impl Verbosity {
    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show per-request statistics
    pub fn show_stats(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
