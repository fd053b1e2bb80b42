//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// graft - merge YAML documents and resolve (( ... )) placeholders
#[derive(Parser, Debug)]
#[command(name = "graft")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Merge YAML files left to right, then evaluate placeholders
    ///
    /// Examples:
    ///   graft merge base.yml prod.yml
    ///   graft merge --prune meta base.yml prod.yml
    ///   graft merge --skip-eval base.yml prod.yml
    Merge {
        /// Print the merged document without evaluating placeholders
        #[arg(long)]
        skip_eval: bool,

        /// Remove a path from the output (repeatable)
        #[arg(long, value_name = "PATH")]
        prune: Vec<String>,

        /// YAML files to merge, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Convert YAML files (or stdin) to single-line JSON
    Json {
        /// YAML files to convert; reads stdin when none are given
        files: Vec<PathBuf>,
    },
}
