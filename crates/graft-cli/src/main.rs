//! graft CLI
//!
//! Merges YAML documents and evaluates the placeholders inside them.

mod cli;
mod commands;
mod error;
mod logging;

use std::io;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("warning: logging unavailable: {e}");
    }
    tracing::debug!(command = ?cli.command, "starting");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Merge {
            skip_eval,
            prune,
            files,
        } => commands::run_merge(&files, skip_eval, &prune, &mut out),
        Commands::Json { files } => {
            if files.is_empty() {
                commands::run_json_stdin(&mut io::stdin().lock(), &mut out)
            } else {
                commands::run_json(&files, &mut out)
            }
        }
    }
}
