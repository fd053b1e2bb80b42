//! `graft json`

use std::io::{Read, Write};
use std::path::PathBuf;

use graft_tree::Tree;

use super::{load_yaml, parse_yaml};
use crate::error::Result;

/// Write each file as one line of JSON.
pub fn run_json(files: &[PathBuf], out: &mut impl Write) -> Result<()> {
    for path in files {
        emit(&load_yaml(path)?, out)?;
    }
    Ok(())
}

/// Convert a YAML document read from `input`.
pub fn run_json_stdin(input: &mut impl Read, out: &mut impl Write) -> Result<()> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    emit(&parse_yaml("<stdin>", &text)?, out)
}

fn emit(tree: &Tree, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer(&mut *out, tree)?;
    writeln!(out)?;
    Ok(())
}
