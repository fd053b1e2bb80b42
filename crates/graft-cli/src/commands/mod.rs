//! Command implementations for graft-cli

pub mod json;
pub mod merge;

use std::path::Path;

use graft_tree::Tree;

use crate::error::{CliError, Result};

pub use json::{run_json, run_json_stdin};
pub use merge::run_merge;

/// Read and parse one YAML file.
pub(crate) fn load_yaml(path: &Path) -> Result<Tree> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_yaml(&path.display().to_string(), &text)
}

pub(crate) fn parse_yaml(name: &str, text: &str) -> Result<Tree> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|source| CliError::Parse {
            name: name.to_string(),
            source,
        })?;
    Ok(Tree::from(value))
}
