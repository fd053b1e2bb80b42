//! `graft merge`

use std::io::Write;
use std::path::PathBuf;

use graft_eval::OperatorRegistry;
use graft_tree::{Cursor, Tree};

use super::load_yaml;
use crate::error::Result;

/// Merge `files`, evaluate unless `skip_eval`, drop `prune` paths and write YAML.
pub fn run_merge(
    files: &[PathBuf],
    skip_eval: bool,
    prune: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let tree = load_yaml(path)?;
        // An empty file parses to null and would wipe everything merged so far.
        if tree == Tree::Null {
            tracing::debug!(path = %path.display(), "skipping empty document");
            continue;
        }
        sources.push(tree);
    }

    let merged = graft_tree::merge(&sources)?;
    let mut tree = if skip_eval {
        merged
    } else {
        let registry = OperatorRegistry::with_builtins();
        graft_eval::evaluate(merged, &registry)?
    };

    for path in prune {
        let cursor = Cursor::parse(path)?;
        if tree.remove(&cursor).is_none() {
            tracing::debug!(path = %cursor, "prune path not present");
        }
    }

    let yaml = serde_yaml::to_string(&tree)?;
    out.write_all(yaml.as_bytes())?;
    Ok(())
}
