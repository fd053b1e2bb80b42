//! Error types for graft-eval

use graft_tree::{Cursor, MultiError};

use crate::operator::{OperatorError, Phase};

/// Result type for graft-eval operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an evaluation run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Placeholders that cannot run at all: syntax errors, unknown operators,
    /// calls targeting the document root
    #[error(transparent)]
    Discovery(MultiError),

    /// The call sites of a phase depend on each other in a loop
    #[error("cycle detected in {phase} phase: {}", render_cycle(.cycle))]
    Cycle { phase: Phase, cycle: Vec<Cursor> },

    #[error("failed to set up the '{operator}' operator: {source}")]
    Setup {
        operator: String,
        #[source]
        source: OperatorError,
    },

    /// One or more call sites failed
    #[error(transparent)]
    Evaluation(MultiError),

    #[error(transparent)]
    Tree(#[from] graft_tree::Error),
}

fn render_cycle(cycle: &[Cursor]) -> String {
    cycle
        .iter()
        .map(|cursor| format!("$.{cursor}"))
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl Error {
    /// The path-tagged failures behind this error, if it carries any.
    pub fn failures(&self) -> Option<&MultiError> {
        match self {
            Error::Discovery(errors) | Error::Evaluation(errors) => Some(errors),
            _ => None,
        }
    }
}
