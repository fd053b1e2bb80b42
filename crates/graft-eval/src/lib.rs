//! Placeholder evaluation for graft documents
//!
//! Parses `(( operator args... ))` placeholders found in a [`Tree`], works out
//! which call sites depend on which, and resolves them in two phases using
//! the operators of an [`OperatorRegistry`].
//!
//! [`Tree`]: graft_tree::Tree

pub mod error;
pub mod evaluator;
pub mod expr;
pub mod graph;
pub mod operator;
pub mod ops;
pub mod registry;
pub mod vault;

pub use error::{Error, Result};
pub use evaluator::{Evaluator, EvaluatorOptions};
pub use expr::{parse_placeholder, Expr, ResolveError, Resolved, SyntaxError};
pub use graph::DependencyGraph;
pub use operator::{
    path_dependencies, subtree_dependencies, OpContext, Operator, OperatorError, Phase, Response,
};
pub use registry::{builtin_registrations, OperatorRegistry, BUILTIN_COUNT};
pub use vault::{
    Environment, HttpTransport, ProcessEnvironment, SecretTransport, StaticEnvironment,
    TransportError, TransportResponse, VaultError, VaultSettings,
};

use graft_tree::Tree;

/// Evaluate every placeholder in `tree` with default options.
pub fn evaluate(tree: Tree, registry: &OperatorRegistry) -> Result<Tree> {
    let mut evaluator = Evaluator::new(tree, registry);
    evaluator.run()?;
    Ok(evaluator.into_tree())
}
