//! The operator contract
//!
//! Every placeholder call names an operator. The evaluator asks the operator
//! which phase it belongs to, which other call sites it waits on, and finally
//! runs it to obtain a [`Response`]. Operators never touch the tree
//! themselves; the evaluator applies responses.

use std::fmt;

use graft_tree::cursor::NAME_FIELD;
use graft_tree::{Cursor, Mapping, Segment, Tree};

use crate::expr::{Expr, ResolveError, Resolved};
use crate::registry::OperatorRegistry;
use crate::vault::VaultError;

/// When an operator runs. All merge-phase call sites settle before any
/// eval-phase call site runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Merge,
    Eval,
}

impl Phase {
    /// Phases in execution order.
    pub const ALL: [Phase; 2] = [Phase::Merge, Phase::Eval];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Merge => f.write_str("merge"),
            Phase::Eval => f.write_str("eval"),
        }
    }
}

/// What a successful operator run asks the evaluator to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Overwrite the call site with this value
    Replace(Tree),
    /// Merge these keys into the call site's parent and drop the call site key
    Inject(Mapping),
}

/// A failure scoped to one call site.
#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Wrong number, kind or shape of arguments
    #[error("{0}")]
    Argument(String),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Tree(#[from] graft_tree::Error),
}

impl OperatorError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }
}

/// What an operator sees while it works out dependencies or runs.
#[derive(Clone, Copy)]
pub struct OpContext<'a> {
    tree: &'a Tree,
    here: &'a Cursor,
    registry: &'a OperatorRegistry,
}

impl<'a> OpContext<'a> {
    pub fn new(tree: &'a Tree, here: &'a Cursor, registry: &'a OperatorRegistry) -> Self {
        Self {
            tree,
            here,
            registry,
        }
    }

    /// The tree as it stands when the operator runs.
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// Where the call site being evaluated lives.
    pub fn here(&self) -> &'a Cursor {
        self.here
    }

    pub fn registry(&self) -> &'a OperatorRegistry {
        self.registry
    }

    /// Resolve `expr`, evaluating calls nested inside lists and concatenations.
    pub fn resolve<'e>(&self, expr: &'e Expr) -> Result<Resolved<'e>, ResolveError>
    where
        'a: 'e,
    {
        expr.resolve_with(self.tree, &|name: &str, args: &[Expr]| {
            self.call(name, args).map_err(|err| ResolveError::Nested {
                name: name.to_string(),
                message: err.to_string(),
            })
        })
    }

    /// Owned value of `expr`, running a top-level call if there is one.
    pub fn value(&self, expr: &Expr) -> Result<Tree, OperatorError> {
        match self.resolve(expr)? {
            Resolved::Call { name, args } => self.call(name, args),
            resolved => Ok(resolved.into_value().unwrap_or_default()),
        }
    }

    /// Run a nested call and return the value it would have replaced itself with.
    pub fn call(&self, name: &str, args: &[Expr]) -> Result<Tree, OperatorError> {
        let operator = self
            .registry
            .get(name)
            .ok_or_else(|| OperatorError::argument(format!("unknown operator '{name}'")))?;

        tracing::trace!(operator = name, path = %self.here, "running nested call");
        match operator.run(self, args)? {
            Response::Replace(value) => Ok(value),
            Response::Inject(_) => Err(OperatorError::argument(format!(
                "(( {name} )) cannot be used inside another expression"
            ))),
        }
    }
}

/// An operator callable from placeholders.
pub trait Operator: Send + Sync {
    /// One-time preparation, called once per run before any call site of
    /// this operator executes.
    fn setup(&self) -> Result<(), OperatorError> {
        Ok(())
    }

    fn phase(&self) -> Phase {
        Phase::Eval
    }

    /// Which of `locations` (every call site of the current phase) this call
    /// must wait for.
    fn dependencies(
        &self,
        ctx: &OpContext<'_>,
        args: &[Expr],
        locations: &[Cursor],
    ) -> Vec<Cursor> {
        path_dependencies(ctx, args, locations)
    }

    fn run(&self, ctx: &OpContext<'_>, args: &[Expr]) -> Result<Response, OperatorError>;
}

/// Where a reference reads, in terms comparable with call-site cursors.
enum Target {
    /// Canonical as far as the tree resolves, the rest as written
    Path(Cursor),
    /// A named entry no element of the sequence at this cursor carries yet.
    /// Elements that are still placeholders may turn into it.
    PendingEntry(Cursor),
}

impl Target {
    fn new(tree: &Tree, cursor: &Cursor) -> Self {
        let (prefix, rest) = cursor.canonical_prefix(tree);
        match (rest.first(), prefix.resolve(tree)) {
            (Some(Segment::Key(_)), Ok(Tree::Sequence(_))) => Target::PendingEntry(prefix),
            _ => {
                let mut segments = prefix.segments().to_vec();
                segments.extend_from_slice(rest);
                Target::Path(Cursor::from_segments(segments))
            }
        }
    }

    /// `location` lies inside what this target reads.
    fn contains(&self, location: &Cursor) -> bool {
        match self {
            Target::Path(target) => location.is_under(target),
            Target::PendingEntry(sequence) => {
                location.is_under(sequence)
                    && match &location.segments()[sequence.len()..] {
                        [Segment::Index(_)] => true,
                        [Segment::Index(_), Segment::Key(key)] => key == NAME_FIELD,
                        _ => false,
                    }
            }
        }
    }

    /// `location` holds a placeholder this target would read through.
    fn passes_through(&self, location: &Cursor) -> bool {
        match self {
            Target::Path(target) => target.is_under(location),
            Target::PendingEntry(_) => false,
        }
    }
}

fn targets(ctx: &OpContext<'_>, args: &[Expr]) -> Vec<Target> {
    args.iter()
        .flat_map(Expr::references)
        .map(|cursor| Target::new(ctx.tree(), cursor))
        .collect()
}

/// Call sites at or below any referenced cursor.
pub fn subtree_dependencies(
    ctx: &OpContext<'_>,
    args: &[Expr],
    locations: &[Cursor],
) -> Vec<Cursor> {
    let targets = targets(ctx, args);
    locations
        .iter()
        .filter(|location| targets.iter().any(|target| target.contains(location)))
        .cloned()
        .collect()
}

/// Call sites at, below or above any referenced cursor.
///
/// Reading `a.b.c` while `a.b` still holds a placeholder would read through
/// unresolved text, so ancestors count too. A named lookup such as
/// `jobs.web.port` that no entry of `jobs` answers yet waits on the entries
/// of `jobs` that are still placeholders.
pub fn path_dependencies(ctx: &OpContext<'_>, args: &[Expr], locations: &[Cursor]) -> Vec<Cursor> {
    let targets = targets(ctx, args);
    locations
        .iter()
        .filter(|location| {
            targets
                .iter()
                .any(|target| target.contains(location) || target.passes_through(location))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cursor(text: &str) -> Cursor {
        Cursor::parse(text).unwrap()
    }

    fn tree(yaml: &str) -> Tree {
        Tree::from(serde_yaml::from_str::<serde_yaml::Value>(yaml).unwrap())
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::Merge < Phase::Eval);
        assert_eq!(Phase::ALL, [Phase::Merge, Phase::Eval]);
        assert_eq!(Phase::Eval.to_string(), "eval");
    }

    #[test]
    fn test_subtree_vs_path_dependencies() {
        let doc = tree("a:\n  b:\n    c: (( grab x ))\n  d: (( grab y ))\nz: (( grab a.b ))\n");
        let registry = OperatorRegistry::new();
        let here = cursor("z");
        let ctx = OpContext::new(&doc, &here, &registry);
        let locations = vec![cursor("a.b.c"), cursor("a.d"), cursor("z"), cursor("a")];
        let args = vec![Expr::Reference(cursor("a.b"))];

        assert_eq!(
            subtree_dependencies(&ctx, &args, &locations),
            vec![cursor("a.b.c")]
        );
        assert_eq!(
            path_dependencies(&ctx, &args, &locations),
            vec![cursor("a.b.c"), cursor("a")]
        );
    }

    #[test]
    fn test_dependencies_follow_named_entries() {
        let doc = tree("jobs:\n- name: api\n  port: (( grab base ))\nout: (( grab jobs.api.port ))\n");
        let registry = OperatorRegistry::new();
        let here = cursor("out");
        let ctx = OpContext::new(&doc, &here, &registry);
        let locations = vec![cursor("jobs.0.port"), cursor("out")];
        let args = vec![Expr::Reference(cursor("jobs.api.port"))];

        assert_eq!(
            path_dependencies(&ctx, &args, &locations),
            vec![cursor("jobs.0.port")]
        );
    }

    #[test]
    fn test_dependencies_wait_for_pending_named_entry() {
        let doc = tree(
            "web:\n  name: web\n  port: 80\njobs:\n- (( grab web ))\n- name: (( grab n ))\n- name: api\n  port: (( grab p ))\nport: (( grab jobs.web.port ))\n",
        );
        let registry = OperatorRegistry::new();
        let here = cursor("port");
        let ctx = OpContext::new(&doc, &here, &registry);
        let locations = vec![
            cursor("jobs.0"),
            cursor("jobs.1.name"),
            cursor("jobs.2.port"),
            cursor("port"),
        ];
        let args = vec![Expr::Reference(cursor("jobs.web.port"))];

        assert_eq!(
            path_dependencies(&ctx, &args, &locations),
            vec![cursor("jobs.0"), cursor("jobs.1.name")]
        );
        assert_eq!(
            subtree_dependencies(&ctx, &args, &locations),
            vec![cursor("jobs.0"), cursor("jobs.1.name")]
        );
    }

    #[test]
    fn test_nested_call_without_operator() {
        let doc = Tree::mapping();
        let registry = OperatorRegistry::new();
        let here = cursor("x");
        let ctx = OpContext::new(&doc, &here, &registry);
        let err = ctx.call("missing", &[]).unwrap_err();
        assert_eq!(err.to_string(), "unknown operator 'missing'");
    }
}
