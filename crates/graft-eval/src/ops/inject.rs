use graft_tree::{merge_maps, Cursor, Tree};

use crate::expr::{Expr, Resolved};
use crate::operator::{subtree_dependencies, OpContext, Operator, OperatorError, Phase, Response};

/// `(( inject <ref>... ))`: splice referenced maps into the enclosing map.
///
/// Runs in the merge phase and waits only on call sites inside the injected
/// maps.
#[derive(Debug, Default)]
pub struct InjectOperator;

impl Operator for InjectOperator {
    fn phase(&self) -> Phase {
        Phase::Merge
    }

    fn dependencies(
        &self,
        ctx: &OpContext<'_>,
        args: &[Expr],
        locations: &[Cursor],
    ) -> Vec<Cursor> {
        subtree_dependencies(ctx, args, locations)
    }

    fn run(&self, ctx: &OpContext<'_>, args: &[Expr]) -> Result<Response, OperatorError> {
        if args.is_empty() {
            return Err(OperatorError::argument(
                "no arguments specified to (( inject ... ))",
            ));
        }

        let mut maps = Vec::with_capacity(args.len());
        for arg in args {
            match ctx.resolve(arg)? {
                Resolved::Reference {
                    value: Tree::Mapping(map),
                    ..
                } => maps.push(map),
                Resolved::Reference { cursor, .. } => {
                    return Err(OperatorError::argument(format!("$.{cursor} is not a map")));
                }
                _ => {
                    return Err(OperatorError::argument(
                        "inject operator only accepts key reference arguments",
                    ));
                }
            }
        }

        tracing::debug!(path = %ctx.here(), sources = maps.len(), "injecting maps");
        Ok(Response::Inject(merge_maps(maps)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OperatorRegistry;
    use graft_tree::Mapping;
    use pretty_assertions::assert_eq;

    fn run(yaml: &str, body: &str) -> Result<Response, OperatorError> {
        let tree = Tree::from(serde_yaml::from_str::<serde_yaml::Value>(yaml).unwrap());
        let registry = OperatorRegistry::new();
        let here = Cursor::parse("job.base").unwrap();
        let ctx = OpContext::new(&tree, &here, &registry);
        let Expr::Call { args, .. } = Expr::parse(body).unwrap() else {
            panic!("not a call");
        };
        InjectOperator.run(&ctx, &args)
    }

    #[test]
    fn test_later_maps_override() {
        let yaml = "a:\n  x: 1\n  y: 1\nb:\n  y: 2\n  z: 2\n";
        let response = run(yaml, "inject a b").unwrap();

        let mut expected = Mapping::new();
        expected.insert("x".into(), Tree::from(1));
        expected.insert("y".into(), Tree::from(2));
        expected.insert("z".into(), Tree::from(2));
        assert_eq!(response, Response::Inject(expected));
    }

    #[test]
    fn test_no_arguments() {
        let err = run("a: {}\n", "inject").unwrap_err();
        assert_eq!(err.to_string(), "no arguments specified to (( inject ... ))");
    }

    #[test]
    fn test_literal_argument() {
        let err = run("a: {}\n", r#"inject "a""#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "inject operator only accepts key reference arguments"
        );
    }

    #[test]
    fn test_sequence_reference() {
        let err = run("list: [1, 2]\n", "inject list").unwrap_err();
        assert_eq!(err.to_string(), "$.list is not a map");
    }

    #[test]
    fn test_merge_phase() {
        assert_eq!(InjectOperator.phase(), Phase::Merge);
    }
}
