use graft_tree::Tree;

use crate::expr::{Expr, Resolved};
use crate::operator::{OpContext, Operator, OperatorError, Response};

/// `(( concat <arg> <arg>... ))`: join scalar values into one string.
#[derive(Debug, Default)]
pub struct ConcatOperator;

impl Operator for ConcatOperator {
    fn run(&self, ctx: &OpContext<'_>, args: &[Expr]) -> Result<Response, OperatorError> {
        if args.len() < 2 {
            return Err(OperatorError::argument(
                "concat operator requires at least two arguments",
            ));
        }

        let mut joined = String::new();
        for arg in args {
            let text = match ctx.resolve(arg)? {
                Resolved::Reference { cursor, value } => value.scalar_text().ok_or_else(|| {
                    OperatorError::argument(format!(
                        "tried to concat $.{cursor}, which is not a string scalar"
                    ))
                })?,
                Resolved::Literal(value) => literal_text(&value)?,
                Resolved::Call { name, args } => literal_text(&ctx.call(name, args)?)?,
            };
            joined.push_str(&text);
        }

        Ok(Response::Replace(Tree::String(joined)))
    }
}

fn literal_text(value: &Tree) -> Result<String, OperatorError> {
    value.scalar_text().ok_or_else(|| {
        OperatorError::argument(format!("concat operator cannot join a {}", value.kind()))
    })
}
