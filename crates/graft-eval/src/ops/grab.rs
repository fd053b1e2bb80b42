use graft_tree::Tree;

use crate::expr::Expr;
use crate::operator::{OpContext, Operator, OperatorError, Response};

/// `(( grab <arg>... ))`: copy values from elsewhere in the document.
///
/// One argument yields its value; several yield a list. Waits on call sites
/// at, above or below each reference.
#[derive(Debug, Default)]
pub struct GrabOperator;

impl Operator for GrabOperator {
    fn run(&self, ctx: &OpContext<'_>, args: &[Expr]) -> Result<Response, OperatorError> {
        if args.is_empty() {
            return Err(OperatorError::argument(
                "grab operator requires at least one argument",
            ));
        }

        let mut values = args
            .iter()
            .map(|arg| ctx.value(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Tree::Sequence(values)
        };
        Ok(Response::Replace(value))
    }
}
