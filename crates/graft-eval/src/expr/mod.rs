//! Placeholder expressions
//!
//! A placeholder such as `(( concat "prefix-" $.meta.name ))` is parsed once
//! into an [`Expr`] and resolved against the live tree every time an
//! operator needs its arguments.

mod lexer;
mod parser;

use std::fmt;

use graft_tree::{Cursor, Tree};

pub use graft_tree::placeholder_body as parse_placeholder;
pub use lexer::{tokenize, Token, TokenKind};

/// Errors raised while parsing placeholder text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unclosed '{0}'")]
    Unclosed(char),

    #[error("expected operator name, found '{0}'")]
    ExpectedOperator(String),

    #[error("invalid reference '{text}': {reason}")]
    InvalidReference { text: String, reason: String },
}

/// Errors raised while resolving an expression against a tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Unable to resolve `{reference}`: {source}")]
    Unresolved {
        reference: Cursor,
        #[source]
        source: graft_tree::Error,
    },

    #[error("cannot concatenate `$.{reference}`: it is a {kind}")]
    NotConcatenable { reference: Cursor, kind: &'static str },

    #[error("cannot concatenate a {kind} literal")]
    NotConcatenableLiteral { kind: &'static str },

    /// A nested call reached a resolver that cannot run operators
    #[error("cannot evaluate nested (( {name} ... )) here")]
    UnevaluatedCall { name: String },

    /// A nested call ran and failed
    #[error("{message}")]
    Nested { name: String, message: String },
}

/// A parsed placeholder expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Tree),
    Reference(Cursor),
    Call { name: String, args: Vec<Expr> },
    /// Adjacent terms written without whitespace between them
    Concat(Vec<Expr>),
    List(Vec<Expr>),
}

/// An expression after resolution against a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Literal(Tree),
    Reference { cursor: Cursor, value: &'a Tree },
    /// Calls are handed back untouched so the consumer decides whether to run them
    Call { name: &'a str, args: &'a [Expr] },
}

impl<'a> Resolved<'a> {
    /// Owned value for literals and references, `None` for calls.
    pub fn into_value(self) -> Option<Tree> {
        match self {
            Resolved::Literal(value) => Some(value),
            Resolved::Reference { value, .. } => Some(value.clone()),
            Resolved::Call { .. } => None,
        }
    }
}

impl Expr {
    /// Parse the body of a placeholder (the text between `((` and `))`).
    ///
    /// A body starting with an operator name is a call; a body made of a
    /// single other term parses to that term.
    ///
    /// ```
    /// use graft_eval::Expr;
    ///
    /// let expr = Expr::parse(r#"vault "secret/db:password""#).unwrap();
    /// assert_eq!(expr.call_name(), Some("vault"));
    /// ```
    pub fn parse(body: &str) -> Result<Expr, SyntaxError> {
        parser::parse(body)
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. })
    }

    pub fn call_name(&self) -> Option<&str> {
        match self {
            Expr::Call { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Resolve without the ability to run nested calls.
    pub fn resolve<'a>(&'a self, tree: &'a Tree) -> Result<Resolved<'a>, ResolveError> {
        self.resolve_with(tree, &|name: &str, _: &[Expr]| {
            Err(ResolveError::UnevaluatedCall {
                name: name.to_string(),
            })
        })
    }

    /// Resolve, running calls nested inside concatenations and lists with `call`.
    ///
    /// A top-level call is still returned as [`Resolved::Call`].
    pub fn resolve_with<'a>(
        &'a self,
        tree: &'a Tree,
        call: &dyn Fn(&str, &[Expr]) -> Result<Tree, ResolveError>,
    ) -> Result<Resolved<'a>, ResolveError> {
        match self {
            Expr::Literal(value) => Ok(Resolved::Literal(value.clone())),
            Expr::Reference(cursor) => {
                let value = lookup(cursor, tree)?;
                Ok(Resolved::Reference {
                    cursor: cursor.clone(),
                    value,
                })
            }
            Expr::Call { name, args } => Ok(Resolved::Call { name, args }),
            Expr::Concat(parts) => {
                let mut joined = String::new();
                for part in parts {
                    joined.push_str(&part.concat_text(tree, call)?);
                }
                Ok(Resolved::Literal(Tree::String(joined)))
            }
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(item.value_with(tree, call)?);
                }
                Ok(Resolved::Literal(Tree::Sequence(values)))
            }
        }
    }

    fn value_with(
        &self,
        tree: &Tree,
        call: &dyn Fn(&str, &[Expr]) -> Result<Tree, ResolveError>,
    ) -> Result<Tree, ResolveError> {
        match self.resolve_with(tree, call)? {
            Resolved::Call { name, args } => call(name, args),
            resolved => Ok(resolved.into_value().unwrap_or_default()),
        }
    }

    fn concat_text(
        &self,
        tree: &Tree,
        call: &dyn Fn(&str, &[Expr]) -> Result<Tree, ResolveError>,
    ) -> Result<String, ResolveError> {
        match self.resolve_with(tree, call)? {
            Resolved::Reference { cursor, value } => {
                value
                    .scalar_text()
                    .ok_or_else(|| ResolveError::NotConcatenable {
                        reference: cursor,
                        kind: value.kind(),
                    })
            }
            Resolved::Literal(value) => scalar_or_literal_error(&value),
            Resolved::Call { name, args } => scalar_or_literal_error(&call(name, args)?),
        }
    }

    /// Every reference in the expression, including nested ones, in source order.
    pub fn references(&self) -> Vec<&Cursor> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Cursor>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Reference(cursor) => out.push(cursor),
            Expr::Call { args: parts, .. } | Expr::Concat(parts) | Expr::List(parts) => {
                for part in parts {
                    part.collect_references(out);
                }
            }
        }
    }

    /// Names of every call in the expression, the outermost first.
    pub fn call_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_call_names(&mut out);
        out
    }

    fn collect_call_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) | Expr::Reference(_) => {}
            Expr::Call { name, args } => {
                out.push(name);
                for arg in args {
                    arg.collect_call_names(out);
                }
            }
            Expr::Concat(parts) | Expr::List(parts) => {
                for part in parts {
                    part.collect_call_names(out);
                }
            }
        }
    }
}

fn lookup<'t>(cursor: &Cursor, tree: &'t Tree) -> Result<&'t Tree, ResolveError> {
    cursor
        .resolve(tree)
        .map_err(|source| ResolveError::Unresolved {
            reference: cursor.clone(),
            source,
        })
}

fn scalar_or_literal_error(value: &Tree) -> Result<String, ResolveError> {
    value
        .scalar_text()
        .ok_or(ResolveError::NotConcatenableLiteral { kind: value.kind() })
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Tree::String(s)) => {
                f.write_str("\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            Expr::Literal(value) => match value.scalar_text() {
                Some(text) => f.write_str(&text),
                None => f.write_str(value.kind()),
            },
            Expr::Reference(cursor) => write!(f, "$.{cursor}"),
            Expr::Call { name, args } => {
                write!(f, "({name}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                f.write_str(")")
            }
            Expr::Concat(parts) => {
                for part in parts {
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            Expr::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}
