//! Recursive-descent parser over [`Token`]s

use graft_tree::{Cursor, Tree};

use super::lexer::{tokenize, Token, TokenKind};
use super::{Expr, SyntaxError};

pub(super) fn parse(body: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err(SyntaxError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = match parser.peek_kind() {
        Some(TokenKind::Word(word)) if is_operator_name(word) => parser.call_body()?,
        _ => parser.argument()?,
    };

    match parser.next() {
        None => Ok(expr),
        Some(token) => Err(SyntaxError::UnexpectedToken(token.kind.to_string())),
    }
}

/// Operator names are identifiers that cannot be mistaken for literals.
fn is_operator_name(word: &str) -> bool {
    let mut chars = word.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    starts_ok
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        && !matches!(word, "true" | "false" | "null" | "nil")
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// `name arg*`, stopping at the end of input or a closing paren.
    fn call_body(&mut self) -> Result<Expr, SyntaxError> {
        let name = match self.next() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) if is_operator_name(&word) => word,
            Some(token) => return Err(SyntaxError::ExpectedOperator(token.kind.to_string())),
            None => return Err(SyntaxError::UnexpectedEnd),
        };

        let mut args = Vec::new();
        while let Some(kind) = self.peek_kind() {
            if *kind == TokenKind::RParen {
                break;
            }
            args.push(self.argument()?);
        }
        Ok(Expr::Call { name, args })
    }

    /// One argument: a primary plus any primaries glued onto it.
    fn argument(&mut self) -> Result<Expr, SyntaxError> {
        let mut parts = vec![self.primary()?];
        while let Some(token) = self.peek() {
            let starts_primary = matches!(
                token.kind,
                TokenKind::Str(_) | TokenKind::Word(_) | TokenKind::LParen | TokenKind::LBracket
            );
            if !token.glued || !starts_primary {
                break;
            }
            parts.push(self.primary()?);
        }

        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            Ok(Expr::Concat(parts))
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.next().ok_or(SyntaxError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Str(text) => Ok(Expr::Literal(Tree::String(text))),
            TokenKind::Word(word) => classify_word(&word),
            TokenKind::LParen => {
                let call = self.call_body()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(call),
                    _ => Err(SyntaxError::Unclosed('(')),
                }
            }
            TokenKind::LBracket => self.list(),
            other => Err(SyntaxError::UnexpectedToken(other.to_string())),
        }
    }

    /// Items after `[`, separated by commas and/or whitespace.
    fn list(&mut self) -> Result<Expr, SyntaxError> {
        let mut items = Vec::new();
        loop {
            match self.peek_kind() {
                None => return Err(SyntaxError::Unclosed('[')),
                Some(TokenKind::RBracket) => {
                    self.pos += 1;
                    return Ok(Expr::List(items));
                }
                Some(TokenKind::Comma) => self.pos += 1,
                Some(_) => items.push(self.argument()?),
            }
        }
    }
}

fn classify_word(word: &str) -> Result<Expr, SyntaxError> {
    let literal = match word {
        "true" => Some(Tree::Bool(true)),
        "false" => Some(Tree::Bool(false)),
        "null" | "nil" | "~" => Some(Tree::Null),
        _ => number(word).map(Tree::Number),
    };
    if let Some(value) = literal {
        return Ok(Expr::Literal(value));
    }

    Cursor::parse(word)
        .map(Expr::Reference)
        .map_err(|err| SyntaxError::InvalidReference {
            text: word.to_string(),
            reason: err.to_string(),
        })
}

fn number(word: &str) -> Option<serde_json::Number> {
    if let Ok(int) = word.parse::<i64>() {
        return Some(int.into());
    }
    // Rejects words like `inf` and `NaN` that f64 would accept.
    let numeric = word
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E'));
    if !numeric || !word.chars().any(|ch| ch.is_ascii_digit()) {
        return None;
    }
    word.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
}
