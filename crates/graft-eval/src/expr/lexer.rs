//! Tokenizer for placeholder bodies

use std::fmt;

use super::SyntaxError;

/// The kinds of token a placeholder body is made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    /// A double-quoted string, escapes already processed
    Str(String),
    /// Anything else: operator names, references, numbers, keywords
    Word(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::Word(w) => f.write_str(w),
        }
    }
}

/// A token plus whether it directly follows the previous token.
///
/// Glued tokens (no whitespace in between) concatenate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub glued: bool,
}

fn is_word_char(ch: char) -> bool {
    !ch.is_whitespace() && !matches!(ch, '(' | ')' | '[' | ']' | ',' | '"')
}

/// Split `input` into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut glued = false;

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            glued = false;
            continue;
        }

        let kind = match ch {
            '(' | ')' | '[' | ']' | ',' => {
                chars.next();
                match ch {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    _ => TokenKind::Comma,
                }
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some(ch) = chars.next() {
                    match ch {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(other) => text.push(other),
                            None => break,
                        },
                        other => text.push(other),
                    }
                }
                if !closed {
                    return Err(SyntaxError::UnterminatedString);
                }
                TokenKind::Str(text)
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    // `jobs[0].name`: an index bracket belongs to the word
                    if ch == '[' && !word.is_empty() {
                        for ch in chars.by_ref() {
                            word.push(ch);
                            if ch == ']' {
                                break;
                            }
                        }
                        continue;
                    }
                    if !is_word_char(ch) {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                TokenKind::Word(word)
            }
        };

        tokens.push(Token { kind, glued });
        glued = true;
    }

    Ok(tokens)
}
