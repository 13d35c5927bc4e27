//! Expression Lexer
//!
//! Turns raw expression text into a flat token stream. Every token carries
//! the byte offset it started at so parse errors can point back into the
//! user's text.

use super::parser::ParseError;

/// A single lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    /// Byte offset of the token's first character in the source text.
    pub pos: usize,
}

/// The kinds of token the expression language knows about.
#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// A floating-point literal.
    Number(f64),
    /// An identifier: a bare name (`x`) or a single-level qualified
    /// name (`node.x`). Whether it is a reference or a function call is
    /// decided by the parser.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl Tok {
    /// Human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Tok::Number(n) => format!("number `{n}`"),
            Tok::Ident(name) => format!("name `{name}`"),
            Tok::Plus => "`+`".to_string(),
            Tok::Minus => "`-`".to_string(),
            Tok::Star => "`*`".to_string(),
            Tok::Slash => "`/`".to_string(),
            Tok::Percent => "`%`".to_string(),
            Tok::Caret => "`^`".to_string(),
            Tok::LParen => "`(`".to_string(),
            Tok::RParen => "`)`".to_string(),
            Tok::Comma => "`,`".to_string(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lex the given text into tokens.
///
/// Whitespace separates tokens and is otherwise ignored. Any character
/// that cannot start a token is an error.
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let pos = i;
        let tok = match c {
            '+' => {
                i += 1;
                Tok::Plus
            }
            '-' => {
                i += 1;
                Tok::Minus
            }
            '*' => {
                i += 1;
                Tok::Star
            }
            '/' => {
                i += 1;
                Tok::Slash
            }
            '%' => {
                i += 1;
                Tok::Percent
            }
            '^' => {
                i += 1;
                Tok::Caret
            }
            '(' => {
                i += 1;
                Tok::LParen
            }
            ')' => {
                i += 1;
                Tok::RParen
            }
            ',' => {
                i += 1;
                Tok::Comma
            }
            c if c.is_ascii_digit() || c == '.' => {
                let (tok, next) = lex_number(text, i)?;
                i = next;
                tok
            }
            c if is_ident_start(c) => {
                let (tok, next) = lex_ident(text, i)?;
                i = next;
                tok
            }
            other => {
                return Err(ParseError::UnexpectedChar { ch: other, pos });
            }
        };

        tokens.push(Token { tok, pos });
    }

    Ok(tokens)
}

/// Lex a numeric literal starting at `start`: digits, optional fraction,
/// optional exponent.
fn lex_number(text: &str, start: usize) -> Result<(Tok, usize), ParseError> {
    let bytes = text.as_bytes();
    let mut i = start;

    while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && (bytes[j] as char).is_ascii_digit() {
            i = j;
            while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                i += 1;
            }
        }
    }

    let literal = &text[start..i];
    let value: f64 = literal
        .parse()
        .map_err(|_| ParseError::InvalidNumber { pos: start })?;
    Ok((Tok::Number(value), i))
}

/// Lex an identifier starting at `start`, allowing a single `.` for
/// qualified references (`node.datum`). The qualifier and the member must
/// both be well-formed names.
fn lex_ident(text: &str, start: usize) -> Result<(Tok, usize), ParseError> {
    let bytes = text.as_bytes();
    let mut i = start;

    while i < bytes.len() && is_ident_continue(bytes[i] as char) {
        i += 1;
    }

    if i < bytes.len() && bytes[i] == b'.' {
        let member = i + 1;
        if member >= bytes.len() || !is_ident_start(bytes[member] as char) {
            return Err(ParseError::UnexpectedChar { ch: '.', pos: i });
        }
        i = member;
        while i < bytes.len() && is_ident_continue(bytes[i] as char) {
            i += 1;
        }
    }

    Ok((Tok::Ident(text[start..i].to_string()), i))
}
