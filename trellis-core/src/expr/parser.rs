//! Expression Parser
//!
//! Recursive-descent parser over the token stream. Precedence, lowest to
//! highest:
//!
//! 1. `+` `-`
//! 2. `*` `/` `%`
//! 3. unary `-`
//! 4. `^` (right-associative, binds tighter than unary minus on its left
//!    operand, so `-2^2 == -4`)
//!
//! Built-in function names and arities are checked here: the table is
//! static, so a misspelled function or a wrong argument count is a parse
//! error, not a deferred evaluation failure.

use thiserror::Error;

use super::ast::{BinaryOp, Builtin, Expr, UnaryOp};
use super::token::{tokenize, Tok, Token};

/// An error produced while lexing or parsing expression text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected character `{ch}` at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("malformed number at offset {pos}")]
    InvalidNumber { pos: usize },

    #[error("unexpected {found} at offset {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("expression ended unexpectedly")]
    UnexpectedEnd,

    #[error("unexpected trailing {found} at offset {pos}")]
    TrailingInput { found: String, pos: usize },

    #[error("unknown function `{name}` at offset {pos}")]
    UnknownFunction { name: String, pos: usize },

    #[error("function `{name}` takes {expected} argument(s), found {found}")]
    WrongArity {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Parse expression text into an AST.
pub fn parse(text: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, index: 0 };
    let expr = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(ParseError::TrailingInput {
            found: token.tok.describe(),
            pos: token.pos,
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn expect(&mut self, want: &Tok) -> Result<(), ParseError> {
        match self.advance() {
            Some(token) if token.tok == *want => Ok(()),
            Some(token) => Err(ParseError::UnexpectedToken {
                found: token.tok.describe(),
                pos: token.pos,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    /// `expr := term (('+' | '-') term)*`
    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        while let Some(token) = self.peek() {
            let op = match token.tok {
                Tok::Plus => BinaryOp::Add,
                Tok::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// `term := factor (('*' | '/' | '%') factor)*`
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.factor()?;
        while let Some(token) = self.peek() {
            let op = match token.tok {
                Tok::Star => BinaryOp::Mul,
                Tok::Slash => BinaryOp::Div,
                Tok::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// `factor := '-' factor | power`
    fn factor(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(token) if token.tok == Tok::Minus) {
            self.advance();
            let operand = self.factor()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.power()
    }

    /// `power := atom ('^' factor)?` — right-associative.
    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(token) if token.tok == Tok::Caret) {
            self.advance();
            let exponent = self.factor()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    /// `atom := NUMBER | REF | call | '(' expr ')'`
    fn atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance().ok_or(ParseError::UnexpectedEnd)?;
        match token.tok {
            Tok::Number(value) => Ok(Expr::Number(value)),
            Tok::Ident(name) => {
                if matches!(self.peek(), Some(next) if next.tok == Tok::LParen) {
                    self.call(name, token.pos)
                } else {
                    Ok(Expr::Ref(name))
                }
            }
            Tok::LParen => {
                let inner = self.expr()?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.describe(),
                pos: token.pos,
            }),
        }
    }

    /// `call := IDENT '(' expr (',' expr)* ')'` — the identifier has
    /// already been consumed.
    fn call(&mut self, name: String, pos: usize) -> Result<Expr, ParseError> {
        let func = Builtin::from_name(&name)
            .ok_or_else(|| ParseError::UnknownFunction { name: name.clone(), pos })?;

        self.expect(&Tok::LParen)?;
        let mut args = vec![self.expr()?];
        while matches!(self.peek(), Some(token) if token.tok == Tok::Comma) {
            self.advance();
            args.push(self.expr()?);
        }
        self.expect(&Tok::RParen)?;

        if args.len() != func.arity() {
            return Err(ParseError::WrongArity {
                name,
                expected: func.arity(),
                found: args.len(),
            });
        }

        Ok(Expr::Call { func, args })
    }
}
