//! Expression Parsing and Evaluation
//!
//! This module implements the small expression language that datums are
//! written in: floating-point arithmetic, a fixed set of built-in
//! functions, and references to other datums by name.
//!
//! # Pipeline
//!
//! 1. `token`: text is lexed into a flat token stream.
//! 2. `parser`: tokens are parsed into an `Expr` tree. Built-in names and
//!    arities are checked here, since the function table is static.
//! 3. `eval`: the tree is interpreted against a resolver that supplies
//!    values for referenced datums.
//!
//! # Purity
//!
//! Parsing and evaluation are pure functions of their inputs. The module
//! holds no state, and reference extraction (`Expr::references`) is
//! static: it reports every name an expression mentions whether or not
//! the name currently resolves to anything.
//!
//! The grammar is intentionally loop-free, so evaluation always
//! terminates.

mod ast;
mod eval;
mod parser;
mod token;

pub use ast::{BinaryOp, Builtin, Expr, UnaryOp, Value};
pub use eval::{evaluate, EvalError};
pub use parser::{parse, ParseError};
