//! Trellis Core
//!
//! This crate provides the datum expression graph engine for the Trellis
//! node editor. It implements:
//!
//! - A small arithmetic expression language with datum references
//! - Datums: named, expression-valued input slots with cached values
//! - A dependency graph with cycle rejection and deterministic
//!   re-evaluation ordering
//! - Nodes and documents that own datums and expose the editor-facing API
//!
//! The editor itself (panels, text fields, sockets) lives elsewhere; it
//! talks to this crate exclusively through `Document`: `set_expr`,
//! `get_expr`, `valid`, `value`, and node input iteration.
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `expr`: expression parsing and evaluation (pure, stateless)
//! - `graph`: datums, the dependency graph manager, nodes, and documents
//!
//! # Example
//!
//! ```rust
//! use trellis_core::graph::Document;
//!
//! let mut doc = Document::new();
//! let n = doc.add_node("n").unwrap();
//! let a = doc.add_input(n, "a", "2").unwrap();
//! let b = doc.add_input(n, "b", "a * 3").unwrap();
//!
//! assert_eq!(doc.value(b), Some(6.0));
//!
//! // Editing a datum re-evaluates everything downstream.
//! doc.set_expr(a, "10");
//! assert_eq!(doc.value(b), Some(30.0));
//!
//! // Failures never escape: they show up as invalidity.
//! doc.set_expr(a, "bad syntax (");
//! assert!(!doc.valid(a));
//! assert!(!doc.valid(b));
//! ```

pub mod expr;
pub mod graph;

pub use expr::{EvalError, Expr, ParseError, Value};
pub use graph::{CycleError, Datum, DatumId, Document, Node, NodeId, SharedDocument};
