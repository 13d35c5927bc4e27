//! Datum Dependency Graph
//!
//! This module implements the reactive heart of the engine: datums
//! holding textual expressions, the dependency graph between them, and
//! the document that ties datums to nodes.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are datums (expression-valued input slots)
//! - Edges are references: if datum A's expression mentions datum B,
//!   A depends on B
//!
//! When a datum's expression changes, the manager recomputes A's edges,
//! rejects the change's edges if they would close a cycle, and otherwise
//! returns a deterministic topological order over everything downstream.
//! The document then re-evaluates each affected datum in that order.
//!
//! # Design Decisions
//!
//! 1. Datums live in a centralized registry rather than owning each other
//!    because:
//!    - It enables efficient topological ordering for batch updates
//!    - It simplifies cycle detection
//!    - Node ownership stays a lifecycle concern, not a borrow concern
//!
//! 2. The registry is indexed by datum ID for O(1) lookups.
//!
//! 3. We maintain both forward (dependencies) and reverse (dependents)
//!    edges to enable efficient traversal in both directions; the two
//!    edge sets are kept exact transposes of each other at all times.
//!
//! 4. Failures are folded into each datum's `valid` flag. Nothing in
//!    this module returns an error to the editor.

mod datum;
mod document;
mod manager;
mod node;

pub use datum::{Datum, DatumId};
pub use document::{Document, SharedDocument};
pub use manager::{CycleError, DependencyGraph};
pub use node::{Node, NodeId};
