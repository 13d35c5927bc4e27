//! Documents
//!
//! A `Document` is the per-open-document scope from the data model: it
//! owns the node table and the dependency graph, resolves reference
//! names, and orchestrates the whole `set_expr` flow — parse, rebind,
//! ordered re-evaluation — folding every failure into the affected
//! datums' validity flags.
//!
//! This is the surface the editor talks to. Nothing here pushes events
//! back at the caller: after a mutation, the editor polls `valid`,
//! `get_expr`, and `value` to refresh its display.
//!
//! # Name resolution
//!
//! A bare reference (`x`) resolves among the inputs of the node that
//! owns the referencing datum. A qualified reference (`other.x`)
//! resolves through the document's node table. Resolution happens when
//! an expression is (re)bound; a name that does not resolve produces no
//! edge and surfaces at evaluation as `UnresolvedReference`.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::expr::{evaluate, parse, EvalError, Expr, Value};

use super::datum::DatumId;
use super::manager::DependencyGraph;
use super::node::{Node, NodeId};

/// A document: nodes, their datums, and the dependency graph between
/// the datums.
pub struct Document {
    /// Nodes in creation order (the editor lists them in this order).
    nodes: IndexMap<NodeId, Node>,

    /// Node name lookup; names are the qualifier in `name.input`
    /// references and must be unique.
    names: IndexMap<String, NodeId>,

    /// The dependency graph manager owning all datums.
    graph: DependencyGraph,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            names: IndexMap::new(),
            graph: DependencyGraph::new(),
        }
    }

    // ------------------------------------------------------------------
    // Node management
    // ------------------------------------------------------------------

    /// Add a node with the given name and no inputs yet.
    ///
    /// Returns `None` if the name is already taken.
    pub fn add_node(&mut self, name: impl Into<String>) -> Option<NodeId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return None;
        }
        let node = Node::new(name.clone());
        let id = node.id();
        self.nodes.insert(id, node);
        self.names.insert(name, id);
        Some(id)
    }

    /// Add a named input datum to a node, with a default expression that
    /// is parsed and evaluated immediately.
    ///
    /// Returns `None` if the node is unknown or already has an input
    /// with that name.
    pub fn add_input(&mut self, node: NodeId, name: &str, default_expr: &str) -> Option<DatumId> {
        let existing = self.nodes.get(&node)?;
        if existing.input(name).is_some() {
            return None;
        }

        let id = self.graph.register(node);
        if let Some(node) = self.nodes.get_mut(&node) {
            node.insert_input(name, id);
        }
        self.set_expr(id, default_expr);
        Some(id)
    }

    /// Remove a node and every datum it owns.
    ///
    /// Each datum is unregistered from the graph first, so the edge sets
    /// stay consistent; datums elsewhere that referenced this node's
    /// inputs are re-evaluated and become invalid (the names no longer
    /// resolve).
    pub fn remove_node(&mut self, node: NodeId) {
        let Some(node) = self.nodes.shift_remove(&node) else {
            debug_assert!(false, "remove of unknown node");
            return;
        };
        self.names.shift_remove(node.name());
        debug!(node = node.name(), "removing node");

        let mut affected = Vec::new();
        for (_, datum) in node.inputs() {
            for id in self.graph.remove(datum) {
                if !affected.contains(&id) {
                    affected.push(id);
                }
            }
        }
        for id in affected {
            // Datums owned by the removed node may appear downstream of
            // its other datums; they are gone from the graph by now.
            if self.graph.get(id).is_some() {
                self.reevaluate(id);
            }
        }
    }

    /// Remove a single input datum from a node.
    ///
    /// Datums that referenced it keep the name in their expression text;
    /// the name no longer resolves, so they turn invalid here.
    pub fn remove_input(&mut self, node: NodeId, name: &str) {
        let Some(node) = self.nodes.get_mut(&node) else {
            debug_assert!(false, "remove of input on unknown node");
            return;
        };
        let Some(datum) = node.remove_input(name) else {
            debug_assert!(false, "remove of unknown input `{name}`");
            return;
        };

        for id in self.graph.remove(datum) {
            self.reevaluate(id);
        }
    }

    /// Get a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a node mutably (the editor uses this to move nodes around).
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Look up a node by name.
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.names.get(name).and_then(|id| self.nodes.get(id))
    }

    /// Iterate nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    // ------------------------------------------------------------------
    // Datum API (what the editor binds its text fields to)
    // ------------------------------------------------------------------

    /// Set a datum's expression text.
    ///
    /// This never fails at the API level: parse errors, unresolved
    /// references, cycles, and arithmetic faults all fold into the
    /// affected datums' `valid` flags. The text itself is always stored,
    /// so the user's keystrokes are never lost.
    ///
    /// On success, the datum and everything transitively downstream of
    /// it are re-evaluated in dependency order. A change that would
    /// create a cycle is rejected: the datum becomes invalid (text still
    /// updated) and no edge or downstream value changes.
    pub fn set_expr(&mut self, id: DatumId, text: &str) {
        if self.graph.get(id).is_none() {
            debug_assert!(false, "set_expr on unregistered datum");
            return;
        }

        match parse(text) {
            Err(err) => {
                trace!(datum = id.raw(), %err, "expression failed to parse");
                if let Some(datum) = self.graph.get_mut(id) {
                    datum.set_expression(text.to_string(), None);
                    datum.invalidate();
                }
                // No references any more; dependents go invalid through
                // the ordered re-evaluation below.
                let order = self
                    .graph
                    .rebind(id, &HashSet::new())
                    .unwrap_or_default();
                for affected in order {
                    self.reevaluate(affected);
                }
            }
            Ok(ast) => {
                let owner = self.graph.get(id).map(|d| d.owner());
                let new_deps = owner
                    .map(|owner| self.resolve_refs(owner, &ast))
                    .unwrap_or_default();

                if let Some(datum) = self.graph.get_mut(id) {
                    datum.set_expression(text.to_string(), Some(ast));
                }

                match self.graph.rebind(id, &new_deps) {
                    Err(_) => {
                        // Rejected: previous edges stand, downstream
                        // values stay untouched, only this datum turns
                        // invalid. The cyclic AST is dropped (the text
                        // stays) so a later upstream edit re-evaluating
                        // this datum along the old edges cannot execute
                        // the rejected expression.
                        if let Some(datum) = self.graph.get_mut(id) {
                            datum.set_expression(text.to_string(), None);
                            datum.invalidate();
                        }
                    }
                    Ok(order) => {
                        for affected in order {
                            self.reevaluate(affected);
                        }
                    }
                }
            }
        }
    }

    /// The datum's expression text, exactly as last set.
    pub fn get_expr(&self, id: DatumId) -> &str {
        match self.graph.get(id) {
            Some(datum) => datum.expression(),
            None => {
                debug_assert!(false, "get_expr on unregistered datum");
                ""
            }
        }
    }

    /// Whether the datum's last evaluation succeeded.
    pub fn valid(&self, id: DatumId) -> bool {
        self.graph.get(id).map(|d| d.valid()).unwrap_or(false)
    }

    /// The datum's last successfully computed value, `None` while
    /// invalid.
    pub fn value(&self, id: DatumId) -> Option<Value> {
        self.graph.get(id).and_then(|d| d.value())
    }

    /// Direct access to the underlying graph (read-only).
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Resolve a reference name from the point of view of `owner`: bare
    /// names among the owner's inputs, `node.input` through the node
    /// table.
    fn resolve_name(&self, owner: NodeId, name: &str) -> Option<DatumId> {
        match name.split_once('.') {
            Some((node, input)) => self.node_by_name(node)?.input(input),
            None => self.nodes.get(&owner)?.input(name),
        }
    }

    /// Resolve every reference in `ast` to a datum id, dropping names
    /// that don't currently resolve (they surface at evaluation).
    fn resolve_refs(&self, owner: NodeId, ast: &Expr) -> HashSet<DatumId> {
        let mut resolved: SmallVec<[DatumId; 4]> = SmallVec::new();
        for name in ast.references() {
            if let Some(id) = self.resolve_name(owner, name) {
                resolved.push(id);
            }
        }
        resolved.into_iter().collect()
    }

    /// Re-evaluate one datum against the current cached values of its
    /// dependencies, updating its value and validity.
    fn reevaluate(&mut self, id: DatumId) {
        let Some(datum) = self.graph.get(id) else {
            return;
        };
        let owner = datum.owner();
        let deps = datum.dependencies().clone();
        let Some(ast) = datum.ast().cloned() else {
            // Unparsed text: invalid, nothing to compute.
            if let Some(datum) = self.graph.get_mut(id) {
                datum.invalidate();
            }
            return;
        };

        let result = {
            let graph = &self.graph;
            let mut resolve = |name: &str| -> Result<Value, EvalError> {
                let target = self
                    .resolve_name(owner, name)
                    .ok_or_else(|| EvalError::UnresolvedReference(name.to_string()))?;
                // Only committed edges may be read. A name that failed
                // to resolve at rebind time has no edge, so even if it
                // resolves now the value would be untracked: edits to
                // it would never propagate back here.
                if !deps.contains(&target) {
                    return Err(EvalError::UnresolvedReference(name.to_string()));
                }
                let upstream = graph
                    .get(target)
                    .ok_or_else(|| EvalError::UnresolvedReference(name.to_string()))?;
                upstream
                    .value()
                    .ok_or_else(|| EvalError::UpstreamInvalid(name.to_string()))
            };
            evaluate(&ast, &mut resolve)
        };

        match result {
            Ok(value) => {
                trace!(datum = id.raw(), value, "datum re-evaluated");
                if let Some(datum) = self.graph.get_mut(id) {
                    datum.set_value(value);
                }
            }
            Err(err) => {
                trace!(datum = id.raw(), %err, "datum evaluation failed");
                if let Some(datum) = self.graph.get_mut(id) {
                    datum.invalidate();
                }
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// A document behind a single mutual-exclusion scope.
///
/// The engine itself is single-threaded and synchronous; when the
/// surrounding application is event-driven, each callback takes the lock
/// for the duration of its mutation so no two `set_expr` calls can
/// interleave. The workload is interactive (human-speed edits), so one
/// coarse lock over the whole document is both sufficient and correct.
#[derive(Clone)]
pub struct SharedDocument {
    inner: Arc<Mutex<Document>>,
}

impl SharedDocument {
    /// Create a new shared, empty document.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Document::new())),
        }
    }

    /// Lock the document for the duration of one mutation or poll.
    pub fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.lock()
    }
}

impl Default for SharedDocument {
    fn default() -> Self {
        Self::new()
    }
}
