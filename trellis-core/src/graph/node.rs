//! Graph Nodes
//!
//! A node is an ordered collection of named datums plus an editor-owned
//! position. Input order is display order only; evaluation never depends
//! on it. The position exists purely for the presentation layer and is
//! never read by the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::datum::DatumId;

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A node: a named, ordered collection of datums.
#[derive(Debug)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// The node's name, unique per document. Cross-node references use
    /// it as the qualifier: `name.input`.
    name: String,

    /// Named inputs in declaration order. Declaration order is what the
    /// editor displays; it has no effect on evaluation.
    inputs: IndexMap<String, DatumId>,

    /// Canvas position, owned and read by the editor only.
    position: (f64, f64),
}

impl Node {
    /// Create a new node with the given name and no inputs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            inputs: IndexMap::new(),
            position: (0.0, 0.0),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterate the inputs in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, DatumId)> {
        self.inputs.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// The number of inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Look up an input datum by name.
    pub fn input(&self, name: &str) -> Option<DatumId> {
        self.inputs.get(name).copied()
    }

    /// Add a named input. Returns false (without inserting) if the name
    /// is already taken.
    pub(super) fn insert_input(&mut self, name: impl Into<String>, datum: DatumId) -> bool {
        let name = name.into();
        if self.inputs.contains_key(&name) {
            return false;
        }
        self.inputs.insert(name, datum);
        true
    }

    /// Remove a named input, preserving the order of the rest. Returns
    /// the datum id that was bound to the name.
    pub(super) fn remove_input(&mut self, name: &str) -> Option<DatumId> {
        self.inputs.shift_remove(name)
    }

    /// Get the canvas position.
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Move the node. Editor-only state; the engine never reads it.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.position = (x, y);
    }
}
