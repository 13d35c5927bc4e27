//! Datums
//!
//! A datum is a single named, expression-valued input slot on a node. It
//! stores the user's raw expression text, the parsed form when the text
//! parses, the last successfully computed value, and its position in the
//! dependency graph (both edge directions).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::expr::{Expr, Value};

use super::node::NodeId;

/// Unique identifier for a datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatumId(u64);

impl DatumId {
    /// Generate a new unique datum ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for DatumId {
    fn default() -> Self {
        Self::new()
    }
}

/// A datum in the dependency graph.
///
/// # Invariants
///
/// - `valid == false` implies `value == None`.
/// - `ast` is `Some` exactly when `expression` parses.
/// - Across the whole graph, `dependents` is the exact transpose of
///   `dependencies` (maintained by the graph manager, not here).
#[derive(Debug)]
pub struct Datum {
    /// Unique identifier for this datum.
    id: DatumId,

    /// The node this datum belongs to. Bare references in sibling
    /// expressions resolve against this node.
    owner: NodeId,

    /// The user's expression text, verbatim. Kept even when it fails to
    /// parse so keystrokes are never lost.
    expression: String,

    /// The parsed expression, when the text parses. Cached so dependents
    /// can be re-evaluated without re-parsing.
    ast: Option<Expr>,

    /// The last successfully computed value. `None` while invalid.
    value: Option<Value>,

    /// Whether the last evaluation attempt succeeded.
    valid: bool,

    /// Datums this datum's expression reads from (resolved references).
    dependencies: HashSet<DatumId>,

    /// Datums whose expressions read from this one.
    dependents: HashSet<DatumId>,

    /// Registration sequence number, used as the deterministic tie-break
    /// when ordering re-evaluation.
    seq: u64,
}

impl Datum {
    /// Create a fresh datum owned by `owner`. It starts unset: empty
    /// expression, invalid, no value, no edges.
    pub fn new(owner: NodeId, seq: u64) -> Self {
        Self {
            id: DatumId::new(),
            owner,
            expression: String::new(),
            ast: None,
            value: None,
            valid: false,
            dependencies: HashSet::new(),
            dependents: HashSet::new(),
            seq,
        }
    }

    /// Get the datum's ID.
    pub fn id(&self) -> DatumId {
        self.id
    }

    /// Get the owning node's ID.
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Get the registration sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The current expression text, exactly as last set.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The parsed expression, if the current text parses.
    pub fn ast(&self) -> Option<&Expr> {
        self.ast.as_ref()
    }

    /// Whether the last evaluation attempt succeeded.
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// The last successfully computed value. `None` while invalid.
    pub fn value(&self) -> Option<Value> {
        self.value
    }

    /// Store new expression text and its parse result. Does not touch
    /// edges or the cached value; callers follow up with a rebind and
    /// re-evaluation (or invalidation).
    pub fn set_expression(&mut self, text: String, ast: Option<Expr>) {
        self.expression = text;
        self.ast = ast;
    }

    /// Record a successful evaluation.
    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
        self.valid = true;
    }

    /// Record a failed evaluation (or the absence of one).
    pub fn invalidate(&mut self) {
        self.value = None;
        self.valid = false;
    }

    /// Get all dependencies.
    pub fn dependencies(&self) -> &HashSet<DatumId> {
        &self.dependencies
    }

    /// Get all dependents.
    pub fn dependents(&self) -> &HashSet<DatumId> {
        &self.dependents
    }

    pub(super) fn add_dependency(&mut self, id: DatumId) {
        self.dependencies.insert(id);
    }

    pub(super) fn remove_dependency(&mut self, id: DatumId) {
        self.dependencies.remove(&id);
    }

    pub(super) fn set_dependencies(&mut self, deps: HashSet<DatumId>) {
        self.dependencies = deps;
    }

    pub(super) fn add_dependent(&mut self, id: DatumId) {
        self.dependents.insert(id);
    }

    pub(super) fn remove_dependent(&mut self, id: DatumId) {
        self.dependents.remove(&id);
    }
}
