//! Dependency Graph Manager
//!
//! The manager owns the datum registry and the edges between datums. It
//! decides whether an expression change is allowed (no cycles) and in
//! what order the affected datums must be re-evaluated.
//!
//! # Algorithm
//!
//! `rebind` replaces one datum's outgoing edges atomically:
//!
//! 1. Check the prospective edge set for a cycle: depth-first search
//!    upward along `dependencies` edges from each new dependency; if the
//!    rebinding datum is reachable, committing would close a loop.
//! 2. On a cycle, mutate nothing and report the rejection.
//! 3. Otherwise commit the edges (retargeting the reverse edges to keep
//!    the transpose invariant) and return a topological order over the
//!    datum and everything transitively downstream of it.
//!
//! Topological ties are broken by datum registration order, so the
//! re-evaluation order is stable and reproducible.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use thiserror::Error;
use tracing::debug;

use super::datum::{Datum, DatumId};
use super::node::NodeId;

/// Rejection of an expression change that would make the graph cyclic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expression would create a circular dependency")]
pub struct CycleError {
    /// The datum whose rebind was rejected.
    pub datum: DatumId,
}

/// The dependency graph manager: datum registry plus edge bookkeeping.
///
/// The graph is acyclic at all times. A `rebind` that would introduce a
/// cycle is rejected before any edge is touched.
pub struct DependencyGraph {
    /// All datums, indexed by ID.
    datums: HashMap<DatumId, Datum>,

    /// Registration counter; each datum's `seq` is drawn from here.
    next_seq: u64,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            datums: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Create and register a fresh datum owned by `owner`.
    pub fn register(&mut self, owner: NodeId) -> DatumId {
        let datum = Datum::new(owner, self.next_seq);
        self.next_seq += 1;
        let id = datum.id();
        self.datums.insert(id, datum);
        id
    }

    /// Get a reference to a datum.
    pub fn get(&self, id: DatumId) -> Option<&Datum> {
        self.datums.get(&id)
    }

    /// Get a mutable reference to a datum.
    pub fn get_mut(&mut self, id: DatumId) -> Option<&mut Datum> {
        self.datums.get_mut(&id)
    }

    /// The total number of registered datums.
    pub fn len(&self) -> usize {
        self.datums.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.datums.is_empty()
    }

    /// Atomically replace `id`'s outgoing edges with `new_deps`.
    ///
    /// On success, returns the re-evaluation order: `id` first, followed
    /// by every datum transitively reachable via `dependents`, sorted so
    /// each datum comes after everything it reads from, ties broken by
    /// registration order.
    ///
    /// On a would-be cycle, no edge is mutated and `CycleError` is
    /// returned.
    pub fn rebind(
        &mut self,
        id: DatumId,
        new_deps: &HashSet<DatumId>,
    ) -> Result<Vec<DatumId>, CycleError> {
        if !self.datums.contains_key(&id) {
            debug_assert!(false, "rebind of unregistered datum {id:?}");
            return Ok(Vec::new());
        }

        if self.would_cycle(id, new_deps) {
            debug!(datum = id.raw(), "rebind rejected: would create a cycle");
            return Err(CycleError { datum: id });
        }

        // Commit: retarget the reverse edges, then swap the forward set.
        let old_deps = self
            .datums
            .get(&id)
            .map(|d| d.dependencies().clone())
            .unwrap_or_default();

        for dep in old_deps.difference(new_deps) {
            if let Some(datum) = self.datums.get_mut(dep) {
                datum.remove_dependent(id);
            }
        }
        for dep in new_deps.difference(&old_deps) {
            if let Some(datum) = self.datums.get_mut(dep) {
                datum.add_dependent(id);
            }
        }
        if let Some(datum) = self.datums.get_mut(&id) {
            datum.set_dependencies(new_deps.clone());
        }

        debug!(
            datum = id.raw(),
            deps = new_deps.len(),
            "rebind committed"
        );

        Ok(self.downstream_order(id))
    }

    /// Remove a datum, erasing it from every other datum's edge sets.
    ///
    /// Returns the re-evaluation order of its former transitive
    /// dependents: their expressions still name the removed datum, so
    /// re-evaluating them surfaces the dangling reference as invalidity.
    pub fn remove(&mut self, id: DatumId) -> Vec<DatumId> {
        let Some(datum) = self.datums.remove(&id) else {
            debug_assert!(false, "remove of unregistered datum {id:?}");
            return Vec::new();
        };

        for dep in datum.dependencies() {
            if let Some(dep) = self.datums.get_mut(dep) {
                dep.remove_dependent(id);
            }
        }
        for dependent in datum.dependents() {
            if let Some(dependent) = self.datums.get_mut(dependent) {
                dependent.remove_dependency(id);
            }
        }

        debug!(datum = id.raw(), "datum removed from graph");

        // Order the surviving dependents among themselves.
        let mut affected = HashSet::new();
        let mut queue: VecDeque<DatumId> = datum.dependents().iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if !affected.insert(next) {
                continue;
            }
            if let Some(next) = self.datums.get(&next) {
                queue.extend(next.dependents().iter().copied());
            }
        }
        self.topological_order(affected)
    }

    /// Would replacing `id`'s outgoing edges with `new_deps` close a
    /// cycle? True iff `id` is reachable from any member of `new_deps`
    /// by following `dependencies` edges (including `id` itself, the
    /// self-reference case).
    fn would_cycle(&self, id: DatumId, new_deps: &HashSet<DatumId>) -> bool {
        if new_deps.contains(&id) {
            return true;
        }

        let mut visited = HashSet::new();
        let mut stack: Vec<DatumId> = new_deps.iter().copied().collect();

        while let Some(current) = stack.pop() {
            if current == id {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(datum) = self.datums.get(&current) {
                stack.extend(datum.dependencies().iter().copied());
            }
        }

        false
    }

    /// The re-evaluation order for `id` and its transitive dependents.
    fn downstream_order(&self, id: DatumId) -> Vec<DatumId> {
        let mut affected = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            if !affected.insert(current) {
                continue;
            }
            if let Some(datum) = self.datums.get(&current) {
                queue.extend(datum.dependents().iter().copied());
            }
        }

        self.topological_order(affected)
    }

    /// Kahn's algorithm restricted to `set`, with ready datums processed
    /// in registration order so the result is deterministic.
    fn topological_order(&self, set: HashSet<DatumId>) -> Vec<DatumId> {
        let mut in_degree: HashMap<DatumId, usize> = HashMap::new();
        let mut ready = BinaryHeap::new();

        for &id in &set {
            if let Some(datum) = self.datums.get(&id) {
                let degree = datum
                    .dependencies()
                    .iter()
                    .filter(|dep| set.contains(dep))
                    .count();
                in_degree.insert(id, degree);
                if degree == 0 {
                    ready.push(Reverse((datum.seq(), id)));
                }
            }
        }

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse((_, id))) = ready.pop() {
            order.push(id);

            if let Some(datum) = self.datums.get(&id) {
                for dependent in datum.dependents() {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            if let Some(dependent_datum) = self.datums.get(dependent) {
                                ready.push(Reverse((dependent_datum.seq(), *dependent)));
                            }
                        }
                    }
                }
            }
        }

        order
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
