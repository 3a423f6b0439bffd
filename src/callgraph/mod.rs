//! Call graphs and their builders.
//!
//! # Components
//!
//! - this module - the [`CallGraph`] container shared by every builder
//! - [`cha`] - Class Hierarchy Analysis construction (no points-to
//!   information; resolution by subtype closure)
//!
//! The pointer solvers build their call graphs on the fly and convert
//! into the same container, so downstream consumers (ICFG construction,
//! interprocedural constant propagation) are builder-agnostic.

pub mod cha;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::ir::{CallKind, MethodId, StmtRef};

pub use cha::build_cha;

/// One resolved call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallEdge {
    /// How the call site dispatches.
    pub kind: CallKind,
    /// The call site.
    pub callsite: StmtRef,
    /// The resolved target.
    pub callee: MethodId,
}

/// A call graph: reachable methods plus per-call-site target sets.
///
/// Methods and edges are only ever added; discovery order is preserved
/// for deterministic iteration.
#[derive(Debug, Default)]
pub struct CallGraph {
    entries: Vec<MethodId>,
    reachable: FxHashSet<MethodId>,
    reachable_order: Vec<MethodId>,
    callees: FxHashMap<StmtRef, FxHashSet<MethodId>>,
    edges: Vec<CallEdge>,
}

impl CallGraph {
    /// Create an empty call graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry method.
    ///
    /// Entry methods are not implicitly reachable; builders mark them so
    /// when they scan them, which keeps `add_reachable`'s "was it new"
    /// answer usable as the scan-once gate.
    pub fn add_entry(&mut self, method: MethodId) {
        if !self.entries.contains(&method) {
            self.entries.push(method);
        }
    }

    /// Entry methods.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[MethodId] {
        &self.entries
    }

    /// Mark a method reachable; returns whether it was new.
    pub fn add_reachable(&mut self, method: MethodId) -> bool {
        if self.reachable.insert(method) {
            self.reachable_order.push(method);
            true
        } else {
            false
        }
    }

    /// Whether a method has been marked reachable.
    #[inline]
    #[must_use]
    pub fn contains(&self, method: MethodId) -> bool {
        self.reachable.contains(&method)
    }

    /// Reachable methods in discovery order.
    #[inline]
    #[must_use]
    pub fn reachable_methods(&self) -> &[MethodId] {
        &self.reachable_order
    }

    /// Add an edge; returns whether it was new.
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        let new = self
            .callees
            .entry(edge.callsite)
            .or_default()
            .insert(edge.callee);
        if new {
            self.edges.push(edge);
        }
        new
    }

    /// Resolved targets of a call site.
    #[must_use]
    pub fn callees_of(&self, callsite: StmtRef) -> Vec<MethodId> {
        let mut targets: Vec<MethodId> = self
            .callees
            .get(&callsite)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        targets.sort_unstable();
        targets
    }

    /// Whether a specific edge exists.
    #[inline]
    #[must_use]
    pub fn has_edge(&self, callsite: StmtRef, callee: MethodId) -> bool {
        self.callees
            .get(&callsite)
            .is_some_and(|s| s.contains(&callee))
    }

    /// Every edge in insertion order.
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    /// Total number of edges.
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
