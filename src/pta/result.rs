//! Frozen pointer-analysis results.
//!
//! Both solvers finish by converting their internal state into a
//! [`PointerAnalysisResult`]: per-variable points-to sets (context
//! collapsed), the discovered call graph, the heap model, and - for the
//! context-sensitive solver - the context-qualified sets as well.
//! Downstream consumers (alias maps, taint reporting) read this frozen
//! view; nothing in it changes after `solve` returns.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::callgraph::CallGraph;
use crate::ir::VarId;
use crate::taint::TaintFlow;

use super::context::CtxId;
use super::cs::CsObjId;
use super::heap::{HeapModel, ObjId};
use super::pfg::PointsToSet;

/// Auxiliary results stored by string key.
///
/// Plug-ins (currently only the taint overlay) deposit their findings
/// here so callers can fetch them without knowing which plug-ins ran.
#[derive(Debug, Clone)]
pub enum AuxResult {
    /// Taint flows reported by the taint overlay.
    TaintFlows(BTreeSet<TaintFlow>),
}

/// The frozen output of a pointer analysis.
#[derive(Debug)]
pub struct PointerAnalysisResult {
    var_pts: FxHashMap<VarId, PointsToSet<ObjId>>,
    cs_var_pts: FxHashMap<(CtxId, VarId), PointsToSet<CsObjId>>,
    call_graph: CallGraph,
    heap: HeapModel,
    aux: FxHashMap<String, AuxResult>,
    empty: PointsToSet<ObjId>,
    empty_cs: PointsToSet<CsObjId>,
}

impl PointerAnalysisResult {
    pub(crate) fn new(
        var_pts: FxHashMap<VarId, PointsToSet<ObjId>>,
        cs_var_pts: FxHashMap<(CtxId, VarId), PointsToSet<CsObjId>>,
        call_graph: CallGraph,
        heap: HeapModel,
    ) -> Self {
        Self {
            var_pts,
            cs_var_pts,
            call_graph,
            heap,
            aux: FxHashMap::default(),
            empty: PointsToSet::new(),
            empty_cs: PointsToSet::new(),
        }
    }

    /// The (context-collapsed) points-to set of a variable.
    #[must_use]
    pub fn points_to(&self, var: VarId) -> &PointsToSet<ObjId> {
        self.var_pts.get(&var).unwrap_or(&self.empty)
    }

    /// The points-to set of a context-qualified variable.
    ///
    /// Empty for results produced by the context-insensitive solver.
    #[must_use]
    pub fn cs_points_to(&self, ctx: CtxId, var: VarId) -> &PointsToSet<CsObjId> {
        self.cs_var_pts.get(&(ctx, var)).unwrap_or(&self.empty_cs)
    }

    /// Variables with a non-empty points-to set, ascending by id.
    #[must_use]
    pub fn vars_with_objects(&self) -> Vec<VarId> {
        let mut vars: Vec<VarId> = self
            .var_pts
            .iter()
            .filter(|(_, pts)| !pts.is_empty())
            .map(|(&v, _)| v)
            .collect();
        vars.sort_unstable();
        vars
    }

    /// The discovered call graph.
    #[inline]
    #[must_use]
    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    /// The heap model (object provenance queries).
    #[inline]
    #[must_use]
    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    /// Store an auxiliary result under a string key.
    pub fn store_aux(&mut self, key: &str, value: AuxResult) {
        self.aux.insert(key.to_owned(), value);
    }

    /// Fetch an auxiliary result.
    #[inline]
    #[must_use]
    pub fn aux(&self, key: &str) -> Option<&AuxResult> {
        self.aux.get(key)
    }

    /// Convenience accessor for the taint overlay's flows.
    #[must_use]
    pub fn taint_flows(&self, key: &str) -> Option<&BTreeSet<TaintFlow>> {
        match self.aux.get(key) {
            Some(AuxResult::TaintFlows(flows)) => Some(flows),
            None => None,
        }
    }
}
