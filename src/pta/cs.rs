//! Context-sensitive whole-program pointer analysis.
//!
//! Structurally the same fixpoint as the context-insensitive solver, but
//! every variable pointer is keyed by the context the selector chose for
//! its method, every abstract object carries the heap context of its
//! allocation, and call-graph nodes are (context, method) pairs. The
//! entry method runs under the empty context.
//!
//! The taint overlay hooks in at two points: when a call edge is first
//! discovered (source/transfer/sink rule matching) and when a delta
//! propagates (tainted objects additionally flow along taint-transfer
//! edges). See [`crate::taint`].

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::callgraph::{CallEdge, CallGraph};
use crate::ir::{
    CallKind, ClassId, FieldId, Invoke, MethodId, Program, Stmt, StmtRef, VarAccessIndex, VarId,
};
use crate::taint::{TaintAnalysis, TaintSolverCtx};

use super::context::{ContextInterner, ContextSelector, CtxId};
use super::heap::{HeapModel, ObjId};
use super::pfg::{PointerFlowGraph, PointsToSet, PtrId};
use super::result::{AuxResult, PointerAnalysisResult};

/// Result key under which the taint overlay stores its flows.
pub const TAINT_FLOWS_KEY: &str = "taint-analysis";

/// Dense id of a context-qualified abstract object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsObjId(pub usize);

/// A node of the context-sensitive pointer flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsPointer {
    /// A variable under the context of its containing method.
    Var(CtxId, VarId),
    /// A static field (contexts never qualify statics).
    StaticField(FieldId),
    /// An instance field of a context-qualified object.
    InstanceField(CsObjId, FieldId),
    /// The element slot of a context-qualified array object.
    ArrayIndex(CsObjId),
}

/// Interner for (heap context, object) pairs.
#[derive(Debug, Default)]
pub struct CsManager {
    objs: Vec<(CtxId, ObjId)>,
    index: FxHashMap<(CtxId, ObjId), CsObjId>,
}

impl CsManager {
    /// Intern a context-qualified object.
    pub fn cs_obj(&mut self, ctx: CtxId, obj: ObjId) -> CsObjId {
        if let Some(&id) = self.index.get(&(ctx, obj)) {
            return id;
        }
        let id = CsObjId(self.objs.len());
        self.objs.push((ctx, obj));
        self.index.insert((ctx, obj), id);
        id
    }

    /// The (heap context, object) pair behind an id.
    #[inline]
    #[must_use]
    pub fn decompose(&self, id: CsObjId) -> (CtxId, ObjId) {
        self.objs[id.0]
    }

    /// The underlying context-free object.
    #[inline]
    #[must_use]
    pub fn obj_of(&self, id: CsObjId) -> ObjId {
        self.objs[id.0].1
    }
}

/// Context-sensitive call graph, kept alongside a collapsed view.
#[derive(Debug, Default)]
struct CsCallGraph {
    reachable: FxHashSet<(CtxId, MethodId)>,
    reachable_order: Vec<(CtxId, MethodId)>,
    edges: FxHashMap<(CtxId, StmtRef), FxHashSet<(CtxId, MethodId)>>,
    collapsed: CallGraph,
}

impl CsCallGraph {
    fn add_reachable(&mut self, node: (CtxId, MethodId)) -> bool {
        if self.reachable.insert(node) {
            self.reachable_order.push(node);
            self.collapsed.add_reachable(node.1);
            true
        } else {
            false
        }
    }

    fn has_edge(&self, callsite: (CtxId, StmtRef), callee: (CtxId, MethodId)) -> bool {
        self.edges
            .get(&callsite)
            .is_some_and(|s| s.contains(&callee))
    }

    fn add_edge(&mut self, kind: CallKind, callsite: (CtxId, StmtRef), callee: (CtxId, MethodId)) {
        if self.edges.entry(callsite).or_default().insert(callee) {
            self.collapsed.add_edge(CallEdge {
                kind,
                callsite: callsite.1,
                callee: callee.1,
            });
        }
    }
}

/// The context-sensitive solver.
pub struct CsSolver<'p, S: ContextSelector> {
    program: &'p Program,
    access: VarAccessIndex,
    selector: S,
    itn: ContextInterner,
    csm: CsManager,
    heap: HeapModel,
    pfg: PointerFlowGraph<CsPointer, CsObjId>,
    call_graph: CsCallGraph,
    worklist: VecDeque<(PtrId, PointsToSet<CsObjId>)>,
    taint: Option<TaintAnalysis>,
}

/// Run context-sensitive pointer analysis with the given selector.
#[must_use]
pub fn solve_cs<S: ContextSelector>(program: &Program, selector: S) -> PointerAnalysisResult {
    CsSolver::new(program, selector).solve()
}

/// Run context-sensitive pointer analysis with the taint overlay.
///
/// The resulting flows are stored under [`TAINT_FLOWS_KEY`].
#[must_use]
pub fn solve_cs_with_taint<S: ContextSelector>(
    program: &Program,
    selector: S,
    taint: TaintAnalysis,
) -> PointerAnalysisResult {
    let mut solver = CsSolver::new(program, selector);
    solver.taint = Some(taint);
    solver.solve()
}

impl<'p, S: ContextSelector> CsSolver<'p, S> {
    /// Create a solver for a program.
    #[must_use]
    pub fn new(program: &'p Program, selector: S) -> Self {
        Self {
            program,
            access: VarAccessIndex::build(program),
            selector,
            itn: ContextInterner::new(),
            csm: CsManager::default(),
            heap: HeapModel::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CsCallGraph::default(),
            worklist: VecDeque::new(),
            taint: None,
        }
    }

    /// Run the fixpoint and freeze the result.
    #[must_use]
    pub fn solve(mut self) -> PointerAnalysisResult {
        let entry = self.program.entry();
        let empty = self.itn.empty();
        self.call_graph.collapsed.add_entry(entry);
        self.add_reachable((empty, entry));
        self.analyze();
        debug!(
            pointers = self.pfg.len(),
            contexts = self.itn.len(),
            cs_methods = self.call_graph.reachable_order.len(),
            "context-sensitive fixpoint reached"
        );

        let flows = self
            .taint
            .take()
            .map(|taint| taint.collect_flows(&self.heap, &self.csm, &mut self.pfg));

        let mut var_pts: FxHashMap<VarId, PointsToSet<ObjId>> = FxHashMap::default();
        let mut cs_var_pts = FxHashMap::default();
        for ptr in self.pfg.pointers() {
            if let CsPointer::Var(ctx, var) = *self.pfg.key(ptr) {
                let pts = self.pfg.pts(ptr);
                if pts.is_empty() {
                    continue;
                }
                let collapsed = var_pts.entry(var).or_default();
                for cs_obj in pts.iter() {
                    collapsed.insert(self.csm.obj_of(cs_obj));
                }
                cs_var_pts.insert((ctx, var), pts.clone());
            }
        }

        let mut result = PointerAnalysisResult::new(
            var_pts,
            cs_var_pts,
            std::mem::take(&mut self.call_graph.collapsed),
            self.heap,
        );
        if let Some(flows) = flows {
            result.store_aux(TAINT_FLOWS_KEY, AuxResult::TaintFlows(flows));
        }
        result
    }

    /// Mark a (context, method) pair reachable and visit its statements.
    fn add_reachable(&mut self, cs_method: (CtxId, MethodId)) {
        if !self.call_graph.add_reachable(cs_method) {
            return;
        }
        let (ctx, method) = cs_method;
        let program = self.program;
        let Some(ir) = program.ir_of(method) else {
            return;
        };
        for (i, stmt) in ir.stmts.iter().enumerate() {
            let site = StmtRef::new(method, i);
            match stmt {
                Stmt::New { lhs, class } => {
                    let obj = self.heap.obj_at(site, *class);
                    let heap_ctx = self.selector.select_heap(&mut self.itn, ctx, obj);
                    let cs_obj = self.csm.cs_obj(heap_ctx, obj);
                    let ptr = self.pfg.pointer(CsPointer::Var(ctx, *lhs));
                    self.worklist
                        .push_back((ptr, PointsToSet::singleton(cs_obj)));
                }
                Stmt::Copy { lhs, rhs } => {
                    self.add_pfg_edge(CsPointer::Var(ctx, *rhs), CsPointer::Var(ctx, *lhs));
                }
                Stmt::LoadField {
                    lhs,
                    base: None,
                    field,
                } => {
                    self.add_pfg_edge(CsPointer::StaticField(*field), CsPointer::Var(ctx, *lhs));
                }
                Stmt::StoreField {
                    base: None,
                    field,
                    rhs,
                } => {
                    self.add_pfg_edge(CsPointer::Var(ctx, *rhs), CsPointer::StaticField(*field));
                }
                Stmt::Invoke(invoke) if invoke.is_static() => {
                    if let Some(callee) = self.resolve_callee(None, invoke) {
                        let callee_ctx =
                            self.selector
                                .select_call(&mut self.itn, ctx, site, callee);
                        self.process_call_edge(ctx, site, invoke, callee, callee_ctx, None);
                    }
                }
                _ => {}
            }
        }
    }

    fn add_pfg_edge(&mut self, source: CsPointer, target: CsPointer) {
        let s = self.pfg.pointer(source);
        let t = self.pfg.pointer(target);
        if self.pfg.add_edge(s, t) && !self.pfg.pts(s).is_empty() {
            let seed = self.pfg.pts(s).clone();
            self.worklist.push_back((t, seed));
        }
    }

    fn analyze(&mut self) {
        while let Some((ptr, pts)) = self.worklist.pop_front() {
            let delta = self.propagate(ptr, &pts);
            if let Some(mut taint) = self.taint.take() {
                taint.propagate(&mut self.solver_ctx(), ptr, &delta);
                self.taint = Some(taint);
            }
            if delta.is_empty() {
                continue;
            }
            let CsPointer::Var(ctx, var) = *self.pfg.key(ptr) else {
                continue;
            };
            for cs_obj in delta.iter() {
                self.expand_instance_effects(ctx, var, cs_obj);
                self.process_call(ctx, var, cs_obj);
            }
        }
    }

    fn propagate(&mut self, ptr: PtrId, pts: &PointsToSet<CsObjId>) -> PointsToSet<CsObjId> {
        let mut delta = PointsToSet::new();
        for obj in pts.iter() {
            if self.pfg.pts_mut(ptr).insert(obj) {
                delta.insert(obj);
            }
        }
        if !delta.is_empty() {
            let succs: Vec<PtrId> = self.pfg.succs_of(ptr).to_vec();
            for succ in succs {
                self.worklist.push_back((succ, delta.clone()));
            }
        }
        delta
    }

    fn expand_instance_effects(&mut self, ctx: CtxId, var: VarId, cs_obj: CsObjId) {
        let program = self.program;
        for site in self.access.store_fields_of(var).to_vec() {
            if let Some(Stmt::StoreField { field, rhs, .. }) = program.stmt_at(site) {
                self.add_pfg_edge(
                    CsPointer::Var(ctx, *rhs),
                    CsPointer::InstanceField(cs_obj, *field),
                );
            }
        }
        for site in self.access.load_fields_of(var).to_vec() {
            if let Some(Stmt::LoadField { lhs, field, .. }) = program.stmt_at(site) {
                self.add_pfg_edge(
                    CsPointer::InstanceField(cs_obj, *field),
                    CsPointer::Var(ctx, *lhs),
                );
            }
        }
        for site in self.access.store_arrays_of(var).to_vec() {
            if let Some(Stmt::StoreArray { rhs, .. }) = program.stmt_at(site) {
                self.add_pfg_edge(CsPointer::Var(ctx, *rhs), CsPointer::ArrayIndex(cs_obj));
            }
        }
        for site in self.access.load_arrays_of(var).to_vec() {
            if let Some(Stmt::LoadArray { lhs, .. }) = program.stmt_at(site) {
                self.add_pfg_edge(CsPointer::ArrayIndex(cs_obj), CsPointer::Var(ctx, *lhs));
            }
        }
    }

    fn process_call(&mut self, ctx: CtxId, var: VarId, recv: CsObjId) {
        let program = self.program;
        let (recv_heap_ctx, recv_obj) = self.csm.decompose(recv);
        let recv_class = self.heap.class_of(recv_obj);
        for site in self.access.invokes_of(var).to_vec() {
            let Some(Stmt::Invoke(invoke)) = program.stmt_at(site) else {
                continue;
            };
            let Some(callee) = self.resolve_callee(recv_class, invoke) else {
                continue;
            };
            let callee_ctx = self.selector.select_call_on(
                &mut self.itn,
                ctx,
                site,
                recv_heap_ctx,
                recv_obj,
                callee,
            );
            // the receiver reaches `this` under the callee context for
            // every discovered object, even on existing call edges
            if let Some(this) = program.ir_of(callee).and_then(|ir| ir.this) {
                let this_ptr = self.pfg.pointer(CsPointer::Var(callee_ctx, this));
                self.worklist
                    .push_back((this_ptr, PointsToSet::singleton(recv)));
            }
            let base = self.pfg.pointer(CsPointer::Var(ctx, var));
            self.process_call_edge(ctx, site, invoke, callee, callee_ctx, Some(base));
        }
    }

    /// Record a resolved context-sensitive call edge; on first discovery
    /// wire the value flows and run the taint rule hooks.
    fn process_call_edge(
        &mut self,
        caller_ctx: CtxId,
        callsite: StmtRef,
        invoke: &Invoke,
        callee: MethodId,
        callee_ctx: CtxId,
        base: Option<PtrId>,
    ) {
        if self
            .call_graph
            .has_edge((caller_ctx, callsite), (callee_ctx, callee))
        {
            return;
        }
        self.call_graph
            .add_edge(invoke.kind, (caller_ctx, callsite), (callee_ctx, callee));
        self.add_reachable((callee_ctx, callee));

        let program = self.program;
        if let Some(callee_ir) = program.ir_of(callee) {
            for (arg, param) in invoke.args.iter().zip(callee_ir.params.clone()) {
                self.add_pfg_edge(
                    CsPointer::Var(caller_ctx, *arg),
                    CsPointer::Var(callee_ctx, param),
                );
            }
            if let Some(lhs) = invoke.result {
                for rv in callee_ir.return_vars.clone() {
                    self.add_pfg_edge(
                        CsPointer::Var(callee_ctx, rv),
                        CsPointer::Var(caller_ctx, lhs),
                    );
                }
            }
        }

        if let Some(mut taint) = self.taint.take() {
            taint.on_new_call_edge(
                &mut self.solver_ctx(),
                caller_ctx,
                callsite,
                invoke,
                callee,
                base,
            );
            self.taint = Some(taint);
        }
    }

    fn resolve_callee(&self, recv_class: Option<ClassId>, invoke: &Invoke) -> Option<MethodId> {
        match invoke.kind {
            CallKind::Static => self.program.declared_method(invoke.declaring, &invoke.subsig),
            CallKind::Special => self.program.dispatch(invoke.declaring, &invoke.subsig),
            CallKind::Virtual | CallKind::Interface => {
                recv_class.and_then(|c| self.program.dispatch(c, &invoke.subsig))
            }
        }
    }

    fn solver_ctx(&mut self) -> TaintSolverCtx<'_> {
        TaintSolverCtx {
            program: self.program,
            heap: &mut self.heap,
            itn: &mut self.itn,
            csm: &mut self.csm,
            pfg: &mut self.pfg,
            worklist: &mut self.worklist,
        }
    }
}
