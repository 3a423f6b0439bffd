//! Taint analysis as an overlay on the context-sensitive pointer solver.
//!
//! # Components
//!
//! - [`config`] - source/transfer/sink rules, loaded from JSON and
//!   resolved against the program
//! - this module - the overlay itself: taint objects, the taint flow
//!   graph, and flow collection
//!
//! # How the overlay works
//!
//! Taint objects are ordinary abstract objects minted by the heap model,
//! distinguished by carrying their source call site. The solver calls in
//! at two points:
//!
//! 1. **New call edge** ([`TaintAnalysis::on_new_call_edge`]): if the
//!    callee is a source and the call binds a result, a taint object is
//!    enqueued on the result pointer. Each matching transfer rule adds an
//!    edge to the taint flow graph (TFG) - a second graph over the same
//!    pointer nodes as the PFG - and, when the transfer's source pointer
//!    already holds taint, enqueues a re-minted taint object at the
//!    transfer's output type. Sink matches are recorded for the end.
//! 2. **Delta propagation** ([`TaintAnalysis::propagate`]): the tainted
//!    subset of every delta additionally flows along TFG edges.
//!
//! After the fixpoint, each recorded sink's argument pointer is scanned;
//! every taint object found there becomes a [`TaintFlow`]. Flows are
//! kept in a `BTreeSet` so reports are totally ordered.

pub mod config;

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ir::{Invoke, MethodId, Program, StmtRef, VarId};
use crate::pta::context::{ContextInterner, CtxId};
use crate::pta::cs::{CsManager, CsObjId, CsPointer};
use crate::pta::heap::HeapModel;
use crate::pta::pfg::{PointerFlowGraph, PointsToSet, PtrId};

pub use config::{TaintConfig, TaintPos, TaintTransfer};

/// A detected source-to-sink flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaintFlow {
    /// Call site of the source that minted the taint.
    pub source: StmtRef,
    /// Call site of the sink the taint reached.
    pub sink: StmtRef,
    /// Which argument of the sink call received the taint.
    pub index: usize,
}

/// Mutable solver state the overlay operates on.
///
/// The context-sensitive solver hands this out at its hook points; the
/// overlay mints objects, interns pointers and enqueues worklist entries
/// through it, never touching the solver's control flow.
pub struct TaintSolverCtx<'a> {
    /// The analysed program.
    pub program: &'a Program,
    /// Heap model, for minting taint objects.
    pub heap: &'a mut HeapModel,
    /// Context interner (taint objects live in the empty context).
    pub itn: &'a mut ContextInterner,
    /// Context-qualified object interner.
    pub csm: &'a mut CsManager,
    /// The solver's pointer flow graph.
    pub pfg: &'a mut PointerFlowGraph<CsPointer, CsObjId>,
    /// The solver's worklist.
    pub worklist: &'a mut VecDeque<(PtrId, PointsToSet<CsObjId>)>,
}

#[derive(Debug, Clone, Copy)]
struct SinkSite {
    ctx: CtxId,
    callsite: StmtRef,
    index: usize,
    arg: VarId,
}

/// The taint overlay.
#[derive(Debug)]
pub struct TaintAnalysis {
    config: TaintConfig,
    tfg: FxHashMap<PtrId, Vec<PtrId>>,
    sinks: Vec<SinkSite>,
}

impl TaintAnalysis {
    /// Create the overlay from resolved rules.
    #[must_use]
    pub fn new(config: TaintConfig) -> Self {
        Self {
            config,
            tfg: FxHashMap::default(),
            sinks: Vec::new(),
        }
    }

    /// Rule hook, invoked once per newly discovered call edge.
    pub fn on_new_call_edge(
        &mut self,
        cx: &mut TaintSolverCtx<'_>,
        caller_ctx: CtxId,
        callsite: StmtRef,
        invoke: &Invoke,
        callee: MethodId,
        base: Option<PtrId>,
    ) {
        // sources mint fresh taint on the call's result
        if let Some(lhs) = invoke.result {
            for &ty in self.config.sources_of(callee) {
                let obj = cx.heap.make_taint(callsite, ty);
                let cs_obj = cx.csm.cs_obj(cx.itn.empty(), obj);
                let ptr = cx.pfg.pointer(CsPointer::Var(caller_ctx, lhs));
                cx.worklist.push_back((ptr, PointsToSet::singleton(cs_obj)));
            }
        }

        // transfers wire TFG edges between call-site positions
        let transfers: Vec<TaintTransfer> = self.config.transfers_of(callee).to_vec();
        for transfer in transfers {
            let from = position_pointer(cx, caller_ctx, invoke, base, transfer.from);
            let to = position_pointer(cx, caller_ctx, invoke, base, transfer.to);
            if let (Some(from), Some(to)) = (from, to) {
                self.add_tfg_edge(cx, from, to, transfer);
            }
        }

        // sinks are recorded now, inspected after the fixpoint
        for &index in self.config.sinks_of(callee) {
            if let Some(&arg) = invoke.args.get(index) {
                self.sinks.push(SinkSite {
                    ctx: caller_ctx,
                    callsite,
                    index,
                    arg,
                });
            }
        }
    }

    /// Add a TFG edge; when the source already holds taint, enqueue a
    /// re-minted taint object at the transfer's output type.
    fn add_tfg_edge(
        &mut self,
        cx: &mut TaintSolverCtx<'_>,
        from: PtrId,
        to: PtrId,
        transfer: TaintTransfer,
    ) {
        let succs = self.tfg.entry(from).or_default();
        if succs.contains(&to) {
            return;
        }
        succs.push(to);

        let existing: Vec<CsObjId> = cx.pfg.pts(from).iter().collect();
        let mut seed = PointsToSet::new();
        for cs_obj in existing {
            let obj = cx.csm.obj_of(cs_obj);
            if let Some(source) = cx.heap.taint_source(obj) {
                let minted = cx.heap.make_taint(source, transfer.ty);
                seed.insert(cx.csm.cs_obj(cx.itn.empty(), minted));
            }
        }
        if !seed.is_empty() {
            cx.worklist.push_back((to, seed));
        }
    }

    /// Propagation hook: route the tainted subset of a delta along TFG
    /// edges. Returns that subset.
    pub fn propagate(
        &mut self,
        cx: &mut TaintSolverCtx<'_>,
        ptr: PtrId,
        delta: &PointsToSet<CsObjId>,
    ) -> PointsToSet<CsObjId> {
        let mut taint = PointsToSet::new();
        for cs_obj in delta.iter() {
            if cx.heap.is_taint(cx.csm.obj_of(cs_obj)) {
                taint.insert(cs_obj);
            }
        }
        if !taint.is_empty() {
            if let Some(succs) = self.tfg.get(&ptr) {
                for &succ in succs {
                    cx.worklist.push_back((succ, taint.clone()));
                }
            }
        }
        taint
    }

    /// Scan the recorded sinks against the final points-to sets.
    #[must_use]
    pub fn collect_flows(
        self,
        heap: &HeapModel,
        csm: &CsManager,
        pfg: &mut PointerFlowGraph<CsPointer, CsObjId>,
    ) -> BTreeSet<TaintFlow> {
        let mut flows = BTreeSet::new();
        for sink in &self.sinks {
            let ptr = pfg.pointer(CsPointer::Var(sink.ctx, sink.arg));
            for cs_obj in pfg.pts(ptr).iter().collect::<Vec<_>>() {
                let obj = csm.obj_of(cs_obj);
                if let Some(source) = heap.taint_source(obj) {
                    flows.insert(TaintFlow {
                        source,
                        sink: sink.callsite,
                        index: sink.index,
                    });
                }
            }
        }
        flows
    }
}

/// The pointer standing at a rule position of a call site, if the site
/// has one there.
fn position_pointer(
    cx: &mut TaintSolverCtx<'_>,
    ctx: CtxId,
    invoke: &Invoke,
    base: Option<PtrId>,
    pos: TaintPos,
) -> Option<PtrId> {
    match pos {
        TaintPos::Base => base,
        TaintPos::Arg(i) => invoke
            .args
            .get(i)
            .map(|&v| cx.pfg.pointer(CsPointer::Var(ctx, v))),
        TaintPos::Result => invoke
            .result
            .map(|v| cx.pfg.pointer(CsPointer::Var(ctx, v))),
    }
}
