//! Generic intraprocedural worklist solver.
//!
//! # Algorithm
//!
//! Classic monotone-framework fixpoint over one method's CFG:
//!
//! 1. Seed the boundary node (entry for forward analyses, exit for
//!    backward ones) with the analysis' boundary fact; every other node
//!    starts at the initial fact.
//! 2. Enqueue all non-boundary nodes in program order.
//! 3. Pop a node, rebuild its incoming fact by meeting the flowing-out
//!    facts of its CFG neighbours, run the node transfer, and requeue the
//!    downstream neighbours when the transfer reports a change.
//!
//! Facts live in finite-height lattices and both `meet_into` and
//! `transfer_node` are monotone, so the loop terminates in the least
//! fixpoint. The queue is FIFO with a dense pending bitset, which makes
//! iteration order (and therefore tracing output) deterministic.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use tracing::trace;

use crate::cfg::{Cfg, CfgNodeId};

use super::fact::DataflowResult;

/// A dataflow analysis pluggable into [`solve`].
///
/// `transfer_node` receives the fact flowing *into* the node (IN for a
/// forward analysis, OUT for a backward one) as `source` and must update
/// `target` (OUT respectively IN) in place, returning whether `target`'s
/// final value differs from its value on entry. Implementations compare
/// against a snapshot rather than reporting "a write happened".
pub trait DataflowAnalysis {
    /// Lattice element annotating each CFG node.
    type Fact: Clone + PartialEq;

    /// Whether facts flow with the CFG edges or against them.
    fn is_forward(&self) -> bool;

    /// Fact seeded at the boundary node.
    fn new_boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    /// Fact every other node starts from.
    fn new_initial_fact(&self) -> Self::Fact;

    /// Meet `fact` into `target`.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Apply the node transfer; returns whether `target` changed.
    fn transfer_node(
        &self,
        cfg: &Cfg,
        node: CfgNodeId,
        source: &Self::Fact,
        target: &mut Self::Fact,
    ) -> bool;
}

/// Run an analysis to its fixpoint over one CFG.
#[must_use]
pub fn solve<A: DataflowAnalysis>(analysis: &A, cfg: &Cfg) -> DataflowResult<CfgNodeId, A::Fact> {
    if analysis.is_forward() {
        solve_forward(analysis, cfg)
    } else {
        solve_backward(analysis, cfg)
    }
}

fn solve_forward<A: DataflowAnalysis>(
    analysis: &A,
    cfg: &Cfg,
) -> DataflowResult<CfgNodeId, A::Fact> {
    let mut result = DataflowResult::new_with(cfg.node_count(), || analysis.new_initial_fact());
    result.set_out_fact(Cfg::ENTRY, analysis.new_boundary_fact(cfg));

    let mut worklist: VecDeque<CfgNodeId> = VecDeque::new();
    let mut pending = FixedBitSet::with_capacity(cfg.node_count());
    for node in cfg.nodes().filter(|&n| n != Cfg::ENTRY) {
        worklist.push_back(node);
        pending.insert(node.0);
    }

    let mut iterations = 0usize;
    while let Some(node) = worklist.pop_front() {
        pending.set(node.0, false);
        iterations += 1;

        let mut in_fact = analysis.new_initial_fact();
        for &pred in cfg.preds_of(node) {
            analysis.meet_into(result.out_fact(pred), &mut in_fact);
        }

        let changed = analysis.transfer_node(cfg, node, &in_fact, result.out_fact_mut(node));
        result.set_in_fact(node, in_fact);

        if changed {
            for &succ in cfg.succs_of(node) {
                if !pending.contains(succ.0) {
                    worklist.push_back(succ);
                    pending.insert(succ.0);
                }
            }
        }
    }

    trace!(method = ?cfg.method(), iterations, "forward fixpoint reached");
    result
}

fn solve_backward<A: DataflowAnalysis>(
    analysis: &A,
    cfg: &Cfg,
) -> DataflowResult<CfgNodeId, A::Fact> {
    let mut result = DataflowResult::new_with(cfg.node_count(), || analysis.new_initial_fact());
    result.set_in_fact(Cfg::EXIT, analysis.new_boundary_fact(cfg));

    let mut worklist: VecDeque<CfgNodeId> = VecDeque::new();
    let mut pending = FixedBitSet::with_capacity(cfg.node_count());
    for node in cfg.nodes().filter(|&n| n != Cfg::EXIT) {
        worklist.push_back(node);
        pending.insert(node.0);
    }

    let mut iterations = 0usize;
    while let Some(node) = worklist.pop_front() {
        pending.set(node.0, false);
        iterations += 1;

        let mut out_fact = analysis.new_initial_fact();
        for &succ in cfg.succs_of(node) {
            analysis.meet_into(result.in_fact(succ), &mut out_fact);
        }

        let changed = analysis.transfer_node(cfg, node, &out_fact, result.in_fact_mut(node));
        result.set_out_fact(node, out_fact);

        if changed {
            for &pred in cfg.preds_of(node) {
                if !pending.contains(pred.0) {
                    worklist.push_back(pred);
                    pending.insert(pred.0);
                }
            }
        }
    }

    trace!(method = ?cfg.method(), iterations, "backward fixpoint reached");
    result
}
