//! Dead-code detection.
//!
//! Fuses constant propagation and live variables into a reachability
//! traversal of the CFG:
//!
//! - An `If` whose condition evaluates to a constant only reaches the
//!   matching branch; the other arm is never entered.
//! - A `Switch` over a constant only reaches the matching case, or the
//!   default when no case matches.
//! - An assignment whose left-hand side is not live afterwards and whose
//!   right-hand side cannot be observed (no allocation, no heap or array
//!   access, no possible division fault) is itself dead, but the
//!   traversal continues through it.
//!
//! Everything not reached is dead. Entry and exit are always considered
//! reachable so that an empty method reports nothing.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::cfg::{build_cfg, Cfg, CfgNode, CfgNodeId, EdgeKind};
use crate::dataflow::fact::{CpFact, SetFact, Value};
use crate::dataflow::{solve, ConstantPropagation, DataflowResult, LiveVariables};
use crate::ir::{BinaryOp, MethodId, Program, Stmt, StmtRef, VarId};

/// Whether evaluating the right-hand side of an assignment can be
/// observed by the rest of the program.
///
/// Allocation touches the heap, field access can trigger initialization
/// or a null dereference, array access can fault, and `Div`/`Rem` can
/// divide by zero. Everything else is pure.
fn has_no_side_effect(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::New { .. } | Stmt::LoadField { .. } | Stmt::LoadArray { .. } => false,
        Stmt::Binary { op, .. } => !matches!(op, BinaryOp::Div | BinaryOp::Rem),
        _ => true,
    }
}

/// Detect dead statements in one method.
///
/// Runs constant propagation and live variables internally, then walks
/// the CFG from the entry pruning constant branches. The result is
/// sorted by statement index.
#[must_use]
pub fn detect_dead_code(program: &Program, method: MethodId) -> Vec<StmtRef> {
    let Some(ir) = program.ir_of(method) else {
        return Vec::new();
    };
    let cfg = build_cfg(method, ir);
    let cp = ConstantPropagation::new(program, ir);
    let constants = solve(&cp, &cfg);
    let live = solve(&LiveVariables::new(ir), &cfg);
    detect_with_results(program, method, &cfg, &constants, &live)
}

/// Detect dead statements using precomputed dataflow results.
#[must_use]
pub fn detect_with_results(
    program: &Program,
    method: MethodId,
    cfg: &Cfg,
    constants: &DataflowResult<CfgNodeId, CpFact>,
    live: &DataflowResult<CfgNodeId, SetFact<VarId>>,
) -> Vec<StmtRef> {
    let ir = match program.ir_of(method) {
        Some(ir) => ir,
        None => return Vec::new(),
    };
    let cp = ConstantPropagation::new(program, ir);

    let mut reachable = FixedBitSet::with_capacity(cfg.node_count());
    let mut visited = FixedBitSet::with_capacity(cfg.node_count());
    let mut queue: VecDeque<CfgNodeId> = VecDeque::new();

    reachable.insert(Cfg::ENTRY.0);
    reachable.insert(Cfg::EXIT.0);
    queue.push_back(Cfg::ENTRY);

    while let Some(node) = queue.pop_front() {
        if visited.contains(node.0) {
            continue;
        }
        visited.insert(node.0);

        let mut enqueue = |targets: &mut VecDeque<CfgNodeId>, target: CfgNodeId| {
            if !visited.contains(target.0) {
                targets.push_back(target);
            }
        };

        let stmt = match cfg.node(node) {
            CfgNode::Stmt(i) => &ir.stmts[i],
            CfgNode::Entry | CfgNode::Exit => {
                for &succ in cfg.succs_of(node) {
                    enqueue(&mut queue, succ);
                }
                continue;
            }
        };

        match stmt {
            Stmt::If { op, v1, v2, .. } => {
                reachable.insert(node.0);
                let cond = cp.evaluate_binary(op.as_binary(), *v1, *v2, constants.in_fact(node));
                if let Value::Const(k) = cond {
                    let wanted = if k != 0 {
                        EdgeKind::IfTrue
                    } else {
                        EdgeKind::IfFalse
                    };
                    for edge in cfg.out_edges_of(node) {
                        if edge.kind == wanted {
                            enqueue(&mut queue, edge.target);
                        }
                    }
                } else {
                    for &succ in cfg.succs_of(node) {
                        enqueue(&mut queue, succ);
                    }
                }
            }
            Stmt::Switch { var, .. } => {
                reachable.insert(node.0);
                match constants.in_fact(node).get(*var) {
                    Value::Const(k) => {
                        let mut matched = false;
                        for edge in cfg.out_edges_of(node) {
                            if edge.kind == EdgeKind::SwitchCase(k) {
                                matched = true;
                                enqueue(&mut queue, edge.target);
                            }
                        }
                        if !matched {
                            for edge in cfg.out_edges_of(node) {
                                if edge.kind == EdgeKind::SwitchDefault {
                                    enqueue(&mut queue, edge.target);
                                }
                            }
                        }
                    }
                    _ => {
                        for &succ in cfg.succs_of(node) {
                            enqueue(&mut queue, succ);
                        }
                    }
                }
            }
            _ if stmt.is_var_assign() => {
                let lhs = stmt.def();
                let dead_store = lhs
                    .map(|v| !live.out_fact(node).contains(&v) && has_no_side_effect(stmt))
                    .unwrap_or(false);
                if !dead_store {
                    reachable.insert(node.0);
                }
                for &succ in cfg.succs_of(node) {
                    enqueue(&mut queue, succ);
                }
            }
            _ => {
                reachable.insert(node.0);
                for &succ in cfg.succs_of(node) {
                    enqueue(&mut queue, succ);
                }
            }
        }
    }

    (0..ir.stmts.len())
        .filter(|&i| !reachable.contains(cfg.node_of_stmt(i).0))
        .map(|i| StmtRef::new(method, i))
        .collect()
}
