//! CFG construction from a method body.

use crate::ir::{Ir, MethodId, Stmt};

use super::types::{Cfg, CfgEdge, CfgNodeId, EdgeKind};

/// Build the control-flow graph of a method body.
///
/// Every statement becomes one node. Fall-through edges connect a
/// statement to its body successor (or to the exit for the final
/// statement); `If`/`Goto`/`Switch` add their labelled jump edges, and
/// `Return` flows to the exit.
#[must_use]
pub fn build_cfg(method: MethodId, ir: &Ir) -> Cfg {
    let stmt_count = ir.stmts.len();
    let node_count = stmt_count + 2;
    let mut out_edges: Vec<Vec<CfgEdge>> = vec![Vec::new(); node_count];

    let node_of = |index: usize| CfgNodeId(index + 2);
    // Fall-through target of statement i: the next statement, or exit.
    let next_of = |index: usize| {
        if index + 1 < stmt_count {
            node_of(index + 1)
        } else {
            Cfg::EXIT
        }
    };

    let first = if stmt_count > 0 { node_of(0) } else { Cfg::EXIT };
    out_edges[Cfg::ENTRY.0].push(CfgEdge {
        source: Cfg::ENTRY,
        target: first,
        kind: EdgeKind::FallThrough,
    });

    for (i, stmt) in ir.stmts.iter().enumerate() {
        let source = node_of(i);
        let edges = &mut out_edges[source.0];
        match stmt {
            Stmt::If { target, .. } => {
                edges.push(CfgEdge {
                    source,
                    target: node_of(*target),
                    kind: EdgeKind::IfTrue,
                });
                edges.push(CfgEdge {
                    source,
                    target: next_of(i),
                    kind: EdgeKind::IfFalse,
                });
            }
            Stmt::Goto { target } => {
                edges.push(CfgEdge {
                    source,
                    target: node_of(*target),
                    kind: EdgeKind::Goto,
                });
            }
            Stmt::Switch { cases, default, .. } => {
                for (value, target) in cases {
                    edges.push(CfgEdge {
                        source,
                        target: node_of(*target),
                        kind: EdgeKind::SwitchCase(*value),
                    });
                }
                edges.push(CfgEdge {
                    source,
                    target: node_of(*default),
                    kind: EdgeKind::SwitchDefault,
                });
            }
            Stmt::Return { .. } => {
                edges.push(CfgEdge {
                    source,
                    target: Cfg::EXIT,
                    kind: EdgeKind::Return,
                });
            }
            _ => {
                edges.push(CfgEdge {
                    source,
                    target: next_of(i),
                    kind: EdgeKind::FallThrough,
                });
            }
        }
    }

    let mut succs: Vec<Vec<CfgNodeId>> = vec![Vec::new(); node_count];
    let mut preds: Vec<Vec<CfgNodeId>> = vec![Vec::new(); node_count];
    for edges in &out_edges {
        for edge in edges {
            if !succs[edge.source.0].contains(&edge.target) {
                succs[edge.source.0].push(edge.target);
            }
            if !preds[edge.target.0].contains(&edge.source) {
                preds[edge.target.0].push(edge.source);
            }
        }
    }

    Cfg::new(method, stmt_count, out_edges, succs, preds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::CfgNode;
    use crate::ir::{CondOp, ProgramBuilder, Type, VarId};

    fn branch_ir() -> (MethodId, Ir) {
        // 0: x = 1
        // 1: if (x == x) goto 3
        // 2: x = 2
        // 3: return
        let mut b = ProgramBuilder::new();
        let c = b.add_class("A", None);
        let m = b.add_method(c, "main()", true);
        let x = b.add_var(m, "x", Type::Int);
        b.set_body(
            m,
            vec![],
            None,
            vec![],
            vec![
                Stmt::AssignLiteral { lhs: x, value: 1 },
                Stmt::If {
                    op: CondOp::Eq,
                    v1: x,
                    v2: x,
                    target: 3,
                },
                Stmt::AssignLiteral { lhs: x, value: 2 },
                Stmt::Return { value: None },
            ],
        );
        let p = b.finish(m).unwrap();
        (m, p.ir_of(m).unwrap().clone())
    }

    #[test]
    fn entry_flows_to_first_statement() {
        let (m, ir) = branch_ir();
        let cfg = build_cfg(m, &ir);
        assert_eq!(cfg.succs_of(Cfg::ENTRY), &[cfg.node_of_stmt(0)]);
        assert_eq!(cfg.node(cfg.node_of_stmt(0)), CfgNode::Stmt(0));
    }

    #[test]
    fn if_has_labelled_true_and_false_edges() {
        let (m, ir) = branch_ir();
        let cfg = build_cfg(m, &ir);
        let branch = cfg.node_of_stmt(1);
        let edges = cfg.out_edges_of(branch);
        assert_eq!(edges.len(), 2);
        assert!(edges
            .iter()
            .any(|e| e.kind == EdgeKind::IfTrue && e.target == cfg.node_of_stmt(3)));
        assert!(edges
            .iter()
            .any(|e| e.kind == EdgeKind::IfFalse && e.target == cfg.node_of_stmt(2)));
    }

    #[test]
    fn return_flows_to_exit() {
        let (m, ir) = branch_ir();
        let cfg = build_cfg(m, &ir);
        assert_eq!(cfg.succs_of(cfg.node_of_stmt(3)), &[Cfg::EXIT]);
        // exit has the return statement as its only predecessor
        assert_eq!(cfg.preds_of(Cfg::EXIT), &[cfg.node_of_stmt(3)]);
    }

    #[test]
    fn empty_body_connects_entry_to_exit() {
        let cfg = build_cfg(
            MethodId(0),
            &Ir {
                params: vec![VarId(0)],
                this: None,
                return_vars: vec![],
                stmts: vec![],
            },
        );
        assert_eq!(cfg.succs_of(Cfg::ENTRY), &[Cfg::EXIT]);
    }
}
