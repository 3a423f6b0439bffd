//! Intraprocedural constant propagation for integer variables.
//!
//! Forward analysis over [`CpFact`]s. Each definition statement kills its
//! left-hand side and generates the abstract value of its right-hand
//! side; everything else copies facts through.
//!
//! # Boundary
//!
//! Parameters are unknown at a method boundary, so every int-holding
//! parameter starts at `Nac`. All other variables start absent (`Undef`).
//!
//! # Evaluation
//!
//! `x = a op b` folds when both operands are constants, with wrap-around
//! 32-bit semantics. A constant-zero divisor makes `Div`/`Rem` evaluate
//! to `Undef`: the statement cannot complete normally, and treating the
//! result as bottom lets dead-code detection prune what follows. The
//! zero-divisor rule is checked before the `Nac` rule on purpose:
//! `nac / 0` is still `Undef`.

use crate::cfg::{Cfg, CfgNode, CfgNodeId};
use crate::ir::{BinaryOp, Ir, Program, Stmt, VarId};

use super::fact::{CpFact, Value};
use super::solver::DataflowAnalysis;

/// Constant propagation over one method body.
pub struct ConstantPropagation<'a> {
    program: &'a Program,
    ir: &'a Ir,
}

impl<'a> ConstantPropagation<'a> {
    /// Create the analysis for a method body.
    #[must_use]
    pub fn new(program: &'a Program, ir: &'a Ir) -> Self {
        Self { program, ir }
    }

    /// Whether a variable participates in the analysis.
    #[inline]
    #[must_use]
    pub fn can_hold_int(&self, var: VarId) -> bool {
        self.program.var(var).ty.can_hold_int()
    }

    /// Abstract value of a binary expression under `fact`.
    ///
    /// Evaluation order matters: the zero-divisor check precedes the
    /// `Nac` rule, then `Nac` absorbs, then `Undef` propagates, then
    /// constants fold.
    #[must_use]
    pub fn evaluate_binary(&self, op: BinaryOp, v1: VarId, v2: VarId, fact: &CpFact) -> Value {
        let x1 = fact.get(v1);
        let x2 = fact.get(v2);
        if op.may_divide_by_zero() && x2 == Value::Const(0) {
            return Value::Undef;
        }
        if x1.is_nac() || x2.is_nac() {
            return Value::Nac;
        }
        if x1.is_undef() || x2.is_undef() {
            return Value::Undef;
        }
        match (x1, x2) {
            (Value::Const(a), Value::Const(b)) => Value::Const(op.apply(a, b)),
            _ => Value::Nac,
        }
    }

    /// Abstract value of a definition's right-hand side.
    fn evaluate_rhs(&self, stmt: &Stmt, fact: &CpFact) -> Value {
        match stmt {
            Stmt::AssignLiteral { value, .. } => Value::Const(*value),
            Stmt::Copy { rhs, .. } => fact.get(*rhs),
            Stmt::Binary { op, v1, v2, .. } => self.evaluate_binary(*op, *v1, *v2, fact),
            // heap loads, allocations and call results are opaque here
            _ => Value::Nac,
        }
    }

    /// Transfer one statement: `out := (in \ def) ∪ gen`.
    ///
    /// Shared with the interprocedural analysis, which delegates every
    /// statement it does not treat specially. The change flag compares
    /// `out` against its entry value, so repeated identical writes do not
    /// report progress.
    pub fn transfer_stmt(&self, stmt: &Stmt, in_fact: &CpFact, out: &mut CpFact) -> bool {
        let mut in_tmp = in_fact.clone();
        if let Some(lhs) = stmt.def() {
            if self.can_hold_int(lhs) {
                let mut gen = CpFact::new();
                gen.update(lhs, self.evaluate_rhs(stmt, in_fact));
                in_tmp.remove(lhs);
                let gen_changed = out.copy_from(&gen);
                return out.copy_from(&in_tmp) || gen_changed;
            }
        }
        out.copy_from(&in_tmp)
    }
}

impl DataflowAnalysis for ConstantPropagation<'_> {
    type Fact = CpFact;

    fn is_forward(&self) -> bool {
        true
    }

    fn new_boundary_fact(&self, _cfg: &Cfg) -> CpFact {
        let mut fact = CpFact::new();
        for &param in &self.ir.params {
            if self.can_hold_int(param) {
                fact.update(param, Value::Nac);
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) {
        for var in fact.keys() {
            let merged = fact.get(var).meet(target.get(var));
            target.update(var, merged);
        }
    }

    fn transfer_node(
        &self,
        cfg: &Cfg,
        node: CfgNodeId,
        source: &CpFact,
        target: &mut CpFact,
    ) -> bool {
        match cfg.node(node) {
            CfgNode::Stmt(i) => self.transfer_stmt(&self.ir.stmts[i], source, target),
            CfgNode::Entry | CfgNode::Exit => target.copy_from(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::build_cfg;
    use crate::dataflow::solver::solve;
    use crate::ir::{CondOp, MethodId, ProgramBuilder, Type};

    struct Fixture {
        program: Program,
        method: MethodId,
    }

    /// Build a one-method program from the given statements; `var_types`
    /// lists (name, type) pairs, the first `param_count` of which are
    /// parameters.
    fn fixture(var_types: &[(&str, Type)], param_count: usize, stmts: Vec<Stmt>) -> Fixture {
        let mut b = ProgramBuilder::new();
        let class = b.add_class("Test", None);
        let method = b.add_method(class, "run()", true);
        let vars: Vec<VarId> = var_types
            .iter()
            .map(|(name, ty)| b.add_var(method, name, *ty))
            .collect();
        b.set_body(method, vars[..param_count].to_vec(), None, vec![], stmts);
        Fixture {
            program: b.finish(method).unwrap(),
            method,
        }
    }

    fn run(fx: &Fixture) -> (Cfg, crate::dataflow::DataflowResult<CfgNodeId, CpFact>) {
        let ir = fx.program.ir_of(fx.method).unwrap();
        let cfg = build_cfg(fx.method, ir);
        let analysis = ConstantPropagation::new(&fx.program, ir);
        let result = solve(&analysis, &cfg);
        (cfg, result)
    }

    #[test]
    fn straight_line_folding() {
        // x = 5; y = x + 3
        let fx = fixture(
            &[("x", Type::Int), ("y", Type::Int)],
            0,
            vec![
                Stmt::AssignLiteral {
                    lhs: VarId(0),
                    value: 5,
                },
                Stmt::Binary {
                    lhs: VarId(1),
                    op: BinaryOp::Add,
                    v1: VarId(0),
                    v2: VarId(0),
                },
            ],
        );
        let (cfg, result) = run(&fx);
        let out = result.out_fact(cfg.node_of_stmt(1));
        assert_eq!(out.get(VarId(0)), Value::Const(5));
        assert_eq!(out.get(VarId(1)), Value::Const(10));
    }

    #[test]
    fn parameters_start_at_nac() {
        // p is a parameter: x = p
        let fx = fixture(
            &[("p", Type::Int), ("x", Type::Int)],
            1,
            vec![Stmt::Copy {
                lhs: VarId(1),
                rhs: VarId(0),
            }],
        );
        let (cfg, result) = run(&fx);
        assert_eq!(
            result.out_fact(cfg.node_of_stmt(0)).get(VarId(1)),
            Value::Nac
        );
    }

    #[test]
    fn branch_meet_keeps_agreeing_values() {
        // z = 0; a = 1; b = 2;
        // if (p != z) { a = 2; b = 1; c = a + b } else { c = a + b }
        // both arms compute c = 3, so c survives the join while a and b
        // degrade to nac
        let p = VarId(0);
        let z = VarId(1);
        let a = VarId(2);
        let bb = VarId(3);
        let c = VarId(4);
        let fx = fixture(
            &[
                ("p", Type::Int),
                ("z", Type::Int),
                ("a", Type::Int),
                ("b", Type::Int),
                ("c", Type::Int),
            ],
            1,
            vec![
                // 0
                Stmt::AssignLiteral { lhs: z, value: 0 },
                // 1
                Stmt::AssignLiteral { lhs: a, value: 1 },
                // 2
                Stmt::AssignLiteral { lhs: bb, value: 2 },
                // 3
                Stmt::If {
                    op: CondOp::Ne,
                    v1: p,
                    v2: z,
                    target: 6,
                },
                // 4: else arm
                Stmt::Binary {
                    lhs: c,
                    op: BinaryOp::Add,
                    v1: a,
                    v2: bb,
                },
                // 5
                Stmt::Goto { target: 9 },
                // 6: then arm
                Stmt::AssignLiteral { lhs: a, value: 2 },
                // 7
                Stmt::AssignLiteral { lhs: bb, value: 1 },
                // 8
                Stmt::Binary {
                    lhs: c,
                    op: BinaryOp::Add,
                    v1: a,
                    v2: bb,
                },
                // 9
                Stmt::Return { value: Some(c) },
            ],
        );
        let (cfg, result) = run(&fx);
        let at_return = result.in_fact(cfg.node_of_stmt(9));
        assert_eq!(at_return.get(a), Value::Nac);
        assert_eq!(at_return.get(bb), Value::Nac);
        assert_eq!(at_return.get(c), Value::Const(3));
    }

    #[test]
    fn division_by_constant_zero_is_undef() {
        // x = 0; y = 10; q = y / x
        let fx = fixture(
            &[("x", Type::Int), ("y", Type::Int), ("q", Type::Int)],
            0,
            vec![
                Stmt::AssignLiteral {
                    lhs: VarId(0),
                    value: 0,
                },
                Stmt::AssignLiteral {
                    lhs: VarId(1),
                    value: 10,
                },
                Stmt::Binary {
                    lhs: VarId(2),
                    op: BinaryOp::Div,
                    v1: VarId(1),
                    v2: VarId(0),
                },
            ],
        );
        let (cfg, result) = run(&fx);
        assert_eq!(
            result.out_fact(cfg.node_of_stmt(2)).get(VarId(2)),
            Value::Undef
        );
    }

    #[test]
    fn zero_divisor_beats_nac_operand() {
        // p is a parameter (nac); z = 0; q = p % z  ->  undef, not nac
        let fx = fixture(
            &[("p", Type::Int), ("z", Type::Int), ("q", Type::Int)],
            1,
            vec![
                Stmt::AssignLiteral {
                    lhs: VarId(1),
                    value: 0,
                },
                Stmt::Binary {
                    lhs: VarId(2),
                    op: BinaryOp::Rem,
                    v1: VarId(0),
                    v2: VarId(1),
                },
            ],
        );
        let (cfg, result) = run(&fx);
        assert_eq!(
            result.out_fact(cfg.node_of_stmt(1)).get(VarId(2)),
            Value::Undef
        );
    }

    #[test]
    fn non_int_definitions_pass_through() {
        // r = new Test; x = 7: the reference definition must not perturb facts
        let fx = fixture(
            &[("r", Type::Object(crate::ir::ClassId(0))), ("x", Type::Int)],
            0,
            vec![
                Stmt::New {
                    lhs: VarId(0),
                    class: crate::ir::ClassId(0),
                },
                Stmt::AssignLiteral {
                    lhs: VarId(1),
                    value: 7,
                },
            ],
        );
        let (cfg, result) = run(&fx);
        let out = result.out_fact(cfg.node_of_stmt(1));
        assert_eq!(out.get(VarId(0)), Value::Undef);
        assert_eq!(out.get(VarId(1)), Value::Const(7));
    }

    #[test]
    fn loop_reaches_fixpoint_with_nac() {
        // i = 0; L: if (i < n) { i = i + one; goto L }
        let i = VarId(0);
        let n = VarId(1);
        let one = VarId(2);
        let fx = fixture(
            &[("i", Type::Int), ("n", Type::Int), ("one", Type::Int)],
            2,
            vec![
                // 0
                Stmt::AssignLiteral { lhs: one, value: 1 },
                // 1
                Stmt::AssignLiteral { lhs: i, value: 0 },
                // 2: loop head
                Stmt::If {
                    op: CondOp::Lt,
                    v1: i,
                    v2: n,
                    target: 3,
                },
                // 3: body (reached via IfTrue; fallthrough also lands here)
                Stmt::Binary {
                    lhs: i,
                    op: BinaryOp::Add,
                    v1: i,
                    v2: one,
                },
                // 4
                Stmt::Goto { target: 2 },
            ],
        );
        let (cfg, result) = run(&fx);
        // after the back edge joins, i is 0 meet 1 meet 2 ... = nac
        assert_eq!(result.in_fact(cfg.node_of_stmt(2)).get(i), Value::Nac);
        assert_eq!(result.in_fact(cfg.node_of_stmt(2)).get(one), Value::Const(1));
    }
}
