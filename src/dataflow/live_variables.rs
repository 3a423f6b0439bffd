//! Live-variable analysis - backward dataflow.
//!
//! A variable is live at a program point if its current value may be read
//! before being redefined.
//!
//! # Data Flow Equations
//!
//! - `OUT[s] = ∪ IN[succ]` over the CFG successors of `s`
//! - `IN[s]  = uses(s) ∪ (OUT[s] \ def(s))`
//!
//! The boundary (the method exit) is empty: nothing is live after the
//! method returns. Dead-code detection consumes the OUT sets to find
//! assignments whose left-hand side is never read again.

use crate::cfg::{Cfg, CfgNode, CfgNodeId};
use crate::ir::{Ir, VarId};

use super::fact::SetFact;
use super::solver::DataflowAnalysis;

/// Live-variable analysis over one method body.
pub struct LiveVariables<'a> {
    ir: &'a Ir,
}

impl<'a> LiveVariables<'a> {
    /// Create the analysis for a method body.
    #[must_use]
    pub fn new(ir: &'a Ir) -> Self {
        Self { ir }
    }
}

impl DataflowAnalysis for LiveVariables<'_> {
    type Fact = SetFact<VarId>;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_boundary_fact(&self, _cfg: &Cfg) -> SetFact<VarId> {
        SetFact::new()
    }

    fn new_initial_fact(&self) -> SetFact<VarId> {
        SetFact::new()
    }

    fn meet_into(&self, fact: &SetFact<VarId>, target: &mut SetFact<VarId>) {
        target.union(fact);
    }

    fn transfer_node(
        &self,
        cfg: &Cfg,
        node: CfgNodeId,
        source: &SetFact<VarId>,
        target: &mut SetFact<VarId>,
    ) -> bool {
        // source is the OUT set, target the IN set being recomputed
        let mut new_in = source.clone();
        if let CfgNode::Stmt(i) = cfg.node(node) {
            let stmt = &self.ir.stmts[i];
            if let Some(def) = stmt.def() {
                new_in.remove(&def);
            }
            for var in stmt.uses() {
                new_in.add(var);
            }
        }
        let changed = *target != new_in;
        *target = new_in;
        changed
    }
}
