//! Interprocedural dataflow over the ICFG.
//!
//! # Solver
//!
//! Same worklist discipline as the intraprocedural solver, with two
//! differences dictated by the ICFG:
//!
//! - Facts crossing an edge are first filtered through the analysis'
//!   *edge transfer* (identity on `Normal`, kill-the-result on
//!   `CallToReturn`, argument-to-parameter on `Call`, return-value on
//!   `Return`), then met into the node's IN fact.
//! - The entry nodes of entry methods keep their boundary OUT fact
//!   forever; the solver never recomputes them.
//!
//! The IN fact accumulates across visits instead of being rebuilt - on a
//! monotone lattice both strategies converge to the same fixpoint, and
//! accumulation is what lets store statements wake up loads that sit on
//! no ICFG path from them.
//!
//! # Inter constant propagation
//!
//! [`InterConstantPropagation`] layers alias information from a pointer
//! analysis over the intraprocedural transfer: a heap or array load
//! takes the meet of the values stored by every aliasing store, and a
//! store that changes its OUT fact re-enqueues every dependent load,
//! even when no ICFG path connects them.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::icfg::{Icfg, IcfgEdge, IcfgEdgeKind, IcfgNodeId};
use crate::ir::{FieldId, Program, Stmt, VarAccessIndex, VarId};
use crate::pta::PointerAnalysisResult;

use super::constant_propagation::ConstantPropagation;
use super::fact::{CpFact, DataflowResult, Value};

/// An interprocedural dataflow analysis pluggable into [`InterSolver`].
pub trait InterDataflowAnalysis {
    /// Lattice element annotating each ICFG node.
    type Fact: Clone + PartialEq;

    /// Boundary fact for an entry method's entry node.
    fn new_boundary_fact(&self, icfg: &Icfg, node: IcfgNodeId) -> Self::Fact;

    /// Fact every other node starts from.
    fn new_initial_fact(&self) -> Self::Fact;

    /// Meet `fact` into `target`.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Filter a fact through an ICFG edge.
    fn transfer_edge(&self, icfg: &Icfg, edge: &IcfgEdge, out_fact: &Self::Fact) -> Self::Fact;

    /// Apply the node transfer; returns whether `out` changed.
    ///
    /// `result` is the solver's current (still evolving) result store,
    /// for analyses that read facts of unrelated nodes; nodes pushed
    /// into `extra` are re-enqueued regardless of edge connectivity.
    fn transfer_node(
        &mut self,
        icfg: &Icfg,
        node: IcfgNodeId,
        in_fact: &Self::Fact,
        out: &mut Self::Fact,
        result: &DataflowResult<IcfgNodeId, Self::Fact>,
        extra: &mut Vec<IcfgNodeId>,
    ) -> bool;
}

/// Worklist solver for interprocedural analyses.
pub struct InterSolver<'i> {
    icfg: &'i Icfg,
}

impl<'i> InterSolver<'i> {
    /// Create a solver over an ICFG.
    #[must_use]
    pub fn new(icfg: &'i Icfg) -> Self {
        Self { icfg }
    }

    /// Run an analysis to its fixpoint.
    pub fn solve<A: InterDataflowAnalysis>(
        &self,
        analysis: &mut A,
    ) -> DataflowResult<IcfgNodeId, A::Fact> {
        let icfg = self.icfg;
        let mut result = DataflowResult::new_with(icfg.node_count(), || analysis.new_initial_fact());

        let mut is_entry = FixedBitSet::with_capacity(icfg.node_count());
        for &entry in icfg.entry_nodes() {
            is_entry.insert(entry.0);
            result.set_out_fact(entry, analysis.new_boundary_fact(icfg, entry));
        }

        let mut worklist: VecDeque<IcfgNodeId> = VecDeque::new();
        let mut pending = FixedBitSet::with_capacity(icfg.node_count());
        for node in icfg.nodes() {
            if !is_entry.contains(node.0) {
                worklist.push_back(node);
                pending.insert(node.0);
            }
        }

        let mut iterations = 0usize;
        let mut extra: Vec<IcfgNodeId> = Vec::new();
        while let Some(node) = worklist.pop_front() {
            pending.set(node.0, false);
            iterations += 1;

            let mut in_fact = result.in_fact(node).clone();
            for edge in icfg.in_edges_of(node) {
                let transferred = analysis.transfer_edge(icfg, edge, result.out_fact(edge.source));
                analysis.meet_into(&transferred, &mut in_fact);
            }

            let mut out = result.out_fact(node).clone();
            extra.clear();
            let changed = analysis.transfer_node(icfg, node, &in_fact, &mut out, &result, &mut extra);
            result.set_in_fact(node, in_fact);
            result.set_out_fact(node, out);

            if changed {
                for edge in icfg.out_edges_of(node) {
                    let target = edge.target;
                    if !is_entry.contains(target.0) && !pending.contains(target.0) {
                        worklist.push_back(target);
                        pending.insert(target.0);
                    }
                }
            }
            for &woken in &extra {
                if !is_entry.contains(woken.0) && !pending.contains(woken.0) {
                    worklist.push_back(woken);
                    pending.insert(woken.0);
                }
            }
        }

        debug!(iterations, nodes = icfg.node_count(), "inter fixpoint reached");
        result
    }
}

// =============================================================================
// Interprocedural constant propagation
// =============================================================================

/// Alias-aware interprocedural constant propagation.
///
/// Built from a frozen [`PointerAnalysisResult`]; the alias map and the
/// static store/load indexes are computed once here and never change
/// while the solver runs.
pub struct InterConstantPropagation<'p> {
    program: &'p Program,
    access: VarAccessIndex,
    alias_map: FxHashMap<VarId, Vec<VarId>>,
    static_stores: FxHashMap<FieldId, Vec<IcfgNodeId>>,
    static_loads: FxHashMap<FieldId, Vec<IcfgNodeId>>,
}

impl<'p> InterConstantPropagation<'p> {
    /// Precompute alias and static-access indexes.
    #[must_use]
    pub fn new(program: &'p Program, icfg: &Icfg, pta: &PointerAnalysisResult) -> Self {
        let mut alias_map: FxHashMap<VarId, Vec<VarId>> = FxHashMap::default();
        let vars = pta.vars_with_objects();
        for &base in &vars {
            for &var in &vars {
                if pta.points_to(base).intersects(pta.points_to(var)) {
                    alias_map.entry(base).or_default().push(var);
                }
            }
        }

        let mut static_stores: FxHashMap<FieldId, Vec<IcfgNodeId>> = FxHashMap::default();
        let mut static_loads: FxHashMap<FieldId, Vec<IcfgNodeId>> = FxHashMap::default();
        for node in icfg.nodes() {
            let Some(site) = icfg.stmt_ref_of(node) else {
                continue;
            };
            match program.stmt_at(site) {
                Some(Stmt::StoreField {
                    base: None, field, ..
                }) => static_stores.entry(*field).or_default().push(node),
                Some(Stmt::LoadField {
                    base: None, field, ..
                }) => static_loads.entry(*field).or_default().push(node),
                _ => {}
            }
        }

        debug!(
            aliased_vars = alias_map.len(),
            static_fields = static_stores.len(),
            "inter constant propagation indexes frozen"
        );
        Self {
            program,
            access: VarAccessIndex::build(program),
            alias_map,
            static_stores,
            static_loads,
        }
    }

    fn cp_for(&self, node_method: crate::ir::MethodId) -> Option<ConstantPropagation<'p>> {
        self.program
            .ir_of(node_method)
            .map(|ir| ConstantPropagation::new(self.program, ir))
    }

    fn aliases_of(&self, base: VarId) -> &[VarId] {
        self.alias_map.get(&base).map_or(&[], Vec::as_slice)
    }

    /// Two array indexes may refer to the same slot unless both are
    /// known constants that differ; `Undef` on either side never
    /// matches.
    fn index_match(load_index: Value, store_index: Value) -> bool {
        match (load_index, store_index) {
            (Value::Const(a), Value::Const(b)) => a == b,
            (Value::Const(_), Value::Nac)
            | (Value::Nac, Value::Const(_))
            | (Value::Nac, Value::Nac) => true,
            _ => false,
        }
    }

    /// Fold a store-site contribution into the accumulated load value.
    fn meet_opt(acc: Option<Value>, value: Value) -> Option<Value> {
        Some(match acc {
            Some(prev) => prev.meet(value),
            None => value,
        })
    }

    /// Apply the gen/kill update shared by both load transfers.
    fn load_update(lhs: VarId, loaded: Option<Value>, in_fact: &CpFact, out: &mut CpFact) -> bool {
        let mut in_tmp = in_fact.clone();
        let mut gen = CpFact::new();
        if let Some(value) = loaded {
            gen.update(lhs, value);
            in_tmp.remove(lhs);
        }
        let gen_changed = out.copy_from(&gen);
        out.copy_from(&in_tmp) || gen_changed
    }

    fn transfer_load_field(
        &self,
        icfg: &Icfg,
        stmt: &Stmt,
        in_fact: &CpFact,
        out: &mut CpFact,
        result: &DataflowResult<IcfgNodeId, CpFact>,
    ) -> bool {
        let Stmt::LoadField { lhs, base, field } = stmt else {
            unreachable!("caller matched LoadField");
        };
        let mut loaded: Option<Value> = None;
        match base {
            None => {
                for &store_node in self
                    .static_stores
                    .get(field)
                    .map_or(&[][..], Vec::as_slice)
                {
                    if let Some(Stmt::StoreField { rhs, .. }) =
                        icfg.stmt_ref_of(store_node).and_then(|s| self.program.stmt_at(s))
                    {
                        loaded = Self::meet_opt(loaded, result.out_fact(store_node).get(*rhs));
                    }
                }
            }
            Some(b) => {
                for &alias in self.aliases_of(*b) {
                    for &site in self.access.store_fields_of(alias) {
                        let Some(Stmt::StoreField {
                            field: store_field,
                            rhs,
                            ..
                        }) = self.program.stmt_at(site)
                        else {
                            continue;
                        };
                        if store_field != field {
                            continue;
                        }
                        let Some(store_node) = icfg.node_of_stmt(site) else {
                            continue;
                        };
                        loaded = Self::meet_opt(loaded, result.out_fact(store_node).get(*rhs));
                    }
                }
            }
        }
        Self::load_update(*lhs, loaded, in_fact, out)
    }

    fn transfer_load_array(
        &self,
        icfg: &Icfg,
        stmt: &Stmt,
        in_fact: &CpFact,
        out: &mut CpFact,
        result: &DataflowResult<IcfgNodeId, CpFact>,
    ) -> bool {
        let Stmt::LoadArray { lhs, base, index } = stmt else {
            unreachable!("caller matched LoadArray");
        };
        let load_index = in_fact.get(*index);
        let mut loaded: Option<Value> = None;
        for &alias in self.aliases_of(*base) {
            for &site in self.access.store_arrays_of(alias) {
                let Some(Stmt::StoreArray {
                    index: store_index,
                    rhs,
                    ..
                }) = self.program.stmt_at(site)
                else {
                    continue;
                };
                let Some(store_node) = icfg.node_of_stmt(site) else {
                    continue;
                };
                let store_index_value = result.in_fact(store_node).get(*store_index);
                if Self::index_match(load_index, store_index_value) {
                    loaded = Self::meet_opt(loaded, result.out_fact(store_node).get(*rhs));
                }
            }
        }
        Self::load_update(*lhs, loaded, in_fact, out)
    }

    /// Loads that must be revisited after a store changed its OUT fact.
    fn dependents_of_store(&self, icfg: &Icfg, stmt: &Stmt) -> Vec<IcfgNodeId> {
        let mut woken = Vec::new();
        match stmt {
            Stmt::StoreField {
                base: None, field, ..
            } => {
                if let Some(loads) = self.static_loads.get(field) {
                    woken.extend_from_slice(loads);
                }
            }
            Stmt::StoreField {
                base: Some(b), ..
            } => {
                for &alias in self.aliases_of(*b) {
                    for &site in self.access.load_fields_of(alias) {
                        if let Some(node) = icfg.node_of_stmt(site) {
                            woken.push(node);
                        }
                    }
                }
            }
            Stmt::StoreArray { base, .. } => {
                for &alias in self.aliases_of(*base) {
                    for &site in self.access.load_arrays_of(alias) {
                        if let Some(node) = icfg.node_of_stmt(site) {
                            woken.push(node);
                        }
                    }
                }
            }
            _ => {}
        }
        woken
    }
}

impl InterDataflowAnalysis for InterConstantPropagation<'_> {
    type Fact = CpFact;

    fn new_boundary_fact(&self, icfg: &Icfg, node: IcfgNodeId) -> CpFact {
        let method = icfg.method_of(node);
        let mut fact = CpFact::new();
        if let Some(ir) = self.program.ir_of(method) {
            for &param in &ir.params {
                if self.program.var(param).ty.can_hold_int() {
                    fact.update(param, Value::Nac);
                }
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

    fn transfer_edge(&self, icfg: &Icfg, edge: &IcfgEdge, out_fact: &CpFact) -> CpFact {
        match &edge.kind {
            IcfgEdgeKind::Normal => out_fact.clone(),
            IcfgEdgeKind::CallToReturn { callsite } => {
                // the call's result arrives via the return edge; kill it
                let mut fact = out_fact.clone();
                if let Some(def) = self
                    .program
                    .stmt_at(*callsite)
                    .and_then(Stmt::def)
                {
                    fact.remove(def);
                }
                fact
            }
            IcfgEdgeKind::Call { callee } => {
                let mut fact = CpFact::new();
                let invoke = icfg
                    .stmt_ref_of(edge.source)
                    .and_then(|site| self.program.stmt_at(site))
                    .and_then(Stmt::as_invoke);
                if let (Some(invoke), Some(callee_ir)) = (invoke, self.program.ir_of(*callee)) {
                    for (&arg, &param) in invoke.args.iter().zip(callee_ir.params.iter()) {
                        fact.update(param, out_fact.get(arg));
                    }
                }
                fact
            }
            IcfgEdgeKind::Return { callsite, ret_vars } => {
                let mut fact = CpFact::new();
                let mut merged: Option<Value> = None;
                for &rv in ret_vars {
                    merged = Self::meet_opt(merged, out_fact.get(rv));
                }
                if let (Some(value), Some(def)) = (
                    merged,
                    self.program.stmt_at(*callsite).and_then(Stmt::def),
                ) {
                    fact.update(def, value);
                }
                fact
            }
        }
    }

    fn transfer_node(
        &mut self,
        icfg: &Icfg,
        node: IcfgNodeId,
        in_fact: &CpFact,
        out: &mut CpFact,
        result: &DataflowResult<IcfgNodeId, CpFact>,
        extra: &mut Vec<IcfgNodeId>,
    ) -> bool {
        let method = icfg.method_of(node);
        let Some(site) = icfg.stmt_ref_of(node) else {
            // synthetic entry/exit nodes copy through
            return out.copy_from(in_fact);
        };
        let Some(stmt) = self.program.stmt_at(site) else {
            return out.copy_from(in_fact);
        };

        match stmt {
            // call-site facts flow around the call via the edges
            Stmt::Invoke(_) => out.copy_from(in_fact),
            Stmt::LoadField { lhs, .. } if self.program.var(*lhs).ty.can_hold_int() => {
                self.transfer_load_field(icfg, stmt, in_fact, out, result)
            }
            Stmt::LoadArray { lhs, .. } if self.program.var(*lhs).ty.can_hold_int() => {
                self.transfer_load_array(icfg, stmt, in_fact, out, result)
            }
            Stmt::StoreField { .. } | Stmt::StoreArray { .. } => {
                let changed = match self.cp_for(method) {
                    Some(cp) => cp.transfer_stmt(stmt, in_fact, out),
                    None => out.copy_from(in_fact),
                };
                if changed {
                    extra.extend(self.dependents_of_store(icfg, stmt));
                }
                changed
            }
            _ => match self.cp_for(method) {
                Some(cp) => cp.transfer_stmt(stmt, in_fact, out),
                None => out.copy_from(in_fact),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CallKind, Invoke, MethodId, ProgramBuilder, StmtRef, Type};
    use crate::pta::solve_ci;

    fn run_inter(
        program: &Program,
    ) -> (Icfg, DataflowResult<IcfgNodeId, CpFact>) {
        let pta = solve_ci(program);
        let icfg = Icfg::build(program, pta.call_graph());
        let mut analysis = InterConstantPropagation::new(program, &icfg, &pta);
        let result = InterSolver::new(&icfg).solve(&mut analysis);
        (icfg, result)
    }

    #[test]
    fn constants_flow_through_calls_and_back() {
        // callee(p) { q = p + p; return q }   main { x = 21; y = callee(x) }
        let mut b = ProgramBuilder::new();
        let class = b.add_class("C", None);
        let callee = b.add_method(class, "callee(int)", true);
        let p = b.add_var(callee, "p", Type::Int);
        let q = b.add_var(callee, "q", Type::Int);
        b.set_body(
            callee,
            vec![p],
            None,
            vec![q],
            vec![
                Stmt::Binary {
                    lhs: q,
                    op: crate::ir::BinaryOp::Add,
                    v1: p,
                    v2: p,
                },
                Stmt::Return { value: Some(q) },
            ],
        );
        let main = b.add_method(class, "main()", true);
        let x = b.add_var(main, "x", Type::Int);
        let y = b.add_var(main, "y", Type::Int);
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::AssignLiteral { lhs: x, value: 21 },
                Stmt::Invoke(Invoke {
                    kind: CallKind::Static,
                    declaring: class,
                    subsig: "callee(int)".into(),
                    recv: None,
                    args: vec![x],
                    result: Some(y),
                }),
                Stmt::Return { value: None },
            ],
        );
        let program = b.finish(main).unwrap();
        let (icfg, result) = run_inter(&program);

        let return_node = icfg.node_of_stmt(StmtRef::new(main, 2)).unwrap();
        assert_eq!(result.in_fact(return_node).get(y), Value::Const(42));
        // inside the callee the argument's constant arrived
        let callee_add = icfg.node_of_stmt(StmtRef::new(callee, 0)).unwrap();
        assert_eq!(result.in_fact(callee_add).get(p), Value::Const(21));
    }

    #[test]
    fn two_call_sites_meet_parameter_values() {
        // callee(p) { return p }  main { a = callee(1-lit); b = callee(2-lit) }
        // p sees 1 meet 2 = nac inside the callee
        let mut b = ProgramBuilder::new();
        let class = b.add_class("C", None);
        let callee = b.add_method(class, "callee(int)", true);
        let p = b.add_var(callee, "p", Type::Int);
        b.set_body(
            callee,
            vec![p],
            None,
            vec![p],
            vec![Stmt::Return { value: Some(p) }],
        );
        let main = b.add_method(class, "main()", true);
        let one = b.add_var(main, "one", Type::Int);
        let two = b.add_var(main, "two", Type::Int);
        let a = b.add_var(main, "a", Type::Int);
        let bb = b.add_var(main, "b", Type::Int);
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::AssignLiteral { lhs: one, value: 1 },
                Stmt::AssignLiteral { lhs: two, value: 2 },
                Stmt::Invoke(Invoke {
                    kind: CallKind::Static,
                    declaring: class,
                    subsig: "callee(int)".into(),
                    recv: None,
                    args: vec![one],
                    result: Some(a),
                }),
                Stmt::Invoke(Invoke {
                    kind: CallKind::Static,
                    declaring: class,
                    subsig: "callee(int)".into(),
                    recv: None,
                    args: vec![two],
                    result: Some(bb),
                }),
                Stmt::Return { value: None },
            ],
        );
        let program = b.finish(main).unwrap();
        let (icfg, result) = run_inter(&program);

        let callee_return = icfg.node_of_stmt(StmtRef::new(callee, 0)).unwrap();
        assert_eq!(result.in_fact(callee_return).get(p), Value::Nac);
        // both call results degrade with the conflated callee
        let end = icfg.node_of_stmt(StmtRef::new(main, 4)).unwrap();
        assert_eq!(result.in_fact(end).get(a), Value::Nac);
        assert_eq!(result.in_fact(end).get(bb), Value::Nac);
    }

    #[test]
    fn instance_field_constant_reaches_aliased_load() {
        // a = new A; a.f = 3; b = a; c = b.f; return
        let mut b = ProgramBuilder::new();
        let class_a = b.add_class("A", None);
        let f = b.add_field(class_a, "f", Type::Int, false);
        let main = b.add_method(class_a, "main()", true);
        let va = b.add_var(main, "a", Type::Object(class_a));
        let vb = b.add_var(main, "b", Type::Object(class_a));
        let vc = b.add_var(main, "c", Type::Int);
        let three = b.add_var(main, "t", Type::Int);
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::New {
                    lhs: va,
                    class: class_a,
                },
                Stmt::AssignLiteral {
                    lhs: three,
                    value: 3,
                },
                Stmt::StoreField {
                    base: Some(va),
                    field: f,
                    rhs: three,
                },
                Stmt::Copy { lhs: vb, rhs: va },
                Stmt::LoadField {
                    lhs: vc,
                    base: Some(vb),
                    field: f,
                },
                Stmt::Return { value: None },
            ],
        );
        let program = b.finish(main).unwrap();
        let (icfg, result) = run_inter(&program);

        let end = icfg.node_of_stmt(StmtRef::new(main, 5)).unwrap();
        assert_eq!(result.in_fact(end).get(vc), Value::Const(3));
    }

    #[test]
    fn static_field_stores_meet_at_loads() {
        // C.g = 1; C.g = 1; x = C.g  -> 1     (agreeing stores)
        let mut b = ProgramBuilder::new();
        let class = b.add_class("C", None);
        let g = b.add_field(class, "g", Type::Int, true);
        let main = b.add_method(class, "main()", true);
        let one = b.add_var(main, "one", Type::Int);
        let x = b.add_var(main, "x", Type::Int);
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::AssignLiteral { lhs: one, value: 1 },
                Stmt::StoreField {
                    base: None,
                    field: g,
                    rhs: one,
                },
                Stmt::LoadField {
                    lhs: x,
                    base: None,
                    field: g,
                },
                Stmt::Return { value: None },
            ],
        );
        let program = b.finish(main).unwrap();
        let (icfg, result) = run_inter(&program);
        let end = icfg.node_of_stmt(StmtRef::new(main, 3)).unwrap();
        assert_eq!(result.in_fact(end).get(x), Value::Const(1));
    }

    #[test]
    fn array_load_respects_index_matching() {
        // arr = new int[]; arr[0] = 7; x = arr[1]; y = arr[0]
        // distinct constant indexes do not alias; equal ones do
        let mut b = ProgramBuilder::new();
        let class = b.add_class("C", None);
        let main = b.add_method(class, "main()", true);
        let arr = b.add_var(main, "arr", Type::Array(class));
        let zero = b.add_var(main, "zero", Type::Int);
        let one = b.add_var(main, "one", Type::Int);
        let seven = b.add_var(main, "seven", Type::Int);
        let x = b.add_var(main, "x", Type::Int);
        let y = b.add_var(main, "y", Type::Int);
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::New {
                    lhs: arr,
                    class,
                },
                Stmt::AssignLiteral { lhs: zero, value: 0 },
                Stmt::AssignLiteral { lhs: one, value: 1 },
                Stmt::AssignLiteral {
                    lhs: seven,
                    value: 7,
                },
                Stmt::StoreArray {
                    base: arr,
                    index: zero,
                    rhs: seven,
                },
                Stmt::LoadArray {
                    lhs: x,
                    base: arr,
                    index: one,
                },
                Stmt::LoadArray {
                    lhs: y,
                    base: arr,
                    index: zero,
                },
                Stmt::Return { value: None },
            ],
        );
        let program = b.finish(main).unwrap();
        let (icfg, result) = run_inter(&program);
        let end = icfg.node_of_stmt(StmtRef::new(main, 7)).unwrap();
        // index 1 never written: nothing loaded
        assert_eq!(result.in_fact(end).get(x), Value::Undef);
        // index 0 was written with 7
        assert_eq!(result.in_fact(end).get(y), Value::Const(7));
    }

    #[test]
    fn entry_nodes_keep_their_boundary_fact() {
        let mut b = ProgramBuilder::new();
        let class = b.add_class("C", None);
        let main = b.add_method(class, "main(int)", true);
        let p = b.add_var(main, "p", Type::Int);
        b.set_body(
            main,
            vec![p],
            None,
            vec![],
            vec![Stmt::Return { value: None }],
        );
        let program = b.finish(main).unwrap();
        let (icfg, result) = run_inter(&program);
        let entry = icfg.entry_nodes()[0];
        assert_eq!(result.out_fact(entry).get(p), Value::Nac);
        let _: MethodId = icfg.method_of(entry);
    }
}
