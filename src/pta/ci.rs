//! Context-insensitive whole-program pointer analysis.
//!
//! # Algorithm
//!
//! On-the-fly inclusion-based analysis with call-graph discovery:
//!
//! 1. `add_reachable` marks a method and visits its statements once:
//!    allocations seed the worklist, copies and static field accesses
//!    add PFG edges, static calls resolve immediately.
//! 2. The worklist carries `(pointer, points-to set)` entries. Popping
//!    one computes the delta against the pointer's accumulated set,
//!    grows it, and forwards the delta along PFG edges.
//! 3. When a *variable* gains objects, the instance effects of those
//!    objects materialize: field/array stores and loads through the
//!    variable become PFG edges against the concrete object, and call
//!    sites with the variable as receiver dispatch against the object's
//!    run-time class (`process_call`), feeding the callee's `this` and
//!    discovering new call edges.
//!
//! PFG edge insertion is idempotent and seeds the target with the
//! source's current set, so edge discovery order cannot lose objects.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::callgraph::{CallEdge, CallGraph};
use crate::ir::{
    CallKind, ClassId, FieldId, Invoke, MethodId, Program, Stmt, StmtRef, VarAccessIndex, VarId,
};

use super::heap::{HeapModel, ObjId};
use super::pfg::{PointerFlowGraph, PointsToSet, PtrId};
use super::result::PointerAnalysisResult;

/// A node of the context-insensitive pointer flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pointer {
    /// A local variable.
    Var(VarId),
    /// A static field.
    StaticField(FieldId),
    /// An instance field of a concrete abstract object.
    InstanceField(ObjId, FieldId),
    /// The (index-smashed) element slot of a concrete array object.
    ArrayIndex(ObjId),
}

/// The context-insensitive solver.
pub struct CiSolver<'p> {
    program: &'p Program,
    access: VarAccessIndex,
    heap: HeapModel,
    pfg: PointerFlowGraph<Pointer, ObjId>,
    call_graph: CallGraph,
    worklist: VecDeque<(PtrId, PointsToSet<ObjId>)>,
}

/// Run context-insensitive pointer analysis from the program entry.
#[must_use]
pub fn solve_ci(program: &Program) -> PointerAnalysisResult {
    CiSolver::new(program).solve()
}

impl<'p> CiSolver<'p> {
    /// Create a solver for a program.
    #[must_use]
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            access: VarAccessIndex::build(program),
            heap: HeapModel::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            worklist: VecDeque::new(),
        }
    }

    /// Run the fixpoint and freeze the result.
    #[must_use]
    pub fn solve(mut self) -> PointerAnalysisResult {
        let entry = self.program.entry();
        self.call_graph.add_entry(entry);
        self.add_reachable(entry);
        self.analyze();
        debug!(
            pointers = self.pfg.len(),
            objects = self.heap.len(),
            methods = self.call_graph.reachable_methods().len(),
            "pointer analysis fixpoint reached"
        );
        self.into_result()
    }

    /// Mark a method reachable and visit its statements once.
    fn add_reachable(&mut self, method: MethodId) {
        if !self.call_graph.add_reachable(method) {
            return;
        }
        let program = self.program;
        let Some(ir) = program.ir_of(method) else {
            return;
        };
        for (i, stmt) in ir.stmts.iter().enumerate() {
            let site = StmtRef::new(method, i);
            match stmt {
                Stmt::New { lhs, class } => {
                    let obj = self.heap.obj_at(site, *class);
                    let ptr = self.pfg.pointer(Pointer::Var(*lhs));
                    self.worklist.push_back((ptr, PointsToSet::singleton(obj)));
                }
                Stmt::Copy { lhs, rhs } => {
                    self.add_pfg_edge(Pointer::Var(*rhs), Pointer::Var(*lhs));
                }
                Stmt::LoadField {
                    lhs,
                    base: None,
                    field,
                } => {
                    self.add_pfg_edge(Pointer::StaticField(*field), Pointer::Var(*lhs));
                }
                Stmt::StoreField {
                    base: None,
                    field,
                    rhs,
                } => {
                    self.add_pfg_edge(Pointer::Var(*rhs), Pointer::StaticField(*field));
                }
                Stmt::Invoke(invoke) if invoke.is_static() => {
                    if let Some(callee) = self.resolve_callee(None, invoke) {
                        self.process_call_edge(site, invoke, callee);
                    }
                }
                _ => {}
            }
        }
    }

    /// Add a PFG edge, seeding the target when the source already points
    /// somewhere.
    fn add_pfg_edge(&mut self, source: Pointer, target: Pointer) {
        let s = self.pfg.pointer(source);
        let t = self.pfg.pointer(target);
        if self.pfg.add_edge(s, t) && !self.pfg.pts(s).is_empty() {
            let seed = self.pfg.pts(s).clone();
            self.worklist.push_back((t, seed));
        }
    }

    /// Worklist fixpoint.
    fn analyze(&mut self) {
        while let Some((ptr, pts)) = self.worklist.pop_front() {
            let delta = self.propagate(ptr, &pts);
            if delta.is_empty() {
                continue;
            }
            let Pointer::Var(var) = *self.pfg.key(ptr) else {
                continue;
            };
            for obj in delta.iter() {
                self.expand_instance_effects(var, obj);
                self.process_call(var, obj);
            }
        }
    }

    /// Grow `pts(ptr)` by `pts`, forwarding the delta to PFG successors.
    fn propagate(&mut self, ptr: PtrId, pts: &PointsToSet<ObjId>) -> PointsToSet<ObjId> {
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

    /// Materialize field/array accesses through `var` against a newly
    /// discovered object.
    fn expand_instance_effects(&mut self, var: VarId, obj: ObjId) {
        let program = self.program;
        for site in self.access.store_fields_of(var).to_vec() {
            if let Some(Stmt::StoreField { field, rhs, .. }) = program.stmt_at(site) {
                self.add_pfg_edge(Pointer::Var(*rhs), Pointer::InstanceField(obj, *field));
            }
        }
        for site in self.access.load_fields_of(var).to_vec() {
            if let Some(Stmt::LoadField { lhs, field, .. }) = program.stmt_at(site) {
                self.add_pfg_edge(Pointer::InstanceField(obj, *field), Pointer::Var(*lhs));
            }
        }
        for site in self.access.store_arrays_of(var).to_vec() {
            if let Some(Stmt::StoreArray { rhs, .. }) = program.stmt_at(site) {
                self.add_pfg_edge(Pointer::Var(*rhs), Pointer::ArrayIndex(obj));
            }
        }
        for site in self.access.load_arrays_of(var).to_vec() {
            if let Some(Stmt::LoadArray { lhs, .. }) = program.stmt_at(site) {
                self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var(*lhs));
            }
        }
    }

    /// Dispatch every call with `var` as receiver against a newly
    /// discovered receiver object.
    fn process_call(&mut self, var: VarId, recv: ObjId) {
        let program = self.program;
        let recv_class = self.heap.class_of(recv);
        for site in self.access.invokes_of(var).to_vec() {
            let Some(Stmt::Invoke(invoke)) = program.stmt_at(site) else {
                continue;
            };
            let Some(callee) = self.resolve_callee(recv_class, invoke) else {
                continue;
            };
            // the receiver reaches `this` for every discovered object,
            // even when the call edge itself already exists
            if let Some(this) = program.ir_of(callee).and_then(|ir| ir.this) {
                let this_ptr = self.pfg.pointer(Pointer::Var(this));
                self.worklist
                    .push_back((this_ptr, PointsToSet::singleton(recv)));
            }
            self.process_call_edge(site, invoke, callee);
        }
    }

    /// Record a resolved call edge; on first discovery, wire arguments,
    /// parameters and returns and make the callee reachable.
    fn process_call_edge(&mut self, callsite: StmtRef, invoke: &Invoke, callee: MethodId) {
        if self.call_graph.has_edge(callsite, callee) {
            return;
        }
        self.call_graph.add_edge(CallEdge {
            kind: invoke.kind,
            callsite,
            callee,
        });
        self.add_reachable(callee);
        let Some(callee_ir) = self.program.ir_of(callee) else {
            return;
        };
        for (arg, param) in invoke.args.iter().zip(callee_ir.params.clone()) {
            self.add_pfg_edge(Pointer::Var(*arg), Pointer::Var(param));
        }
        if let Some(lhs) = invoke.result {
            for rv in callee_ir.return_vars.clone() {
                self.add_pfg_edge(Pointer::Var(rv), Pointer::Var(lhs));
            }
        }
    }

    /// Resolve a call against the receiver's run-time class.
    fn resolve_callee(&self, recv_class: Option<ClassId>, invoke: &Invoke) -> Option<MethodId> {
        match invoke.kind {
            CallKind::Static => self.program.declared_method(invoke.declaring, &invoke.subsig),
            CallKind::Special => self.program.dispatch(invoke.declaring, &invoke.subsig),
            CallKind::Virtual | CallKind::Interface => {
                recv_class.and_then(|c| self.program.dispatch(c, &invoke.subsig))
            }
        }
    }

    fn into_result(self) -> PointerAnalysisResult {
        let mut var_pts = FxHashMap::default();
        for ptr in self.pfg.pointers() {
            if let Pointer::Var(v) = *self.pfg.key(ptr) {
                if !self.pfg.pts(ptr).is_empty() {
                    var_pts.insert(v, self.pfg.pts(ptr).clone());
                }
            }
        }
        PointerAnalysisResult::new(var_pts, FxHashMap::default(), self.call_graph, self.heap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ProgramBuilder, Type};

    #[test]
    fn copy_unions_points_to_sets() {
        // x = new T1; y = new T2; x = y
        let mut b = ProgramBuilder::new();
        let t1 = b.add_class("T1", None);
        let t2 = b.add_class("T2", None);
        let main = b.add_method(t1, "main()", true);
        let x = b.add_var(main, "x", Type::Object(t1));
        let y = b.add_var(main, "y", Type::Object(t2));
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::New { lhs: x, class: t1 },
                Stmt::New { lhs: y, class: t2 },
                Stmt::Copy { lhs: x, rhs: y },
            ],
        );
        let program = b.finish(main).unwrap();
        let result = solve_ci(&program);
        assert_eq!(result.points_to(x).len(), 2);
        assert_eq!(result.points_to(y).len(), 1);
        // y's object flowed into x
        let y_obj = result.points_to(y).iter().next().unwrap();
        assert!(result.points_to(x).contains(y_obj));
    }

    #[test]
    fn instance_field_store_flows_to_matching_load() {
        // a = new A; b = a; a.f = x; y = b.f  with  x = new T
        let mut b = ProgramBuilder::new();
        let class_a = b.add_class("A", None);
        let class_t = b.add_class("T", None);
        let f = b.add_field(class_a, "f", Type::Object(class_t), false);
        let main = b.add_method(class_a, "main()", true);
        let va = b.add_var(main, "a", Type::Object(class_a));
        let vb = b.add_var(main, "b", Type::Object(class_a));
        let vx = b.add_var(main, "x", Type::Object(class_t));
        let vy = b.add_var(main, "y", Type::Object(class_t));
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
                Stmt::New {
                    lhs: vx,
                    class: class_t,
                },
                Stmt::Copy { lhs: vb, rhs: va },
                Stmt::StoreField {
                    base: Some(va),
                    field: f,
                    rhs: vx,
                },
                Stmt::LoadField {
                    lhs: vy,
                    base: Some(vb),
                    field: f,
                },
            ],
        );
        let program = b.finish(main).unwrap();
        let result = solve_ci(&program);
        // the store through a and the load through its alias b meet at
        // the same instance field
        assert_eq!(result.points_to(vy).len(), 1);
        let x_obj = result.points_to(vx).iter().next().unwrap();
        assert!(result.points_to(vy).contains(x_obj));
    }

    #[test]
    fn array_store_flows_to_load() {
        // arr = new A[]; x = new T; arr[i] = x; y = arr[j]
        let mut b = ProgramBuilder::new();
        let class_a = b.add_class("A", None);
        let class_t = b.add_class("T", None);
        let main = b.add_method(class_a, "main()", true);
        let arr = b.add_var(main, "arr", Type::Array(class_t));
        let vx = b.add_var(main, "x", Type::Object(class_t));
        let vy = b.add_var(main, "y", Type::Object(class_t));
        let vi = b.add_var(main, "i", Type::Int);
        let vj = b.add_var(main, "j", Type::Int);
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::New {
                    lhs: arr,
                    class: class_a,
                },
                Stmt::New {
                    lhs: vx,
                    class: class_t,
                },
                Stmt::StoreArray {
                    base: arr,
                    index: vi,
                    rhs: vx,
                },
                Stmt::LoadArray {
                    lhs: vy,
                    base: arr,
                    index: vj,
                },
            ],
        );
        let program = b.finish(main).unwrap();
        let result = solve_ci(&program);
        let x_obj = result.points_to(vx).iter().next().unwrap();
        assert!(result.points_to(vy).contains(x_obj));
    }

    #[test]
    fn virtual_call_discovered_through_receiver_objects() {
        // class A { id(p) { return p } }  class B extends A { id(p) { return p } }
        // main: r = new B; t = new T; s = r.id(t)
        let mut b = ProgramBuilder::new();
        let class_a = b.add_class("A", None);
        let class_b = b.add_class("B", Some(class_a));
        let class_t = b.add_class("T", None);

        let a_id = b.add_method(class_a, "id(Object)", false);
        let a_this = b.add_var(a_id, "this", Type::Object(class_a));
        let a_p = b.add_var(a_id, "p", Type::Object(class_t));
        b.set_body(
            a_id,
            vec![a_p],
            Some(a_this),
            vec![a_p],
            vec![Stmt::Return { value: Some(a_p) }],
        );

        let b_id = b.add_method(class_b, "id(Object)", false);
        let b_this = b.add_var(b_id, "this", Type::Object(class_b));
        let b_p = b.add_var(b_id, "p", Type::Object(class_t));
        b.set_body(
            b_id,
            vec![b_p],
            Some(b_this),
            vec![b_p],
            vec![Stmt::Return { value: Some(b_p) }],
        );

        let main = b.add_method(class_a, "main()", true);
        let r = b.add_var(main, "r", Type::Object(class_b));
        let t = b.add_var(main, "t", Type::Object(class_t));
        let s = b.add_var(main, "s", Type::Object(class_t));
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::New {
                    lhs: r,
                    class: class_b,
                },
                Stmt::New {
                    lhs: t,
                    class: class_t,
                },
                Stmt::Invoke(Invoke {
                    kind: CallKind::Virtual,
                    declaring: class_a,
                    subsig: "id(Object)".into(),
                    recv: Some(r),
                    args: vec![t],
                    result: Some(s),
                }),
            ],
        );
        let program = b.finish(main).unwrap();
        let result = solve_ci(&program);

        // dispatch on the dynamic type picks B.id, not A.id
        let callsite = StmtRef::new(main, 2);
        assert_eq!(result.call_graph().callees_of(callsite), vec![b_id]);
        // this, parameter and return flows all materialized
        assert!(result.points_to(b_this).contains(result.points_to(r).iter().next().unwrap()));
        let t_obj = result.points_to(t).iter().next().unwrap();
        assert!(result.points_to(b_p).contains(t_obj));
        assert!(result.points_to(s).contains(t_obj));
        // A.id was never called
        assert!(result.points_to(a_p).is_empty());
    }

    #[test]
    fn static_field_flow() {
        // C.g = x; y = C.g
        let mut b = ProgramBuilder::new();
        let class_c = b.add_class("C", None);
        let class_t = b.add_class("T", None);
        let g = b.add_field(class_c, "g", Type::Object(class_t), true);
        let main = b.add_method(class_c, "main()", true);
        let x = b.add_var(main, "x", Type::Object(class_t));
        let y = b.add_var(main, "y", Type::Object(class_t));
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::New {
                    lhs: x,
                    class: class_t,
                },
                Stmt::StoreField {
                    base: None,
                    field: g,
                    rhs: x,
                },
                Stmt::LoadField {
                    lhs: y,
                    base: None,
                    field: g,
                },
            ],
        );
        let program = b.finish(main).unwrap();
        let result = solve_ci(&program);
        assert_eq!(result.points_to(y).len(), 1);
    }

    #[test]
    fn static_call_wires_params_and_returns() {
        // id(p) { return p }   main: x = new T; y = id(x)
        let mut b = ProgramBuilder::new();
        let class_c = b.add_class("C", None);
        let class_t = b.add_class("T", None);
        let id = b.add_method(class_c, "id(Object)", true);
        let p = b.add_var(id, "p", Type::Object(class_t));
        b.set_body(id, vec![p], None, vec![p], vec![Stmt::Return { value: Some(p) }]);
        let main = b.add_method(class_c, "main()", true);
        let x = b.add_var(main, "x", Type::Object(class_t));
        let y = b.add_var(main, "y", Type::Object(class_t));
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![
                Stmt::New {
                    lhs: x,
                    class: class_t,
                },
                Stmt::Invoke(Invoke {
                    kind: CallKind::Static,
                    declaring: class_c,
                    subsig: "id(Object)".into(),
                    recv: None,
                    args: vec![x],
                    result: Some(y),
                }),
            ],
        );
        let program = b.finish(main).unwrap();
        let result = solve_ci(&program);
        let x_obj = result.points_to(x).iter().next().unwrap();
        assert!(result.points_to(p).contains(x_obj));
        assert!(result.points_to(y).contains(x_obj));
        assert!(result.call_graph().contains(id));
    }
}
