//! Call-graph construction by Class Hierarchy Analysis.
//!
//! # Algorithm
//!
//! Worklist over methods starting at the program entry. Each method's
//! body is scanned for call sites; every site is resolved purely from
//! the class hierarchy:
//!
//! - `Static` - the declared method on the declaring class.
//! - `Special` - superclass dispatch from the declaring class.
//! - `Virtual`/`Interface` - the subtype closure of the declared type
//!   (the type itself, transitively closed under subinterfaces,
//!   implementors and subclasses), each member dispatched; the union of
//!   the hits is the target set.
//!
//! The result over-approximates any run-time call graph: no points-to
//! information is consulted, so every subtype's override is a target.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::ir::{CallKind, ClassId, Invoke, MethodId, Program, Stmt, StmtRef};

use super::{CallEdge, CallGraph};

/// Build a CHA call graph from the program entry.
#[must_use]
pub fn build_cha(program: &Program) -> CallGraph {
    let mut graph = CallGraph::new();
    graph.add_entry(program.entry());

    let mut worklist: VecDeque<MethodId> = VecDeque::new();
    worklist.push_back(program.entry());
    let mut scanned: FxHashSet<MethodId> = FxHashSet::default();

    while let Some(method) = worklist.pop_front() {
        if !scanned.insert(method) {
            continue;
        }
        graph.add_reachable(method);

        let Some(ir) = program.ir_of(method) else {
            continue;
        };
        for (i, stmt) in ir.stmts.iter().enumerate() {
            let Stmt::Invoke(invoke) = stmt else { continue };
            let callsite = StmtRef::new(method, i);
            for callee in resolve(program, invoke) {
                graph.add_edge(CallEdge {
                    kind: invoke.kind,
                    callsite,
                    callee,
                });
                if !scanned.contains(&callee) {
                    worklist.push_back(callee);
                }
            }
        }
    }

    debug!(
        methods = graph.reachable_methods().len(),
        edges = graph.edge_count(),
        "CHA call graph built"
    );
    graph
}

/// Resolve the possible targets of a call site via the class hierarchy.
///
/// Returns targets in a deterministic (sorted) order. A site that
/// resolves to nothing contributes no edges.
#[must_use]
pub fn resolve(program: &Program, invoke: &Invoke) -> Vec<MethodId> {
    let mut targets: Vec<MethodId> = match invoke.kind {
        CallKind::Static => program
            .declared_method(invoke.declaring, &invoke.subsig)
            .into_iter()
            .collect(),
        CallKind::Special => program
            .dispatch(invoke.declaring, &invoke.subsig)
            .into_iter()
            .collect(),
        CallKind::Virtual | CallKind::Interface => {
            let mut set = FxHashSet::default();
            for class in subtype_closure(program, invoke.declaring) {
                if let Some(m) = program.dispatch(class, &invoke.subsig) {
                    set.insert(m);
                }
            }
            set.into_iter().collect()
        }
    };
    targets.sort_unstable();
    targets
}

/// The smallest set containing `root` and closed under direct
/// subinterfaces, direct implementors and direct subclasses.
fn subtype_closure(program: &Program, root: ClassId) -> Vec<ClassId> {
    let mut closure: Vec<ClassId> = vec![root];
    let mut seen: FxHashSet<ClassId> = FxHashSet::default();
    seen.insert(root);

    // subinterfaces of everything collected so far
    let mut stack: Vec<ClassId> = vec![root];
    while let Some(current) = stack.pop() {
        for &sub in program.direct_subinterfaces_of(current) {
            if seen.insert(sub) {
                closure.push(sub);
                stack.push(sub);
            }
        }
    }

    // classes implementing any collected interface
    let mut stack: Vec<ClassId> = closure.clone();
    while let Some(current) = stack.pop() {
        for &implementor in program.direct_implementors_of(current) {
            if seen.insert(implementor) {
                closure.push(implementor);
                stack.push(implementor);
            }
        }
    }

    // subclasses of every collected class
    let mut stack: Vec<ClassId> = closure.clone();
    while let Some(current) = stack.pop() {
        for &sub in program.direct_subclasses_of(current) {
            if seen.insert(sub) {
                closure.push(sub);
                stack.push(sub);
            }
        }
    }

    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ProgramBuilder, Type};

    /// interface I { m() }
    /// class A implements I { m() }
    /// class B extends A { m() }
    /// class Main { static main() { I i; i.m(); } }
    fn diamond_program() -> (Program, StmtRef, MethodId, MethodId) {
        let mut b = ProgramBuilder::new();
        let iface = b.add_interface("I");
        let class_a = b.add_class("A", None);
        b.add_implements(class_a, iface);
        let class_b = b.add_class("B", Some(class_a));
        let main_class = b.add_class("Main", None);

        b.add_abstract_method(iface, "m()");
        let am = b.add_method(class_a, "m()", false);
        let a_this = b.add_var(am, "this", Type::Object(class_a));
        b.set_body(am, vec![], Some(a_this), vec![], vec![Stmt::Return { value: None }]);
        let bm = b.add_method(class_b, "m()", false);
        let b_this = b.add_var(bm, "this", Type::Object(class_b));
        b.set_body(bm, vec![], Some(b_this), vec![], vec![Stmt::Return { value: None }]);

        let main = b.add_method(main_class, "main()", true);
        let i = b.add_var(main, "i", Type::Object(iface));
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![Stmt::Invoke(Invoke {
                kind: CallKind::Interface,
                declaring: iface,
                subsig: "m()".into(),
                recv: Some(i),
                args: vec![],
                result: None,
            })],
        );
        let program = b.finish(main).unwrap();
        (program, StmtRef::new(main, 0), am, bm)
    }

    #[test]
    fn interface_call_resolves_to_all_overrides() {
        let (program, callsite, am, bm) = diamond_program();
        let graph = build_cha(&program);
        let mut targets = graph.callees_of(callsite);
        targets.sort_unstable();
        assert_eq!(targets, vec![am, bm]);
    }

    #[test]
    fn callees_become_reachable() {
        let (program, _, am, bm) = diamond_program();
        let graph = build_cha(&program);
        assert!(graph.contains(am));
        assert!(graph.contains(bm));
    }

    #[test]
    fn static_call_resolves_to_declared_method() {
        let mut b = ProgramBuilder::new();
        let class = b.add_class("C", None);
        let helper = b.add_method(class, "helper()", true);
        b.set_body(helper, vec![], None, vec![], vec![Stmt::Return { value: None }]);
        let main = b.add_method(class, "main()", true);
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![Stmt::Invoke(Invoke {
                kind: CallKind::Static,
                declaring: class,
                subsig: "helper()".into(),
                recv: None,
                args: vec![],
                result: None,
            })],
        );
        let program = b.finish(main).unwrap();
        let graph = build_cha(&program);
        assert_eq!(graph.callees_of(StmtRef::new(main, 0)), vec![helper]);
    }

    #[test]
    fn special_call_dispatches_up_the_superclass_chain() {
        // class Base { init() }  class Derived extends Base {}
        // Derived::<init> special-call resolves to Base.init()
        let mut b = ProgramBuilder::new();
        let base = b.add_class("Base", None);
        let derived = b.add_class("Derived", Some(base));
        let init = b.add_method(base, "init()", false);
        let this = b.add_var(init, "this", Type::Object(base));
        b.set_body(init, vec![], Some(this), vec![], vec![Stmt::Return { value: None }]);
        let main = b.add_method(base, "main()", true);
        let d = b.add_var(main, "d", Type::Object(derived));
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![Stmt::Invoke(Invoke {
                kind: CallKind::Special,
                declaring: derived,
                subsig: "init()".into(),
                recv: Some(d),
                args: vec![],
                result: None,
            })],
        );
        let program = b.finish(main).unwrap();
        let graph = build_cha(&program);
        assert_eq!(graph.callees_of(StmtRef::new(main, 0)), vec![init]);
    }

    #[test]
    fn unresolved_site_contributes_no_edges() {
        let mut b = ProgramBuilder::new();
        let class = b.add_class("C", None);
        let main = b.add_method(class, "main()", true);
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![Stmt::Invoke(Invoke {
                kind: CallKind::Static,
                declaring: class,
                subsig: "missing()".into(),
                recv: None,
                args: vec![],
                result: None,
            })],
        );
        let program = b.finish(main).unwrap();
        let graph = build_cha(&program);
        assert!(graph.callees_of(StmtRef::new(main, 0)).is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn closure_includes_transitive_subinterfaces() {
        // interface I; interface J extends I; class C implements J { m() }
        let mut b = ProgramBuilder::new();
        let i = b.add_interface("I");
        let j = b.add_interface("J");
        b.add_implements(j, i);
        let c = b.add_class("C", None);
        b.add_implements(c, j);
        let cm = b.add_method(c, "m()", false);
        let this = b.add_var(cm, "this", Type::Object(c));
        b.set_body(cm, vec![], Some(this), vec![], vec![Stmt::Return { value: None }]);
        let main = b.add_method(c, "main()", true);
        let v = b.add_var(main, "v", Type::Object(i));
        b.set_body(
            main,
            vec![],
            None,
            vec![],
            vec![Stmt::Invoke(Invoke {
                kind: CallKind::Interface,
                declaring: i,
                subsig: "m()".into(),
                recv: Some(v),
                args: vec![],
                result: None,
            })],
        );
        let program = b.finish(main).unwrap();
        let graph = build_cha(&program);
        assert_eq!(graph.callees_of(StmtRef::new(main, 0)), vec![cm]);
    }
}
