//! Program container: classes, methods, fields, variables and bodies.
//!
//! A [`Program`] is the immutable world the analyses run over. It owns
//! every arena (classes, methods, fields, variables), the class-hierarchy
//! indexes (direct subclasses, subinterfaces, implementors), and the
//! per-method bodies. Construction goes through [`ProgramBuilder`], which
//! validates jump targets and freezes the hierarchy indexes; after
//! `finish` the program is never mutated.

use rustc_hash::FxHashMap;

use crate::error::{FlowError, Result};

use super::stmt::Stmt;
use super::types::{ClassId, FieldData, FieldId, MethodId, StmtRef, Type, VarData, VarId};

/// A class or interface declaration.
#[derive(Debug, Clone)]
pub struct Class {
    /// Fully qualified name.
    pub name: String,
    /// Direct superclass; `None` for the hierarchy root and interfaces.
    pub superclass: Option<ClassId>,
    /// Interfaces this class implements / this interface extends.
    pub interfaces: Vec<ClassId>,
    /// Whether this declaration is an interface.
    pub is_interface: bool,
}

/// A method declaration, optionally with a body.
#[derive(Debug, Clone)]
pub struct Method {
    /// Declaring class.
    pub class: ClassId,
    /// Subsignature (name plus descriptor) used for dispatch.
    pub subsig: String,
    /// Whether the method is static.
    pub is_static: bool,
    /// Abstract methods never dispatch and have no body.
    pub is_abstract: bool,
    /// The body; `None` for abstract methods.
    pub ir: Option<Ir>,
}

/// A method body.
#[derive(Debug, Clone)]
pub struct Ir {
    /// Parameter variables, in declaration order.
    pub params: Vec<VarId>,
    /// The receiver variable for instance methods.
    pub this: Option<VarId>,
    /// Variables returned by the method's `Return` statements.
    pub return_vars: Vec<VarId>,
    /// Statement list; jump targets index into it.
    pub stmts: Vec<Stmt>,
}

/// The analysed program with its class hierarchy.
#[derive(Debug)]
pub struct Program {
    classes: Vec<Class>,
    methods: Vec<Method>,
    vars: Vec<VarData>,
    fields: Vec<FieldData>,
    entry: MethodId,
    direct_subclasses: Vec<Vec<ClassId>>,
    direct_subinterfaces: Vec<Vec<ClassId>>,
    direct_implementors: Vec<Vec<ClassId>>,
    declared: FxHashMap<(ClassId, String), MethodId>,
    signatures: FxHashMap<String, MethodId>,
}

impl Program {
    /// The program entry method.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> MethodId {
        self.entry
    }

    /// Look up a class.
    #[inline]
    #[must_use]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    /// Look up a method.
    #[inline]
    #[must_use]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    /// Look up a variable.
    #[inline]
    #[must_use]
    pub fn var(&self, id: VarId) -> &VarData {
        &self.vars[id.0]
    }

    /// Look up a field.
    #[inline]
    #[must_use]
    pub fn field(&self, id: FieldId) -> &FieldData {
        &self.fields[id.0]
    }

    /// Number of variables across the whole program.
    #[inline]
    #[must_use]
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// All method ids.
    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        (0..self.methods.len()).map(MethodId)
    }

    /// All variable ids.
    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.vars.len()).map(VarId)
    }

    /// The body of a method, if it has one.
    #[inline]
    #[must_use]
    pub fn ir_of(&self, method: MethodId) -> Option<&Ir> {
        self.methods[method.0].ir.as_ref()
    }

    /// The statement at a given position.
    #[inline]
    #[must_use]
    pub fn stmt_at(&self, site: StmtRef) -> Option<&Stmt> {
        self.ir_of(site.method)
            .and_then(|ir| ir.stmts.get(site.index))
    }

    /// `Class.subsig` signature of a method, used to key taint rules.
    #[must_use]
    pub fn signature_of(&self, method: MethodId) -> String {
        let m = &self.methods[method.0];
        format!("{}.{}", self.classes[m.class.0].name, m.subsig)
    }

    /// Resolve a `Class.subsig` signature string to a method.
    #[inline]
    #[must_use]
    pub fn method_by_signature(&self, signature: &str) -> Option<MethodId> {
        self.signatures.get(signature).copied()
    }

    /// Resolve a class name.
    #[must_use]
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(ClassId)
    }

    // =========================================================================
    // Class hierarchy queries
    // =========================================================================

    /// Direct subclasses of a class.
    #[inline]
    #[must_use]
    pub fn direct_subclasses_of(&self, class: ClassId) -> &[ClassId] {
        &self.direct_subclasses[class.0]
    }

    /// Direct subinterfaces of an interface.
    #[inline]
    #[must_use]
    pub fn direct_subinterfaces_of(&self, class: ClassId) -> &[ClassId] {
        &self.direct_subinterfaces[class.0]
    }

    /// Direct (class) implementors of an interface.
    #[inline]
    #[must_use]
    pub fn direct_implementors_of(&self, class: ClassId) -> &[ClassId] {
        &self.direct_implementors[class.0]
    }

    /// The direct superclass, if any.
    #[inline]
    #[must_use]
    pub fn superclass_of(&self, class: ClassId) -> Option<ClassId> {
        self.classes[class.0].superclass
    }

    /// The method a class itself declares for a subsignature.
    #[inline]
    #[must_use]
    pub fn declared_method(&self, class: ClassId, subsig: &str) -> Option<MethodId> {
        self.declared.get(&(class, subsig.to_owned())).copied()
    }

    /// Method dispatch: walk up the superclass chain from `class` until a
    /// concrete (non-abstract) declaration of `subsig` is found.
    #[must_use]
    pub fn dispatch(&self, class: ClassId, subsig: &str) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(c) = current {
            if let Some(m) = self.declared.get(&(c, subsig.to_owned())) {
                if !self.methods[m.0].is_abstract {
                    return Some(*m);
                }
            }
            current = self.classes[c.0].superclass;
        }
        None
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Incremental [`Program`] constructor.
///
/// Declarations may arrive in any order; bodies are attached with
/// [`ProgramBuilder::set_body`] once their variables exist. `finish`
/// validates jump targets and builds the hierarchy indexes.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    classes: Vec<Class>,
    methods: Vec<Method>,
    vars: Vec<VarData>,
    fields: Vec<FieldData>,
}

impl ProgramBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a class.
    pub fn add_class(&mut self, name: &str, superclass: Option<ClassId>) -> ClassId {
        let id = ClassId(self.classes.len());
        self.classes.push(Class {
            name: name.to_owned(),
            superclass,
            interfaces: Vec::new(),
            is_interface: false,
        });
        id
    }

    /// Declare an interface.
    pub fn add_interface(&mut self, name: &str) -> ClassId {
        let id = self.add_class(name, None);
        self.classes[id.0].is_interface = true;
        id
    }

    /// Record that `class` implements (or, for interfaces, extends) `iface`.
    pub fn add_implements(&mut self, class: ClassId, iface: ClassId) {
        self.classes[class.0].interfaces.push(iface);
    }

    /// Declare a concrete method; the body is attached later.
    pub fn add_method(&mut self, class: ClassId, subsig: &str, is_static: bool) -> MethodId {
        let id = MethodId(self.methods.len());
        self.methods.push(Method {
            class,
            subsig: subsig.to_owned(),
            is_static,
            is_abstract: false,
            ir: None,
        });
        id
    }

    /// Declare an abstract method (participates in dispatch lookups only
    /// as a miss).
    pub fn add_abstract_method(&mut self, class: ClassId, subsig: &str) -> MethodId {
        let id = self.add_method(class, subsig, false);
        self.methods[id.0].is_abstract = true;
        id
    }

    /// Declare a field.
    pub fn add_field(&mut self, class: ClassId, name: &str, ty: Type, is_static: bool) -> FieldId {
        let id = FieldId(self.fields.len());
        self.fields.push(FieldData {
            class,
            name: name.to_owned(),
            ty,
            is_static,
        });
        id
    }

    /// Declare a local variable of a method.
    pub fn add_var(&mut self, method: MethodId, name: &str, ty: Type) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarData {
            name: name.to_owned(),
            ty,
            method,
        });
        id
    }

    /// Attach a body to a previously declared method.
    pub fn set_body(
        &mut self,
        method: MethodId,
        params: Vec<VarId>,
        this: Option<VarId>,
        return_vars: Vec<VarId>,
        stmts: Vec<Stmt>,
    ) {
        self.methods[method.0].ir = Some(Ir {
            params,
            this,
            return_vars,
            stmts,
        });
    }

    /// Validate and freeze the program.
    pub fn finish(self, entry: MethodId) -> Result<Program> {
        let class_count = self.classes.len();
        let mut direct_subclasses = vec![Vec::new(); class_count];
        let mut direct_subinterfaces = vec![Vec::new(); class_count];
        let mut direct_implementors = vec![Vec::new(); class_count];

        for (idx, class) in self.classes.iter().enumerate() {
            let id = ClassId(idx);
            if let Some(sup) = class.superclass {
                direct_subclasses[sup.0].push(id);
            }
            for &iface in &class.interfaces {
                if class.is_interface {
                    direct_subinterfaces[iface.0].push(id);
                } else {
                    direct_implementors[iface.0].push(id);
                }
            }
        }

        let mut declared = FxHashMap::default();
        let mut signatures = FxHashMap::default();
        for (idx, method) in self.methods.iter().enumerate() {
            let id = MethodId(idx);
            declared.insert((method.class, method.subsig.clone()), id);
            let sig = format!("{}.{}", self.classes[method.class.0].name, method.subsig);
            signatures.insert(sig, id);
        }

        for (idx, method) in self.methods.iter().enumerate() {
            let Some(ir) = &method.ir else { continue };
            let bound = ir.stmts.len();
            for stmt in &ir.stmts {
                let bad_target = match stmt {
                    Stmt::If { target, .. } | Stmt::Goto { target } => *target >= bound,
                    Stmt::Switch { cases, default, .. } => {
                        *default >= bound || cases.iter().any(|(_, t)| *t >= bound)
                    }
                    _ => false,
                };
                if bad_target {
                    return Err(FlowError::MalformedIr {
                        method: MethodId(idx),
                        reason: format!("jump target out of bounds (body has {bound} statements)"),
                    });
                }
            }
        }

        if self.methods[entry.0].ir.is_none() {
            return Err(FlowError::MissingEntryBody(entry));
        }

        Ok(Program {
            classes: self.classes,
            methods: self.methods,
            vars: self.vars,
            fields: self.fields,
            entry,
            direct_subclasses,
            direct_subinterfaces,
            direct_implementors,
            declared,
            signatures,
        })
    }
}

// =============================================================================
// Variable access index
// =============================================================================

/// Reverse index from variables to the statements that access the heap
/// through them.
///
/// The pointer solvers consult this when a receiver/base variable gains a
/// new object: every store/load/call through that variable must be
/// re-examined. Built once per program and shared read-only.
#[derive(Debug, Default)]
pub struct VarAccessIndex {
    store_fields: FxHashMap<VarId, Vec<StmtRef>>,
    load_fields: FxHashMap<VarId, Vec<StmtRef>>,
    store_arrays: FxHashMap<VarId, Vec<StmtRef>>,
    load_arrays: FxHashMap<VarId, Vec<StmtRef>>,
    invokes: FxHashMap<VarId, Vec<StmtRef>>,
}

impl VarAccessIndex {
    /// Scan every method body and build the index.
    #[must_use]
    pub fn build(program: &Program) -> Self {
        let mut index = Self::default();
        for method in program.methods() {
            let Some(ir) = program.ir_of(method) else {
                continue;
            };
            for (i, stmt) in ir.stmts.iter().enumerate() {
                let site = StmtRef::new(method, i);
                match stmt {
                    Stmt::StoreField {
                        base: Some(base), ..
                    } => index.store_fields.entry(*base).or_default().push(site),
                    Stmt::LoadField {
                        base: Some(base), ..
                    } => index.load_fields.entry(*base).or_default().push(site),
                    Stmt::StoreArray { base, .. } => {
                        index.store_arrays.entry(*base).or_default().push(site)
                    }
                    Stmt::LoadArray { base, .. } => {
                        index.load_arrays.entry(*base).or_default().push(site)
                    }
                    Stmt::Invoke(invoke) => {
                        if let Some(recv) = invoke.recv {
                            index.invokes.entry(recv).or_default().push(site);
                        }
                    }
                    _ => {}
                }
            }
        }
        index
    }

    /// Instance field stores with `var` as base.
    #[inline]
    #[must_use]
    pub fn store_fields_of(&self, var: VarId) -> &[StmtRef] {
        self.store_fields.get(&var).map_or(&[], Vec::as_slice)
    }

    /// Instance field loads with `var` as base.
    #[inline]
    #[must_use]
    pub fn load_fields_of(&self, var: VarId) -> &[StmtRef] {
        self.load_fields.get(&var).map_or(&[], Vec::as_slice)
    }

    /// Array stores with `var` as base.
    #[inline]
    #[must_use]
    pub fn store_arrays_of(&self, var: VarId) -> &[StmtRef] {
        self.store_arrays.get(&var).map_or(&[], Vec::as_slice)
    }

    /// Array loads with `var` as base.
    #[inline]
    #[must_use]
    pub fn load_arrays_of(&self, var: VarId) -> &[StmtRef] {
        self.load_arrays.get(&var).map_or(&[], Vec::as_slice)
    }

    /// Call sites with `var` as receiver.
    #[inline]
    #[must_use]
    pub fn invokes_of(&self, var: VarId) -> &[StmtRef] {
        self.invokes.get(&var).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::stmt::{CallKind, Invoke};

    fn two_class_program() -> (ProgramBuilder, ClassId, ClassId) {
        let mut b = ProgramBuilder::new();
        let a = b.add_class("A", None);
        let c = b.add_class("B", Some(a));
        (b, a, c)
    }

    #[test]
    fn dispatch_walks_superclass_chain() {
        let (mut b, a, sub) = two_class_program();
        let m = b.add_method(a, "m()", false);
        let entry = b.add_method(a, "main()", true);
        b.set_body(entry, vec![], None, vec![], vec![Stmt::Nop]);
        b.set_body(m, vec![], None, vec![], vec![Stmt::Nop]);
        let p = b.finish(entry).unwrap();

        // B declares nothing, so dispatch falls back to A.m()
        assert_eq!(p.dispatch(sub, "m()"), Some(m));
        assert_eq!(p.dispatch(a, "m()"), Some(m));
        assert_eq!(p.dispatch(a, "absent()"), None);
    }

    #[test]
    fn dispatch_skips_abstract_declarations() {
        let mut b = ProgramBuilder::new();
        let base = b.add_class("Base", None);
        let derived = b.add_class("Derived", Some(base));
        let concrete = b.add_method(base, "m()", false);
        b.set_body(concrete, vec![], None, vec![], vec![Stmt::Nop]);
        let abst = b.add_abstract_method(derived, "m()");
        let entry = b.add_method(base, "main()", true);
        b.set_body(entry, vec![], None, vec![], vec![Stmt::Nop]);
        let p = b.finish(entry).unwrap();

        assert_ne!(p.dispatch(derived, "m()"), Some(abst));
        assert_eq!(p.dispatch(derived, "m()"), Some(concrete));
    }

    #[test]
    fn finish_rejects_out_of_bounds_targets() {
        let mut b = ProgramBuilder::new();
        let a = b.add_class("A", None);
        let entry = b.add_method(a, "main()", true);
        b.set_body(entry, vec![], None, vec![], vec![Stmt::Goto { target: 5 }]);
        assert!(matches!(
            b.finish(entry),
            Err(FlowError::MalformedIr { .. })
        ));
    }

    #[test]
    fn access_index_groups_statements_by_base() {
        let mut b = ProgramBuilder::new();
        let a = b.add_class("A", None);
        let entry = b.add_method(a, "main()", true);
        let f = b.add_field(a, "f", Type::Int, false);
        let x = b.add_var(entry, "x", Type::Object(a));
        let y = b.add_var(entry, "y", Type::Int);
        b.set_body(
            entry,
            vec![],
            None,
            vec![],
            vec![
                Stmt::New { lhs: x, class: a },
                Stmt::StoreField {
                    base: Some(x),
                    field: f,
                    rhs: y,
                },
                Stmt::LoadField {
                    lhs: y,
                    base: Some(x),
                    field: f,
                },
                Stmt::Invoke(Invoke {
                    kind: CallKind::Virtual,
                    declaring: a,
                    subsig: "m()".into(),
                    recv: Some(x),
                    args: vec![],
                    result: None,
                }),
            ],
        );
        let p = b.finish(entry).unwrap();
        let index = VarAccessIndex::build(&p);
        assert_eq!(index.store_fields_of(x).len(), 1);
        assert_eq!(index.load_fields_of(x).len(), 1);
        assert_eq!(index.invokes_of(x).len(), 1);
        assert!(index.store_arrays_of(x).is_empty());
    }
}
