//! Intermediate representation consumed by every analysis.
//!
//! # Components
//!
//! - [`types`] - dense ids, primitive/reference types, variable and field data
//! - [`stmt`] - the closed statement sum type and integer operator semantics
//! - [`program`] - program arenas, class hierarchy, builder, access indexes
//!
//! The IR is deliberately flat: expressions are three-address, heap
//! accesses always go through a base variable, and jump targets are
//! statement indexes. Analyses treat a finished [`Program`] as immutable.

pub mod program;
pub mod stmt;
pub mod types;

pub use program::{Class, Ir, Method, Program, ProgramBuilder, VarAccessIndex};
pub use stmt::{BinaryOp, CallKind, CondOp, Invoke, Stmt};
pub use types::{ClassId, FieldData, FieldId, MethodId, StmtRef, Type, VarData, VarId};
