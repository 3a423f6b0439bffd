//! Whole-program pointer analysis.
//!
//! # Components
//!
//! - [`heap`] - allocation-site object abstraction (plus taint objects)
//! - [`pfg`] - the pointer flow graph and points-to sets
//! - [`context`] - interned contexts and selector policies
//! - [`ci`] - the context-insensitive solver
//! - [`cs`] - the context-sensitive solver (hosts the taint overlay)
//! - [`result`] - the frozen [`PointerAnalysisResult`]
//!
//! Both solvers discover the call graph on the fly: methods become
//! reachable when a resolved call edge first reaches them, and receiver
//! variables gaining objects drive virtual dispatch. Points-to sets and
//! graphs only ever grow, so the FIFO fixpoint is deterministic and
//! terminates on the finite abstract heap.

pub mod ci;
pub mod context;
pub mod cs;
pub mod heap;
pub mod pfg;
pub mod result;

pub use ci::{solve_ci, CiSolver, Pointer};
pub use context::{
    ContextElem, ContextInsensitive, ContextInterner, ContextSelector, CtxId, KCallSite, KObject,
};
pub use cs::{solve_cs, solve_cs_with_taint, CsManager, CsObjId, CsPointer, CsSolver, TAINT_FLOWS_KEY};
pub use heap::{HeapModel, HeapObj, ObjId};
pub use pfg::{PointerFlowGraph, PointsToSet, PtrId};
pub use result::{AuxResult, PointerAnalysisResult};
