//! Dataflow analyses and the monotone solver framework.
//!
//! # Components
//!
//! - [`fact`] - lattices ([`Value`], [`CpFact`], [`SetFact`]) and the
//!   per-node result store
//! - [`solver`] - the generic intraprocedural worklist solver
//! - [`constant_propagation`] - forward integer constant propagation
//! - [`live_variables`] - backward liveness
//! - [`dead_code`] - reachability under constant branch pruning fused
//!   with dead-store elision
//! - [`inter`] - the interprocedural (ICFG) solver and alias-aware
//!   interprocedural constant propagation
//!
//! # Example
//!
//! ```ignore
//! use classflow::cfg::build_cfg;
//! use classflow::dataflow::{solve, ConstantPropagation};
//!
//! let ir = program.ir_of(method).unwrap();
//! let cfg = build_cfg(method, ir);
//! let result = solve(&ConstantPropagation::new(&program, ir), &cfg);
//! let exit_fact = result.in_fact(classflow::cfg::Cfg::EXIT);
//! ```

pub mod constant_propagation;
pub mod dead_code;
pub mod fact;
pub mod inter;
pub mod live_variables;
pub mod solver;

pub use constant_propagation::ConstantPropagation;
pub use dead_code::{detect_dead_code, detect_with_results};
pub use fact::{CpFact, DataflowResult, DenseNodeId, SetFact, Value};
pub use inter::{InterConstantPropagation, InterSolver};
pub use live_variables::LiveVariables;
pub use solver::{solve, DataflowAnalysis};
